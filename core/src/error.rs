//! Error taxonomy shared by the storage layer, the runtime, and the HTTP shell.

use thiserror::Error;

/// Errors reported by storage collaborators ([`TableStore`](crate::store::TableStore)
/// and [`BlobStore`](crate::store::BlobStore)).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed record or blob does not exist.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The store call failed outright (network, throttling, shutdown).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A batch call exceeded the store's per-call item ceiling.
    #[error("Batch of {size} items exceeds the store limit of {limit}")]
    BatchTooLarge {
        /// Items in the rejected call
        size: usize,
        /// The store's ceiling
        limit: usize,
    },

    /// A stored item could not be decoded into a domain record.
    #[error("Malformed record {key}: {reason}")]
    Malformed {
        /// Key of the offending item
        key: String,
        /// Decoder message
        reason: String,
    },
}

/// Feed-level failures surfaced to callers of the runtime.
///
/// Partial batch application is not an error: it is reported as
/// [`BatchWriteOutcome::unprocessed`](crate::store::BatchWriteOutcome) and retried
/// locally by the cascade engine. Only an exhausted retry budget escalates to
/// [`FeedError::RetryExhausted`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// A parent or child record is absent. Never retried.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Kind of record ("post", "comment", "image")
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The cascade engine gave up with dependents still present.
    #[error("Failed to delete all dependents after {retries} retries, {outstanding} items remain unprocessed")]
    RetryExhausted {
        /// Keys the store never confirmed
        outstanding: usize,
        /// Retry budget that was spent
        retries: u32,
    },

    /// Delivery to a single subscriber failed. Never propagated to publishers.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    /// A store or blob-store call failed outright.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Caller input was rejected.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Caller is not allowed to mutate the addressed record.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A record could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl FeedError {
    /// Shorthand for [`FeedError::NotFound`].
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }
}

impl From<StoreError> for FeedError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => Self::NotFound {
                resource: "record",
                id: key,
            },
            StoreError::Malformed { .. } => Self::Serialization(err.to_string()),
            StoreError::Unavailable(_) | StoreError::BatchTooLarge { .. } => {
                Self::UpstreamUnavailable(err.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
