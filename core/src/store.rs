//! Storage collaborator contracts.
//!
//! The feed persists records in a key-value **table store** and image bytes in
//! an **object (blob) store**. Both are external systems; this module only
//! fixes the narrow contract the runtime relies on.
//!
//! # Batch Writes
//!
//! ```text
//!  batch_delete([k1 .. kN])   N ≤ batch_limit()
//!        │
//!        ▼
//!  ┌──────────────┐   Ok(outcome)     outcome.unprocessed ⊆ {k1 .. kN}
//!  │  TableStore  │ ───────────────▶  (may be non-empty on a nominally
//!  └──────────────┘                    successful call: retry them)
//!        │
//!        └── Err(StoreError)          call failed outright: do not retry
//! ```
//!
//! # Dyn Compatibility
//!
//! Methods return boxed futures instead of using `async fn` so the traits can
//! be shared as `Arc<dyn TableStore>` / `Arc<dyn BlobStore>` between the
//! coordinator, the cascade engine, and HTTP handlers.

use crate::error::StoreError;
use crate::model::{Item, RecordKey};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by storage collaborators.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Result of a batch write call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchWriteOutcome {
    /// Keys the store accepted into the call but did not apply.
    pub unprocessed: Vec<RecordKey>,
}

impl BatchWriteOutcome {
    /// An outcome where every request was applied.
    #[must_use]
    pub const fn complete() -> Self {
        Self {
            unprocessed: Vec::new(),
        }
    }

    /// Whether every request in the call was applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unprocessed.is_empty()
    }
}

/// Key-value table store with a capacity-bounded batch-write API.
pub trait TableStore: Send + Sync {
    /// Maximum number of requests accepted by one [`batch_delete`](Self::batch_delete) call.
    fn batch_limit(&self) -> usize;

    /// Fetch one item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store cannot be reached.
    fn get_item<'a>(&'a self, key: &'a RecordKey) -> StoreFuture<'a, Option<Item>>;

    /// Insert or replace one item.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store cannot be reached.
    fn put_item(&self, item: Item) -> StoreFuture<'_, ()>;

    /// Delete one item, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store cannot be reached.
    fn delete_item<'a>(&'a self, key: &'a RecordKey) -> StoreFuture<'a, bool>;

    /// Every item in `partition_key` whose sort key starts with `sort_prefix`,
    /// fully paginated before returning.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if any page fails.
    fn query<'a>(&'a self, partition_key: &'a str, sort_prefix: &'a str)
    -> StoreFuture<'a, Vec<Item>>;

    /// Every item in any partition whose sort key starts with `sort_prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if any page fails.
    fn scan<'a>(&'a self, sort_prefix: &'a str) -> StoreFuture<'a, Vec<Item>>;

    /// Keys of every item matched by [`query`](Self::query).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if any page fails.
    fn query_keys<'a>(
        &'a self,
        partition_key: &'a str,
        sort_prefix: &'a str,
    ) -> StoreFuture<'a, Vec<RecordKey>> {
        Box::pin(async move {
            let items = self.query(partition_key, sort_prefix).await?;
            Ok(items.into_iter().map(|item| item.key).collect())
        })
    }

    /// Delete up to [`batch_limit`](Self::batch_limit) items in one call.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BatchTooLarge`] if `keys` exceeds the limit, or
    /// [`StoreError::Unavailable`] if the call fails outright.
    fn batch_delete(&self, keys: Vec<RecordKey>) -> StoreFuture<'_, BatchWriteOutcome>;
}

/// Object store holding uploaded images.
pub trait BlobStore: Send + Sync {
    /// Whether a blob exists under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store cannot be reached.
    fn exists<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool>;

    /// Open an upload slot for `key` and return the URL the client sends the
    /// file bytes to.
    ///
    /// Stores that cannot hand out direct upload URLs register `key` right
    /// away, so [`exists`](Self::exists) reports it from then on.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store cannot be reached.
    fn prepare_upload<'a>(&'a self, key: &'a str, content_type: &'a str)
    -> StoreFuture<'a, String>;

    /// Delete the blob under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no blob exists (callers usually
    /// treat this as success), or [`StoreError::Unavailable`].
    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}
