//! Cascading delete of a post's comments through the batch-write API.
//!
//! # Algorithm
//!
//! ```text
//! 1. enumerate   query_keys(post#{id}, "comment#")      full listing, no interleaving
//! 2. first pass  [k1..k25] [k26..k50] [k51..k60]        ≤ batch_size each, in order
//!                   │          │           │
//!                   └──────────┴───────────┴──> unprocessed (running list)
//! 3. retry loop  while unprocessed ≠ ∅ and attempt < max_retries:
//!                  resubmit up to batch_size from the front
//!                  still unprocessed → push back to front, attempt += 1,
//!                                      sleep min(initial·2^(attempt-1), max)
//!                  fully applied     → attempt = 0
//! 4. outcome     unprocessed = ∅  → Ok(report)
//!                otherwise        → Err(RetryExhausted { outstanding })
//! ```
//!
//! A fully applied retry round resets the attempt counter, so a later,
//! unrelated partial failure starts with a fresh budget. A batch call that
//! fails outright is surfaced immediately and never retried here.

use crate::retry::CascadeConfig;
use metrics::counter;
use murmur_core::environment::Sleeper;
use murmur_core::model::{COMMENT_PREFIX, RecordKey, post_partition};
use murmur_core::{BatchWriteOutcome, FeedError, StoreError, TableStore};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors from a cascade delete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CascadeError {
    /// The retry budget ran out with dependents still present.
    #[error("{outstanding} dependents still present after {retries} retries")]
    RetryExhausted {
        /// Keys the store never confirmed
        outstanding: usize,
        /// Retry budget that was spent
        retries: u32,
    },

    /// A listing or batch call failed outright.
    #[error("Store call failed: {0}")]
    Upstream(#[from] StoreError),
}

impl From<CascadeError> for FeedError {
    fn from(err: CascadeError) -> Self {
        match err {
            CascadeError::RetryExhausted {
                outstanding,
                retries,
            } => Self::RetryExhausted {
                outstanding,
                retries,
            },
            CascadeError::Upstream(store) => store.into(),
        }
    }
}

/// Summary of a successful cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Dependents found by the listing
    pub enumerated: usize,
    /// Batch calls issued in the first pass
    pub batches: usize,
    /// Retry calls issued after the first pass
    pub retry_batches: usize,
    /// Backoff sleeps taken
    pub backoffs: usize,
}

/// Deletes every dependent of a parent record in store-sized batches.
#[derive(Clone)]
pub struct CascadeDeleteEngine {
    table: Arc<dyn TableStore>,
    sleeper: Arc<dyn Sleeper>,
}

impl CascadeDeleteEngine {
    /// Create an engine over `table`, suspending on `sleeper` between retries.
    #[must_use]
    pub fn new(table: Arc<dyn TableStore>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { table, sleeper }
    }

    /// Delete every comment of `post_id`.
    ///
    /// The post itself is left untouched; callers delete it only after this
    /// returns `Ok`.
    ///
    /// # Errors
    ///
    /// - [`CascadeError::RetryExhausted`] if comments remain after `max_retries`
    /// - [`CascadeError::Upstream`] if the listing or any batch call fails outright
    pub async fn delete_children(
        &self,
        post_id: &str,
        config: &CascadeConfig,
    ) -> Result<CascadeReport, CascadeError> {
        let partition = post_partition(post_id);
        let keys = self.table.query_keys(&partition, COMMENT_PREFIX).await?;

        debug!(post_id, children = keys.len(), "Enumerated dependents");
        self.delete_keys(keys, config).await
    }

    /// Delete an already enumerated set of keys.
    ///
    /// # Errors
    ///
    /// Same as [`delete_children`](Self::delete_children).
    pub async fn delete_keys(
        &self,
        keys: Vec<RecordKey>,
        config: &CascadeConfig,
    ) -> Result<CascadeReport, CascadeError> {
        let batch_size = config.batch_size.clamp(1, self.table.batch_limit().max(1));
        let mut report = CascadeReport {
            enumerated: keys.len(),
            ..CascadeReport::default()
        };

        let mut unprocessed: VecDeque<RecordKey> = VecDeque::new();
        for chunk in keys.chunks(batch_size) {
            let outcome = self.submit(chunk.to_vec()).await?;
            report.batches += 1;
            unprocessed.extend(outcome.unprocessed);
        }

        if !unprocessed.is_empty() {
            warn!(
                unprocessed = unprocessed.len(),
                "First pass left items unprocessed, retrying"
            );
        }

        let mut attempt: u32 = 0;
        while !unprocessed.is_empty() && attempt < config.max_retries {
            let take = batch_size.min(unprocessed.len());
            let batch: Vec<RecordKey> = unprocessed.drain(..take).collect();

            let outcome = self.submit(batch).await?;
            report.retry_batches += 1;

            if outcome.is_complete() {
                attempt = 0;
                continue;
            }

            let rejected = outcome.unprocessed.len();
            for key in outcome.unprocessed.into_iter().rev() {
                unprocessed.push_front(key);
            }

            attempt += 1;
            let delay = config.delay_for_attempt(attempt);
            counter!("cascade_retries_total").increment(1);
            warn!(
                attempt,
                rejected,
                remaining = unprocessed.len(),
                delay_ms = delay.as_millis(),
                "Retry round left items unprocessed, backing off"
            );

            self.sleeper.sleep(delay).await;
            report.backoffs += 1;
        }

        if !unprocessed.is_empty() {
            counter!("cascade_failures_total").increment(1);
            error!(
                outstanding = unprocessed.len(),
                retries = config.max_retries,
                "Cascade delete gave up"
            );
            return Err(CascadeError::RetryExhausted {
                outstanding: unprocessed.len(),
                retries: config.max_retries,
            });
        }

        info!(
            deleted = report.enumerated,
            batches = report.batches,
            retry_batches = report.retry_batches,
            "Cascade delete complete"
        );
        Ok(report)
    }

    async fn submit(&self, batch: Vec<RecordKey>) -> Result<BatchWriteOutcome, StoreError> {
        let size = batch.len();
        counter!("cascade_batches_total").increment(1);

        let outcome = self.table.batch_delete(batch).await.inspect_err(|e| {
            error!(size, error = %e, "Batch delete call failed");
        })?;

        let applied = size.saturating_sub(outcome.unprocessed.len());
        counter!("cascade_items_deleted_total").increment(applied as u64);
        Ok(outcome)
    }
}

impl std::fmt::Debug for CascadeDeleteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CascadeDeleteEngine")
            .field("batch_limit", &self.table.batch_limit())
            .finish_non_exhaustive()
    }
}
