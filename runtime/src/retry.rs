//! Retry configuration for capacity-bounded batch writes.
//!
//! The table store accepts at most a fixed number of requests per batch call and
//! may leave part of any batch unapplied under load. [`CascadeConfig`] describes
//! how the cascade engine sizes its batches and how it backs off while
//! resubmitting the unapplied remainder.
//!
//! # Example
//!
//! ```rust
//! use murmur_runtime::retry::CascadeConfig;
//! use std::time::Duration;
//!
//! let config = CascadeConfig::builder()
//!     .batch_size(25)
//!     .max_retries(5)
//!     .initial_backoff(Duration::from_millis(100))
//!     .max_backoff(Duration::from_secs(5))
//!     .build();
//!
//! assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
//! assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
//! ```

use std::time::Duration;

/// Default per-call batch size (the table store's ceiling).
pub const DEFAULT_BATCH_SIZE: usize = 25;
/// Default retry budget.
pub const DEFAULT_MAX_RETRIES: u32 = 5;
/// Default first backoff.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);
/// Default backoff ceiling.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Batch sizing and backoff policy for cascade deletes.
///
/// # Default Values
///
/// - `batch_size`: 25
/// - `max_retries`: 5
/// - `initial_backoff`: 100ms
/// - `max_backoff`: 5 seconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeConfig {
    /// Maximum keys per batch call
    pub batch_size: usize,
    /// Consecutive failed retry rounds tolerated before giving up
    pub max_retries: u32,
    /// Backoff after the first failed retry round
    pub initial_backoff: Duration,
    /// Cap for exponential backoff
    pub max_backoff: Duration,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl CascadeConfig {
    /// Create a new config builder.
    #[must_use]
    pub const fn builder() -> CascadeConfigBuilder {
        CascadeConfigBuilder {
            batch_size: None,
            max_retries: None,
            initial_backoff: None,
            max_backoff: None,
        }
    }

    /// Backoff before the retry following failed attempt number `attempt` (1-based).
    ///
    /// `initial_backoff × 2^(attempt-1)`, saturating at `max_backoff`. Computed
    /// with integer duration arithmetic so very large attempt counts cannot
    /// overflow or lose precision.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);

        2u32.checked_pow(exponent)
            .and_then(|factor| self.initial_backoff.checked_mul(factor))
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }
}

/// Builder for [`CascadeConfig`].
#[derive(Debug, Clone)]
pub struct CascadeConfigBuilder {
    batch_size: Option<usize>,
    max_retries: Option<u32>,
    initial_backoff: Option<Duration>,
    max_backoff: Option<Duration>,
}

impl CascadeConfigBuilder {
    /// Set maximum keys per batch call. Zero is raised to one.
    #[must_use]
    pub const fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Set the retry budget.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set the backoff after the first failed retry round.
    #[must_use]
    pub const fn initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = Some(delay);
        self
    }

    /// Set the backoff ceiling.
    #[must_use]
    pub const fn max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = Some(delay);
        self
    }

    /// Build the [`CascadeConfig`].
    #[must_use]
    pub fn build(self) -> CascadeConfig {
        CascadeConfig {
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            initial_backoff: self.initial_backoff.unwrap_or(DEFAULT_INITIAL_BACKOFF),
            max_backoff: self.max_backoff.unwrap_or(DEFAULT_MAX_BACKOFF),
        }
    }
}
