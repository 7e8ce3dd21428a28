//! # Murmur Testing
//!
//! Testing utilities for the Murmur feed.
//!
//! This crate provides:
//! - [`ScriptedTableStore`] / [`ScriptedBlobStore`]: in-memory stores whose batch
//!   behaviour is scripted per call and whose every call is logged
//! - [`RecordingSleeper`]: records backoff durations instead of sleeping
//! - [`FixedClock`]: deterministic time
//! - Record fixtures and proptest strategies
//!
//! ## Example
//!
//! ```ignore
//! use murmur_testing::{BatchRule, RecordingSleeper, ScriptedTableStore};
//!
//! #[tokio::test]
//! async fn retries_rejected_items() {
//!     let table = Arc::new(ScriptedTableStore::new());
//!     table.script([BatchRule::RejectLast(3)]);
//!     let sleeper = Arc::new(RecordingSleeper::new());
//!
//!     let engine = CascadeDeleteEngine::new(table.clone(), sleeper.clone());
//!     engine.delete_children("p1", &CascadeConfig::default()).await?;
//!
//!     assert_eq!(table.batch_sizes(), vec![25, 25, 10, 3]);
//! }
//! ```

use chrono::{DateTime, Utc};
use murmur_core::environment::{Clock, Sleeper};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub mod fixtures;
pub mod scripted_store;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Arc, Clock, DateTime, Duration, Future, Mutex, Pin, Sleeper, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use murmur_testing::mocks::FixedClock;
    /// use murmur_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Sleeper that returns at once and remembers every requested duration.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingSleeper {
        sleeps: Arc<Mutex<Vec<Duration>>>,
    }

    impl RecordingSleeper {
        /// Create a sleeper with an empty record.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Every duration requested so far, in order.
        ///
        /// # Panics
        ///
        /// Panics if the record lock is poisoned.
        #[must_use]
        #[allow(clippy::unwrap_used)]
        pub fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    impl Sleeper for RecordingSleeper {
        #[allow(clippy::unwrap_used)]
        fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
            self.sleeps.lock().unwrap().push(duration);
            Box::pin(std::future::ready(()))
        }
    }
}

/// Install a test-friendly `tracing` subscriber honouring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, RecordingSleeper, test_clock};
pub use scripted_store::{BatchRule, Operation, ScriptedBlobStore, ScriptedTableStore};
