//! Injected time dependencies.
//!
//! The runtime never reads the wall clock or sleeps directly; it goes through
//! these traits so tests can pin time and observe backoff without waiting.
//!
//! ```ignore
//! // Production
//! let engine = CascadeDeleteEngine::new(table, Arc::new(TokioSleeper));
//!
//! // Test: records every backoff instead of sleeping
//! let sleeper = Arc::new(RecordingSleeper::new());
//! let engine = CascadeDeleteEngine::new(table, sleeper.clone());
//! ```

use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Suspends the calling task between retry rounds.
pub trait Sleeper: Send + Sync {
    /// Suspend for `duration`.
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}
