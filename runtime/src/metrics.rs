//! Prometheus metrics for the feed runtime.
//!
//! Metrics recorded by the runtime:
//! - Event broker publish, drop, and subscriber counts
//! - Cascade delete batches, retries, and failures
//! - Post lifecycle latency
//! - Image upload slots issued
//!
//! The `metrics` macros are no-ops until a recorder is installed, so
//! components record unconditionally and the server decides whether to export.
//!
//! # Example
//!
//! ```rust,no_run
//! use murmur_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! let body = server.render().unwrap_or_default();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
    /// Failed to bind HTTP server
    #[error("Failed to bind metrics server: {0}")]
    Bind(#[from] std::io::Error),
}

/// Prometheus recorder plus the address its scrape endpoint is served on.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server for `addr`.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Address the scrape endpoint should be bound to.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Describe every metric and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Build`] if histogram buckets are rejected, or
    /// [`MetricsError::Install`] if the recorder cannot be installed.
    ///
    /// # Note
    ///
    /// A recorder installed earlier in the process (e.g. by another test) is
    /// tolerated; [`handle`](Self::handle) then stays `None`.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Event broker
    describe_counter!(
        "broker_events_published_total",
        "Total number of events fanned out by the broker"
    );
    describe_counter!(
        "broker_events_dropped_total",
        "Deliveries skipped because a subscriber queue was full"
    );
    describe_gauge!("broker_subscribers", "Currently registered subscribers");

    // Cascade delete
    describe_counter!(
        "cascade_batches_total",
        "Batch delete calls issued, including retries"
    );
    describe_counter!(
        "cascade_retries_total",
        "Retry rounds that left items unprocessed"
    );
    describe_counter!(
        "cascade_items_deleted_total",
        "Dependent records confirmed deleted"
    );
    describe_counter!(
        "cascade_failures_total",
        "Cascade deletes that exhausted their retry budget"
    );

    // Post lifecycle
    describe_histogram!(
        "post_lifecycle_duration_seconds",
        "Time taken to create, update, or delete a post"
    );

    // Uploads
    describe_counter!(
        "uploads_issued_total",
        "Image upload slots handed out to clients"
    );
}
