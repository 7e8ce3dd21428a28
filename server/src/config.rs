//! Configuration management for the feed server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! A variable that is unset or does not parse falls back to its default.

use murmur_runtime::CascadeConfig;
use murmur_runtime::memory::IN_MEMORY_BATCH_LIMIT;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Live event stream configuration
    pub stream: StreamConfig,
    /// Comment cascade policy
    pub cascade: CascadeConfig,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log filter directives (`RUST_LOG`)
    pub log_level: String,
    /// Prometheus scrape address; metrics export is off when unset
    pub metrics_addr: Option<SocketAddr>,
    /// Grace period for in-flight requests after Ctrl-C
    pub shutdown_timeout: Duration,
}

/// Event stream configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Per-subscriber queue depth before deliveries are skipped
    pub subscriber_buffer: usize,
    /// Interval between SSE keep-alive comments
    pub keepalive: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let parsed = |key: &str, default| parse_or(var(key), default);

        Self {
            server: ServerConfig {
                host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(var("PORT"), 8080),
                log_level: var("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
                metrics_addr: var("METRICS_ADDR").and_then(|s| s.parse().ok()),
                shutdown_timeout: Duration::from_secs(parsed("SHUTDOWN_TIMEOUT_SECS", 10)),
            },
            stream: StreamConfig {
                subscriber_buffer: parse_or(var("SUBSCRIBER_BUFFER"), 16_usize).max(1),
                keepalive: Duration::from_secs(parsed("SSE_KEEPALIVE_SECS", 15).max(1)),
            },
            cascade: CascadeConfig {
                batch_size: parse_or(var("CASCADE_BATCH_SIZE"), IN_MEMORY_BATCH_LIMIT)
                    .clamp(1, IN_MEMORY_BATCH_LIMIT),
                max_retries: parse_or(var("CASCADE_MAX_RETRIES"), 5),
                initial_backoff: Duration::from_millis(parsed("CASCADE_INITIAL_BACKOFF_MS", 100)),
                max_backoff: Duration::from_millis(parsed("CASCADE_MAX_BACKOFF_MS", 5000)),
            },
        }
    }

    /// Socket address of the HTTP listener.
    ///
    /// # Errors
    ///
    /// Returns an error if `HOST` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,murmur=debug,tower_http=info";

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|s| s.parse().ok()).unwrap_or(default)
}
