//! HTTP and live event surface for the Murmur feed.
//!
//! This crate is the imperative shell around `murmur-runtime`: it parses
//! requests, resolves the caller, hands the work to the post lifecycle
//! coordinator or to the comment, user, or upload service, and maps
//! [`FeedError`]s onto status codes. Connected viewers receive `new_post`, `update_post`, and
//! `delete_post` notifications over server-sent events.
//!
//! # Request Flow
//!
//! 1. **Correlate** the request and open a tracing span
//! 2. **Extract** the caller from identity headers and the body as JSON
//! 3. **Dispatch** to the coordinator or a service
//! 4. **Map** the result (or [`AppError`]) to an HTTP response
//!
//! # Example
//!
//! ```ignore
//! use murmur_web::{AppState, build_router};
//!
//! let state = AppState::new(coordinator, comments, users, uploads, broker);
//! let app = build_router(state);
//! axum::serve(listener, app).await?;
//! ```
//!
//! [`FeedError`]: murmur_core::FeedError

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{Caller, CorrelationId, USER_ID_HEADER, USER_NAME_HEADER};
pub use middleware::{CORRELATION_ID_HEADER, request_span_layer};
pub use router::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
