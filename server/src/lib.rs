//! Murmur feed server.
//!
//! Wires the in-memory stores, the event broker, the post lifecycle
//! coordinator, and the comment, user, and upload services into the HTTP
//! router, and exposes the Prometheus scrape endpoint when metrics are
//! enabled.

#![forbid(unsafe_code)]

pub mod config;

pub use config::Config;

use axum::{Router, routing::get};
use metrics_exporter_prometheus::PrometheusHandle;
use murmur_runtime::memory::{InMemoryBlobStore, InMemoryTableStore};
use murmur_runtime::{
    CommentService, EventBroker, PostLifecycleCoordinator, UploadService, UserService,
};
use murmur_web::AppState;
use std::sync::Arc;

/// Build handler state over fresh in-memory stores.
#[must_use]
pub fn build_state(config: &Config) -> AppState {
    let table = Arc::new(InMemoryTableStore::new());
    let blobs = Arc::new(InMemoryBlobStore::new());
    let broker = EventBroker::new(config.stream.subscriber_buffer);

    let coordinator = PostLifecycleCoordinator::new(
        table.clone(),
        blobs.clone(),
        broker.clone(),
        config.cascade.clone(),
    );
    let comments = CommentService::new(table.clone());
    let users = UserService::new(table);
    let uploads = UploadService::new(blobs);

    AppState::new(coordinator, comments, users, uploads, broker)
        .with_keepalive(config.stream.keepalive)
}

/// Prometheus scrape endpoint (`GET /metrics`).
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    )
}
