//! Application state shared across all HTTP handlers.

use murmur_runtime::{
    CommentService, EventBroker, PostLifecycleCoordinator, UploadService, UserService,
};
use std::time::Duration;

/// Default interval between SSE keep-alive comments.
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(15);

/// Handles to the feed runtime, injected into every handler.
///
/// Every field is a cheap, clonable handle; there is no process-wide
/// singleton, so tests can build as many independent states as they like.
///
/// # Examples
///
/// ```ignore
/// async fn timeline(State(state): State<AppState>) -> Result<Json<Vec<Post>>, AppError> {
///     Ok(Json(state.coordinator.timeline().await?))
/// }
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Post create, update, and delete
    pub coordinator: PostLifecycleCoordinator,
    /// Comment operations
    pub comments: CommentService,
    /// Accounts and follows
    pub users: UserService,
    /// Image upload slots
    pub uploads: UploadService,
    /// Live event fan-out
    pub broker: EventBroker,
    /// SSE keep-alive interval
    pub keepalive: Duration,
}

impl AppState {
    /// Create application state.
    #[must_use]
    pub const fn new(
        coordinator: PostLifecycleCoordinator,
        comments: CommentService,
        users: UserService,
        uploads: UploadService,
        broker: EventBroker,
    ) -> Self {
        Self {
            coordinator,
            comments,
            users,
            uploads,
            broker,
            keepalive: DEFAULT_KEEPALIVE,
        }
    }

    /// Override the SSE keep-alive interval.
    #[must_use]
    pub const fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }
}
