//! Route table.

use crate::handlers::{comments, events, health, posts, uploads, users};
use crate::middleware::request_span_layer;
use crate::state::AppState;
use axum::{
    Router,
    http::{HeaderName, Method, header},
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the HTTP surface over `state`.
///
/// Middleware (outermost first): correlation id, request tracing, CORS.
///
/// `/posts/:id` names a user and `/posts/:id/comments` a post; the segment
/// shares one parameter name because the router requires it. The static
/// `/users/follow` and `/users/unfollow` take priority over `/users/:user_id`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness))
        .route("/events", get(events::stream_events))
        .route("/me", get(users::me))
        .route("/users", post(users::register).get(users::list_users))
        .route("/users/follow", post(users::follow))
        .route("/users/unfollow", delete(users::unfollow))
        .route("/users/:user_id", get(users::get_user))
        .route("/users/:user_id/following", get(users::following))
        .route("/presign", post(uploads::presign))
        .route("/posts", post(posts::create_post).get(posts::timeline))
        .route("/posts/:id", get(posts::posts_by_user))
        .route(
            "/users/:user_id/posts/:post_id",
            put(posts::update_post).delete(posts::delete_post),
        )
        .route(
            "/posts/:id/comments",
            post(comments::create_comment).get(comments::list_comments),
        )
        .route(
            "/users/:user_id/posts/:post_id/comments/:comment_id",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .layer(request_span_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-user-id"),
            HeaderName::from_static("x-user-name"),
            HeaderName::from_static("x-correlation-id"),
        ])
        .expose_headers([HeaderName::from_static("x-correlation-id")])
}
