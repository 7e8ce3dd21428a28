//! Post endpoints.
//!
//! Mutations go through the [`PostLifecycleCoordinator`], which persists the
//! change and then announces it to every connected event stream.
//!
//! [`PostLifecycleCoordinator`]: murmur_runtime::PostLifecycleCoordinator

use crate::error::AppError;
use crate::extractors::Caller;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use murmur_core::{Post, PostDraft};

/// Create a post owned by the caller.
///
/// # Endpoint
///
/// ```text
/// POST /posts
/// {"text": "hello", "image": ""}
/// ```
///
/// # Errors
///
/// 401 without identity, 422 for a rejected draft, 503 if storage is down.
pub async fn create_post(
    State(state): State<AppState>,
    caller: Caller,
    Json(draft): Json<PostDraft>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let post = state.coordinator.create_post(&caller.author(), draft).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// Every post, newest first.
///
/// # Errors
///
/// 503 if storage is down.
pub async fn timeline(State(state): State<AppState>) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(state.coordinator.timeline().await?))
}

/// Posts of one user, newest first.
///
/// # Errors
///
/// 503 if storage is down.
pub async fn posts_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(state.coordinator.posts_by_user(&user_id).await?))
}

/// Replace the text and image of one of the caller's posts.
///
/// # Errors
///
/// 403 when `user_id` is not the caller, 404 for an unknown post, 422 for a
/// rejected draft.
pub async fn update_post(
    State(state): State<AppState>,
    caller: Caller,
    Path((user_id, post_id)): Path<(String, String)>,
    Json(draft): Json<PostDraft>,
) -> Result<Json<Post>, AppError> {
    caller.authorize(&user_id)?;
    let post = state
        .coordinator
        .update_post(&user_id, &post_id, draft)
        .await?;
    Ok(Json(post))
}

/// Delete one of the caller's posts together with its comments and image.
///
/// # Errors
///
/// 403 when `user_id` is not the caller, 404 for an unknown post, 503 when the
/// comment cascade gives up with comments still outstanding.
pub async fn delete_post(
    State(state): State<AppState>,
    caller: Caller,
    Path((user_id, post_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    caller.authorize(&user_id)?;
    state.coordinator.delete_post(&user_id, &post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
