//! Comment endpoints.

use crate::error::AppError;
use crate::extractors::Caller;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use murmur_core::Comment;
use serde::Deserialize;

/// Body of comment create and update requests.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentBody {
    /// Comment text
    #[serde(default)]
    pub text: String,
}

/// Comment on a post as the caller.
///
/// # Errors
///
/// 401 without identity, 422 for rejected text.
pub async fn create_comment(
    State(state): State<AppState>,
    caller: Caller,
    Path(post_id): Path<String>,
    Json(body): Json<CommentBody>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let comment = state
        .comments
        .create(&post_id, &caller.author(), &body.text)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Comments of a post, newest first.
///
/// # Errors
///
/// 503 if storage is down.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<Comment>>, AppError> {
    Ok(Json(state.comments.list(&post_id).await?))
}

/// Replace the text of one of the caller's comments.
///
/// # Errors
///
/// 403 when the caller did not write it, 404 for an unknown comment.
pub async fn update_comment(
    State(state): State<AppState>,
    caller: Caller,
    Path((user_id, post_id, comment_id)): Path<(String, String, String)>,
    Json(body): Json<CommentBody>,
) -> Result<Json<Comment>, AppError> {
    caller.authorize(&user_id)?;
    let comment = state
        .comments
        .update(&user_id, &post_id, &comment_id, &body.text)
        .await?;
    Ok(Json(comment))
}

/// Delete one of the caller's comments.
///
/// # Errors
///
/// 403 when the caller did not write it, 404 for an unknown comment.
pub async fn delete_comment(
    State(state): State<AppState>,
    caller: Caller,
    Path((user_id, post_id, comment_id)): Path<(String, String, String)>,
) -> Result<StatusCode, AppError> {
    caller.authorize(&user_id)?;
    state
        .comments
        .delete(&user_id, &post_id, &comment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
