//! Account and follow endpoints.

use crate::error::AppError;
use crate::extractors::Caller;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use murmur_core::{Follow, User};
use serde::{Deserialize, Serialize};

/// Body of `POST /users`.
///
/// `id` defaults to the caller; naming anyone else is forbidden.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterBody {
    /// Account id, normally omitted
    #[serde(default)]
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Contact address
    #[serde(default)]
    pub email: String,
    /// Avatar URL
    #[serde(default)]
    pub picture: String,
}

/// Body of `POST /users/follow`.
#[derive(Debug, Clone, Deserialize)]
pub struct FollowBody {
    /// Account to follow
    pub following_id: String,
}

/// Body of `DELETE /users/unfollow`.
#[derive(Debug, Clone, Deserialize)]
pub struct UnfollowBody {
    /// Account to stop following
    pub unfollowing_id: String,
}

/// Response of `GET /me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeResponse {
    /// Caller id
    pub id: String,
    /// Caller display name
    pub name: String,
    /// Ids the caller follows
    pub following: Vec<String>,
}

/// Register the caller, or refresh their profile.
///
/// # Endpoint
///
/// ```text
/// POST /users
/// {"name": "Ada", "email": "ada@example.com", "picture": ""}
/// ```
///
/// # Errors
///
/// 401 without identity, 403 when registering another id, 422 for a blank
/// name.
pub async fn register(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let id = if body.id.trim().is_empty() {
        caller.user_id.clone()
    } else {
        caller.authorize(body.id.trim())?;
        body.id
    };

    let user = state
        .users
        .register(User {
            id,
            name: body.name,
            email: body.email,
            picture: body.picture,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Every registered user, by name.
///
/// # Errors
///
/// 503 if storage is down.
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.users.list().await?))
}

/// One registered user.
///
/// # Errors
///
/// 404 for an unknown user.
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.get(&user_id).await?))
}

/// Ids a user follows.
///
/// # Errors
///
/// 503 if storage is down.
pub async fn following(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.users.following(&user_id).await?))
}

/// The caller's profile and follow list.
///
/// # Errors
///
/// 401 without identity, 404 if the caller never registered.
pub async fn me(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<MeResponse>, AppError> {
    let profile = state.users.profile(&caller.user_id).await?;
    Ok(Json(MeResponse {
        id: profile.user.id,
        name: profile.user.name,
        following: profile.following,
    }))
}

/// Follow another registered user.
///
/// # Errors
///
/// 404 for an unknown target, 422 when following yourself.
pub async fn follow(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<FollowBody>,
) -> Result<(StatusCode, Json<Follow>), AppError> {
    let follow = state
        .users
        .follow(&caller.user_id, &body.following_id)
        .await?;
    Ok((StatusCode::CREATED, Json(follow)))
}

/// Stop following a user.
///
/// # Errors
///
/// 404 when the caller was not following them.
pub async fn unfollow(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<UnfollowBody>,
) -> Result<StatusCode, AppError> {
    state
        .users
        .unfollow(&caller.user_id, &body.unfollowing_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
