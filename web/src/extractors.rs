//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: the request's correlation ID, as assigned by
//!   [`request_span_layer`](crate::middleware::request_span_layer)
//! - [`Caller`]: the authenticated caller, from gateway identity headers
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(
//!     State(state): State<AppState>,
//!     caller: Caller,
//!     Json(draft): Json<PostDraft>,
//! ) -> Result<Json<Post>, AppError> {
//!     let post = state.coordinator.create_post(&caller.author(), draft).await?;
//!     Ok(Json(post))
//! }
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use murmur_core::Author;
use uuid::Uuid;

/// Header carrying the authenticated account id.
pub const USER_ID_HEADER: &str = "X-User-Id";
/// Header carrying the authenticated display name.
pub const USER_NAME_HEADER: &str = "X-User-Name";

/// Correlation ID for request tracing.
///
/// Taken from request extensions when the middleware is installed, otherwise
/// from the `X-Correlation-ID` header, otherwise freshly generated.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts.extensions.get::<Uuid>().copied().unwrap_or_else(|| {
            parts
                .headers
                .get(CORRELATION_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| Uuid::parse_str(s).ok())
                .unwrap_or_else(Uuid::new_v4)
        });

        Ok(Self(correlation_id))
    }
}

/// The authenticated caller.
///
/// Authentication happens upstream (API gateway or auth proxy), which forwards
/// the verified identity as `X-User-Id` and `X-User-Name`. A request without
/// a user id is rejected with 401; a missing name falls back to the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Account identifier
    pub user_id: String,
    /// Display name
    pub user_name: String,
}

impl Caller {
    /// The caller as a record author.
    #[must_use]
    pub fn author(&self) -> Author {
        Author::new(self.user_id.clone(), self.user_name.clone())
    }

    /// Reject unless the caller is `user_id`.
    ///
    /// # Errors
    ///
    /// Returns a 403 [`AppError`] when acting on another user's records.
    pub fn authorize(&self, user_id: &str) -> Result<(), AppError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            Err(AppError::forbidden("Not authorized to modify this user's records"))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
        };

        let user_id = header(USER_ID_HEADER).ok_or_else(|| AppError::unauthorized("Not authenticated"))?;
        let user_name = header(USER_NAME_HEADER).unwrap_or_else(|| user_id.clone());

        Ok(Self { user_id, user_name })
    }
}
