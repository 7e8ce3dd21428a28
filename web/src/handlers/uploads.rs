//! Image upload slots.

use crate::error::AppError;
use crate::extractors::Caller;
use crate::state::AppState;
use axum::{Json, extract::State};
use murmur_core::{UploadRequest, UploadTicket};

/// Hand the caller an upload URL and the key to reference the image by.
///
/// # Endpoint
///
/// ```text
/// POST /presign
/// {"file_name": "cat.png", "file_type": "image/png"}
/// ```
///
/// # Errors
///
/// 401 without identity, 422 for a non-image or unusable file name.
pub async fn presign(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<UploadRequest>,
) -> Result<Json<UploadTicket>, AppError> {
    Ok(Json(state.uploads.issue(&caller.user_id, request).await?))
}
