//! Image upload slots.
//!
//! Clients never stream image bytes through the feed service. They ask for an
//! [`UploadTicket`], send the file to its URL, and then create or edit a post
//! naming the ticket's key as `image`.

use crate::validation;
use chrono::Duration;
use metrics::counter;
use murmur_core::environment::{Clock, SystemClock};
use murmur_core::{BlobStore, FeedError, UploadRequest, UploadTicket};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Prefix of every key handed out for uploads.
pub const UPLOAD_KEY_PREFIX: &str = "uploads/";
/// How long an upload URL stays valid.
pub const UPLOAD_TICKET_MINUTES: i64 = 15;

/// Hands out upload slots in the blob store.
#[derive(Clone)]
pub struct UploadService {
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
}

impl UploadService {
    /// Create a service using the wall clock.
    #[must_use]
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            blobs,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for ticket expiry.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Open an upload slot for an image.
    ///
    /// Keys have the form `uploads/{uuid}_{file_name}`, so two uploads of the
    /// same file never collide.
    ///
    /// # Errors
    ///
    /// - [`FeedError::Validation`] for an unusable file name or a non-image type
    /// - [`FeedError::UpstreamUnavailable`] if the blob store call fails
    #[tracing::instrument(skip(self, request))]
    pub async fn issue(
        &self,
        user_id: &str,
        request: UploadRequest,
    ) -> Result<UploadTicket, FeedError> {
        let file_name = validation::file_name(&request.file_name)?;
        let content_type = validation::image_type(&request.file_type)?;

        let key = format!("{UPLOAD_KEY_PREFIX}{}_{file_name}", Uuid::new_v4());
        let url = self.blobs.prepare_upload(&key, &content_type).await?;
        let expires_at = self.clock.now() + Duration::minutes(UPLOAD_TICKET_MINUTES);

        counter!("uploads_issued_total").increment(1);
        info!(%key, %content_type, "Upload slot issued");
        Ok(UploadTicket {
            key,
            url,
            expires_at,
        })
    }
}

impl std::fmt::Debug for UploadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadService").finish_non_exhaustive()
    }
}
