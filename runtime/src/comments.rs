//! Comment create, list, edit, and delete.
//!
//! Comment mutations are not announced to live viewers; only post mutations
//! are.

use crate::repository::CommentRepository;
use crate::validation;
use murmur_core::environment::{Clock, SystemClock};
use murmur_core::{Author, Comment, FeedError, TableStore};
use std::sync::Arc;
use tracing::info;

/// Comment operations against the table store.
#[derive(Clone)]
pub struct CommentService {
    comments: CommentRepository,
    clock: Arc<dyn Clock>,
}

impl CommentService {
    /// Create a service using the wall clock.
    #[must_use]
    pub fn new(table: Arc<dyn TableStore>) -> Self {
        Self {
            comments: CommentRepository::new(table),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used to stamp records.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Add a comment to `post_id`.
    ///
    /// # Errors
    ///
    /// - [`FeedError::Validation`] if the text is empty or too long
    /// - [`FeedError::UpstreamUnavailable`] if the store call fails
    #[tracing::instrument(skip(self, text), fields(user_id = %author.user_id))]
    pub async fn create(
        &self,
        post_id: &str,
        author: &Author,
        text: &str,
    ) -> Result<Comment, FeedError> {
        let text = validation::comment_text(text)?;
        let comment = Comment::new(post_id, author, text, self.clock.now());
        self.comments.put(&comment).await?;

        info!(comment_id = %comment.id, "Comment created");
        Ok(comment)
    }

    /// Comments of `post_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UpstreamUnavailable`] if the store call fails.
    pub async fn list(&self, post_id: &str) -> Result<Vec<Comment>, FeedError> {
        self.comments.list(post_id).await
    }

    /// Replace the text of a comment written by `user_id`.
    ///
    /// # Errors
    ///
    /// - [`FeedError::NotFound`] if the comment does not exist
    /// - [`FeedError::Forbidden`] if `user_id` did not write it
    /// - [`FeedError::Validation`] if the text is rejected
    #[tracing::instrument(skip(self, text))]
    pub async fn update(
        &self,
        user_id: &str,
        post_id: &str,
        comment_id: &str,
        text: &str,
    ) -> Result<Comment, FeedError> {
        let text = validation::comment_text(text)?;
        let existing = self.owned(user_id, post_id, comment_id).await?;

        let updated = Comment {
            text,
            edited: Some(self.clock.now()),
            ..existing
        };
        self.comments.put(&updated).await?;

        info!(comment_id, "Comment updated");
        Ok(updated)
    }

    /// Delete a comment written by `user_id`.
    ///
    /// # Errors
    ///
    /// - [`FeedError::NotFound`] if the comment does not exist
    /// - [`FeedError::Forbidden`] if `user_id` did not write it
    #[tracing::instrument(skip(self))]
    pub async fn delete(
        &self,
        user_id: &str,
        post_id: &str,
        comment_id: &str,
    ) -> Result<Comment, FeedError> {
        let existing = self.owned(user_id, post_id, comment_id).await?;
        self.comments.delete(&existing).await?;

        info!(comment_id, "Comment deleted");
        Ok(existing)
    }

    async fn owned(
        &self,
        user_id: &str,
        post_id: &str,
        comment_id: &str,
    ) -> Result<Comment, FeedError> {
        let comment = self.comments.get(post_id, comment_id).await?;
        if comment.user_id == user_id {
            Ok(comment)
        } else {
            Err(FeedError::Forbidden(format!(
                "comment {comment_id} belongs to another user"
            )))
        }
    }
}

impl std::fmt::Debug for CommentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommentService").finish_non_exhaustive()
    }
}
