//! Sequencing of post mutations and their notifications.
//!
//! # Delete Sequence
//!
//! ```text
//! 1. fetch post ──────────── absent ─────────> NotFound
//!        │
//! 2. cascade comments ────── exhausted ──────> RetryExhausted   (post intact)
//!        │
//! 3. delete image blob ───── blob missing ───> (continue)
//!        │                └─ call failed ────> UpstreamUnavailable
//! 4. delete post record
//!        │
//! 5. publish delete_post {"id": post_id}
//! ```
//!
//! No step runs if an earlier one failed, and nothing is published for an
//! operation that did not complete every persistence step. Create and update
//! publish `new_post` / `update_post` with the full record only after the
//! record is stored. Event payloads are serialized before the first write, so
//! a payload that cannot be encoded fails the operation with nothing stored.

use crate::broker::EventBroker;
use crate::cascade::CascadeDeleteEngine;
use crate::repository::PostRepository;
use crate::retry::CascadeConfig;
use crate::validation;
use metrics::histogram;
use murmur_core::environment::{Clock, Sleeper, SystemClock, TokioSleeper};
use murmur_core::{
    Author, BlobStore, Event, EventKind, FeedError, Post, PostDraft, StoreError, TableStore,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Payload of a `delete_post` event.
#[derive(Debug, Serialize)]
struct DeletedPost<'a> {
    id: &'a str,
}

/// Orchestrates create, update, and delete of posts.
#[derive(Clone)]
pub struct PostLifecycleCoordinator {
    table: Arc<dyn TableStore>,
    posts: PostRepository,
    blobs: Arc<dyn BlobStore>,
    cascade: CascadeDeleteEngine,
    broker: EventBroker,
    clock: Arc<dyn Clock>,
    config: CascadeConfig,
}

impl PostLifecycleCoordinator {
    /// Create a coordinator using the wall clock and the tokio timer.
    #[must_use]
    pub fn new(
        table: Arc<dyn TableStore>,
        blobs: Arc<dyn BlobStore>,
        broker: EventBroker,
        config: CascadeConfig,
    ) -> Self {
        Self {
            posts: PostRepository::new(table.clone()),
            cascade: CascadeDeleteEngine::new(table.clone(), Arc::new(TokioSleeper)),
            table,
            blobs,
            broker,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the clock used to stamp records.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the sleeper used between cascade retries.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.cascade = CascadeDeleteEngine::new(self.table.clone(), sleeper);
        self
    }

    /// The cascade policy in use.
    #[must_use]
    pub const fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Create a post and announce it as `new_post`.
    ///
    /// # Errors
    ///
    /// - [`FeedError::Validation`] if the draft is empty, too long, or names
    ///   an image that was never uploaded
    /// - [`FeedError::UpstreamUnavailable`] if a store call fails
    #[tracing::instrument(skip(self, draft), fields(user_id = %author.user_id))]
    pub async fn create_post(&self, author: &Author, draft: PostDraft) -> Result<Post, FeedError> {
        let started = Instant::now();
        let draft = validation::post_draft(draft)?;

        if !draft.image.is_empty() {
            self.ensure_image_exists(&draft.image).await?;
        }

        let post = Post::new(author, draft, self.clock.now());
        let event = Event::json(EventKind::NewPost, &post)?;
        self.posts.put(&post).await?;
        self.broker.publish(event);

        info!(post_id = %post.id, "Post created");
        record_duration("create", started);
        Ok(post)
    }

    /// Replace the text and image of a post and announce it as `update_post`.
    ///
    /// A replaced image blob is deleted once the updated record is stored.
    ///
    /// # Errors
    ///
    /// - [`FeedError::NotFound`] if the post does not exist
    /// - [`FeedError::Validation`] if the draft is rejected
    /// - [`FeedError::UpstreamUnavailable`] if a store call fails
    #[tracing::instrument(skip(self, draft))]
    pub async fn update_post(
        &self,
        user_id: &str,
        post_id: &str,
        draft: PostDraft,
    ) -> Result<Post, FeedError> {
        let started = Instant::now();
        let draft = validation::post_draft(draft)?;
        let existing = self.posts.get(user_id, post_id).await?;

        let image_changed = existing.image != draft.image;
        if image_changed && !draft.image.is_empty() {
            self.ensure_image_exists(&draft.image).await?;
        }

        let updated = Post {
            text: draft.text,
            image: draft.image,
            edited: Some(self.clock.now()),
            ..existing.clone()
        };
        let event = Event::json(EventKind::UpdatePost, &updated)?;
        self.posts.put(&updated).await?;

        if image_changed && existing.has_image() {
            if let Err(e) = self.delete_image(&existing.image).await {
                warn!(image = %existing.image, error = %e, "Replaced image left behind");
            }
        }

        self.broker.publish(event);

        info!(post_id, "Post updated");
        record_duration("update", started);
        Ok(updated)
    }

    /// Delete a post together with its comments and image, then announce
    /// `delete_post`.
    ///
    /// # Errors
    ///
    /// - [`FeedError::NotFound`] if the post does not exist
    /// - [`FeedError::RetryExhausted`] if comments could not all be deleted;
    ///   the post is left in place so the delete can be retried
    /// - [`FeedError::UpstreamUnavailable`] if a store or blob call fails
    #[tracing::instrument(skip(self))]
    pub async fn delete_post(&self, user_id: &str, post_id: &str) -> Result<Post, FeedError> {
        let started = Instant::now();

        let post = self.posts.get(user_id, post_id).await?;
        let event = Event::json(EventKind::DeletePost, &DeletedPost { id: &post.id })?;

        let report = self.cascade.delete_children(&post.id, &self.config).await?;
        debug!(comments = report.enumerated, "Comments removed");

        if post.has_image() {
            self.delete_image(&post.image).await?;
        }

        self.posts.delete(&post).await?;

        self.broker.publish(event);

        info!(post_id, comments = report.enumerated, "Post deleted");
        record_duration("delete", started);
        Ok(post)
    }

    /// Every post, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UpstreamUnavailable`] if the store call fails.
    pub async fn timeline(&self) -> Result<Vec<Post>, FeedError> {
        self.posts.timeline().await
    }

    /// Posts written by `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UpstreamUnavailable`] if the store call fails.
    pub async fn posts_by_user(&self, user_id: &str) -> Result<Vec<Post>, FeedError> {
        self.posts.by_user(user_id).await
    }

    async fn ensure_image_exists(&self, image: &str) -> Result<(), FeedError> {
        if self.blobs.exists(image).await? {
            Ok(())
        } else {
            Err(FeedError::Validation(format!("image {image} does not exist")))
        }
    }

    /// Delete an image blob, treating an already missing blob as deleted.
    async fn delete_image(&self, image: &str) -> Result<(), FeedError> {
        match self.blobs.delete(image).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound(_)) => {
                debug!(image, "Image already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for PostLifecycleCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostLifecycleCoordinator")
            .field("config", &self.config)
            .field("broker", &self.broker)
            .finish_non_exhaustive()
    }
}

fn record_duration(operation: &'static str, started: Instant) {
    histogram!("post_lifecycle_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}
