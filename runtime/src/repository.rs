//! Typed access to feed records on top of a [`TableStore`].

use murmur_core::model::{
    COMMENT_PREFIX, FOLLOW_PREFIX, POST_PREFIX, PROFILE_SORT_KEY, post_partition, user_partition,
};
use murmur_core::{Comment, FeedError, Follow, Item, Post, RecordKey, TableStore, User};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::warn;

/// Post records, keyed `user#{user_id}` / `post#{post_id}`.
#[derive(Clone)]
pub struct PostRepository {
    table: Arc<dyn TableStore>,
}

impl PostRepository {
    /// Create a repository over `table`.
    #[must_use]
    pub fn new(table: Arc<dyn TableStore>) -> Self {
        Self { table }
    }

    /// Fetch one post.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NotFound`] if the post does not exist.
    pub async fn get(&self, user_id: &str, post_id: &str) -> Result<Post, FeedError> {
        let key = RecordKey::post(user_id, post_id);
        let item = self
            .table
            .get_item(&key)
            .await?
            .ok_or_else(|| FeedError::not_found("post", post_id))?;
        Ok(item.decode()?)
    }

    /// Insert or replace a post.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UpstreamUnavailable`] if the store call fails.
    pub async fn put(&self, post: &Post) -> Result<(), FeedError> {
        let item = Item::encode(post.key(), post)?;
        self.table.put_item(item).await?;
        Ok(())
    }

    /// Delete a post record.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NotFound`] if the record was already gone.
    pub async fn delete(&self, post: &Post) -> Result<(), FeedError> {
        if self.table.delete_item(&post.key()).await? {
            Ok(())
        } else {
            Err(FeedError::not_found("post", post.id.clone()))
        }
    }

    /// Every post, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UpstreamUnavailable`] if the scan fails.
    pub async fn timeline(&self) -> Result<Vec<Post>, FeedError> {
        let items = self.table.scan(POST_PREFIX).await?;
        Ok(newest_first(decode_all(&items), |p: &Post| p.timestamp))
    }

    /// Posts written by `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UpstreamUnavailable`] if the query fails.
    pub async fn by_user(&self, user_id: &str) -> Result<Vec<Post>, FeedError> {
        let items = self.table.query(&user_partition(user_id), POST_PREFIX).await?;
        Ok(newest_first(decode_all(&items), |p: &Post| p.timestamp))
    }
}

/// Comment records, keyed `post#{post_id}` / `comment#{comment_id}`.
#[derive(Clone)]
pub struct CommentRepository {
    table: Arc<dyn TableStore>,
}

impl CommentRepository {
    /// Create a repository over `table`.
    #[must_use]
    pub fn new(table: Arc<dyn TableStore>) -> Self {
        Self { table }
    }

    /// Fetch one comment.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NotFound`] if the comment does not exist.
    pub async fn get(&self, post_id: &str, comment_id: &str) -> Result<Comment, FeedError> {
        let key = RecordKey::comment(post_id, comment_id);
        let item = self
            .table
            .get_item(&key)
            .await?
            .ok_or_else(|| FeedError::not_found("comment", comment_id))?;
        Ok(item.decode()?)
    }

    /// Insert or replace a comment.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UpstreamUnavailable`] if the store call fails.
    pub async fn put(&self, comment: &Comment) -> Result<(), FeedError> {
        let item = Item::encode(comment.key(), comment)?;
        self.table.put_item(item).await?;
        Ok(())
    }

    /// Delete a comment record.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NotFound`] if the record was already gone.
    pub async fn delete(&self, comment: &Comment) -> Result<(), FeedError> {
        if self.table.delete_item(&comment.key()).await? {
            Ok(())
        } else {
            Err(FeedError::not_found("comment", comment.id.clone()))
        }
    }

    /// Comments of `post_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UpstreamUnavailable`] if the query fails.
    pub async fn list(&self, post_id: &str) -> Result<Vec<Comment>, FeedError> {
        let items = self.table.query(&post_partition(post_id), COMMENT_PREFIX).await?;
        Ok(newest_first(decode_all(&items), |c: &Comment| c.timestamp))
    }
}

/// Profiles and follow edges, both in the `user#{user_id}` partition.
#[derive(Clone)]
pub struct UserRepository {
    table: Arc<dyn TableStore>,
}

impl UserRepository {
    /// Create a repository over `table`.
    #[must_use]
    pub fn new(table: Arc<dyn TableStore>) -> Self {
        Self { table }
    }

    /// Fetch one profile.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NotFound`] if no such user is registered.
    pub async fn get(&self, user_id: &str) -> Result<User, FeedError> {
        let item = self
            .table
            .get_item(&RecordKey::user(user_id))
            .await?
            .ok_or_else(|| FeedError::not_found("user", user_id))?;
        Ok(item.decode()?)
    }

    /// Insert or replace a profile.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UpstreamUnavailable`] if the store call fails.
    pub async fn put(&self, user: &User) -> Result<(), FeedError> {
        self.table.put_item(Item::encode(user.key(), user)?).await?;
        Ok(())
    }

    /// Every registered user, by name.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UpstreamUnavailable`] if the scan fails.
    pub async fn all(&self) -> Result<Vec<User>, FeedError> {
        let items = self.table.scan(PROFILE_SORT_KEY).await?;
        let mut users: Vec<User> = decode_all(&items);
        users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }

    /// Store a follow edge.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UpstreamUnavailable`] if the store call fails.
    pub async fn put_follow(&self, follow: &Follow) -> Result<(), FeedError> {
        self.table.put_item(Item::encode(follow.key(), follow)?).await?;
        Ok(())
    }

    /// Remove a follow edge, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UpstreamUnavailable`] if the store call fails.
    pub async fn delete_follow(
        &self,
        user_id: &str,
        following_id: &str,
    ) -> Result<bool, FeedError> {
        Ok(self
            .table
            .delete_item(&RecordKey::follow(user_id, following_id))
            .await?)
    }

    /// Edges going out of `user_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UpstreamUnavailable`] if the query fails.
    pub async fn following(&self, user_id: &str) -> Result<Vec<Follow>, FeedError> {
        let items = self.table.query(&user_partition(user_id), FOLLOW_PREFIX).await?;
        let mut follows: Vec<Follow> = decode_all(&items);
        follows.sort_by(|a, b| a.since.cmp(&b.since));
        Ok(follows)
    }
}

/// Decode every item, skipping (and logging) the ones that do not parse.
fn decode_all<T: DeserializeOwned>(items: &[Item]) -> Vec<T> {
    items
        .iter()
        .filter_map(|item| {
            item.decode()
                .inspect_err(|e| warn!(key = %item.key, error = %e, "Skipping undecodable record"))
                .ok()
        })
        .collect()
}

fn newest_first<T, K: Ord>(mut records: Vec<T>, timestamp: impl Fn(&T) -> K) -> Vec<T> {
    records.sort_by(|a, b| timestamp(b).cmp(&timestamp(a)));
    records
}
