//! Accounts and the follow graph.
//!
//! Registration is an upsert: the identity provider's callback registers the
//! caller on every sign-in, refreshing name, email, and picture. Follow edges
//! are directed and live in the follower's partition, so "who do I follow" is
//! a single query.

use crate::repository::UserRepository;
use crate::validation;
use murmur_core::environment::{Clock, SystemClock};
use murmur_core::{FeedError, Follow, TableStore, User};
use std::sync::Arc;
use tracing::info;

/// A user together with the ids they follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// The account
    pub user: User,
    /// Followed account ids, oldest edge first
    pub following: Vec<String>,
}

/// User registration, lookup, and follow operations.
#[derive(Clone)]
pub struct UserService {
    users: UserRepository,
    clock: Arc<dyn Clock>,
}

impl UserService {
    /// Create a service using the wall clock.
    #[must_use]
    pub fn new(table: Arc<dyn TableStore>) -> Self {
        Self {
            users: UserRepository::new(table),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used to stamp follow edges.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register `user`, or refresh an existing registration.
    ///
    /// # Errors
    ///
    /// - [`FeedError::Validation`] if the id or name is blank
    /// - [`FeedError::UpstreamUnavailable`] if the store call fails
    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn register(&self, user: User) -> Result<User, FeedError> {
        let id = user.id.trim().to_string();
        if id.is_empty() {
            return Err(FeedError::Validation("user id is required".to_string()));
        }

        let user = User {
            id,
            name: validation::user_name(&user.name)?,
            email: user.email.trim().to_string(),
            picture: user.picture.trim().to_string(),
        };
        self.users.put(&user).await?;

        info!("User registered");
        Ok(user)
    }

    /// Look up one user.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NotFound`] if the user was never registered.
    pub async fn get(&self, user_id: &str) -> Result<User, FeedError> {
        self.users.get(user_id).await
    }

    /// Every registered user, by name.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UpstreamUnavailable`] if the store call fails.
    pub async fn list(&self) -> Result<Vec<User>, FeedError> {
        self.users.all().await
    }

    /// A registered user and the ids they follow.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NotFound`] if the user was never registered.
    pub async fn profile(&self, user_id: &str) -> Result<Profile, FeedError> {
        let user = self.users.get(user_id).await?;
        let following = self.following(user_id).await?;
        Ok(Profile { user, following })
    }

    /// Ids followed by `user_id`, oldest edge first.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UpstreamUnavailable`] if the store call fails.
    pub async fn following(&self, user_id: &str) -> Result<Vec<String>, FeedError> {
        let follows = self.users.following(user_id).await?;
        Ok(follows.into_iter().map(|f| f.following_id).collect())
    }

    /// Make `user_id` follow `following_id`. Following twice is a no-op that
    /// keeps the original edge.
    ///
    /// # Errors
    ///
    /// - [`FeedError::Validation`] when following yourself
    /// - [`FeedError::NotFound`] if `following_id` is not registered
    #[tracing::instrument(skip(self))]
    pub async fn follow(&self, user_id: &str, following_id: &str) -> Result<Follow, FeedError> {
        let following_id = following_id.trim();
        if following_id.is_empty() {
            return Err(FeedError::Validation("following_id is required".to_string()));
        }
        if following_id == user_id {
            return Err(FeedError::Validation("cannot follow yourself".to_string()));
        }
        self.users.get(following_id).await?;

        let existing = self.users.following(user_id).await?;
        if let Some(edge) = existing.into_iter().find(|f| f.following_id == following_id) {
            return Ok(edge);
        }

        let follow = Follow {
            user_id: user_id.to_string(),
            following_id: following_id.to_string(),
            since: self.clock.now(),
        };
        self.users.put_follow(&follow).await?;

        info!(following_id, "Followed");
        Ok(follow)
    }

    /// Remove the edge `user_id` → `following_id`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NotFound`] if `user_id` was not following them.
    #[tracing::instrument(skip(self))]
    pub async fn unfollow(&self, user_id: &str, following_id: &str) -> Result<(), FeedError> {
        let following_id = following_id.trim();
        if !self.users.delete_follow(user_id, following_id).await? {
            return Err(FeedError::not_found("follow", following_id));
        }

        info!(following_id, "Unfollowed");
        Ok(())
    }
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService").finish_non_exhaustive()
    }
}
