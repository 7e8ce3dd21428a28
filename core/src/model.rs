//! Feed records and their table-store keys.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use uuid::Uuid;

/// Sort-key prefix of post records inside a user partition.
pub const POST_PREFIX: &str = "post#";
/// Sort-key prefix of comment records inside a post partition.
pub const COMMENT_PREFIX: &str = "comment#";
/// Partition-key prefix of user partitions.
pub const USER_PREFIX: &str = "user#";
/// Sort key of the profile record inside a user partition.
pub const PROFILE_SORT_KEY: &str = "profile";
/// Sort-key prefix of follow edges inside a user partition.
pub const FOLLOW_PREFIX: &str = "follow#";

/// `{partition_key, sort_key}` pair addressing one item in the table store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    /// Partition key (`user#…` or `post#…`)
    pub partition_key: String,
    /// Sort key (`profile`, `follow#…`, `post#…` or `comment#…`)
    pub sort_key: String,
}

impl RecordKey {
    /// Build a key from raw parts.
    #[must_use]
    pub fn new(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
        }
    }

    /// Key of a post owned by `user_id`.
    #[must_use]
    pub fn post(user_id: &str, post_id: &str) -> Self {
        Self::new(user_partition(user_id), format!("{POST_PREFIX}{post_id}"))
    }

    /// Key of a comment under `post_id`.
    #[must_use]
    pub fn comment(post_id: &str, comment_id: &str) -> Self {
        Self::new(post_partition(post_id), format!("{COMMENT_PREFIX}{comment_id}"))
    }

    /// Key of the profile of `user_id`.
    #[must_use]
    pub fn user(user_id: &str) -> Self {
        Self::new(user_partition(user_id), PROFILE_SORT_KEY)
    }

    /// Key of the edge "`user_id` follows `following_id`".
    #[must_use]
    pub fn follow(user_id: &str, following_id: &str) -> Self {
        Self::new(user_partition(user_id), format!("{FOLLOW_PREFIX}{following_id}"))
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition_key, self.sort_key)
    }
}

/// Partition holding every post written by `user_id`.
#[must_use]
pub fn user_partition(user_id: &str) -> String {
    format!("{USER_PREFIX}{user_id}")
}

/// Partition holding every comment of `post_id`.
#[must_use]
pub fn post_partition(post_id: &str) -> String {
    format!("{POST_PREFIX}{post_id}")
}

/// A stored item: its key plus a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Item address
    pub key: RecordKey,
    /// Encoded record
    pub body: serde_json::Value,
}

impl Item {
    /// Encode a record under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] if the record cannot be encoded.
    pub fn encode<T: Serialize>(key: RecordKey, record: &T) -> Result<Self, StoreError> {
        let body = serde_json::to_value(record).map_err(|e| StoreError::Malformed {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { key, body })
    }

    /// Decode the body into a record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] if the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        T::deserialize(&self.body).map_err(|e| StoreError::Malformed {
            key: self.key.to_string(),
            reason: e.to_string(),
        })
    }
}

/// The authenticated caller performing a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Stable account identifier
    pub user_id: String,
    /// Display name copied onto records
    pub user_name: String,
}

impl Author {
    /// Create an author.
    #[must_use]
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
        }
    }
}

/// Text and image of a post, as submitted for create or update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    /// Body text (may be empty when an image is attached)
    #[serde(default)]
    pub text: String,
    /// Blob key of an uploaded image, or empty
    #[serde(default)]
    pub image: String,
}

/// A short post with an optional image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post identifier
    pub id: String,
    /// Owner account
    pub user_id: String,
    /// Owner display name at creation time
    pub user_name: String,
    /// Body text
    pub text: String,
    /// Blob key of the attached image, empty if none
    #[serde(default)]
    pub image: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Last edit time
    #[serde(default)]
    pub edited: Option<DateTime<Utc>>,
}

impl Post {
    /// Create a new post with a fresh identifier.
    #[must_use]
    pub fn new(author: &Author, draft: PostDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: author.user_id.clone(),
            user_name: author.user_name.clone(),
            text: draft.text,
            image: draft.image,
            timestamp: now,
            edited: None,
        }
    }

    /// Table-store key of this post.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey::post(&self.user_id, &self.id)
    }

    /// Whether an image blob is attached.
    #[must_use]
    pub fn has_image(&self) -> bool {
        !self.image.is_empty()
    }
}

/// A comment attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment identifier
    pub id: String,
    /// Parent post
    pub post_id: String,
    /// Author account
    pub user_id: String,
    /// Author display name at creation time
    pub user_name: String,
    /// Body text
    pub text: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Last edit time
    #[serde(default)]
    pub edited: Option<DateTime<Utc>>,
}

impl Comment {
    /// Create a new comment with a fresh identifier.
    #[must_use]
    pub fn new(post_id: &str, author: &Author, text: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            post_id: post_id.to_string(),
            user_id: author.user_id.clone(),
            user_name: author.user_name.clone(),
            text,
            timestamp: now,
            edited: None,
        }
    }

    /// Table-store key of this comment.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey::comment(&self.post_id, &self.id)
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account identifier, as issued by the identity provider
    pub id: String,
    /// Display name
    pub name: String,
    /// Contact address
    #[serde(default)]
    pub email: String,
    /// Avatar URL
    #[serde(default)]
    pub picture: String,
}

impl User {
    /// Table-store key of this profile.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey::user(&self.id)
    }
}

/// `user_id` follows `following_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    /// Follower
    pub user_id: String,
    /// Followed account
    pub following_id: String,
    /// When the edge was created
    pub since: DateTime<Utc>,
}

impl Follow {
    /// Table-store key of this edge.
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey::follow(&self.user_id, &self.following_id)
    }
}

/// Request for an image upload slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    /// Client-side file name, kept as the key suffix
    pub file_name: String,
    /// MIME type of the file
    #[serde(default)]
    pub file_type: String,
}

/// Where to upload an image, and the key to reference it by in a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTicket {
    /// Blob key to pass as a post's `image`
    pub key: String,
    /// Upload destination for the file bytes
    pub url: String,
    /// The upload URL stops working after this time
    pub expires_at: DateTime<Utc>,
}
