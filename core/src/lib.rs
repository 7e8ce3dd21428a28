//! # Murmur Core
//!
//! Domain records, mutation events, and collaborator contracts for the Murmur
//! social feed.
//!
//! This crate is deliberately free of I/O. It defines:
//!
//! - **Records**: [`Post`](model::Post), [`Comment`](model::Comment),
//!   [`User`](model::User) and [`Follow`](model::Follow) together with the
//!   [`RecordKey`](model::RecordKey) layout used in the table store
//! - **Events**: the immutable [`Event`](event::Event) fanned out to live viewers
//! - **Storage contracts**: [`TableStore`](store::TableStore) and
//!   [`BlobStore`](store::BlobStore), implemented by persistence backends
//! - **Environment**: [`Clock`](environment::Clock) and
//!   [`Sleeper`](environment::Sleeper) so time can be controlled in tests
//! - **Errors**: the [`FeedError`](error::FeedError) taxonomy shared by every layer
//!
//! ## Record Layout
//!
//! ```text
//! partition            sort                 record
//! ─────────────────    ──────────────────   ───────
//! user#{user_id}       profile              User
//! user#{user_id}       follow#{target_id}   Follow
//! user#{user_id}       post#{post_id}       Post
//! post#{post_id}       comment#{id}         Comment
//! ```
//!
//! Comments live in their post's partition, so deleting a post means first
//! deleting every item under `post#{post_id}` with the `comment#` prefix.

pub mod environment;
pub mod error;
pub mod event;
pub mod model;
pub mod store;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use error::{FeedError, StoreError};
pub use event::{Event, EventKind};
pub use model::{
    Author, Comment, Follow, Item, Post, PostDraft, RecordKey, UploadRequest, UploadTicket, User,
};
pub use store::{BatchWriteOutcome, BlobStore, TableStore};
