//! # Murmur Runtime
//!
//! The moving parts behind the Murmur feed: live fan-out of mutation events,
//! cascading deletes against a capacity-bounded table store, and the
//! coordinator that sequences post mutations.
//!
//! ## Core Components
//!
//! - **[`EventBroker`]**: single-owner actor fanning events out to live viewers
//!   without ever blocking a publisher
//! - **[`CascadeDeleteEngine`]**: batched deletion of a post's comments with
//!   bounded, exponentially backed-off retries of unprocessed items
//! - **[`PostLifecycleCoordinator`]**: create, update, and delete of posts,
//!   publishing an event only after persistence succeeds
//! - **[`CommentService`]**: comment create, list, edit, and delete
//! - **[`UserService`]**: registration, profiles, and the follow graph
//! - **[`UploadService`]**: upload slots for post images
//!
//! ## Example
//!
//! ```ignore
//! use murmur_runtime::{CascadeConfig, EventBroker, PostLifecycleCoordinator};
//! use murmur_runtime::memory::{InMemoryBlobStore, InMemoryTableStore};
//!
//! let broker = EventBroker::new(16);
//! let coordinator = PostLifecycleCoordinator::new(
//!     Arc::new(InMemoryTableStore::new()),
//!     Arc::new(InMemoryBlobStore::new()),
//!     broker.clone(),
//!     CascadeConfig::default(),
//! );
//!
//! let mut viewer = broker.subscribe();
//! let post = coordinator.create_post(&author, draft).await?;
//! let event = viewer.recv().await; // new_post
//! ```

/// Real-time event fan-out
pub mod broker;

/// Batched cascade deletes with retry
pub mod cascade;

/// Comment operations
pub mod comments;

/// Post mutation sequencing
pub mod coordinator;

/// In-memory storage backends
pub mod memory;

/// Prometheus metrics for observability
pub mod metrics;

/// Typed record access
pub mod repository;

/// Batch sizing and backoff policy
pub mod retry;

/// Image upload slots
pub mod uploads;

/// Accounts and follows
pub mod users;

/// Input rules
pub mod validation;

pub use broker::{EventBroker, SubscriberId, Subscription};
pub use cascade::{CascadeDeleteEngine, CascadeError, CascadeReport};
pub use comments::CommentService;
pub use coordinator::PostLifecycleCoordinator;
pub use retry::CascadeConfig;
pub use uploads::UploadService;
pub use users::{Profile, UserService};
