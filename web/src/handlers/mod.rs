//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by domain.

pub mod comments;
pub mod events;
pub mod health;
pub mod posts;
pub mod uploads;
pub mod users;

// Re-export common handler utilities
pub use health::{health_check, readiness};
