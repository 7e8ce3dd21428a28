//! Mutation notifications pushed to connected viewers.
//!
//! An [`Event`] is a named, opaque payload. It is built once by the publisher,
//! cloned cheaply for every subscriber (the payload is reference counted), and
//! discarded after delivery. Events are never persisted or replayed.
//!
//! # Example
//!
//! ```
//! use murmur_core::event::{Event, EventKind};
//!
//! let event = Event::json(EventKind::DeletePost, &serde_json::json!({ "id": "p-1" }))?;
//! assert_eq!(event.name(), "delete_post");
//! assert_eq!(event.payload_str()?, r#"{"id":"p-1"}"#);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::FeedError;
use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// The mutation kinds broadcast by the post lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A post was created; payload is the full post.
    NewPost,
    /// A post was edited; payload is the full updated post.
    UpdatePost,
    /// A post and its comments were removed; payload is `{"id": post_id}`.
    DeletePost,
}

impl EventKind {
    /// Wire name used as the event name on the stream.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewPost => "new_post",
            Self::UpdatePost => "update_post",
            Self::DeletePost => "delete_post",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable named event with an opaque payload.
#[derive(Clone, PartialEq, Eq)]
pub struct Event {
    name: Arc<str>,
    payload: Bytes,
}

impl Event {
    /// Create an event from a name and raw payload bytes.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, payload: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }

    /// Create an event whose payload is the JSON encoding of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Serialization`] if `value` cannot be encoded.
    pub fn json<T: Serialize>(kind: EventKind, value: &T) -> Result<Self, FeedError> {
        let payload = serde_json::to_vec(value)?;
        Ok(Self::new(kind.as_str(), payload))
    }

    /// The event name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw payload.
    #[must_use]
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// The payload as UTF-8 text, as required by text transports.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::TransportFailure`] if the payload is not valid UTF-8.
    pub fn payload_str(&self) -> Result<&str, FeedError> {
        std::str::from_utf8(&self.payload)
            .map_err(|e| FeedError::TransportFailure(format!("event {} is not UTF-8: {e}", self.name)))
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn kind_wire_names() {
        assert_eq!(EventKind::NewPost.as_str(), "new_post");
        assert_eq!(EventKind::UpdatePost.as_str(), "update_post");
        assert_eq!(EventKind::DeletePost.to_string(), "delete_post");
    }

    #[test]
    fn clones_share_payload() {
        let event = Event::new("new_post", vec![1u8, 2, 3]);
        let copy = event.clone();
        assert_eq!(event.payload().as_ptr(), copy.payload().as_ptr());
    }

    #[test]
    fn non_utf8_payload_is_a_transport_failure() {
        let event = Event::new("new_post", vec![0xff, 0xfe]);
        assert!(matches!(
            event.payload_str(),
            Err(FeedError::TransportFailure(_))
        ));
    }
}
