//! Real-time fan-out of mutation events to connected viewers.
//!
//! The broker is a single-owner actor. One dispatcher task owns the set of live
//! subscribers; everything else talks to it through an unbounded command
//! channel, so registration, deregistration, and fan-out are serialized without
//! any lock around the subscriber set.
//!
//! # Architecture
//!
//! ```text
//! HTTP handlers                 Dispatcher task                 Viewers
//!   │                                 │                            │
//!   ├─ subscribe() ──── Subscribe ───>│ insert(id, endpoint)       │
//!   │                                 │                            │
//!   ├─ publish(e) ───── Publish ─────>│ for each endpoint:         │
//!   │   (returns at once)             │   try_send(e) ────────────>│ (queue full: drop
//!   │                                 │                            │  for this viewer only)
//!   ├─ drop(Subscription) ─ Unsubscribe ─>│ remove(id)             │
//! ```
//!
//! # Delivery Semantics
//!
//! - **At-most-once, best effort**: a viewer whose queue is full misses the event
//! - **Per-subscriber order**: events arrive in publish order
//! - **No replay**: a subscriber only sees events dispatched after its registration
//! - **Publisher isolation**: `publish` never waits on any viewer
//!
//! # Example
//!
//! ```rust,no_run
//! use murmur_core::Event;
//! use murmur_runtime::broker::EventBroker;
//!
//! # async fn example() {
//! let broker = EventBroker::new(16);
//! let mut subscription = broker.subscribe();
//!
//! broker.publish(Event::new("new_post", "{}"));
//! let event = subscription.recv().await;
//! assert_eq!(event.map(|e| e.name().to_string()), Some("new_post".to_string()));
//! # }
//! ```

use futures::Stream;
use metrics::{counter, gauge};
use murmur_core::Event;
use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

/// Default per-subscriber queue capacity.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 16;

/// Identifier of one registered delivery endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Requests handled by the dispatcher, in arrival order.
enum Command {
    Subscribe {
        id: SubscriberId,
        endpoint: mpsc::Sender<Event>,
    },
    Unsubscribe {
        id: SubscriberId,
    },
    Publish {
        event: Event,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
}

struct Shared {
    commands: mpsc::UnboundedSender<Command>,
    next_id: AtomicU64,
    subscriber_buffer: usize,
}

/// Handle to a running event broker.
///
/// Cloning is cheap; all clones talk to the same dispatcher. The dispatcher
/// exits once every handle and every [`Subscription`] has been dropped.
#[derive(Clone)]
pub struct EventBroker {
    shared: Arc<Shared>,
}

impl EventBroker {
    /// Start a broker whose subscribers each buffer up to `subscriber_buffer`
    /// undelivered events (a zero capacity is raised to one).
    ///
    /// Spawns the dispatcher on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn new(subscriber_buffer: usize) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        tokio::spawn(dispatch(receiver));

        Self {
            shared: Arc::new(Shared {
                commands,
                next_id: AtomicU64::new(1),
                subscriber_buffer: subscriber_buffer.max(1),
            }),
        }
    }

    /// Register a new delivery endpoint. Always succeeds.
    ///
    /// The subscription sees every event published after this call returns.
    /// Dropping it unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let (endpoint, receiver) = mpsc::channel(self.shared.subscriber_buffer);

        self.send(Command::Subscribe { id, endpoint });

        Subscription {
            id,
            receiver,
            commands: self.shared.commands.clone(),
            open: true,
        }
    }

    /// Remove an endpoint from the live set. Unknown or already removed ids are ignored.
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.send(Command::Unsubscribe { id });
    }

    /// Queue `event` for delivery to every subscriber live at dispatch time.
    ///
    /// Returns immediately; never waits for any subscriber.
    pub fn publish(&self, event: Event) {
        self.send(Command::Publish { event });
    }

    /// Number of live subscribers, as seen by the dispatcher after every
    /// previously issued request has been applied.
    pub async fn subscriber_count(&self) -> usize {
        let (reply, response) = oneshot::channel();
        self.send(Command::Count { reply });
        response.await.unwrap_or(0)
    }

    fn send(&self, command: Command) {
        if self.shared.commands.send(command).is_err() {
            warn!("Event broker dispatcher is not running, request dropped");
        }
    }
}

impl fmt::Debug for EventBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBroker")
            .field("subscriber_buffer", &self.shared.subscriber_buffer)
            .finish_non_exhaustive()
    }
}

/// Dispatcher loop. Sole owner of the subscriber set.
#[allow(clippy::cast_precision_loss)] // gauge values are f64
async fn dispatch(mut commands: mpsc::UnboundedReceiver<Command>) {
    let mut subscribers: HashMap<SubscriberId, mpsc::Sender<Event>> = HashMap::new();
    debug!("Event broker dispatcher started");

    while let Some(command) = commands.recv().await {
        match command {
            Command::Subscribe { id, endpoint } => {
                subscribers.insert(id, endpoint);
                gauge!("broker_subscribers").set(subscribers.len() as f64);
                debug!(subscriber = %id, live = subscribers.len(), "Subscriber registered");
            }
            Command::Unsubscribe { id } => {
                if subscribers.remove(&id).is_some() {
                    gauge!("broker_subscribers").set(subscribers.len() as f64);
                    debug!(subscriber = %id, live = subscribers.len(), "Subscriber removed");
                }
            }
            Command::Publish { event } => fan_out(&subscribers, &event),
            Command::Count { reply } => {
                let _ = reply.send(subscribers.len());
            }
        }
    }

    debug!("Event broker dispatcher stopped");
}

fn fan_out(subscribers: &HashMap<SubscriberId, mpsc::Sender<Event>>, event: &Event) {
    counter!("broker_events_published_total").increment(1);
    let mut delivered = 0usize;

    for (id, endpoint) in subscribers {
        match endpoint.try_send(event.clone()) {
            Ok(()) => delivered += 1,
            Err(mpsc::error::TrySendError::Full(_)) => {
                counter!("broker_events_dropped_total").increment(1);
                debug!(subscriber = %id, event = event.name(), "Subscriber queue full, event dropped");
            }
            // Receiver already gone; its unsubscribe is queued behind us.
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    trace!(event = event.name(), delivered, live = subscribers.len(), "Event fanned out");
}

/// A registered delivery endpoint.
///
/// Yields events in publish order, either through [`recv`](Self::recv) or as a
/// [`Stream`]. The endpoint is `Open` until [`unsubscribe`](Self::unsubscribe)
/// is called or the subscription is dropped, after which it is inert and yields
/// nothing more.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<Event>,
    commands: mpsc::UnboundedSender<Command>,
    open: bool,
}

impl Subscription {
    /// This endpoint's identifier.
    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Whether the endpoint is still registered.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Wait for the next event. Returns `None` once unsubscribed.
    pub async fn recv(&mut self) -> Option<Event> {
        if !self.open {
            return None;
        }
        self.receiver.recv().await
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<Event> {
        if !self.open {
            return None;
        }
        self.receiver.try_recv().ok()
    }

    /// Leave the live set. Calling this more than once has no effect.
    pub fn unsubscribe(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.receiver.close();
        // A closed command channel means the dispatcher is gone along with the set.
        let _ = self.commands.send(Command::Unsubscribe { id: self.id });
        debug!(subscriber = %self.id, "Subscription closed");
    }
}

impl Stream for Subscription {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if !self.open {
            return Poll::Ready(None);
        }
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribe_then_publish_delivers() {
        let broker = EventBroker::new(4);
        let mut subscription = broker.subscribe();

        broker.publish(Event::new("new_post", "a"));

        let event = subscription.recv().await.expect("event");
        assert_eq!(event.name(), "new_post");
        assert_eq!(event.payload().as_ref(), b"a");
    }

    #[tokio::test]
    async fn drop_unsubscribes() {
        let broker = EventBroker::new(4);
        let subscription = broker.subscribe();
        assert_eq!(broker.subscriber_count().await, 1);

        drop(subscription);
        assert_eq!(broker.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn unsubscribed_handle_is_inert() {
        let broker = EventBroker::new(4);
        let mut subscription = broker.subscribe();

        broker.publish(Event::new("new_post", "queued"));
        assert_eq!(broker.subscriber_count().await, 1);

        subscription.unsubscribe();
        assert!(!subscription.is_open());
        assert!(subscription.recv().await.is_none());
        assert!(subscription.try_recv().is_none());
    }

    #[tokio::test]
    async fn zero_buffer_is_raised_to_one() {
        let broker = EventBroker::new(0);
        let mut subscription = broker.subscribe();

        broker.publish(Event::new("a", "1"));
        broker.publish(Event::new("b", "2"));
        assert_eq!(broker.subscriber_count().await, 1);

        assert_eq!(subscription.try_recv().map(|e| e.name().to_string()), Some("a".to_string()));
        assert!(subscription.try_recv().is_none());
    }

    #[test]
    fn subscriber_id_display() {
        assert_eq!(SubscriberId(7).to_string(), "sub-7");
    }
}
