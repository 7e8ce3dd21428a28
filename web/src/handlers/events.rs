//! Live event stream over server-sent events.
//!
//! Each connection owns one broker [`Subscription`]. Events arrive as
//!
//! ```text
//! event: new_post
//! data: {"id":"...","text":"..."}
//! ```
//!
//! with periodic keep-alive comments in between. When the client goes away
//! axum drops the stream, which drops the subscription and removes the
//! connection from the live set.

use crate::state::AppState;
use axum::{
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use futures::Stream;
use murmur_runtime::Subscription;
use std::convert::Infallible;
use tracing::{debug, warn};

/// Open a live event stream.
///
/// # Endpoint
///
/// ```text
/// GET /events
/// Accept: text/event-stream
/// ```
#[allow(clippy::unused_async)]
pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let subscription = state.broker.subscribe();
    debug!(subscriber = %subscription.id(), "Event stream opened");

    Sse::new(sse_frames(subscription)).keep_alive(KeepAlive::new().interval(state.keepalive))
}

/// Turn a subscription into SSE frames.
///
/// A payload that cannot be carried as text ends this stream only; the broker
/// and every other subscriber are unaffected.
pub fn sse_frames(mut subscription: Subscription) -> impl Stream<Item = Result<SseEvent, Infallible>> {
    async_stream::stream! {
        while let Some(event) = subscription.recv().await {
            match event.payload_str() {
                Ok(data) => yield Ok(SseEvent::default().event(event.name()).data(data)),
                Err(e) => {
                    warn!(subscriber = %subscription.id(), event = event.name(), error = %e, "Dropping event stream");
                    break;
                }
            }
        }
        subscription.unsubscribe();
        debug!(subscriber = %subscription.id(), "Event stream closed");
    }
}
