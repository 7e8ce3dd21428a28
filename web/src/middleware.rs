//! Per-request tracing span.
//!
//! [`request_span_layer`] runs each request inside an `http_request` span so
//! log lines from the coordinator, the cascade engine, and the broker can be
//! grouped by request and by caller. The span carries:
//!
//! | field            | source                                            |
//! |------------------|---------------------------------------------------|
//! | `correlation_id` | `X-Correlation-ID` when it is a UUID, else fresh  |
//! | `method`, `path` | request line                                      |
//! | `user_id`        | `X-User-Id`, left empty for anonymous readers     |
//! | `status`         | recorded once the handler responds                |
//!
//! The correlation ID is stored in request extensions for the
//! [`CorrelationId`](crate::CorrelationId) extractor and echoed back in the
//! response. Event-stream responses are logged when the stream opens, since
//! their latency covers only the headers.

use crate::extractors::USER_ID_HEADER;
use axum::{
    extract::Request,
    http::{HeaderValue, header},
    response::Response,
};
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use tracing::{Instrument, Span, field};
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

const EVENT_STREAM: &str = "text/event-stream";

/// Layer that wraps every request in an `http_request` span.
#[must_use]
pub const fn request_span_layer() -> RequestSpanLayer {
    RequestSpanLayer
}

/// See [`request_span_layer`].
#[derive(Clone, Debug)]
pub struct RequestSpanLayer;

impl<S> Layer<S> for RequestSpanLayer {
    type Service = RequestSpan<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestSpan { inner }
    }
}

/// Service produced by [`RequestSpanLayer`].
#[derive(Clone, Debug)]
pub struct RequestSpan<S> {
    inner: S,
}

impl<S> Service<Request> for RequestSpan<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);
        req.extensions_mut().insert(correlation_id);

        let span = open_span(&req, correlation_id);
        let started = Instant::now();
        let fut = self.inner.call(req).instrument(span.clone());

        Box::pin(async move {
            let mut response = fut.await?;
            let status = response.status();
            span.record("status", status.as_u16());

            let streaming = response
                .headers()
                .get(header::CONTENT_TYPE)
                .is_some_and(|v| v.as_bytes().starts_with(EVENT_STREAM.as_bytes()));
            let latency_ms = started.elapsed().as_millis();

            span.in_scope(|| {
                if streaming {
                    tracing::info!("Event stream opened");
                } else if status.is_server_error() {
                    tracing::warn!(latency_ms, "Request failed");
                } else {
                    tracing::debug!(latency_ms, "Request completed");
                }
            });

            if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }

            Ok(response)
        })
    }
}

fn open_span(req: &Request, correlation_id: Uuid) -> Span {
    let span = tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        method = %req.method(),
        path = req.uri().path(),
        user_id = field::Empty,
        status = field::Empty,
    );

    let caller = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty());
    if let Some(user_id) = caller {
        span.record("user_id", field::display(user_id));
    }
    span
}
