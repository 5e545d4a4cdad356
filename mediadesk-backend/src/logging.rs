//! Request tracing for the HTTP layer
//!

use std::time::Duration;

use axum::http::{header::CONTENT_LENGTH, HeaderMap, Request};
use axum::response::Response;
use tower_http::{
    classify::{ServerErrorsAsFailures, ServerErrorsFailureClass, SharedClassifier},
    trace::{MakeSpan, OnFailure, OnRequest, OnResponse, TraceLayer},
};
use tracing::{error, field::Empty, trace, Span};
use uuid::Uuid;

#[derive(Copy, Clone, Default)]
pub(crate) struct RequestSpanner;

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
}

impl<B> MakeSpan<B> for RequestSpanner {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "request",
            request_id = %Uuid::new_v4(),
            method = %request.method(),
            path = %request.uri().path(),
            upload_bytes = content_length(request.headers()),
            status = Empty,
            latency_ms = Empty,
            bytes = Empty
        )
    }
}

impl<B> OnRequest<B> for RequestSpanner {
    fn on_request(&mut self, _request: &Request<B>, _span: &Span) {
        trace!("request received");
    }
}

impl<B> OnResponse<B> for RequestSpanner {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        span.record("status", response.status().as_u16());
        span.record("latency_ms", latency.as_millis() as u64);
        if let Some(bytes) = content_length(response.headers()) {
            span.record("bytes", bytes);
        }
        tracing::event!(tracing::Level::INFO, "response sent");
    }
}

impl OnFailure<ServerErrorsFailureClass> for RequestSpanner {
    fn on_failure(&mut self, failure: ServerErrorsFailureClass, latency: Duration, _span: &Span) {
        error!(
            failure = %failure,
            latency_ms = latency.as_millis() as u64,
            "request failed"
        );
    }
}

pub(crate) fn logging_layer() -> TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    RequestSpanner,
    RequestSpanner,
    RequestSpanner,
    tower_http::trace::DefaultOnBodyChunk,
    tower_http::trace::DefaultOnEos,
    RequestSpanner,
> {
    TraceLayer::new_for_http()
        .make_span_with(RequestSpanner)
        .on_request(RequestSpanner)
        .on_response(RequestSpanner)
        .on_failure(RequestSpanner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_content_length() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_length(&headers), None);

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("1234"));
        assert_eq!(content_length(&headers), Some(1234));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("lots"));
        assert_eq!(content_length(&headers), None);
    }
}
