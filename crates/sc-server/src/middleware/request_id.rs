//! Request correlation.
//!
//! `tower_http`'s request-id layers assign a UUID to requests that arrive
//! without an `x-request-id` header and copy it onto the response. This
//! module ties that id into the trace span and hands it to handlers so
//! error bodies can quote it.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Request};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::Span;

/// Header carrying the correlation id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Layer assigning ids to requests that lack one.
pub fn set_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer echoing the id back on the response.
pub fn propagate_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Span for `TraceLayer`, tagged with the request id so every log line of a
/// conversion can be correlated.
pub fn make_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %header_id(request.headers()).unwrap_or("-"),
    )
}

fn header_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok())
}

/// The current request's id, as assigned by [`set_layer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for RequestId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_id(&parts.headers).unwrap_or("unknown");
        Ok(RequestId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn extract(request: Request<()>) -> RequestId {
        let (mut parts, _) = request.into_parts();
        RequestId::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn extractor_reads_header() {
        let request = Request::builder()
            .header(REQUEST_ID_HEADER, "abc-123")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await, RequestId("abc-123".into()));
    }

    #[tokio::test]
    async fn extractor_without_header() {
        let request = Request::builder().body(()).unwrap();
        assert_eq!(extract(request).await.0, "unknown");
    }
}
