//! HTTP route handlers.

pub mod events;
pub mod health;
pub mod inventory;
pub mod metrics;

use axum::http::HeaderMap;
use domain::RequestContext;

/// Builds the request context from an incoming `traceparent` header.
pub(crate) fn request_context(headers: &HeaderMap) -> RequestContext {
    let traceparent = headers
        .get("traceparent")
        .and_then(|value| value.to_str().ok());
    RequestContext::from_traceparent(traceparent)
}
