use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

const TARGET: &str = "kvcache::http::response";
const REQUEST_ID_MAX_LEN: usize = 64;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Cache key a handler acted on, carried on the response for the access log.
#[derive(Clone, Debug)]
pub struct KeyLabel(pub String);

pub fn label_key(response: &mut Response, key: impl Into<String>) {
    response.extensions_mut().insert(KeyLabel(key.into()));
}

/// Reuses a caller-supplied `x-request-id` when it is short printable ASCII,
/// otherwise mints one. The id is echoed on the response.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= REQUEST_ID_MAX_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
    }
    response.extensions_mut().insert(ctx);
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();
    let key = response
        .extensions_mut()
        .remove::<KeyLabel>()
        .map(|KeyLabel(key)| key)
        .unwrap_or_else(|| "-".to_string());

    if status.is_success() {
        debug!(
            target: TARGET,
            status = status.as_u16(),
            method = %method,
            route = %route,
            key = %key,
            elapsed_ms,
            request_id = %request_id,
            "request completed",
        );
        return response;
    }

    let (source, messages) = match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = messages.first().map(String::as_str).unwrap_or("-");

    if status.is_server_error() {
        error!(
            target: TARGET,
            status = status.as_u16(),
            method = %method,
            route = %route,
            key = %key,
            elapsed_ms,
            source,
            detail,
            chain = ?messages,
            request_id = %request_id,
            "request failed",
        );
    } else {
        warn!(
            target: TARGET,
            status = status.as_u16(),
            method = %method,
            route = %route,
            key = %key,
            elapsed_ms,
            source,
            detail,
            request_id = %request_id,
            "request rejected",
        );
    }

    response
}
