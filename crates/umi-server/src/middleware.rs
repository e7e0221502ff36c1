//! Request middleware: key checks and request tracing.

use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{Instrument, info, info_span};

use crate::error::ApiError;
use crate::handler::AppState;

/// Header carrying the client API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the admin key.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

fn key_matches(headers: &HeaderMap, header: &str, expected: Option<&str>) -> bool {
    let Some(expected) = expected.filter(|k| !k.is_empty()) else {
        return false;
    };
    headers
        .get(header)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|given| given == expected)
}

/// Rejects requests without the configured `X-API-Key`.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !key_matches(request.headers(), API_KEY_HEADER, Some(state.config.api_key.as_str())) {
        return Err(ApiError::Unauthorized("Invalid or missing API key"));
    }
    Ok(next.run(request).await)
}

/// Rejects requests without the configured `X-Admin-Key`.
///
/// With no admin key configured every admin request is rejected.
pub async fn require_admin_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let expected = state.config.admin_api_key.as_deref();
    if !key_matches(request.headers(), ADMIN_KEY_HEADER, expected) {
        return Err(ApiError::Unauthorized("Invalid or missing admin key"));
    }
    Ok(next.run(request).await)
}

/// Wraps each request in a span and logs its status and latency.
pub async fn trace_request(request: Request, next: Next) -> Response {
    let span = info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
    );
    async move {
        let started = Instant::now();
        let response = next.run(request).await;
        info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "handled request"
        );
        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn key_comparison() {
        let mut headers = HeaderMap::new();
        assert!(!key_matches(&headers, API_KEY_HEADER, Some("secret")));

        headers.insert(API_KEY_HEADER, HeaderValue::from_static("secret"));
        assert!(key_matches(&headers, API_KEY_HEADER, Some("secret")));
        assert!(!key_matches(&headers, API_KEY_HEADER, Some("other")));
        assert!(!key_matches(&headers, API_KEY_HEADER, None));
        assert!(!key_matches(&headers, API_KEY_HEADER, Some("")));
    }
}
