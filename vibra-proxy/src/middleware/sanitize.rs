//! Request body sanitization
//!
//! JSON bodies are read (up to [`MAX_BODY_BYTES`]), their top-level string
//! fields scrubbed of script fragments, and the request rebuilt with the
//! cleaned body. Non-JSON and unparseable bodies pass through untouched;
//! the handler decides what to do with them.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::header,
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tracing::debug;
use vibra_common::sanitize::sanitize_json_fields;

use super::is_json_request;
use crate::error::ProxyError;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Sanitization middleware
pub async fn sanitize_json_body(request: Request, next: Next) -> Result<Response, ProxyError> {
    if !is_json_request(request.headers()) {
        return Ok(next.run(request).await);
    }

    let (mut parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| {
            debug!("Rejecting request body: {}", e);
            ProxyError::PayloadTooLarge
        })?;

    let body_bytes = match serde_json::from_slice::<Value>(&body_bytes) {
        Ok(mut value) => {
            let cleaned = sanitize_json_fields(&mut value);
            if cleaned > 0 {
                debug!(fields = cleaned, path = %parts.uri.path(), "Sanitized request fields");
                parts.headers.remove(header::CONTENT_LENGTH);
                Bytes::from(serde_json::to_vec(&value).unwrap_or_default())
            } else {
                body_bytes
            }
        }
        Err(_) => body_bytes,
    };

    // Reconstruct request with the (possibly) cleaned body
    let request = Request::from_parts(parts, Body::from(body_bytes));
    Ok(next.run(request).await)
}
