//! Error types for vibra-proxy
//!
//! Every failure that reaches a caller is rendered as `{ "error": message }`.
//! Upstream failure detail never leaves the proxy: callers get a fixed,
//! localized message and the detail goes to the log.

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::suno_client::UpstreamError;
use crate::validation::ValidationError;

/// Message for upstream 4xx responses
pub const MSG_CHECK_INPUT: &str = "Erro na requisição. Verifique os dados enviados.";
/// Message for any other generation failure
pub const MSG_INTERNAL: &str = "Erro interno do servidor. Tente novamente mais tarde.";
/// Message for a failed status lookup
pub const MSG_STATUS_FAILED: &str = "Erro ao verificar status";
/// Message for a status lookup without task id
pub const MSG_TASK_ID_REQUIRED: &str = "taskId é necessário";
/// Message for an oversized or unreadable body
pub const MSG_PAYLOAD_TOO_LARGE: &str = "Requisição muito grande. Limite de 1MB.";

/// API error type
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Request field failed validation (400)
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Status lookup without task id (400)
    #[error("Missing taskId")]
    MissingTaskId,

    /// Request body over the size limit (413)
    #[error("Request body too large")]
    PayloadTooLarge,

    /// Caller exceeded a rate limit (429)
    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited {
        message: &'static str,
        retry_after: Duration,
    },

    /// Generation submission failed upstream (4xx passthrough or 500)
    #[error("Generation submit failed: {0}")]
    Submit(UpstreamError),

    /// Status lookup failed upstream (500)
    #[error("Status lookup failed: {0}")]
    StatusLookup(UpstreamError),

    /// Startup configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// vibra-common error
    #[error("Common error: {0}")]
    Common(#[from] vibra_common::Error),
}

impl ProxyError {
    /// HTTP status and public message for this error
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ProxyError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ProxyError::MissingTaskId => (StatusCode::BAD_REQUEST, MSG_TASK_ID_REQUIRED.to_string()),
            ProxyError::PayloadTooLarge => {
                (StatusCode::PAYLOAD_TOO_LARGE, MSG_PAYLOAD_TOO_LARGE.to_string())
            }
            ProxyError::RateLimited { message, .. } => {
                (StatusCode::TOO_MANY_REQUESTS, message.to_string())
            }
            ProxyError::Submit(err) => match err.client_error_status() {
                Some(status) => (status, MSG_CHECK_INPUT.to_string()),
                None => (StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL.to_string()),
            },
            ProxyError::StatusLookup(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_STATUS_FAILED.to_string())
            }
            ProxyError::Config(_) | ProxyError::HttpClient(_) | ProxyError::Common(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL.to_string())
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let mut response = (status, Json(json!({ "error": message }))).into_response();

        if let ProxyError::RateLimited { retry_after, .. } = &self {
            // Round up so clients never retry a fraction of a second early
            let seconds = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_client_error_keeps_status() {
        let err = ProxyError::Submit(UpstreamError::Status {
            status: 422,
            body: "artist name detected".to_string(),
        });
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(message, MSG_CHECK_INPUT);
    }

    #[test]
    fn test_upstream_server_error_is_generic_500() {
        let err = ProxyError::Submit(UpstreamError::Status {
            status: 503,
            body: "maintenance".to_string(),
        });
        assert_eq!(
            err.status_and_message(),
            (StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL.to_string())
        );
    }

    #[test]
    fn test_status_lookup_always_500() {
        let err = ProxyError::StatusLookup(UpstreamError::Status {
            status: 404,
            body: String::new(),
        });
        assert_eq!(
            err.status_and_message(),
            (StatusCode::INTERNAL_SERVER_ERROR, MSG_STATUS_FAILED.to_string())
        );
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = ProxyError::RateLimited {
            message: "slow down",
            retry_after: Duration::from_millis(8_200),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "9");
    }
}
