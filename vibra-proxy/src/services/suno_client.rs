//! Upstream music generation API client
//!
//! Bearer-authenticated JSON calls to the generation service. Successful
//! responses are relayed verbatim (raw bytes plus content type) so callers
//! see exactly what the upstream returned. Outbound calls share one pacer,
//! so bursts from many callers reach the upstream at a steady rate.

use std::num::NonZeroU32;
use std::time::Duration;

use axum::{
    body::Bytes,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::Serialize;
use thiserror::Error;

/// Path of the generation submit endpoint
pub const SUBMIT_PATH: &str = "/api/v1/generate";
/// Path of the task status endpoint
pub const RECORD_INFO_PATH: &str = "/api/v1/generate/record-info";

const USER_AGENT: &str = concat!("vibra-proxy/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Upstream calls per second unless configured otherwise
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

/// Upstream call failures
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Upstream answered with a non-2xx status
    #[error("upstream returned status {status}")]
    Status { status: u16, body: String },

    /// Request never produced a response
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl UpstreamError {
    /// Upstream status code, if a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            UpstreamError::Transport(err) => err.status().map(|s| s.as_u16()),
        }
    }

    /// The upstream 4xx status, for passthrough to the caller
    pub fn client_error_status(&self) -> Option<StatusCode> {
        self.status()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .filter(StatusCode::is_client_error)
    }

    /// Upstream response body, if any (log only)
    pub fn body(&self) -> Option<&str> {
        match self {
            UpstreamError::Status { body, .. } => Some(body),
            UpstreamError::Transport(_) => None,
        }
    }
}

/// Body sent to the upstream submit endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePayload {
    pub prompt: String,
    pub model: String,
    pub custom_mode: bool,
    pub instrumental: bool,
    pub call_back_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

/// Successful upstream response, relayed as-is
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub body: Bytes,
    pub content_type: Option<String>,
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let content_type = self
            .content_type
            .as_deref()
            .and_then(|ct| HeaderValue::from_str(ct).ok())
            .unwrap_or_else(|| HeaderValue::from_static("application/json"));

        (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], self.body).into_response()
    }
}

/// Client for the upstream generation API
pub struct SunoClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    pacer: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl SunoClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            pacer: RateLimiter::direct(Quota::per_second(
                NonZeroU32::new(DEFAULT_REQUESTS_PER_SECOND).expect("default pace is non-zero"),
            )),
        })
    }

    /// Replace the outbound pace
    pub fn with_pace(mut self, per_second: NonZeroU32) -> Self {
        self.pacer = RateLimiter::direct(Quota::per_second(per_second));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit a generation request
    pub async fn submit(&self, payload: &GeneratePayload) -> Result<UpstreamResponse, UpstreamError> {
        let url = format!("{}{}", self.base_url, SUBMIT_PATH);
        tracing::debug!(url = %url, model = %payload.model, "Submitting generation upstream");
        self.pacer.until_ready().await;

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await?;

        Self::relay(response).await
    }

    /// Fetch the current status of a task
    pub async fn record_info(&self, task_id: &str) -> Result<UpstreamResponse, UpstreamError> {
        let url = format!("{}{}", self.base_url, RECORD_INFO_PATH);
        tracing::debug!(url = %url, task_id = %task_id, "Querying task status upstream");
        self.pacer.until_ready().await;

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[("taskId", task_id)])
            .send()
            .await?;

        Self::relay(response).await
    }

    async fn relay(response: reqwest::Response) -> Result<UpstreamResponse, UpstreamError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        Ok(UpstreamResponse { body, content_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = SunoClient::new("https://upstream.example/", "key").unwrap();
        assert_eq!(client.base_url(), "https://upstream.example");
    }

    #[test]
    fn test_pace_limits_outbound_burst() {
        let client = SunoClient::new("https://upstream.example", "key")
            .unwrap()
            .with_pace(NonZeroU32::new(2).unwrap());

        assert!(client.pacer.check().is_ok());
        assert!(client.pacer.check().is_ok());
        assert!(client.pacer.check().is_err());
    }

    #[test]
    fn test_payload_omits_absent_title_and_style() {
        let payload = GeneratePayload {
            prompt: "deep house".to_string(),
            model: "V5".to_string(),
            custom_mode: false,
            instrumental: true,
            call_back_url: "https://cb.example".to_string(),
            title: None,
            style: None,
        };
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["callBackUrl"], "https://cb.example");
        assert_eq!(json["customMode"], false);
        assert!(json.get("title").is_none());
        assert!(json.get("style").is_none());
    }

    #[test]
    fn test_client_error_status_only_for_4xx() {
        let rejected = UpstreamError::Status {
            status: 400,
            body: String::new(),
        };
        assert_eq!(rejected.client_error_status(), Some(StatusCode::BAD_REQUEST));

        let broken = UpstreamError::Status {
            status: 502,
            body: String::new(),
        };
        assert_eq!(broken.client_error_status(), None);
    }
}
