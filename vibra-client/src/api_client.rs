//! HTTP client for the vibra-proxy API

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use vibra_common::config::env_non_empty;
use vibra_common::models::{ApiEnvelope, RecordInfo, SubmitData};
use vibra_common::{GenerationRequest, TaskHandle};

use crate::error::{ClientError, Result};
use crate::poller::TaskStatusSource;

/// Environment variable overriding the backend base URL
pub const API_URL_ENV: &str = "VITE_API_URL";
pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";

const REQUEST_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("vibra-client/", env!("CARGO_PKG_VERSION"));

/// Error body shapes the backend may return
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    error: Option<String>,
}

/// Backend API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ClientError::Config("API base URL is empty".to_string()));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.to_string(),
        })
    }

    /// Client for `VITE_API_URL`, or the local default
    pub fn from_env() -> Result<Self> {
        let url = env_non_empty(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self::new(&url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit a generation request; succeeds only when a task id comes back
    pub async fn generate(&self, request: &GenerationRequest) -> Result<TaskHandle> {
        let url = format!("{}/generate-music", self.base_url);
        debug!(url = %url, model = %request.model, custom_mode = request.custom_mode, "Submitting generation");

        let response = self.http_client.post(&url).json(request).send().await.map_err(|e| {
            warn!("Backend unavailable or error: {}", e);
            ClientError::from(e)
        })?;
        let envelope: ApiEnvelope<SubmitData> = Self::decode(response).await?;

        match envelope.data.and_then(|d| d.task_id).filter(|id| !id.is_empty()) {
            Some(task_id) => Ok(TaskHandle::new(task_id)),
            None => Err(ClientError::InvalidResponse {
                message: envelope.msg,
            }),
        }
    }

    /// Fetch the status document of a task
    pub async fn record_info(&self, task_id: &str) -> Result<ApiEnvelope<RecordInfo>> {
        let url = format!("{}/generate/record-info", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .query(&[("taskId", task_id)])
            .send()
            .await
            .map_err(|e| {
                warn!("Status check failed: {}", e);
                ClientError::from(e)
            })?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            return Err(ClientError::Backend {
                status: status.as_u16(),
                message: body.msg.or(body.error),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl TaskStatusSource for ApiClient {
    async fn fetch_status(&self, task_id: &str) -> Result<ApiEnvelope<RecordInfo>> {
        self.record_info(task_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:3001/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3001/api");
    }

    #[test]
    fn test_empty_base_url_rejected() {
        assert!(matches!(ApiClient::new("/"), Err(ClientError::Config(_))));
    }
}
