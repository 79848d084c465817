//! GET /api/generate/record-info?taskId=...

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::error;

use crate::error::{ApiResult, ProxyError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RecordInfoQuery {
    #[serde(rename = "taskId")]
    pub task_id: Option<String>,
}

/// Relay the upstream status document for a task
pub async fn record_info(
    State(state): State<AppState>,
    Query(query): Query<RecordInfoQuery>,
) -> ApiResult<Response> {
    let task_id = query
        .task_id
        .filter(|id| !id.is_empty())
        .ok_or(ProxyError::MissingTaskId)?;

    match state.upstream.record_info(&task_id).await {
        Ok(response) => Ok(response.into_response()),
        Err(err) => {
            error!(
                task_id = %task_id,
                error = %err,
                upstream_status = ?err.status(),
                upstream_body = err.body().unwrap_or(""),
                "Status lookup failed"
            );
            state.record_error(format!("record-info: {}", err)).await;
            Err(ProxyError::StatusLookup(err))
        }
    }
}
