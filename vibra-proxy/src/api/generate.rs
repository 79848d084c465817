//! POST /api/generate-music
//!
//! Validates the request, strips artist names from the free-text fields and
//! forwards the result to the upstream submit endpoint. The upstream answer
//! is relayed verbatim on success.

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info};
use uuid::Uuid;
use vibra_common::ArtistFilter;

use crate::error::{ApiResult, ProxyError};
use crate::middleware::is_json_request;
use crate::services::GeneratePayload;
use crate::validation::{validate_generation_request, ValidatedRequest};
use crate::AppState;

/// Build the upstream payload from a validated request.
///
/// `title` and `style` are only sent in custom mode, and only when something
/// is left after redaction.
pub fn build_upstream_payload(
    request: &ValidatedRequest,
    filter: &ArtistFilter,
    callback_url: &str,
) -> GeneratePayload {
    let (title, style) = if request.custom_mode {
        (
            filter.redact_opt(request.title.as_deref()).filter(|t| !t.is_empty()),
            filter.redact_opt(request.style.as_deref()).filter(|s| !s.is_empty()),
        )
    } else {
        (None, None)
    };

    GeneratePayload {
        prompt: filter.redact(&request.prompt),
        model: request.model.as_str().to_string(),
        custom_mode: request.custom_mode,
        instrumental: request.instrumental,
        call_back_url: callback_url.to_string(),
        title,
        style,
    }
}

/// POST /api/generate-music
pub async fn generate_music(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let request_id = Uuid::new_v4();

    // Non-JSON or malformed bodies validate as empty and fail on prompt
    let body: Value = if is_json_request(&headers) {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    } else {
        Value::Null
    };

    let request = validate_generation_request(&body).map_err(|e| {
        debug!(request_id = %request_id, field = e.field(), "Rejected generation request");
        e
    })?;

    let payload = build_upstream_payload(&request, &state.filter, &state.config.callback_url);

    info!(
        request_id = %request_id,
        model = %payload.model,
        custom_mode = payload.custom_mode,
        instrumental = payload.instrumental,
        prompt_redacted = payload.prompt != request.prompt,
        "Forwarding generation request"
    );
    debug!(
        request_id = %request_id,
        original_prompt = %request.prompt,
        filtered_prompt = %payload.prompt,
        original_style = ?request.style,
        filtered_style = ?payload.style,
        original_title = ?request.title,
        filtered_title = ?payload.title,
        "Artist filter applied"
    );

    match state.upstream.submit(&payload).await {
        Ok(response) => {
            info!(request_id = %request_id, "Generation submitted");
            Ok(response.into_response())
        }
        Err(err) => {
            let caller = connect_info
                .map(|ConnectInfo(addr)| addr.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let user_agent = headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");

            error!(
                request_id = %request_id,
                error = %err,
                upstream_status = ?err.status(),
                upstream_body = err.body().unwrap_or(""),
                caller = %caller,
                user_agent = %user_agent,
                timestamp = %Utc::now().to_rfc3339(),
                "Generation submit failed"
            );
            state.record_error(format!("generate: {}", err)).await;

            Err(ProxyError::Submit(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibra_common::ModelVersion;

    fn request(custom_mode: bool) -> ValidatedRequest {
        ValidatedRequest {
            prompt: "chill beats Kygo feat. John Doe".to_string(),
            style: Some("house like Avicii".to_string()),
            title: Some("Drake".to_string()),
            model: ModelVersion::V4,
            custom_mode,
            instrumental: true,
        }
    }

    #[test]
    fn test_simple_mode_drops_title_and_style() {
        let filter = ArtistFilter::builtin();
        let payload = build_upstream_payload(&request(false), &filter, "https://cb.example");

        assert_eq!(payload.prompt, "chill beats");
        assert_eq!(payload.model, "V4");
        assert_eq!(payload.title, None);
        assert_eq!(payload.style, None);
        assert_eq!(payload.call_back_url, "https://cb.example");
    }

    #[test]
    fn test_custom_mode_omits_fields_emptied_by_redaction() {
        let filter = ArtistFilter::builtin();
        let payload = build_upstream_payload(&request(true), &filter, "https://cb.example");

        // Title was nothing but an artist name
        assert_eq!(payload.title, None);
        let style = payload.style.unwrap();
        assert!(!style.contains("Avicii"));
        assert!(style.starts_with("house"));
    }
}
