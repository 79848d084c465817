//! Generation request, task status and track models
//!
//! Shared between the proxy (which validates requests and relays envelopes)
//! and the client (which submits requests and turns finished tasks into
//! library tracks).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Maximum prompt length in characters
pub const MAX_PROMPT_CHARS: usize = 1000;
/// Maximum style length in characters
pub const MAX_STYLE_CHARS: usize = 500;
/// Maximum title length in characters
pub const MAX_TITLE_CHARS: usize = 100;

/// Duration assumed when the upstream clip carries none (seconds)
pub const DEFAULT_TRACK_DURATION_SECS: f64 = 180.0;
/// Tags assumed when the upstream clip carries none
pub const DEFAULT_TRACK_TAGS: &str = "Electronic";
/// Title used when neither the clip nor the submission has one
pub const DEFAULT_TRACK_TITLE: &str = "Generated Track";

// ============================================================================
// Generation Request
// ============================================================================

/// Upstream model version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelVersion {
    V3,
    V4,
    #[default]
    V5,
}

impl ModelVersion {
    pub const ALL: [ModelVersion; 3] = [ModelVersion::V3, ModelVersion::V4, ModelVersion::V5];

    /// Parse a model name case-insensitively ("v5" → `V5`)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "V3" => Some(Self::V3),
            "V4" => Some(Self::V4),
            "V5" => Some(Self::V5),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V3 => "V3",
            Self::V4 => "V4",
            Self::V5 => "V5",
        }
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::InvalidInput(format!("unknown model version: {}", s)))
    }
}

/// Generation request as sent by the client to the proxy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Free-text prompt (lyrics in custom mode)
    pub prompt: String,
    /// Style description, used in custom mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Track title, used in custom mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub model: ModelVersion,
    #[serde(default)]
    pub custom_mode: bool,
    pub instrumental: bool,
}

// ============================================================================
// Task Status
// ============================================================================

/// Opaque handle of an in-flight generation task
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle {
    #[serde(rename = "taskId")]
    pub task_id: String,
}

impl TaskHandle {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
        }
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.task_id)
    }
}

/// Upstream task status
///
/// Unknown values are kept verbatim in [`TaskStatus::Other`] and treated as
/// still pending.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Pending,
    Success,
    FirstSuccess,
    GenerateAudioFailed,
    CreateTaskFailed,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::FirstSuccess => "FIRST_SUCCESS",
            Self::GenerateAudioFailed => "GENERATE_AUDIO_FAILED",
            Self::CreateTaskFailed => "CREATE_TASK_FAILED",
            Self::Other(value) => value,
        }
    }

    /// Terminal success (`SUCCESS` or `FIRST_SUCCESS`)
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::FirstSuccess)
    }

    /// Terminal failure (`GENERATE_AUDIO_FAILED` or `CREATE_TASK_FAILED`)
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::GenerateAudioFailed | Self::CreateTaskFailed)
    }

    pub fn is_terminal(&self) -> bool {
        self.is_success() || self.is_failure()
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => Self::Pending,
            "SUCCESS" => Self::Success,
            "FIRST_SUCCESS" => Self::FirstSuccess,
            "GENERATE_AUDIO_FAILED" => Self::GenerateAudioFailed,
            "CREATE_TASK_FAILED" => Self::CreateTaskFailed,
            _ => Self::Other(value),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Upstream Envelopes
// ============================================================================

/// `{ code, msg, data }` envelope used by the upstream API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: Option<i64>,
    pub msg: Option<String>,
    pub data: Option<T>,
}

/// `data` of a successful submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitData {
    #[serde(rename = "taskId", default)]
    pub task_id: Option<String>,
}

/// `data` of a record-info lookup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordInfo {
    #[serde(rename = "taskId", default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub response: Option<RecordResponse>,
}

impl RecordInfo {
    /// Clips produced so far (empty when the response carries none)
    pub fn clips(&self) -> &[GeneratedClip] {
        self.response
            .as_ref()
            .and_then(|r| r.suno_data.as_deref())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordResponse {
    #[serde(rename = "sunoData", default)]
    pub suno_data: Option<Vec<GeneratedClip>>,
}

/// One rendition returned for a finished task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedClip {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub tags: Option<String>,
}

// ============================================================================
// Library Track
// ============================================================================

/// Track lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    Queued,
    Streaming,
    Complete,
    Error,
}

/// Track stored in the client library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub audio_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Duration in seconds
    pub duration: f64,
    pub tags: String,
    pub status: TrackStatus,
    pub created_at: DateTime<Utc>,
    pub model_name: String,
}

impl Track {
    /// Materialize a finished clip as a completed library track.
    ///
    /// Empty clip fields fall back to: the submitted title, then
    /// [`DEFAULT_TRACK_TITLE`]; `fallback_image`; an empty audio URL;
    /// [`DEFAULT_TRACK_DURATION_SECS`]; [`DEFAULT_TRACK_TAGS`].
    pub fn from_clip(
        clip: &GeneratedClip,
        submitted_title: Option<&str>,
        fallback_image: &str,
        model: ModelVersion,
        created_at: DateTime<Utc>,
    ) -> Self {
        let title = non_empty(clip.title.as_deref())
            .or_else(|| non_empty(submitted_title))
            .unwrap_or(DEFAULT_TRACK_TITLE);

        Self {
            id: clip.id.clone(),
            title: title.to_string(),
            image_url: non_empty(clip.image_url.as_deref())
                .unwrap_or(fallback_image)
                .to_string(),
            audio_url: clip.audio_url.clone().unwrap_or_default(),
            video_url: non_empty(clip.video_url.as_deref()).map(str::to_string),
            duration: clip
                .duration
                .filter(|d| d.is_finite() && *d > 0.0)
                .unwrap_or(DEFAULT_TRACK_DURATION_SECS),
            tags: non_empty(clip.tags.as_deref())
                .unwrap_or(DEFAULT_TRACK_TAGS)
                .to_string(),
            status: TrackStatus::Complete,
            created_at,
            model_name: model.to_string(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_version_parse_is_case_insensitive() {
        assert_eq!(ModelVersion::parse("v5"), Some(ModelVersion::V5));
        assert_eq!(ModelVersion::parse("V3"), Some(ModelVersion::V3));
        assert_eq!(ModelVersion::parse("v4"), Some(ModelVersion::V4));
        assert_eq!(ModelVersion::parse("v6"), None);
        assert!("chirp".parse::<ModelVersion>().is_err());
        assert_eq!(ModelVersion::default(), ModelVersion::V5);
    }

    #[test]
    fn test_generation_request_wire_format() {
        let request = GenerationRequest {
            prompt: "dark techno".to_string(),
            style: None,
            title: None,
            model: ModelVersion::V4,
            custom_mode: false,
            instrumental: true,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({ "prompt": "dark techno", "model": "V4", "customMode": false, "instrumental": true })
        );
    }

    #[test]
    fn test_task_status_classification() {
        assert!(TaskStatus::Success.is_success());
        assert!(TaskStatus::FirstSuccess.is_terminal());
        assert!(TaskStatus::CreateTaskFailed.is_failure());
        assert!(!TaskStatus::Pending.is_terminal());

        let other: TaskStatus = serde_json::from_value(json!("TEXT_SUCCESS")).unwrap();
        assert_eq!(other, TaskStatus::Other("TEXT_SUCCESS".to_string()));
        assert!(!other.is_terminal());
        assert_eq!(serde_json::to_value(&other).unwrap(), json!("TEXT_SUCCESS"));
    }

    #[test]
    fn test_record_info_parses_clips() {
        let envelope: ApiEnvelope<RecordInfo> = serde_json::from_value(json!({
            "code": 200,
            "msg": "success",
            "data": {
                "taskId": "abc",
                "status": "SUCCESS",
                "response": { "sunoData": [
                    { "id": "t1", "title": "Neon", "audioUrl": "https://cdn/t1.mp3", "duration": 201.5 },
                    { "id": "t2" }
                ]}
            }
        }))
        .unwrap();

        let data = envelope.data.unwrap();
        assert_eq!(data.status, Some(TaskStatus::Success));
        assert_eq!(data.clips().len(), 2);
        assert_eq!(data.clips()[0].duration, Some(201.5));
    }

    #[test]
    fn test_record_info_without_response() {
        let envelope: ApiEnvelope<RecordInfo> =
            serde_json::from_value(json!({ "code": 200, "data": { "status": "PENDING", "response": null } }))
                .unwrap();
        assert!(envelope.data.unwrap().clips().is_empty());
    }

    #[test]
    fn test_track_from_clip_applies_fallbacks() {
        let now = Utc::now();
        let clip = GeneratedClip {
            id: "t2".to_string(),
            title: Some(String::new()),
            duration: Some(0.0),
            ..Default::default()
        };

        let track = Track::from_clip(&clip, Some("Night Drive"), "https://img/default.png", ModelVersion::V5, now);
        assert_eq!(track.title, "Night Drive");
        assert_eq!(track.image_url, "https://img/default.png");
        assert_eq!(track.audio_url, "");
        assert_eq!(track.video_url, None);
        assert_eq!(track.duration, DEFAULT_TRACK_DURATION_SECS);
        assert_eq!(track.tags, DEFAULT_TRACK_TAGS);
        assert_eq!(track.status, TrackStatus::Complete);
        assert_eq!(track.model_name, "V5");

        let untitled = Track::from_clip(&clip, None, "", ModelVersion::V3, now);
        assert_eq!(untitled.title, DEFAULT_TRACK_TITLE);
    }

    #[test]
    fn test_track_from_clip_keeps_clip_values() {
        let clip = GeneratedClip {
            id: "t1".to_string(),
            title: Some("Neon".to_string()),
            image_url: Some("https://img/t1.png".to_string()),
            audio_url: Some("https://cdn/t1.mp3".to_string()),
            video_url: Some("https://cdn/t1.mp4".to_string()),
            duration: Some(201.5),
            tags: Some("synthwave".to_string()),
        };

        let track = Track::from_clip(&clip, Some("ignored"), "fallback", ModelVersion::V4, Utc::now());
        assert_eq!(track.title, "Neon");
        assert_eq!(track.image_url, "https://img/t1.png");
        assert_eq!(track.video_url.as_deref(), Some("https://cdn/t1.mp4"));
        assert_eq!(track.duration, 201.5);
        assert_eq!(track.tags, "synthwave");
    }
}
