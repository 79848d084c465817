//! Generation request validation
//!
//! Checks run in a fixed order and the first failing field wins. Lengths are
//! counted in characters. Fields that are absent, null, `false`, `0` or `""`
//! count as "not provided" for the optional checks.

use serde_json::Value;
use thiserror::Error;
use vibra_common::models::{MAX_PROMPT_CHARS, MAX_STYLE_CHARS, MAX_TITLE_CHARS};
use vibra_common::ModelVersion;

/// Field-level validation failure with its public message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Prompt deve ser uma string com no máximo 1000 caracteres")]
    InvalidPrompt,

    #[error("Estilo deve ser uma string com no máximo 500 caracteres")]
    InvalidStyle,

    #[error("Título deve ser uma string com no máximo 100 caracteres")]
    InvalidTitle,

    #[error("Modelo deve ser V3, V4 ou V5")]
    InvalidModel,

    #[error("Instrumental deve ser um booleano")]
    InvalidInstrumental,

    #[error("customMode deve ser um booleano")]
    InvalidCustomMode,

    #[error("Prompt é necessário para geração simples")]
    PromptRequired,

    #[error("Estilo é necessário para modo customizado")]
    StyleRequired,
}

impl ValidationError {
    /// Name of the offending request field
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::InvalidPrompt | ValidationError::PromptRequired => "prompt",
            ValidationError::InvalidStyle | ValidationError::StyleRequired => "style",
            ValidationError::InvalidTitle => "title",
            ValidationError::InvalidModel => "model",
            ValidationError::InvalidInstrumental => "instrumental",
            ValidationError::InvalidCustomMode => "customMode",
        }
    }
}

/// A generation request that passed validation, before redaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub prompt: String,
    pub style: Option<String>,
    pub title: Option<String>,
    pub model: ModelVersion,
    pub custom_mode: bool,
    pub instrumental: bool,
}

/// Validate a raw JSON request body.
///
/// A body that is not a JSON object fails on the prompt check.
pub fn validate_generation_request(body: &Value) -> Result<ValidatedRequest, ValidationError> {
    let prompt = match body.get("prompt") {
        Some(Value::String(s)) if within(s, MAX_PROMPT_CHARS) => s.clone(),
        _ => return Err(ValidationError::InvalidPrompt),
    };

    let style = optional_text(body.get("style"), MAX_STYLE_CHARS, ValidationError::InvalidStyle)?;
    let title = optional_text(body.get("title"), MAX_TITLE_CHARS, ValidationError::InvalidTitle)?;

    let model = match body.get("model") {
        Some(value) if is_truthy(value) => value
            .as_str()
            .and_then(ModelVersion::parse)
            .ok_or(ValidationError::InvalidModel)?,
        _ => ModelVersion::default(),
    };

    let instrumental = match body.get("instrumental") {
        Some(Value::Bool(b)) => *b,
        _ => return Err(ValidationError::InvalidInstrumental),
    };

    let custom_mode = match body.get("customMode") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => return Err(ValidationError::InvalidCustomMode),
    };

    if !custom_mode && prompt.is_empty() {
        return Err(ValidationError::PromptRequired);
    }
    if custom_mode && style.as_deref().map_or(true, str::is_empty) {
        return Err(ValidationError::StyleRequired);
    }

    Ok(ValidatedRequest {
        prompt,
        style,
        title,
        model,
        custom_mode,
        instrumental,
    })
}

fn optional_text(
    value: Option<&Value>,
    max_chars: usize,
    err: ValidationError,
) -> Result<Option<String>, ValidationError> {
    match value {
        Some(v) if is_truthy(v) => match v {
            Value::String(s) if within(s, max_chars) => Ok(Some(s.clone())),
            _ => Err(err),
        },
        _ => Ok(None),
    }
}

fn within(text: &str, max_chars: usize) -> bool {
    text.chars().count() <= max_chars
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
