//! Generation form composition
//!
//! Turns what the user picked (styles, description, optional lyrics and
//! title) into the [`GenerationRequest`] sent to the backend, and turns
//! submission failures into something a user can act on.

use thiserror::Error;
use vibra_common::{GenerationRequest, ModelVersion};

use crate::error::ClientError;

pub const MAX_STYLES: usize = 5;
pub const MIN_DESCRIPTION_CHARS: usize = 3;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;
/// Title sent in custom mode when the user left it blank
pub const DEFAULT_CUSTOM_TITLE: &str = "VibraAi Track";
/// Title given to tracks of an untitled submission
pub const DEFAULT_SUBMITTED_TITLE: &str = "Nova Música";

pub const MSG_ARTIST_POLICY: &str = "Política Suno: Nomes de artistas reais (ex: Kygo, Avicii) \
                                     são proibidos. Descreva o estilo (ex: 'Tropical House').";
pub const MSG_BACKEND_UNREACHABLE: &str = "Não foi possível conectar ao servidor backend.";
pub const MSG_UNKNOWN_ERROR: &str = "Erro desconhecido";

/// Form validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Máximo de 5 estilos permitidos")]
    TooManyStyles,

    #[error("A descrição é muito curta")]
    DescriptionTooShort,

    #[error("A descrição deve ter no máximo 1000 caracteres")]
    DescriptionTooLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationMode {
    /// Styles and description form a single prompt
    #[default]
    Simple,
    /// Lyrics, title and style are sent separately
    Custom,
}

/// What the user filled in
#[derive(Debug, Clone, Default)]
pub struct GenerationForm {
    pub description: String,
    pub lyrics: Option<String>,
    pub title: Option<String>,
    pub styles: Vec<String>,
    pub instrumental: bool,
    pub model: ModelVersion,
    pub mode: GenerationMode,
}

impl GenerationForm {
    /// Add a style, keeping at most [`MAX_STYLES`]; selecting a style twice
    /// removes it
    pub fn toggle_style(&mut self, style: &str) -> Result<(), FormError> {
        if let Some(pos) = self.styles.iter().position(|s| s == style) {
            self.styles.remove(pos);
            return Ok(());
        }
        if self.styles.len() >= MAX_STYLES {
            return Err(FormError::TooManyStyles);
        }
        self.styles.push(style.to_string());
        Ok(())
    }

    /// Build the backend request
    pub fn compose(&self) -> Result<GenerationRequest, FormError> {
        if self.styles.len() > MAX_STYLES {
            return Err(FormError::TooManyStyles);
        }
        let chars = self.description.chars().count();
        if chars < MIN_DESCRIPTION_CHARS {
            return Err(FormError::DescriptionTooShort);
        }
        if chars > MAX_DESCRIPTION_CHARS {
            return Err(FormError::DescriptionTooLong);
        }

        let styles = self.styles.join(", ");

        let request = match self.mode {
            GenerationMode::Simple => GenerationRequest {
                prompt: if styles.is_empty() {
                    self.description.clone()
                } else {
                    format!("{} style. {}", styles, self.description)
                },
                style: None,
                title: None,
                model: self.model,
                custom_mode: false,
                instrumental: self.instrumental,
            },
            GenerationMode::Custom => GenerationRequest {
                prompt: self.lyrics.clone().unwrap_or_default(),
                style: Some(if styles.is_empty() {
                    self.description.clone()
                } else {
                    format!("{}, {}", styles, self.description)
                }),
                title: Some(
                    non_blank(self.title.as_deref())
                        .unwrap_or(DEFAULT_CUSTOM_TITLE)
                        .to_string(),
                ),
                model: self.model,
                custom_mode: true,
                instrumental: self.instrumental,
            },
        };

        Ok(request)
    }

    /// Title the resulting tracks fall back to
    pub fn submitted_title(&self) -> String {
        non_blank(self.title.as_deref())
            .unwrap_or(DEFAULT_SUBMITTED_TITLE)
            .to_string()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// User-facing explanation of a failed submission
pub fn describe_submission_error(err: &ClientError) -> String {
    if let Some(message) = err.backend_message() {
        if message.to_lowercase().contains("artist name") {
            return MSG_ARTIST_POLICY.to_string();
        }
        return message.to_string();
    }

    match err {
        ClientError::Transport(_) => MSG_BACKEND_UNREACHABLE.to_string(),
        ClientError::Form(form) => form.to_string(),
        ClientError::InvalidResponse { .. } => err.to_string(),
        _ => MSG_UNKNOWN_ERROR.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(mode: GenerationMode) -> GenerationForm {
        GenerationForm {
            description: "dreamy pads and warm bass".to_string(),
            styles: vec!["Deep House".to_string(), "Chillout".to_string()],
            instrumental: true,
            mode,
            ..Default::default()
        }
    }

    #[test]
    fn test_simple_mode_prompt() {
        let request = form(GenerationMode::Simple).compose().unwrap();
        assert_eq!(request.prompt, "Deep House, Chillout style. dreamy pads and warm bass");
        assert!(!request.custom_mode);
        assert_eq!(request.style, None);
        assert_eq!(request.title, None);
        assert_eq!(request.model, ModelVersion::V5);
    }

    #[test]
    fn test_simple_mode_without_styles() {
        let mut f = form(GenerationMode::Simple);
        f.styles.clear();
        assert_eq!(f.compose().unwrap().prompt, "dreamy pads and warm bass");
    }

    #[test]
    fn test_custom_mode_fields() {
        let mut f = form(GenerationMode::Custom);
        f.lyrics = Some("la la la".to_string());
        let request = f.compose().unwrap();

        assert!(request.custom_mode);
        assert_eq!(request.prompt, "la la la");
        assert_eq!(request.style.as_deref(), Some("Deep House, Chillout, dreamy pads and warm bass"));
        assert_eq!(request.title.as_deref(), Some(DEFAULT_CUSTOM_TITLE));
    }

    #[test]
    fn test_custom_mode_without_lyrics_sends_empty_prompt() {
        let mut f = form(GenerationMode::Custom);
        f.title = Some("Night Swim".to_string());
        let request = f.compose().unwrap();
        assert_eq!(request.prompt, "");
        assert_eq!(request.title.as_deref(), Some("Night Swim"));
    }

    #[test]
    fn test_description_bounds() {
        let mut f = form(GenerationMode::Simple);
        f.description = "ok".to_string();
        assert_eq!(f.compose().unwrap_err(), FormError::DescriptionTooShort);

        f.description = "x".repeat(1001);
        assert_eq!(f.compose().unwrap_err(), FormError::DescriptionTooLong);
    }

    #[test]
    fn test_style_limit() {
        let mut f = GenerationForm::default();
        for style in ["House", "Techno", "Trance", "Dubstep", "Ambient"] {
            f.toggle_style(style).unwrap();
        }
        assert_eq!(f.toggle_style("EDM"), Err(FormError::TooManyStyles));

        // Deselecting frees a slot
        f.toggle_style("Techno").unwrap();
        f.toggle_style("EDM").unwrap();
        assert_eq!(f.styles.len(), MAX_STYLES);
    }

    #[test]
    fn test_submitted_title_fallback() {
        let mut f = form(GenerationMode::Simple);
        assert_eq!(f.submitted_title(), DEFAULT_SUBMITTED_TITLE);
        f.title = Some("Aurora".to_string());
        assert_eq!(f.submitted_title(), "Aurora");
    }

    #[test]
    fn test_artist_policy_message() {
        let err = ClientError::Backend {
            status: 400,
            message: Some("Prompt contains Artist Name references".to_string()),
        };
        assert_eq!(describe_submission_error(&err), MSG_ARTIST_POLICY);
    }

    #[test]
    fn test_backend_message_shown() {
        let err = ClientError::Backend {
            status: 429,
            message: Some("Limite de geração excedido. Tente novamente em 1 hora.".to_string()),
        };
        assert_eq!(
            describe_submission_error(&err),
            "Limite de geração excedido. Tente novamente em 1 hora."
        );

        let err = ClientError::Backend {
            status: 500,
            message: None,
        };
        assert_eq!(describe_submission_error(&err), MSG_UNKNOWN_ERROR);
    }

    #[test]
    fn test_missing_task_id_message() {
        let err = ClientError::InvalidResponse { message: None };
        assert_eq!(describe_submission_error(&err), "Resposta inválida da API");
    }
}
