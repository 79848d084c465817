//! Error types for vibra-client

use thiserror::Error;

use crate::compose::FormError;

/// Client-side errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Backend could not be reached (connect failure, timeout)
    #[error("Backend unreachable: {0}")]
    Transport(reqwest::Error),

    /// Backend answered with a non-2xx status
    #[error("Backend returned status {status}")]
    Backend {
        status: u16,
        /// `msg` or `error` field of the response body, if any
        message: Option<String>,
    },

    /// Backend answered 2xx with a document we cannot use
    #[error("Resposta inválida da API")]
    InvalidResponse {
        /// Upstream `msg`, when the document carried one
        message: Option<String>,
    },

    /// Form rejected before submission
    #[error("{0}")]
    Form(#[from] FormError),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Library persistence failure
    #[error("Library error: {0}")]
    Library(String),
}

impl ClientError {
    /// Message reported by the backend, if any
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ClientError::Backend { message, .. } | ClientError::InvalidResponse { message } => {
                message.as_deref()
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::InvalidResponse { message: None }
        } else {
            ClientError::Transport(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
