//! # VibraAI Common Library
//!
//! Shared code for the VibraAI proxy and client including:
//! - Generation request / task status / track models
//! - Artist-name redaction filter
//! - Request text sanitization
//! - Configuration loading
//! - Electronic genre catalog used to compose style strings

pub mod artist_filter;
pub mod config;
pub mod error;
pub mod genres;
pub mod models;
pub mod sanitize;

pub use artist_filter::{ArtistFilter, CreditHeuristic, DenyList};
pub use error::{Error, Result};
pub use models::{GenerationRequest, ModelVersion, TaskHandle, TaskStatus, Track};
