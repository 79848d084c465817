//! Outbound service clients

pub mod suno_client;

pub use suno_client::{GeneratePayload, SunoClient, UpstreamError, UpstreamResponse};
