//! HTTP API handlers

pub mod generate;
pub mod health;
pub mod record_info;
pub mod ui;

pub use generate::generate_music;
pub use health::health_routes;
pub use record_info::record_info;
pub use ui::{root_head, root_routes, spa_service};

/// Generation submit route
pub const GENERATE_MUSIC_PATH: &str = "/api/generate-music";
/// Task status route
pub const RECORD_INFO_PATH: &str = "/api/generate/record-info";
