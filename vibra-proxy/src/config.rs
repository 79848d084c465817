//! Proxy configuration
//!
//! Resolution order per setting: command line / environment, then the TOML
//! file (`~/.config/vibra/vibra-proxy.toml` or `--config`), then compiled
//! defaults. The upstream API key comes only from the environment.

use std::fmt;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use vibra_common::config::resolve_setting;

use crate::error::ProxyError;
use crate::middleware::RateLimitRule;
use crate::services::suno_client::DEFAULT_REQUESTS_PER_SECOND;

/// Environment variable holding the upstream API key
pub const API_KEY_ENV: &str = "SUNO_API_KEY";

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.sunoapi.org";
pub const DEFAULT_CALLBACK_URL: &str = "https://api.example.com/callback";
pub const DEFAULT_STATIC_DIR: &str = "public";
pub const DEFAULT_INDEX_FILE: &str = "index.html";

/// Contents of `vibra-proxy.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProxyFileConfig {
    pub port: Option<u16>,
    pub frontend_url: Option<String>,
    pub upstream_url: Option<String>,
    pub callback_url: Option<String>,
    pub static_dir: Option<PathBuf>,
    pub index_file: Option<PathBuf>,
    /// Outbound calls per second to the upstream API
    pub upstream_requests_per_second: Option<u32>,
    pub rate_limits: RateLimitFileConfig,
}

/// `[rate_limits]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RateLimitFileConfig {
    pub general_max_requests: Option<u32>,
    pub general_window_secs: Option<u64>,
    pub generation_max_requests: Option<u32>,
    pub generation_window_secs: Option<u64>,
}

/// Command line / environment values, highest priority
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub frontend_url: Option<String>,
    pub upstream_url: Option<String>,
    pub static_dir: Option<PathBuf>,
}

/// Resolved proxy configuration
#[derive(Clone)]
pub struct ProxyConfig {
    pub api_key: String,
    pub port: u16,
    /// Allowed CORS origin; any origin when unset
    pub frontend_url: Option<String>,
    pub upstream_base_url: String,
    pub upstream_requests_per_second: NonZeroU32,
    pub callback_url: String,
    /// Directory served for static assets
    pub static_dir: PathBuf,
    /// Document served for any unmatched GET (client-side routing)
    pub index_file: PathBuf,
    pub general_limit: RateLimitRule,
    pub generation_limit: RateLimitRule,
}

impl ProxyConfig {
    /// Resolve the final configuration; fails without an API key
    pub fn resolve(
        api_key: Option<String>,
        overrides: ConfigOverrides,
        file: ProxyFileConfig,
    ) -> Result<Self, ProxyError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProxyError::Config(format!("{} is not set", API_KEY_ENV)))?;

        let upstream_requests_per_second = NonZeroU32::new(
            file.upstream_requests_per_second
                .unwrap_or(DEFAULT_REQUESTS_PER_SECOND),
        )
        .ok_or_else(|| ProxyError::Config("upstream_requests_per_second must be > 0".to_string()))?;

        let limits = &file.rate_limits;
        let general_limit = RateLimitRule {
            max_requests: limits
                .general_max_requests
                .unwrap_or(RateLimitRule::GENERAL.max_requests),
            window: limits
                .general_window_secs
                .map(Duration::from_secs)
                .unwrap_or(RateLimitRule::GENERAL.window),
            ..RateLimitRule::GENERAL
        };
        let generation_limit = RateLimitRule {
            max_requests: limits
                .generation_max_requests
                .unwrap_or(RateLimitRule::GENERATION.max_requests),
            window: limits
                .generation_window_secs
                .map(Duration::from_secs)
                .unwrap_or(RateLimitRule::GENERATION.window),
            ..RateLimitRule::GENERATION
        };

        Ok(Self {
            api_key,
            port: resolve_setting(overrides.port, file.port, DEFAULT_PORT),
            frontend_url: overrides
                .frontend_url
                .or(file.frontend_url)
                .filter(|u| !u.trim().is_empty()),
            upstream_base_url: resolve_setting(
                overrides.upstream_url,
                file.upstream_url,
                DEFAULT_UPSTREAM_URL.to_string(),
            ),
            upstream_requests_per_second,
            callback_url: file
                .callback_url
                .unwrap_or_else(|| DEFAULT_CALLBACK_URL.to_string()),
            static_dir: resolve_setting(
                overrides.static_dir,
                file.static_dir,
                PathBuf::from(DEFAULT_STATIC_DIR),
            ),
            index_file: file
                .index_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_FILE)),
            general_limit,
            generation_limit,
        })
    }

    /// Defaults everywhere except key and upstream (embedding and tests)
    pub fn with_upstream(api_key: &str, upstream_base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            port: DEFAULT_PORT,
            frontend_url: None,
            upstream_base_url: upstream_base_url.to_string(),
            upstream_requests_per_second: NonZeroU32::new(DEFAULT_REQUESTS_PER_SECOND)
                .expect("default pace is non-zero"),
            callback_url: DEFAULT_CALLBACK_URL.to_string(),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            index_file: PathBuf::from(DEFAULT_INDEX_FILE),
            general_limit: RateLimitRule::GENERAL,
            generation_limit: RateLimitRule::GENERATION,
        }
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("api_key", &"<redacted>")
            .field("port", &self.port)
            .field("frontend_url", &self.frontend_url)
            .field("upstream_base_url", &self.upstream_base_url)
            .field("upstream_requests_per_second", &self.upstream_requests_per_second)
            .field("callback_url", &self.callback_url)
            .field("static_dir", &self.static_dir)
            .field("index_file", &self.index_file)
            .field("general_limit", &self.general_limit)
            .field("generation_limit", &self.generation_limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_error() {
        let result = ProxyConfig::resolve(None, ConfigOverrides::default(), ProxyFileConfig::default());
        assert!(matches!(result, Err(ProxyError::Config(msg)) if msg.contains(API_KEY_ENV)));

        let blank = ProxyConfig::resolve(
            Some("  ".to_string()),
            ConfigOverrides::default(),
            ProxyFileConfig::default(),
        );
        assert!(blank.is_err());
    }

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::with_upstream("key", DEFAULT_UPSTREAM_URL);
        assert_eq!(config.port, 3001);
        assert_eq!(config.frontend_url, None);
        assert_eq!(config.callback_url, DEFAULT_CALLBACK_URL);
        assert_eq!(config.general_limit, RateLimitRule::GENERAL);
        assert_eq!(config.generation_limit, RateLimitRule::GENERATION);
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert_eq!(config.index_file, PathBuf::from("index.html"));
    }

    #[test]
    fn test_override_beats_file() {
        let file: ProxyFileConfig = toml::from_str(
            r#"
            port = 4000
            frontend_url = "https://file.example"
            upstream_url = "https://upstream.file"

            [rate_limits]
            generation_max_requests = 5
            "#,
        )
        .unwrap();
        let overrides = ConfigOverrides {
            port: Some(5000),
            ..Default::default()
        };

        let config = ProxyConfig::resolve(Some("key".to_string()), overrides, file).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.frontend_url.as_deref(), Some("https://file.example"));
        assert_eq!(config.upstream_base_url, "https://upstream.file");
        assert_eq!(config.generation_limit.max_requests, 5);
        assert_eq!(config.generation_limit.window, Duration::from_secs(3600));
        assert_eq!(config.general_limit, RateLimitRule::GENERAL);
    }

    #[test]
    fn test_upstream_pace() {
        let config = ProxyConfig::with_upstream("key", DEFAULT_UPSTREAM_URL);
        assert_eq!(config.upstream_requests_per_second.get(), DEFAULT_REQUESTS_PER_SECOND);

        let file: ProxyFileConfig = toml::from_str("upstream_requests_per_second = 3").unwrap();
        let config = ProxyConfig::resolve(Some("key".to_string()), ConfigOverrides::default(), file).unwrap();
        assert_eq!(config.upstream_requests_per_second.get(), 3);

        let file: ProxyFileConfig = toml::from_str("upstream_requests_per_second = 0").unwrap();
        let result = ProxyConfig::resolve(Some("key".to_string()), ConfigOverrides::default(), file);
        assert!(matches!(result, Err(ProxyError::Config(_))));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = ProxyConfig::with_upstream("super-secret", DEFAULT_UPSTREAM_URL);
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
