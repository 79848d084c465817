//! Security response headers
//!
//! Headers are only added when the handler did not set them itself.

use axum::http::{header, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

/// Content security policy allowing media from anywhere over https and API
/// calls to `upstream_origin`
pub fn content_security_policy(upstream_origin: &str) -> String {
    [
        "default-src 'self'".to_string(),
        "style-src 'self' 'unsafe-inline' https://fonts.googleapis.com".to_string(),
        "font-src 'self' https://fonts.gstatic.com".to_string(),
        "img-src 'self' data: https: blob:".to_string(),
        "script-src 'self'".to_string(),
        format!("connect-src 'self' {}", upstream_origin),
        "media-src 'self' https: blob:".to_string(),
    ]
    .join("; ")
}

/// Origin (scheme://host[:port]) of a base URL, or the input when unparseable
pub fn origin_of(base_url: &str) -> String {
    reqwest::Url::parse(base_url)
        .map(|url| url.origin().ascii_serialization())
        .unwrap_or_else(|_| base_url.to_string())
}

/// Wrap a router with the security header layers
pub fn with_security_headers(router: Router, upstream_base_url: &str) -> Router {
    let csp = HeaderValue::from_str(&content_security_policy(&origin_of(upstream_base_url)))
        .unwrap_or_else(|_| HeaderValue::from_static("default-src 'self'"));

    router
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            csp,
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_strips_path() {
        assert_eq!(origin_of("https://api.sunoapi.org/"), "https://api.sunoapi.org");
        assert_eq!(origin_of("http://127.0.0.1:9000/base"), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_csp_names_upstream() {
        let csp = content_security_policy("https://api.sunoapi.org");
        assert!(csp.starts_with("default-src 'self'; "));
        assert!(csp.contains("connect-src 'self' https://api.sunoapi.org"));
        assert!(csp.contains("media-src 'self' https: blob:"));
    }
}
