//! Request middleware: rate limiting, body sanitization, security headers

pub mod rate_limit;
pub mod sanitize;
pub mod security_headers;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::{header, Extensions, HeaderMap};

pub use rate_limit::{
    enforce_api_rate_limit, enforce_rate_limit, RateLimitPolicy, RateLimitRule, RateLimits,
};
pub use sanitize::{sanitize_json_body, MAX_BODY_BYTES};
pub use security_headers::with_security_headers;

/// Caller address from the connection, unspecified when unavailable
pub fn caller_ip(extensions: &Extensions) -> IpAddr {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// True when the request declares a JSON body
pub fn is_json_request(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}
