//! Per-caller rate limiting
//!
//! A policy remembers, per caller IP, when each request it admitted during
//! the last `window` arrived. A request is admitted only while fewer than
//! `max_requests` of those remain, so no caller gets more than
//! `max_requests` through in any `window`-long span. A rejected caller is
//! told how long until its oldest admitted request leaves the window.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::caller_ip;
use crate::error::ProxyError;

/// Message for callers over the general API limit
pub const MSG_GENERAL_LIMIT: &str = "Muitas requisições. Tente novamente em 15 minutos.";
/// Message for callers over the generation limit
pub const MSG_GENERATION_LIMIT: &str = "Limite de geração excedido. Tente novamente em 1 hora.";

/// Path prefix covered by [`enforce_api_rate_limit`]
pub const API_PREFIX: &str = "/api";

/// Request budget per caller over a time window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub max_requests: u32,
    pub window: Duration,
    pub message: &'static str,
}

impl RateLimitRule {
    /// 100 requests per 15 minutes on every API route
    pub const GENERAL: RateLimitRule = RateLimitRule {
        max_requests: 100,
        window: Duration::from_secs(15 * 60),
        message: MSG_GENERAL_LIMIT,
    };

    /// 50 requests per hour on generation submit
    pub const GENERATION: RateLimitRule = RateLimitRule {
        max_requests: 50,
        window: Duration::from_secs(60 * 60),
        message: MSG_GENERATION_LIMIT,
    };

    fn validate(&self) -> Result<(), ProxyError> {
        if self.max_requests == 0 {
            return Err(ProxyError::Config(
                "rate limit max_requests must be > 0".to_string(),
            ));
        }
        if self.window.is_zero() {
            return Err(ProxyError::Config("rate limit window must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Arrival times of admitted requests, oldest first
type Admitted = VecDeque<Instant>;

/// A named rate limit shared by all routes it guards
#[derive(Clone)]
pub struct RateLimitPolicy {
    name: &'static str,
    rule: RateLimitRule,
    callers: Arc<Mutex<HashMap<IpAddr, Admitted>>>,
}

impl RateLimitPolicy {
    pub fn new(name: &'static str, rule: RateLimitRule) -> Result<Self, ProxyError> {
        rule.validate()?;
        Ok(Self {
            name,
            rule,
            callers: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn rule(&self) -> &RateLimitRule {
        &self.rule
    }

    /// Count one request for `caller`; on rejection returns the wait time
    pub fn check(&self, caller: IpAddr) -> Result<(), Duration> {
        let now = Instant::now();
        let window = self.rule.window;

        let mut callers = self.lock();
        let admitted = callers.entry(caller).or_default();
        while admitted
            .front()
            .is_some_and(|&at| now.duration_since(at) >= window)
        {
            admitted.pop_front();
        }

        if admitted.len() < self.rule.max_requests as usize {
            admitted.push_back(now);
            return Ok(());
        }

        let oldest = admitted.front().copied().unwrap_or(now);
        Err((oldest + window).saturating_duration_since(now))
    }

    /// Forget callers with nothing admitted inside the current window
    pub fn retain_recent(&self) {
        let now = Instant::now();
        let window = self.rule.window;

        let mut callers = self.lock();
        callers.retain(|_, admitted| {
            admitted
                .back()
                .is_some_and(|&at| now.duration_since(at) < window)
        });
        callers.shrink_to_fit();
    }

    /// Number of callers currently tracked
    pub fn tracked_callers(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<IpAddr, Admitted>> {
        self.callers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The proxy's two policies
#[derive(Clone)]
pub struct RateLimits {
    pub general: RateLimitPolicy,
    pub generation: RateLimitPolicy,
}

impl RateLimits {
    pub fn new(general: RateLimitRule, generation: RateLimitRule) -> Result<Self, ProxyError> {
        Ok(Self {
            general: RateLimitPolicy::new("general", general)?,
            generation: RateLimitPolicy::new("generation", generation)?,
        })
    }

    /// Periodically purge idle callers from both policies
    pub fn spawn_housekeeping(&self, every: Duration) -> JoinHandle<()> {
        let limits = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limits.general.retain_recent();
                limits.generation.retain_recent();
                debug!(
                    general = limits.general.tracked_callers(),
                    generation = limits.generation.tracked_callers(),
                    "Rate limiter housekeeping"
                );
            }
        })
    }
}

/// True for `/api` and every path below it
pub fn is_api_path(path: &str) -> bool {
    path.strip_prefix(API_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Rate limit middleware for the routes it is layered on
pub async fn enforce_rate_limit(
    State(policy): State<RateLimitPolicy>,
    request: Request,
    next: Next,
) -> Response {
    admit(&policy, request, next).await
}

/// Rate limit middleware for every path under [`API_PREFIX`], including
/// paths no route matches
pub async fn enforce_api_rate_limit(
    State(policy): State<RateLimitPolicy>,
    request: Request,
    next: Next,
) -> Response {
    if !is_api_path(request.uri().path()) {
        return next.run(request).await;
    }
    admit(&policy, request, next).await
}

async fn admit(policy: &RateLimitPolicy, request: Request, next: Next) -> Response {
    let caller = caller_ip(request.extensions());

    match policy.check(caller) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            warn!(
                policy = policy.name(),
                caller = %caller,
                path = %request.uri().path(),
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            ProxyError::RateLimited {
                message: policy.rule().message,
                retry_after,
            }
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn rule(max_requests: u32) -> RateLimitRule {
        RateLimitRule {
            max_requests,
            window: Duration::from_secs(3600),
            message: "limited",
        }
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_up_to_max_then_reject() {
        let policy = RateLimitPolicy::new("test", rule(3)).unwrap();

        for _ in 0..3 {
            assert!(policy.check(ip(1)).is_ok());
        }
        assert_eq!(policy.check(ip(1)), Err(Duration::from_secs(3600)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_general_rule_holds_for_whole_window() {
        let policy = RateLimitPolicy::new("general", RateLimitRule::GENERAL).unwrap();

        for _ in 0..100 {
            assert!(policy.check(ip(1)).is_ok());
        }
        assert!(policy.check(ip(1)).is_err());

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(policy.check(ip(1)), Err(Duration::from_secs(890)));

        tokio::time::advance(Duration::from_secs(889)).await;
        assert_eq!(policy.check(ip(1)), Err(Duration::from_secs(1)));

        // The whole first batch leaves the window together
        tokio::time::advance(Duration::from_secs(1)).await;
        for _ in 0..100 {
            assert!(policy.check(ip(1)).is_ok());
        }
        assert!(policy.check(ip(1)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slots_free_one_at_a_time() {
        let policy = RateLimitPolicy::new("test", rule(2)).unwrap();

        assert!(policy.check(ip(1)).is_ok());
        tokio::time::advance(Duration::from_secs(600)).await;
        assert!(policy.check(ip(1)).is_ok());

        tokio::time::advance(Duration::from_secs(600)).await;
        assert_eq!(policy.check(ip(1)), Err(Duration::from_secs(2400)));

        tokio::time::advance(Duration::from_secs(2400)).await;
        assert!(policy.check(ip(1)).is_ok());
        assert_eq!(policy.check(ip(1)), Err(Duration::from_secs(600)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejections_are_not_counted() {
        let policy = RateLimitPolicy::new("test", rule(1)).unwrap();

        assert!(policy.check(ip(1)).is_ok());
        for _ in 0..10 {
            assert!(policy.check(ip(1)).is_err());
        }

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(policy.check(ip(1)).is_ok());
    }

    #[test]
    fn test_callers_are_independent() {
        let policy = RateLimitPolicy::new("test", rule(1)).unwrap();

        assert!(policy.check(ip(1)).is_ok());
        assert!(policy.check(ip(1)).is_err());
        assert!(policy.check(ip(2)).is_ok());
        assert_eq!(policy.tracked_callers(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retain_recent_forgets_idle_callers() {
        let policy = RateLimitPolicy::new("test", rule(5)).unwrap();

        assert!(policy.check(ip(1)).is_ok());
        tokio::time::advance(Duration::from_secs(1800)).await;
        assert!(policy.check(ip(2)).is_ok());

        tokio::time::advance(Duration::from_secs(1800)).await;
        policy.retain_recent();
        assert_eq!(policy.tracked_callers(), 1);
    }

    #[test]
    fn test_zero_budget_is_config_error() {
        assert!(matches!(
            RateLimitPolicy::new("test", rule(0)),
            Err(ProxyError::Config(_))
        ));

        let zero_window = RateLimitRule {
            window: Duration::ZERO,
            ..rule(5)
        };
        assert!(RateLimitPolicy::new("test", zero_window).is_err());
    }

    #[test]
    fn test_api_paths() {
        assert!(is_api_path("/api"));
        assert!(is_api_path("/api/"));
        assert!(is_api_path("/api/generate-music"));
        assert!(is_api_path("/api/anything/else"));
        assert!(!is_api_path("/apis"));
        assert!(!is_api_path("/health"));
        assert!(!is_api_path("/"));
    }

    #[test]
    fn test_default_rules() {
        assert_eq!(RateLimitRule::GENERAL.max_requests, 100);
        assert_eq!(RateLimitRule::GENERAL.window, Duration::from_secs(900));
        assert_eq!(RateLimitRule::GENERATION.max_requests, 50);
        assert_eq!(RateLimitRule::GENERATION.window, Duration::from_secs(3600));
    }
}
