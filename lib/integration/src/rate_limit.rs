//! Rate limiting for outbound searches.
//!
//! Protects the provider quota by limiting how often each key (usually a
//! chat user) may trigger a search within a fixed window.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Rate limit configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration in seconds.
    pub window_seconds: u32,
}

impl RateLimitConfig {
    /// Creates a new rate limit configuration.
    #[must_use]
    pub fn new(max_requests: u32, window_seconds: u32) -> Self {
        Self {
            max_requests,
            window_seconds,
        }
    }

    /// Requests per minute.
    #[must_use]
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, 60)
    }

    fn window(&self) -> Duration {
        Duration::seconds(i64::from(self.window_seconds))
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::per_minute(10)
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed; `remaining` more fit in the current window.
    Allowed { remaining: u32 },
    /// Rate limit exceeded until the window resets.
    Exceeded { retry_after: Duration },
}

impl RateLimitResult {
    /// Returns true if the request is allowed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Whole seconds until the window resets, rounded up, if exceeded.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::Allowed { .. } => None,
            Self::Exceeded { retry_after } => {
                let millis = u64::try_from(retry_after.num_milliseconds()).unwrap_or(0);
                Some(millis.div_ceil(1000))
            }
        }
    }
}

#[derive(Debug, Clone)]
struct WindowState {
    count: u32,
    window_start: DateTime<Utc>,
}

/// A fixed-window rate limiter shared between clones.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Arc<Mutex<HashMap<String, WindowState>>>,
}

impl RateLimiter {
    /// Creates a new rate limiter with the given configuration.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, WindowState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Checks if a request is allowed for the given key.
    ///
    /// If allowed, increments the request count.
    pub fn check_and_increment(&self, key: &str) -> RateLimitResult {
        let now = Utc::now();
        let window = self.config.window();
        let mut state = self.lock();

        let entry = state.entry(key.to_string()).or_insert(WindowState {
            count: 0,
            window_start: now,
        });

        if now - entry.window_start >= window {
            entry.window_start = now;
            entry.count = 0;
        }

        let resets_at = entry.window_start + window;
        if entry.count >= self.config.max_requests {
            return RateLimitResult::Exceeded {
                retry_after: resets_at - now,
            };
        }

        entry.count += 1;
        RateLimitResult::Allowed {
            remaining: self.config.max_requests - entry.count,
        }
    }

    /// Drops windows that have already expired; returns how many.
    pub fn prune_expired(&self) -> usize {
        let now = Utc::now();
        let window = self.config.window();
        let mut state = self.lock();
        let before = state.len();
        state.retain(|_, entry| now - entry.window_start < window);
        before - state.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_allows_under_limit() {
        let limiter = RateLimiter::new(RateLimitConfig::new(3, 60));

        for expected in [2, 1, 0] {
            assert_eq!(
                limiter.check_and_increment("user"),
                RateLimitResult::Allowed {
                    remaining: expected
                }
            );
        }
    }

    #[test]
    fn rate_limit_blocks_over_limit() {
        let limiter = RateLimiter::new(RateLimitConfig::new(2, 60));
        limiter.check_and_increment("user");
        limiter.check_and_increment("user");

        let result = limiter.check_and_increment("user");
        assert!(!result.is_allowed());
        let secs = result.retry_after_secs().expect("retry hint");
        assert!((1..=60).contains(&secs));
    }

    #[test]
    fn rate_limit_per_key_isolation() {
        let limiter = RateLimiter::new(RateLimitConfig::new(1, 60));
        limiter.check_and_increment("alice");

        assert!(!limiter.check_and_increment("alice").is_allowed());
        assert!(limiter.check_and_increment("bob").is_allowed());
    }

    #[test]
    fn allowed_requests_have_no_retry_hint() {
        let limiter = RateLimiter::new(RateLimitConfig::per_minute(5));
        assert_eq!(limiter.check_and_increment("user").retry_after_secs(), None);
    }

    #[test]
    fn zero_second_window_always_resets() {
        let limiter = RateLimiter::new(RateLimitConfig::new(1, 0));
        assert!(limiter.check_and_increment("user").is_allowed());
        assert!(limiter.check_and_increment("user").is_allowed());
        assert_eq!(limiter.prune_expired(), 1);
    }

    #[test]
    fn clones_share_state() {
        let limiter = RateLimiter::new(RateLimitConfig::new(1, 60));
        let clone = limiter.clone();
        limiter.check_and_increment("user");
        assert!(!clone.check_and_increment("user").is_allowed());
        assert_eq!(clone.prune_expired(), 0);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: RateLimitConfig =
            serde_json::from_str(r#"{"max_requests": 3}"#).expect("config");
        assert_eq!(config, RateLimitConfig::new(3, 60));
    }
}
