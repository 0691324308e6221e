//! Core configuration.
//!
//! Loaded once at startup by the binary and handed to the dispatcher as an
//! immutable value. Every field has a default so partial configuration
//! sources deserialize cleanly.

use crate::error::ConfigError;
use barbot_integration::RateLimitConfig;
use barbot_integration::map::MAX_MARKERS;
use barbot_integration::search::MAX_RESULT_LIMIT;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;

/// Settings for the session orchestration core.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CoreConfig {
    /// Bars shown per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Inactivity, in seconds, after which a session is evicted.
    #[serde(default = "default_idle_timeout_seconds")]
    pub idle_timeout_seconds: u64,

    /// Maximum number of markers on a map image.
    #[serde(default = "default_marker_cap")]
    pub marker_cap: usize,

    /// Search radius in meters.
    #[serde(default = "default_search_radius")]
    pub search_radius_default: u32,

    /// Number of bars requested per search.
    #[serde(default = "default_result_limit")]
    pub result_limit: u32,

    /// Provider categories to search.
    #[serde(default = "default_categories")]
    pub categories: BTreeSet<String>,

    /// Deadline, in seconds, for each outbound call.
    #[serde(default = "default_upstream_timeout_seconds")]
    pub upstream_timeout_seconds: u64,

    /// Interval, in seconds, between idle session sweeps.
    #[serde(default = "default_eviction_interval_seconds")]
    pub eviction_interval_seconds: u64,

    /// Per-user limit on location searches.
    #[serde(default)]
    pub search_rate_limit: RateLimitConfig,
}

fn default_page_size() -> usize {
    6
}

fn default_idle_timeout_seconds() -> u64 {
    1200
}

fn default_marker_cap() -> usize {
    9
}

fn default_search_radius() -> u32 {
    1000
}

fn default_result_limit() -> u32 {
    20
}

fn default_categories() -> BTreeSet<String> {
    BTreeSet::from(["bars".to_string()])
}

fn default_upstream_timeout_seconds() -> u64 {
    10
}

fn default_eviction_interval_seconds() -> u64 {
    60
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            idle_timeout_seconds: default_idle_timeout_seconds(),
            marker_cap: default_marker_cap(),
            search_radius_default: default_search_radius(),
            result_limit: default_result_limit(),
            categories: default_categories(),
            upstream_timeout_seconds: default_upstream_timeout_seconds(),
            eviction_interval_seconds: default_eviction_interval_seconds(),
            search_rate_limit: RateLimitConfig::default(),
        }
    }
}

impl CoreConfig {
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    #[must_use]
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_seconds)
    }

    #[must_use]
    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_seconds)
    }

    /// Checks that every setting is within its accepted range.
    ///
    /// # Errors
    ///
    /// Returns the first setting found out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(invalid("page_size", "must be at least 1"));
        }
        if !(1..=MAX_MARKERS).contains(&self.marker_cap) {
            return Err(invalid(
                "marker_cap",
                format!("must be between 1 and {MAX_MARKERS}"),
            ));
        }
        if self.page_size > self.marker_cap {
            return Err(invalid(
                "page_size",
                format!("must not exceed marker_cap ({})", self.marker_cap),
            ));
        }
        if !(1..=MAX_RESULT_LIMIT).contains(&self.result_limit) {
            return Err(invalid(
                "result_limit",
                format!("must be between 1 and {MAX_RESULT_LIMIT}"),
            ));
        }
        if self.search_radius_default == 0 {
            return Err(invalid("search_radius_default", "must be at least 1"));
        }
        if self.categories.is_empty() {
            return Err(invalid("categories", "must not be empty"));
        }
        if self.idle_timeout_seconds == 0 {
            return Err(invalid("idle_timeout_seconds", "must be at least 1"));
        }
        if self.upstream_timeout_seconds == 0 {
            return Err(invalid("upstream_timeout_seconds", "must be at least 1"));
        }
        if self.eviction_interval_seconds == 0 {
            return Err(invalid("eviction_interval_seconds", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
