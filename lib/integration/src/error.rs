//! Error types for the integration crate.
//!
//! Upstream failures come in two flavors, both retryable from the
//! user's perspective:
//! - `Unavailable`: network failure, timeout, or rate limiting
//! - `BadResponse`: the provider answered with unusable data

use std::fmt;

/// Errors from calls to an upstream provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// The provider could not be reached in time or refused service.
    Unavailable {
        reason: String,
        /// Seconds until a retry may succeed, when the provider says so.
        retry_after_secs: Option<u64>,
    },
    /// The provider returned a malformed or empty response.
    BadResponse { reason: String },
}

impl UpstreamError {
    /// Creates an `Unavailable` error with no retry hint.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
            retry_after_secs: None,
        }
    }

    /// Creates a `BadResponse` error.
    #[must_use]
    pub fn bad_response(reason: impl Into<String>) -> Self {
        Self::BadResponse {
            reason: reason.into(),
        }
    }

    /// Creates the error reported when an outbound call exceeds its deadline.
    #[must_use]
    pub fn timed_out() -> Self {
        Self::unavailable("request timed out")
    }

    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Returns the retry hint, if any.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::Unavailable {
                retry_after_secs, ..
            } => *retry_after_secs,
            Self::BadResponse { .. } => None,
        }
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable {
                reason,
                retry_after_secs: Some(secs),
            } => write!(f, "upstream unavailable: {reason}, retry after {secs}s"),
            Self::Unavailable { reason, .. } => write!(f, "upstream unavailable: {reason}"),
            Self::BadResponse { reason } => write!(f, "upstream bad response: {reason}"),
        }
    }
}

impl std::error::Error for UpstreamError {}
