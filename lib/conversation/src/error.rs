//! Error types for the conversation crate.
//!
//! - `PageError`: Pagination requests outside the ranked result
//! - `SessionError`: Session invariant violations
//! - `DispatchError`: Outcomes of a failed transition, each with a
//!   defined user-facing handling
//! - `ConfigError`: Invalid core configuration

use barbot_integration::UpstreamError;
use std::fmt;

/// Errors from pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    /// The page does not start within the result, or the page size is zero.
    InvalidPage {
        page_index: usize,
        page_size: usize,
        len: usize,
    },
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPage {
                page_index,
                page_size,
                len,
            } => write!(
                f,
                "invalid page {page_index} (page size {page_size}) for {len} results"
            ),
        }
    }
}

impl std::error::Error for PageError {}

/// Errors from session state checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session violates one of its invariants.
    Corrupted { reason: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted { reason } => write!(f, "session corrupted: {reason}"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Why a transition could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The upstream provider failed; the session is left unchanged.
    Upstream(UpstreamError),
    /// The event does not apply to the current state; it is ignored.
    InvalidEvent { reason: String },
    /// The session violated an invariant and must be reset.
    SessionCorrupted { reason: String },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upstream(e) => write!(f, "{e}"),
            Self::InvalidEvent { reason } => write!(f, "invalid event: {reason}"),
            Self::SessionCorrupted { reason } => write!(f, "session corrupted: {reason}"),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<UpstreamError> for DispatchError {
    fn from(e: UpstreamError) -> Self {
        Self::Upstream(e)
    }
}

impl From<SessionError> for DispatchError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Corrupted { reason } => Self::SessionCorrupted { reason },
        }
    }
}

/// Errors from configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A setting is out of its accepted range.
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { field, reason } => write!(f, "invalid setting '{field}': {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}
