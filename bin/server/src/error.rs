//! Error types for the server binary.
//!
//! - `StartupError`: Failures while loading configuration or building clients
//! - `TransportError`: Failures talking to the Telegram Bot API

use std::fmt;

/// Errors that prevent the bot from starting.
#[derive(Debug)]
pub enum StartupError {
    /// Configuration could not be loaded or deserialized.
    Config { details: String },
    /// Configuration loaded but a setting is out of range.
    InvalidConfig { details: String },
    /// An HTTP client could not be built.
    Client { details: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "failed to load configuration: {details}"),
            Self::InvalidConfig { details } => write!(f, "invalid configuration: {details}"),
            Self::Client { details } => write!(f, "failed to build HTTP client: {details}"),
        }
    }
}

impl std::error::Error for StartupError {}

/// Errors from Bot API calls.
#[derive(Debug)]
pub enum TransportError {
    /// The request could not be sent or the connection failed.
    RequestFailed {
        method: &'static str,
        details: String,
    },
    /// The API answered with something other than a Bot API envelope.
    InvalidResponse {
        method: &'static str,
        details: String,
    },
    /// The API rejected the call.
    Rejected {
        method: &'static str,
        description: String,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { method, details } => {
                write!(f, "{method} request failed: {details}")
            }
            Self::InvalidResponse { method, details } => {
                write!(f, "{method} returned an invalid response: {details}")
            }
            Self::Rejected {
                method,
                description,
            } => write!(f, "{method} rejected: {description}"),
        }
    }
}

impl std::error::Error for TransportError {}
