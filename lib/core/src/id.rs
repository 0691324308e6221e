//! Strongly-typed ID types for domain entities.
//!
//! Generated IDs use ULID (Universally Unique Lexicographically Sortable
//! Identifier) format, providing both uniqueness and temporal ordering.
//! User IDs are opaque strings handed to us by the chat platform.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Macro to generate a strongly-typed ID wrapper around ULID.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Creates a new ID with a randomly generated ULID.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }
    };
}

define_id!(
    /// Identifies one search generation issued for a session.
    SearchId,
    "srch"
);

define_id!(
    /// Correlates log lines for a single inbound chat event.
    EventId,
    "evt"
);

/// Identifier of a chat user, as reported by the chat platform.
///
/// The platform identifier is trusted as-is; it is the stable key for
/// per-user session state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user ID from the platform identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the user ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_id_display_format() {
        let id = SearchId::new();
        assert!(id.to_string().starts_with("srch_"));
    }

    #[test]
    fn search_ids_are_distinct() {
        assert_ne!(SearchId::new(), SearchId::new());
    }

    #[test]
    fn user_id_from_chat_id() {
        let id = UserId::from(-100_123_i64);
        assert_eq!(id.as_str(), "-100123");
        assert_eq!(id, UserId::new("-100123"));
    }

    #[test]
    fn user_id_serializes_transparently() {
        let id = UserId::new("42");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"42\"");
    }
}
