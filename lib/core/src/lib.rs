//! Core domain types and utilities for barbot.
//!
//! This crate provides the foundational types, error handling, and shared
//! data model used by the search integrations, the conversation core and
//! the chat transport.

pub mod error;
pub mod id;
pub mod model;

pub use error::Result;
pub use id::{EventId, SearchId, UserId};
pub use model::{Bar, Location, SearchResult};
