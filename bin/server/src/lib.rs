//! barbot Telegram server.
//!
//! Wires the conversation core to the Telegram Bot API, Yelp and the
//! static map service.

pub mod bot;
pub mod config;
pub mod error;
pub mod telegram;
