//! Upstream integrations for barbot.
//!
//! This crate provides:
//!
//! - **Search client**: The `SearchClient` trait and the Yelp Fusion client
//! - **Map links**: Static map image URLs for a page of bars
//! - **Rate limiter**: Fixed-window limits on outbound searches

pub mod error;
pub mod map;
pub mod rate_limit;
pub mod search;
pub mod yelp;

pub use error::UpstreamError;
pub use map::{ImageRequest, MapConfig, MapLinkBuilder, MapMarker};
pub use rate_limit::{RateLimitConfig, RateLimitResult, RateLimiter};
pub use search::{SearchClient, SearchQuery};
pub use yelp::{YelpClient, YelpConfig};
