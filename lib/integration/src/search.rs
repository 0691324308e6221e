//! The business-search seam.
//!
//! Every search provider implements [`SearchClient`]; the conversation core
//! only ever talks to the trait.

use crate::error::UpstreamError;
use async_trait::async_trait;
use barbot_core::{Location, SearchId, SearchResult};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Largest radius, in meters, accepted by the search provider.
pub const MAX_RADIUS_METERS: u32 = 40_000;

/// Largest number of results the provider returns for one query.
pub const MAX_RESULT_LIMIT: u32 = 50;

/// A location + radius + category query.
///
/// Each query is one search generation; the result it produces carries
/// the same [`SearchId`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub id: SearchId,
    pub location: Location,
    pub radius_meters: u32,
    pub categories: BTreeSet<String>,
    pub limit: u32,
}

impl SearchQuery {
    /// Creates a query, clamping the radius into `[1, MAX_RADIUS_METERS]`.
    #[must_use]
    pub fn new(location: Location, radius_meters: u32, categories: BTreeSet<String>) -> Self {
        Self {
            id: SearchId::new(),
            location,
            radius_meters: clamp_radius(radius_meters),
            categories,
            limit: MAX_RESULT_LIMIT,
        }
    }

    /// Sets the result limit, clamped into `[1, MAX_RESULT_LIMIT]`.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.clamp(1, MAX_RESULT_LIMIT);
        self
    }

    /// Returns the categories as the comma separated list providers expect.
    #[must_use]
    pub fn categories_param(&self) -> String {
        self.categories
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Clamps a radius into the range the provider accepts.
#[must_use]
pub fn clamp_radius(radius_meters: u32) -> u32 {
    radius_meters.clamp(1, MAX_RADIUS_METERS)
}

/// Trait for business-search providers.
///
/// Implementations hold no per-user state and must be safe to call
/// concurrently.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Searches for businesses around a location.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Unavailable`] on network failures, timeouts
    /// and rate limiting, and [`UpstreamError::BadResponse`] when the
    /// provider's answer is malformed or empty.
    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, UpstreamError>;
}

#[async_trait]
impl<T: SearchClient + ?Sized> SearchClient for Arc<T> {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, UpstreamError> {
        (**self).search(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_is_clamped() {
        assert_eq!(clamp_radius(0), 1);
        assert_eq!(clamp_radius(500), 500);
        assert_eq!(clamp_radius(100_000), MAX_RADIUS_METERS);
    }

    #[test]
    fn query_clamps_on_construction() {
        let query = SearchQuery::new(Location::new(0.0, 0.0), 0, BTreeSet::new());
        assert_eq!(query.radius_meters, 1);
    }

    #[test]
    fn limit_is_clamped() {
        let query = SearchQuery::new(Location::new(0.0, 0.0), 10, BTreeSet::new());
        assert_eq!(query.clone().with_limit(0).limit, 1);
        assert_eq!(query.clone().with_limit(20).limit, 20);
        assert_eq!(query.with_limit(500).limit, MAX_RESULT_LIMIT);
    }

    #[test]
    fn each_query_is_a_new_generation() {
        let a = SearchQuery::new(Location::new(0.0, 0.0), 10, BTreeSet::new());
        let b = SearchQuery::new(Location::new(0.0, 0.0), 10, BTreeSet::new());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn categories_param_is_sorted_and_joined() {
        let categories = ["pubs", "bars", "cocktailbars"]
            .into_iter()
            .map(String::from)
            .collect();
        let query = SearchQuery::new(Location::new(0.0, 0.0), 1000, categories);
        assert_eq!(query.categories_param(), "bars,cocktailbars,pubs");
    }
}
