//! Search data model shared by the integrations and the conversation core.

use crate::id::SearchId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A point on the map, in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Creates a location.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns true if both coordinates are finite and within range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// A bar returned by the business-search provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Provider identifier, unique within one search response.
    pub id: String,
    pub name: String,
    pub coordinates: Location,
    pub rating: f64,
    pub distance_meters: f64,
    /// Display address; multi-line addresses are newline separated.
    pub address: String,
    pub phone: Option<String>,
    pub categories: BTreeSet<String>,
}

/// The bars returned for one location query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The search generation that produced this result.
    pub id: SearchId,
    pub bars: Vec<Bar>,
    /// Where the user was when the search was issued.
    pub origin: Location,
    pub fetched_at: DateTime<Utc>,
}

impl SearchResult {
    /// Creates a result stamped with the current time.
    #[must_use]
    pub fn new(id: SearchId, origin: Location, bars: Vec<Bar>) -> Self {
        Self {
            id,
            bars,
            origin,
            fetched_at: Utc::now(),
        }
    }

    /// Looks up a bar by provider id.
    #[must_use]
    pub fn bar(&self, id: &str) -> Option<&Bar> {
        self.bars.iter().find(|bar| bar.id == id)
    }

    /// Returns true if a bar with this id is part of the result.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.bar(id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
