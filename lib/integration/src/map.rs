//! Static map image links.
//!
//! Maps are rendered by the Google Static Maps API; we only build the
//! request URL and let the chat platform fetch the image.

use barbot_core::{Bar, Location};
use serde::Deserialize;
use url::Url;

/// Labels available for markers, in order.
const MARKER_LABELS: &[u8] = b"123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Largest marker cap we can label unambiguously.
pub const MAX_MARKERS: usize = MARKER_LABELS.len();

/// Static map rendering configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    /// Endpoint of the static map service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key appended to every request, if set.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_zoom")]
    pub zoom: u8,

    #[serde(default = "default_size")]
    pub width: u16,

    #[serde(default = "default_size")]
    pub height: u16,
}

fn default_base_url() -> String {
    "https://maps.googleapis.com/maps/api/staticmap".to_string()
}

fn default_zoom() -> u8 {
    15
}

fn default_size() -> u16 {
    400
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            zoom: default_zoom(),
            width: default_size(),
            height: default_size(),
        }
    }
}

/// One labeled marker on a map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub label: char,
    pub location: Location,
}

/// A request for a static map image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub url: String,
    pub center: Location,
    pub markers: Vec<MapMarker>,
}

/// Builds static map requests with a bounded number of markers.
#[derive(Debug, Clone)]
pub struct MapLinkBuilder {
    config: MapConfig,
    marker_cap: usize,
}

impl MapLinkBuilder {
    /// Creates a builder; the cap is clamped into `[1, MAX_MARKERS]`.
    #[must_use]
    pub fn new(config: MapConfig, marker_cap: usize) -> Self {
        Self {
            config,
            marker_cap: marker_cap.clamp(1, MAX_MARKERS),
        }
    }

    #[must_use]
    pub fn marker_cap(&self) -> usize {
        self.marker_cap
    }

    /// Returns the label for the marker at `index` (0-based).
    #[must_use]
    pub fn label(index: usize) -> Option<char> {
        MARKER_LABELS.get(index).map(|&b| char::from(b))
    }

    /// Builds a map centered on the user with one marker per bar.
    ///
    /// Bars beyond the marker cap are dropped, keeping the first ones in
    /// the given order.
    #[must_use]
    pub fn build(&self, bars: &[Bar], user_location: Location) -> ImageRequest {
        let markers = bars
            .iter()
            .take(self.marker_cap)
            .enumerate()
            .filter_map(|(index, bar)| {
                Self::label(index).map(|label| MapMarker {
                    label,
                    location: bar.coordinates,
                })
            })
            .collect();
        self.request(user_location, markers)
    }

    /// Builds a map centered on a single bar.
    #[must_use]
    pub fn build_single(&self, bar: &Bar) -> ImageRequest {
        let marker = MapMarker {
            label: '1',
            location: bar.coordinates,
        };
        self.request(bar.coordinates, vec![marker])
    }

    fn request(&self, center: Location, markers: Vec<MapMarker>) -> ImageRequest {
        ImageRequest {
            url: self.url(center, &markers),
            center,
            markers,
        }
    }

    fn url(&self, center: Location, markers: &[MapMarker]) -> String {
        let Ok(mut url) = Url::parse(&self.config.base_url) else {
            // Config validation rejects this; degrade to a bare query string.
            return format!("{}?center={center}", self.config.base_url);
        };

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("center", &center.to_string())
                .append_pair("zoom", &self.config.zoom.to_string())
                .append_pair(
                    "size",
                    &format!("{}x{}", self.config.width, self.config.height),
                )
                .append_pair("maptype", "roadmap")
                .append_pair("scale", "1");
            for marker in markers {
                query.append_pair(
                    "markers",
                    &format!("label:{}|{}", marker.label, marker.location),
                );
            }
            if let Some(key) = &self.config.api_key {
                query.append_pair("key", key);
            }
        }

        url.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn bar(id: &str, lat: f64, lon: f64) -> Bar {
        Bar {
            id: id.to_string(),
            name: id.to_string(),
            coordinates: Location::new(lat, lon),
            rating: 4.0,
            distance_meters: 10.0,
            address: String::new(),
            phone: None,
            categories: BTreeSet::new(),
        }
    }

    #[test]
    fn builds_markers_in_order() {
        let builder = MapLinkBuilder::new(MapConfig::default(), 9);
        let bars = vec![bar("a", 40.1, -73.1), bar("b", 40.2, -73.2)];

        let image = builder.build(&bars, Location::new(40.0, -73.0));

        assert_eq!(image.center, Location::new(40.0, -73.0));
        assert_eq!(image.markers.len(), 2);
        assert_eq!(image.markers[0].label, '1');
        assert_eq!(image.markers[1].location, Location::new(40.2, -73.2));
        assert!(image.url.starts_with("https://maps.googleapis.com/maps/api/staticmap?"));
        assert!(image.url.contains("center=40%2C-73"));
        assert!(image.url.contains("markers=label%3A1%7C40.1%2C-73.1"));
        assert!(!image.url.contains("key="));
    }

    #[test]
    fn drops_markers_beyond_cap() {
        let builder = MapLinkBuilder::new(MapConfig::default(), 2);
        let bars = vec![bar("a", 1.0, 1.0), bar("b", 2.0, 2.0), bar("c", 3.0, 3.0)];

        let image = builder.build(&bars, Location::new(0.0, 0.0));

        assert_eq!(image.markers.len(), 2);
        assert_eq!(image.markers[1].location, Location::new(2.0, 2.0));
        assert_eq!(image.url.matches("markers=").count(), 2);
    }

    #[test]
    fn build_is_deterministic() {
        let builder = MapLinkBuilder::new(MapConfig::default(), 9);
        let bars = vec![bar("a", 1.0, 1.0), bar("b", 2.0, 2.0)];
        let here = Location::new(0.5, 0.5);
        assert_eq!(builder.build(&bars, here), builder.build(&bars, here));
    }

    #[test]
    fn cap_is_clamped_to_labels() {
        assert_eq!(MapLinkBuilder::new(MapConfig::default(), 0).marker_cap(), 1);
        assert_eq!(
            MapLinkBuilder::new(MapConfig::default(), 100).marker_cap(),
            MAX_MARKERS
        );
    }

    #[test]
    fn labels_run_digits_then_letters() {
        assert_eq!(MapLinkBuilder::label(0), Some('1'));
        assert_eq!(MapLinkBuilder::label(8), Some('9'));
        assert_eq!(MapLinkBuilder::label(9), Some('A'));
        assert_eq!(MapLinkBuilder::label(MAX_MARKERS), None);
    }

    #[test]
    fn api_key_is_appended() {
        let config = MapConfig {
            api_key: Some("secret".to_string()),
            ..MapConfig::default()
        };
        let builder = MapLinkBuilder::new(config, 9);
        let image = builder.build_single(&bar("a", 1.0, 2.0));
        assert_eq!(image.center, Location::new(1.0, 2.0));
        assert_eq!(image.markers.len(), 1);
        assert!(image.url.ends_with("key=secret"));
    }
}
