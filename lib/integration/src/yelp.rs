//! Yelp Fusion business-search client.

use crate::error::UpstreamError;
use crate::search::{SearchClient, SearchQuery};
use async_trait::async_trait;
use barbot_core::{Bar, Location, SearchResult};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Yelp API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct YelpConfig {
    /// Fusion API key, sent as a bearer token.
    pub api_key: String,

    /// Base URL of the Fusion API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    "https://api.yelp.com/v3".to_string()
}

/// Search client backed by the Yelp Fusion `businesses/search` endpoint.
#[derive(Debug, Clone)]
pub struct YelpClient {
    http: reqwest::Client,
    config: YelpConfig,
}

impl YelpClient {
    /// Creates a client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: YelpConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, config })
    }

    fn search_url(&self) -> String {
        format!(
            "{}/businesses/search",
            self.config.api_base.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl SearchClient for YelpClient {
    #[instrument(skip(self, query), fields(search_id = %query.id, location = %query.location))]
    async fn search(&self, query: &SearchQuery) -> Result<SearchResult, UpstreamError> {
        let response = self
            .http
            .get(self.search_url())
            .bearer_auth(&self.config.api_key)
            .query(&[
                ("latitude", query.location.latitude.to_string()),
                ("longitude", query.location.longitude.to_string()),
                ("radius", query.radius_meters.to_string()),
                ("categories", query.categories_param()),
                ("limit", query.limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "yelp search request failed");
                if e.is_timeout() {
                    UpstreamError::timed_out()
                } else {
                    UpstreamError::unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok());
            let err = classify_status(status, retry_after);
            warn!(status = %status, error = %err, "yelp search returned error status");
            return Err(err);
        }

        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::unavailable(format!("failed to read body: {e}")))?;

        let result = parse_search_response(query, &body)?;
        debug!(bars = result.len(), "yelp search succeeded");
        Ok(result)
    }
}

/// Maps a non-success HTTP status to an upstream error.
#[must_use]
pub fn classify_status(status: StatusCode, retry_after_secs: Option<u64>) -> UpstreamError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        UpstreamError::Unavailable {
            reason: "rate limited by provider".to_string(),
            retry_after_secs,
        }
    } else if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        UpstreamError::Unavailable {
            reason: format!("provider returned {status}"),
            retry_after_secs,
        }
    } else {
        UpstreamError::bad_response(format!("provider returned {status}"))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    businesses: Option<Vec<Business>>,
}

#[derive(Debug, Deserialize)]
struct Business {
    id: String,
    name: String,
    #[serde(default)]
    rating: f64,
    #[serde(default)]
    distance: f64,
    coordinates: Option<Coordinates>,
    location: Option<BusinessLocation>,
    #[serde(default)]
    display_phone: Option<String>,
    #[serde(default)]
    categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct Coordinates {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BusinessLocation {
    #[serde(default)]
    display_address: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Category {
    title: String,
}

impl Business {
    fn into_bar(self) -> Option<Bar> {
        let coordinates = self.coordinates?;
        let location = Location::new(coordinates.latitude?, coordinates.longitude?);
        if !location.is_valid() {
            return None;
        }

        Some(Bar {
            id: self.id,
            name: self.name,
            coordinates: location,
            rating: self.rating,
            distance_meters: self.distance,
            address: self
                .location
                .map(|l| l.display_address.join("\n"))
                .unwrap_or_default(),
            phone: self.display_phone.filter(|phone| !phone.trim().is_empty()),
            categories: self.categories.into_iter().map(|c| c.title).collect(),
        })
    }
}

/// Parses a `businesses/search` response body into a search result.
///
/// # Errors
///
/// Returns [`UpstreamError::BadResponse`] if the body is not valid JSON,
/// has no `businesses` array, or yields no usable bars.
pub fn parse_search_response(
    query: &SearchQuery,
    body: &str,
) -> Result<SearchResult, UpstreamError> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| UpstreamError::bad_response(format!("invalid JSON: {e}")))?;

    let businesses = response
        .businesses
        .ok_or_else(|| UpstreamError::bad_response("missing businesses"))?;

    let mut seen = HashSet::new();
    let mut bars = Vec::with_capacity(businesses.len());
    for business in businesses {
        let id = business.id.clone();
        let Some(bar) = business.into_bar() else {
            warn!(business_id = %id, "skipping business without usable coordinates");
            continue;
        };
        if !seen.insert(bar.id.clone()) {
            warn!(business_id = %bar.id, "skipping duplicate business");
            continue;
        }
        bars.push(bar);
    }

    if bars.is_empty() {
        return Err(UpstreamError::bad_response("no bars in response"));
    }

    Ok(SearchResult::new(query.id, query.location, bars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn query() -> SearchQuery {
        SearchQuery::new(
            Location::new(40.0, -73.0),
            1000,
            BTreeSet::from(["bars".to_string()]),
        )
    }

    const BODY: &str = r#"{
        "total": 2,
        "businesses": [
            {
                "id": "dead-rabbit",
                "name": "The Dead Rabbit",
                "rating": 4.5,
                "distance": 210.4,
                "coordinates": {"latitude": 40.7033, "longitude": -74.0109},
                "location": {"display_address": ["30 Water St", "New York, NY 10004"]},
                "display_phone": "(646) 422-7906",
                "categories": [
                    {"alias": "pubs", "title": "Pubs"},
                    {"alias": "cocktailbars", "title": "Cocktail Bars"}
                ]
            },
            {
                "id": "no-phone",
                "name": "Quiet Corner",
                "rating": 4.0,
                "distance": 90.0,
                "coordinates": {"latitude": 40.7, "longitude": -74.0},
                "location": {"display_address": ["1 Side St"]},
                "display_phone": "",
                "categories": []
            }
        ]
    }"#;

    #[test]
    fn parses_businesses_into_bars() {
        let query = query();
        let result = parse_search_response(&query, BODY).expect("parse");

        assert_eq!(result.id, query.id);
        assert_eq!(result.origin, query.location);
        assert_eq!(result.len(), 2);

        let rabbit = result.bar("dead-rabbit").expect("bar present");
        assert_eq!(rabbit.name, "The Dead Rabbit");
        assert_eq!(rabbit.rating, 4.5);
        assert_eq!(rabbit.address, "30 Water St\nNew York, NY 10004");
        assert_eq!(rabbit.phone.as_deref(), Some("(646) 422-7906"));
        assert!(rabbit.categories.contains("Cocktail Bars"));

        let quiet = result.bar("no-phone").expect("bar present");
        assert_eq!(quiet.phone, None);
        assert!(quiet.categories.is_empty());
    }

    #[test]
    fn missing_businesses_is_bad_response() {
        let err = parse_search_response(&query(), r#"{"error": {"code": "X"}}"#).unwrap_err();
        assert!(matches!(err, UpstreamError::BadResponse { .. }));
    }

    #[test]
    fn empty_businesses_is_bad_response() {
        let err = parse_search_response(&query(), r#"{"businesses": []}"#).unwrap_err();
        assert!(matches!(err, UpstreamError::BadResponse { .. }));
    }

    #[test]
    fn invalid_json_is_bad_response() {
        let err = parse_search_response(&query(), "<html>oops</html>").unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn skips_businesses_without_coordinates_and_duplicates() {
        let body = r#"{"businesses": [
            {"id": "a", "name": "A", "rating": 3.0, "distance": 1.0,
             "coordinates": {"latitude": null, "longitude": null}},
            {"id": "b", "name": "B", "rating": 3.0, "distance": 1.0,
             "coordinates": {"latitude": 1.0, "longitude": 1.0}},
            {"id": "b", "name": "B again", "rating": 5.0, "distance": 1.0,
             "coordinates": {"latitude": 1.0, "longitude": 1.0}}
        ]}"#;

        let result = parse_search_response(&query(), body).expect("parse");
        assert_eq!(result.len(), 1);
        assert_eq!(result.bars[0].name, "B");
    }

    #[test]
    fn status_classification() {
        let limited = classify_status(StatusCode::TOO_MANY_REQUESTS, Some(12));
        assert!(limited.is_unavailable());
        assert_eq!(limited.retry_after_secs(), Some(12));

        assert!(classify_status(StatusCode::BAD_GATEWAY, None).is_unavailable());
        assert!(classify_status(StatusCode::REQUEST_TIMEOUT, None).is_unavailable());
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, None),
            UpstreamError::BadResponse { .. }
        ));
    }

    #[test]
    fn search_url_trims_trailing_slash() {
        let client = YelpClient::new(
            YelpConfig {
                api_key: "key".to_string(),
                api_base: "http://localhost:8080/v3/".to_string(),
            },
            Duration::from_secs(1),
        )
        .expect("client");
        assert_eq!(client.search_url(), "http://localhost:8080/v3/businesses/search");
    }
}
