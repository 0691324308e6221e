//! Rendering of session state into responses.

use crate::error::PageError;
use crate::event::{Action, MenuItem, Response};
use crate::ranker;
use barbot_core::{Bar, SearchResult};
use barbot_integration::{MapLinkBuilder, UpstreamError};

pub const WELCOME_MESSAGE: &str = "Welcome to BarBot. Find any bars nearby";

pub const HELP_MESSAGE: &str = "Click the button to find bars near your location. A map with all \
bars near your location is shown. Click the inline buttons to get more information about a bar";

const IDLE_MESSAGE: &str = "Share your location to find bars nearby.";

const PAGE_MESSAGE: &str = "Select one option to get more information of the bar.";

const RESET_MESSAGE: &str =
    "Something went wrong with your search. Please share your location again.";

const SHARE_LOCATION_LABEL: &str = "Bars near my location";

/// Formats a rating without decimals when it is integral.
#[must_use]
pub fn format_rating(rating: f64) -> String {
    if rating.fract() == 0.0 {
        format!("{rating:.0}")
    } else {
        format!("{rating:.1}")
    }
}

/// Renders responses for each view of a session.
#[derive(Debug, Clone)]
pub struct Renderer {
    maps: MapLinkBuilder,
    page_size: usize,
}

impl Renderer {
    #[must_use]
    pub fn new(maps: MapLinkBuilder, page_size: usize) -> Self {
        Self { maps, page_size }
    }

    fn share_location_menu() -> Vec<MenuItem> {
        vec![MenuItem::new(SHARE_LOCATION_LABEL, Action::ShareLocation)]
    }

    #[must_use]
    pub fn welcome(&self) -> Response {
        Response::text(WELCOME_MESSAGE).with_menu(Self::share_location_menu())
    }

    #[must_use]
    pub fn help(&self) -> Response {
        Response::text(HELP_MESSAGE).with_menu(Self::share_location_menu())
    }

    /// The view for a session without results.
    #[must_use]
    pub fn idle(&self) -> Response {
        Response::text(IDLE_MESSAGE).with_menu(Self::share_location_menu())
    }

    /// Tells the user their session was reset.
    #[must_use]
    pub fn session_reset(&self) -> Response {
        Response::text(RESET_MESSAGE).with_menu(Self::share_location_menu())
    }

    /// Reports a retryable upstream failure.
    #[must_use]
    pub fn upstream_error(&self, error: &UpstreamError) -> Response {
        let text = match error.retry_after_secs() {
            Some(secs) => format!(
                "I couldn't look up bars right now. Please try again in {secs} seconds."
            ),
            None => "I couldn't look up bars right now. Please share your location again in a \
                     moment."
                .to_string(),
        };
        Response::text(text)
            .with_menu(Self::share_location_menu())
            .retryable()
    }

    /// Renders one page of a ranked result with its map.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::InvalidPage`] if the page is outside the result.
    pub fn page(&self, result: &SearchResult, page_index: usize) -> Result<Response, PageError> {
        let bars = ranker::paginate(&result.bars, page_index, self.page_size)?;
        let pages = ranker::page_count(result.len(), self.page_size);

        let mut text = PAGE_MESSAGE.to_string();
        if pages > 1 {
            text.push_str(&format!("\nPage {}/{pages}", page_index + 1));
        }

        let mut menu: Vec<MenuItem> = bars
            .iter()
            .enumerate()
            .map(|(index, bar)| {
                let label = MapLinkBuilder::label(index)
                    .map_or_else(|| (index + 1).to_string(), String::from);
                MenuItem::new(
                    format!("{label}. {} ⭐ {}", bar.name, format_rating(bar.rating)),
                    Action::SelectBar {
                        bar_id: bar.id.clone(),
                    },
                )
            })
            .collect();
        if page_index > 0 {
            menu.push(MenuItem::new("« Previous", Action::PrevPage));
        }
        if page_index + 1 < pages {
            menu.push(MenuItem::new("Next »", Action::NextPage));
        }

        Ok(Response::text(text)
            .with_image(self.maps.build(bars, result.origin))
            .with_menu(menu))
    }

    /// Renders the detail view for one bar.
    #[must_use]
    pub fn detail(&self, bar: &Bar) -> Response {
        let mut text = format!(
            "{}\n⭐ {} · {:.0} m away",
            bar.name,
            format_rating(bar.rating),
            bar.distance_meters
        );
        if let Some(phone) = &bar.phone {
            text.push_str(&format!("\n☎️ {phone}"));
        }
        if !bar.address.is_empty() {
            text.push('\n');
            text.push_str(&bar.address);
        }
        if !bar.categories.is_empty() {
            let categories: Vec<&str> = bar.categories.iter().map(String::as_str).collect();
            text.push_str(&format!("\n{}", categories.join(", ")));
        }

        Response::text(text)
            .with_image(self.maps.build_single(bar))
            .with_menu(vec![MenuItem::new("« Back to list", Action::Back)])
            .with_location(bar.coordinates)
    }
}
