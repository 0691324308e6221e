//! Inbound events and outbound responses exchanged with the transport.

use barbot_core::{EventId, Location, UserId};
use barbot_integration::ImageRequest;
use serde::{Deserialize, Serialize};

/// What the user did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// The user shared their location.
    Location { location: Location },
    NextPage,
    PrevPage,
    /// The user picked a bar from the menu.
    SelectBar { bar_id: String },
    Back,
    Start,
    Help,
}

impl EventKind {
    /// Short name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Location { .. } => "location",
            Self::NextPage => "next_page",
            Self::PrevPage => "prev_page",
            Self::SelectBar { .. } => "select_bar",
            Self::Back => "back",
            Self::Start => "start",
            Self::Help => "help",
        }
    }
}

/// An event from a chat user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub id: EventId,
    pub user_id: UserId,
    pub kind: EventKind,
}

impl InboundEvent {
    #[must_use]
    pub fn new(user_id: UserId, kind: EventKind) -> Self {
        Self {
            id: EventId::new(),
            user_id,
            kind,
        }
    }
}

/// The action behind a menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    SelectBar { bar_id: String },
    NextPage,
    PrevPage,
    Back,
    /// Ask the chat client to share the user's location.
    ShareLocation,
}

impl Action {
    /// Encodes the action as compact callback data.
    ///
    /// Returns `None` for [`Action::ShareLocation`], which is a client-side
    /// request rather than a callback.
    #[must_use]
    pub fn callback_data(&self) -> Option<String> {
        match self {
            Self::SelectBar { bar_id } => Some(format!("bar:{bar_id}")),
            Self::NextPage => Some("next".to_string()),
            Self::PrevPage => Some("prev".to_string()),
            Self::Back => Some("back".to_string()),
            Self::ShareLocation => None,
        }
    }

    /// Decodes callback data produced by [`Action::callback_data`].
    #[must_use]
    pub fn from_callback_data(data: &str) -> Option<Self> {
        match data {
            "next" => Some(Self::NextPage),
            "prev" => Some(Self::PrevPage),
            "back" => Some(Self::Back),
            _ => data
                .strip_prefix("bar:")
                .filter(|id| !id.is_empty())
                .map(|id| Self::SelectBar {
                    bar_id: id.to_string(),
                }),
        }
    }

    /// Returns the event this action produces when triggered.
    #[must_use]
    pub fn into_event_kind(self) -> Option<EventKind> {
        match self {
            Self::SelectBar { bar_id } => Some(EventKind::SelectBar { bar_id }),
            Self::NextPage => Some(EventKind::NextPage),
            Self::PrevPage => Some(EventKind::PrevPage),
            Self::Back => Some(EventKind::Back),
            Self::ShareLocation => None,
        }
    }
}

/// One menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub label: String,
    pub action: Action,
}

impl MenuItem {
    #[must_use]
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// What the transport should send back to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub text: String,
    pub image: Option<ImageRequest>,
    pub menu: Vec<MenuItem>,
    /// A location pin to send after the text.
    pub location: Option<Location>,
    /// True if the response reports a failure the user may retry.
    pub retryable: bool,
}

impl Response {
    /// Creates a text-only response.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
            menu: Vec::new(),
            location: None,
            retryable: false,
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: ImageRequest) -> Self {
        self.image = Some(image);
        self
    }

    #[must_use]
    pub fn with_menu(mut self, menu: Vec<MenuItem>) -> Self {
        self.menu = menu;
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_data_roundtrips_for_navigation() {
        for action in [
            Action::NextPage,
            Action::PrevPage,
            Action::Back,
            Action::SelectBar {
                bar_id: "the-dead-rabbit-new-york".to_string(),
            },
        ] {
            let data = action.callback_data().expect("callback action");
            assert_eq!(Action::from_callback_data(&data), Some(action));
        }
    }

    #[test]
    fn share_location_has_no_callback() {
        assert_eq!(Action::ShareLocation.callback_data(), None);
        assert_eq!(Action::ShareLocation.into_event_kind(), None);
    }

    #[test]
    fn unknown_callback_data_is_rejected() {
        assert_eq!(Action::from_callback_data("bar:"), None);
        assert_eq!(Action::from_callback_data("bar_1"), None);
        assert_eq!(Action::from_callback_data(""), None);
    }

    #[test]
    fn bar_ids_may_contain_colons() {
        assert_eq!(
            Action::from_callback_data("bar:a:b"),
            Some(Action::SelectBar {
                bar_id: "a:b".to_string()
            })
        );
    }

    #[test]
    fn event_kind_serializes_with_tag() {
        let kind = EventKind::Location {
            location: Location::new(40.0, -73.0),
        };
        let json = serde_json::to_value(&kind).expect("serialize");
        assert_eq!(json["kind"], "location");
        assert_eq!(kind.name(), "location");
    }
}
