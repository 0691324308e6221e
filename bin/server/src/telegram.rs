//! Telegram Bot API transport.
//!
//! Translates Bot API updates into inbound events and responses into Bot
//! API requests. The mapping functions are pure; [`TelegramClient`] only
//! performs the HTTP calls.

use crate::config::TelegramConfig;
use crate::error::TransportError;
use barbot_conversation::{Action, EventKind, InboundEvent, Response};
use barbot_core::{Location, Result, UserId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Telegram rejects callback data longer than this many bytes.
const MAX_CALLBACK_DATA_BYTES: usize = 64;

/// Extra time allowed for a long poll beyond its server-side timeout.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// An incoming update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub location: Option<SharedLocation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SharedLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

/// An update resolved to the chat it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Chat the responses go to.
    pub chat_id: i64,
    /// Callback query to acknowledge, if the update was a button press.
    pub callback_query_id: Option<String>,
    /// The event for the dispatcher; `None` if the update means nothing to us.
    pub event: Option<InboundEvent>,
}

/// Maps an update to a delivery.
///
/// Returns `None` for updates without a chat to answer in.
#[must_use]
pub fn delivery_from_update(update: Update) -> Option<Delivery> {
    if let Some(query) = update.callback_query {
        let chat_id = query.message.as_ref().map(|m| m.chat.id)?;
        let event = query
            .data
            .as_deref()
            .and_then(Action::from_callback_data)
            .and_then(Action::into_event_kind)
            .map(|kind| InboundEvent::new(UserId::from(query.from.id), kind));
        return Some(Delivery {
            chat_id,
            callback_query_id: Some(query.id),
            event,
        });
    }

    let message = update.message?;
    let user_id = UserId::from(message.from.as_ref().map_or(message.chat.id, |u| u.id));
    let kind = if let Some(shared) = message.location {
        Some(EventKind::Location {
            location: Location::new(shared.latitude, shared.longitude),
        })
    } else {
        message.text.as_deref().and_then(command)
    };

    Some(Delivery {
        chat_id: message.chat.id,
        callback_query_id: None,
        event: kind.map(|kind| InboundEvent::new(user_id, kind)),
    })
}

/// Recognizes `/start` and `/help`, with or without a bot mention.
fn command(text: &str) -> Option<EventKind> {
    let text = text.trim().to_lowercase();
    let name = text.split_whitespace().next()?;
    let name = name.split('@').next().unwrap_or(name);
    match name {
        "/start" => Some(EventKind::Start),
        "/help" => Some(EventKind::Help),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
    pub request_location: bool,
}

/// Keyboard attached to a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline {
        inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
    },
    Keyboard {
        keyboard: Vec<Vec<KeyboardButton>>,
        resize_keyboard: bool,
        one_time_keyboard: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendPhoto {
    pub chat_id: i64,
    /// URL Telegram fetches the image from.
    pub photo: String,
    pub caption: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendLocation {
    pub chat_id: i64,
    pub latitude: f64,
    pub longitude: f64,
}

/// One Bot API call that delivers part of a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message(SendMessage),
    Photo(SendPhoto),
    Location(SendLocation),
}

impl Outbound {
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Message(_) => "sendMessage",
            Self::Photo(_) => "sendPhoto",
            Self::Location(_) => "sendLocation",
        }
    }
}

/// Builds the keyboard for a response menu.
///
/// Callback actions become an inline keyboard with one bar per row and the
/// page buttons sharing the last row. A menu with only a location request
/// becomes a one-time reply keyboard.
#[must_use]
pub fn reply_markup(response: &Response) -> Option<ReplyMarkup> {
    let mut rows = Vec::new();
    let mut navigation = Vec::new();
    let mut share_location = None;

    for item in &response.menu {
        let Some(data) = item.action.callback_data() else {
            share_location.get_or_insert(item.label.clone());
            continue;
        };
        if data.len() > MAX_CALLBACK_DATA_BYTES {
            warn!(label = %item.label, "dropping button with oversized callback data");
            continue;
        }
        let button = InlineKeyboardButton {
            text: item.label.clone(),
            callback_data: data,
        };
        match item.action {
            Action::NextPage | Action::PrevPage => navigation.push(button),
            _ => rows.push(vec![button]),
        }
    }
    if !navigation.is_empty() {
        rows.push(navigation);
    }

    if !rows.is_empty() {
        return Some(ReplyMarkup::Inline {
            inline_keyboard: rows,
        });
    }
    share_location.map(|text| ReplyMarkup::Keyboard {
        keyboard: vec![vec![KeyboardButton {
            text,
            request_location: true,
        }]],
        resize_keyboard: true,
        one_time_keyboard: true,
    })
}

/// Turns a response into the Bot API calls that deliver it, in order.
#[must_use]
pub fn outbound_requests(chat_id: i64, response: &Response) -> Vec<Outbound> {
    let reply_markup = reply_markup(response);
    let mut requests = vec![match &response.image {
        Some(image) => Outbound::Photo(SendPhoto {
            chat_id,
            photo: image.url.clone(),
            caption: response.text.clone(),
            reply_markup,
        }),
        None => Outbound::Message(SendMessage {
            chat_id,
            text: response.text.clone(),
            reply_markup,
        }),
    }];
    if let Some(location) = response.location {
        requests.push(Outbound::Location(SendLocation {
            chat_id,
            latitude: location.latitude,
            longitude: location.longitude,
        }));
    }
    requests
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
    allowed_updates: &'static [&'static str],
}

#[derive(Debug, Serialize)]
struct AnswerCallbackQuery<'a> {
    callback_query_id: &'a str,
}

/// Bot API client.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    poll_timeout: Duration,
}

impl TelegramClient {
    /// Creates a client for the configured bot.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &TelegramConfig) -> std::result::Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.poll_timeout() + POLL_GRACE)
            .build()?;
        Ok(Self {
            http,
            base_url: format!(
                "{}/bot{}",
                config.api_base.trim_end_matches('/'),
                config.token
            ),
            poll_timeout: config.poll_timeout(),
        })
    }

    async fn call<P, T>(&self, method: &'static str, params: &P) -> Result<T, TransportError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .json(params)
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed {
                method,
                details: e.without_url().to_string(),
            })?;

        let envelope: Envelope<T> =
            response
                .json()
                .await
                .map_err(|e| TransportError::InvalidResponse {
                    method,
                    details: e.without_url().to_string(),
                })?;

        match envelope {
            Envelope {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            Envelope { description, .. } => Err(TransportError::Rejected {
                method,
                description: description.unwrap_or_else(|| "no description".to_string()),
            }
            .into()),
        }
    }

    /// Long-polls for updates after `offset`.
    #[instrument(skip(self))]
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TransportError> {
        let params = GetUpdates {
            offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: &["message", "callback_query"],
        };
        let updates: Vec<Update> = self.call("getUpdates", &params).await?;
        if !updates.is_empty() {
            debug!(count = updates.len(), "received updates");
        }
        Ok(updates)
    }

    /// Performs one outbound request.
    pub async fn send(&self, request: &Outbound) -> Result<(), TransportError> {
        let method = request.method();
        let _: serde_json::Value = match request {
            Outbound::Message(params) => self.call(method, params).await?,
            Outbound::Photo(params) => self.call(method, params).await?,
            Outbound::Location(params) => self.call(method, params).await?,
        };
        Ok(())
    }

    /// Stops the client's loading indicator for a button press.
    pub async fn answer_callback_query(&self, id: &str) -> Result<(), TransportError> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &AnswerCallbackQuery {
                    callback_query_id: id,
                },
            )
            .await?;
        Ok(())
    }
}
