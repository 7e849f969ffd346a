//! HTTPS client for the Bot API.
//!
//! Every method is a JSON `POST` to `{api_base_url}/bot{token}/{method}`.
//! The token stays in a `SecretString` and is redacted from every error
//! string this client produces.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use giveaway_core::log::SecretRedactor;
use giveaway_core::{ChatId, Notifier, NotifyError};
use http::Request;
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use super::types::{
    AnswerCallbackQuery, ApiResponse, GetUpdates, InlineKeyboardButton, InlineKeyboardMarkup,
    Message, SendMessage, Update, User,
};
use crate::handlers::ChatSurface;
use crate::render::OutgoingMessage;

/// Timeout for calls other than long polling and replies.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for `sendMessage` and `answerCallbackQuery`.
///
/// Updates are dispatched in sequence, so a stalled reply holds back every
/// later update until it expires.
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Slack on top of the server-side long-poll timeout.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Update kinds the bot consumes.
const ALLOWED_UPDATES: &[&str] = &["message", "callback_query"];

/// Errors from Bot API calls.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TelegramError {
    /// Could not build the request.
    #[error("failed to build request: {0}")]
    Request(String),

    /// Connection or I/O failure.
    #[error("network error: {0}")]
    Network(String),

    /// No response within the deadline.
    #[error("{method} timed out")]
    Timeout {
        /// Bot API method.
        method: &'static str,
    },

    /// Response body was not the expected JSON.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The Bot API answered `ok: false`.
    #[error("Bot API error {code}: {description}")]
    Api {
        /// Error code (mirrors the HTTP status).
        code: i64,
        /// Error description.
        description: String,
        /// Flood-control wait, if any.
        retry_after: Option<u64>,
    },
}

impl TelegramError {
    /// Flood-control wait requested by the server.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Api {
                retry_after: Some(secs),
                ..
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }

    /// Maps to the delivery error seen by the lifecycle engine.
    ///
    /// 400 and 403 concern the recipient (blocked bot, unknown chat, user
    /// never started the bot); everything else is a transport failure.
    #[must_use]
    pub fn into_notify_error(self, recipient: ChatId) -> NotifyError {
        match self {
            Self::Api {
                code: 400 | 403,
                description,
                ..
            } => NotifyError::Unreachable {
                recipient,
                reason: description,
            },
            other => NotifyError::Transport(other.to_string()),
        }
    }
}

/// Bot API client.
pub struct TelegramClient {
    api_base_url: String,
    token: SecretString,
    http: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    redactor: SecretRedactor,
}

impl TelegramClient {
    /// Creates a client for `api_base_url` authenticated by `token`.
    ///
    /// Requires a process-wide rustls crypto provider to be installed.
    #[must_use]
    pub fn new(api_base_url: &str, token: SecretString) -> Self {
        let https = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();
        let http = Client::builder(TokioExecutor::new()).build(https);
        let redactor = SecretRedactor::new().with_literal(token.expose_secret());

        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_owned(),
            token,
            http,
            redactor,
        }
    }

    /// `getMe`: the bot's own account.
    ///
    /// # Errors
    ///
    /// Returns [`TelegramError`] if the call fails.
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &serde_json::json!({}), REQUEST_TIMEOUT)
            .await
    }

    /// `getUpdates`: long-polls for new updates starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`TelegramError`] if the call fails.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        poll_timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        let params = GetUpdates {
            offset,
            timeout: poll_timeout.as_secs(),
            allowed_updates: ALLOWED_UPDATES,
        };
        self.call("getUpdates", &params, poll_timeout + POLL_GRACE)
            .await
    }

    /// `sendMessage`.
    ///
    /// # Errors
    ///
    /// Returns [`TelegramError`] if the call fails.
    pub async fn send_message(
        &self,
        chat: ChatId,
        message: &OutgoingMessage,
    ) -> Result<Message, TelegramError> {
        let reply_markup = (!message.keyboard.is_empty()).then(|| InlineKeyboardMarkup {
            inline_keyboard: message
                .keyboard
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|button| InlineKeyboardButton {
                            text: button.text.clone(),
                            callback_data: button.callback_data.clone(),
                        })
                        .collect()
                })
                .collect(),
        });
        let params = SendMessage {
            chat_id: chat.0,
            text: &message.text,
            parse_mode: message.html.then_some("HTML"),
            reply_markup,
        };
        self.call("sendMessage", &params, REPLY_TIMEOUT).await
    }

    /// `answerCallbackQuery` with an alert.
    ///
    /// # Errors
    ///
    /// Returns [`TelegramError`] if the call fails.
    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<bool, TelegramError> {
        let params = AnswerCallbackQuery {
            callback_query_id,
            text,
            show_alert: text.is_some(),
        };
        self.call("answerCallbackQuery", &params, REPLY_TIMEOUT)
            .await
    }

    async fn call<P, R>(
        &self,
        method: &'static str,
        params: &P,
        timeout: Duration,
    ) -> Result<R, TelegramError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!(
            "{}/bot{}/{method}",
            self.api_base_url,
            self.token.expose_secret()
        );
        let body =
            serde_json::to_vec(params).map_err(|e| TelegramError::Request(e.to_string()))?;

        let request = Request::builder()
            .method("POST")
            .uri(&url)
            .header("Content-Type", "application/json")
            .header(
                "User-Agent",
                concat!("giveaway-daemon/", env!("CARGO_PKG_VERSION")),
            )
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| TelegramError::Request(self.scrub(&e.to_string())))?;

        debug!(method, "calling Bot API");

        let response = tokio::time::timeout(timeout, self.http.request(request))
            .await
            .map_err(|_| TelegramError::Timeout { method })?
            .map_err(|e| TelegramError::Network(self.scrub(&e.to_string())))?;

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| TelegramError::Network(self.scrub(&e.to_string())))?
            .to_bytes();

        let parsed: ApiResponse<R> = serde_json::from_slice(&bytes)
            .map_err(|e| TelegramError::Decode(format!("HTTP {status}: {e}")))?;

        if parsed.ok {
            return parsed
                .result
                .ok_or_else(|| TelegramError::Decode(format!("{method}: missing result")));
        }

        Err(TelegramError::Api {
            code: parsed.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
            description: parsed
                .description
                .map(|d| self.scrub(&d))
                .unwrap_or_default(),
            retry_after: parsed.parameters.and_then(|p| p.retry_after),
        })
    }

    fn scrub(&self, text: &str) -> String {
        self.redactor.redact(text).into_owned()
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base_url", &self.api_base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn notify(&self, recipient: ChatId, text: &str) -> Result<(), NotifyError> {
        self.send_message(recipient, &OutgoingMessage::plain(text))
            .await
            .map(|_| ())
            .map_err(|e| e.into_notify_error(recipient))
    }
}

#[async_trait]
impl ChatSurface for TelegramClient {
    async fn send(&self, chat: ChatId, message: OutgoingMessage) -> Result<(), NotifyError> {
        self.send_message(chat, &message)
            .await
            .map(|_| ())
            .map_err(|e| e.into_notify_error(chat))
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), NotifyError> {
        self.answer_callback_query(callback_id, text)
            .await
            .map(|_| ())
            .map_err(|e| NotifyError::Transport(e.to_string()))
    }
}
