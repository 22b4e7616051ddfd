//! Outbound notification channel.
//!
//! The watch loop only needs `send`. `TelegramNotifier` talks to the Bot API;
//! `ConsoleNotifier` logs messages instead and backs dry runs.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::error::NotifyError;
use crate::models::{MessageFormat, NotifierConfig};

/// Delivers text messages to a destination.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        destination: &str,
        text: &str,
        format: MessageFormat,
    ) -> Result<(), NotifyError>;
}

/// Telegram Bot API `sendMessage` client.
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
    disable_link_preview: bool,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    disable_web_page_preview: bool,
}

impl TelegramNotifier {
    /// `client` should carry the configured timeout; a timed out call is
    /// reported as a transient failure.
    pub fn new(client: Client, bot_token: &str, config: &NotifierConfig) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                bot_token
            ),
            disable_link_preview: config.disable_link_preview,
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(
        &self,
        destination: &str,
        text: &str,
        format: MessageFormat,
    ) -> Result<(), NotifyError> {
        let payload = SendMessage {
            chat_id: destination,
            text,
            parse_mode: match format {
                MessageFormat::Html => Some("HTML"),
                MessageFormat::Plain => None,
            },
            disable_web_page_preview: self.disable_link_preview,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                // Never echo the URL: it embeds the bot token.
                let e = e.without_url();
                if e.is_builder() {
                    NotifyError::Permanent(e.to_string())
                } else {
                    NotifyError::Transient(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            log::debug!("Delivered message: {}", preview(text));
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        Err(classify_status(status, &detail))
    }
}

fn classify_status(status: StatusCode, detail: &str) -> NotifyError {
    let message = format!("Telegram responded {status}: {}", preview(detail));
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        NotifyError::Transient(message)
    } else {
        NotifyError::Permanent(message)
    }
}

/// First 100 characters, for logs.
fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(100).collect();
    if text.chars().count() > 100 {
        out.push_str("...");
    }
    out
}

/// Logs messages instead of sending them.
#[derive(Debug, Default, Clone)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(
        &self,
        destination: &str,
        text: &str,
        _format: MessageFormat,
    ) -> Result<(), NotifyError> {
        log::info!("[dry-run -> {}]\n{}", destination, text);
        Ok(())
    }
}
