// src/config.rs

//! Startup context.
//!
//! Everything the watcher needs is built once here (validated configuration,
//! credentials, the shared HTTP client) and handed to the components that use
//! it. Nothing is kept in globals.

use std::fmt;
use std::sync::Arc;

use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{Config, MessageFormat};
use crate::pipeline::{AlertDispatcher, WatchLoop};
use crate::services::{ConsoleNotifier, HttpSourceReader, Notifier, TelegramNotifier};
use crate::utils::http::create_async_client;

/// Environment variable holding the Telegram bot token.
pub const BOT_TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
/// Environment variable holding the destination chat id.
pub const CHAT_ID_VAR: &str = "TELEGRAM_CHAT_ID";

/// Notifier credentials. Never logged.
#[derive(Clone)]
pub struct Credentials {
    pub bot_token: String,
    pub chat_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through `lookup`; blank values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<&str> = [BOT_TOKEN_VAR, CHAT_ID_VAR]
            .into_iter()
            .filter(|&name| get(name).is_none())
            .collect();
        match (get(BOT_TOKEN_VAR), get(CHAT_ID_VAR)) {
            (Some(bot_token), Some(chat_id)) => Ok(Self { bot_token, chat_id }),
            _ => Err(AppError::config(format!(
                "missing environment variable(s): {}",
                missing.join(", ")
            ))),
        }
    }
}

/// Application context constructed once at startup.
pub struct AppContext {
    pub config: Arc<Config>,
    pub client: Client,
    credentials: Option<Credentials>,
}

impl AppContext {
    /// Validate `config` and build the shared HTTP client.
    pub fn new(config: Config, credentials: Option<Credentials>) -> Result<Self> {
        config.validate()?;
        let client = create_async_client(&config.http)?;
        Ok(Self {
            config: Arc::new(config),
            client,
            credentials,
        })
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn message_format(&self) -> MessageFormat {
        if self.config.notifier.html {
            MessageFormat::Html
        } else {
            MessageFormat::Plain
        }
    }

    /// Telegram when credentials are present, the console otherwise.
    pub fn dispatcher(&self) -> AlertDispatcher {
        let format = self.message_format();
        match &self.credentials {
            Some(creds) => {
                let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(
                    self.client.clone(),
                    &creds.bot_token,
                    &self.config.notifier,
                ));
                AlertDispatcher::new(notifier, creds.chat_id.as_str(), format)
            }
            None => AlertDispatcher::new(Arc::new(ConsoleNotifier), "console", format),
        }
    }

    pub fn source_reader(&self) -> Result<HttpSourceReader> {
        HttpSourceReader::new(self.client.clone(), &self.config.source)
    }

    /// Assemble the watch loop from this context.
    pub fn watch_loop(&self) -> Result<WatchLoop> {
        let reader = Arc::new(self.source_reader()?);
        Ok(WatchLoop::new(reader, self.dispatcher(), &self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_credentials_present() {
        let creds = Credentials::from_lookup(lookup(&[
            (BOT_TOKEN_VAR, "123:abc"),
            (CHAT_ID_VAR, "-100200"),
        ]))
        .unwrap();
        assert_eq!(creds.chat_id, "-100200");
        assert!(!format!("{creds:?}").contains("123:abc"));
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let err = Credentials::from_lookup(lookup(&[(CHAT_ID_VAR, "1"), (BOT_TOKEN_VAR, "  ")]))
            .unwrap_err();
        assert!(matches!(err, AppError::Config(ref m) if m.contains(BOT_TOKEN_VAR)));
        assert!(!err.to_string().contains(CHAT_ID_VAR));
    }

    #[test]
    fn test_context_rejects_invalid_config() {
        let mut config = Config::default();
        config.watch.interval_secs = 0;
        assert!(AppContext::new(config, None).is_err());
    }

    #[test]
    fn test_context_without_credentials_uses_console() {
        let ctx = AppContext::new(Config::default(), None).unwrap();
        assert!(ctx.credentials().is_none());
        assert_eq!(ctx.message_format(), MessageFormat::Html);
        assert!(ctx.watch_loop().is_ok());
    }
}
