// src/error.rs

//! Unified error handling for the watcher.
//!
//! `AppError` covers everything that can go wrong before the watch loop
//! starts (configuration, credentials, selector compilation). Errors raised
//! while the loop is running are modelled separately by [`FetchError`] and
//! [`NotifyError`] so the loop can decide how to recover from each.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error (missing credentials, unusable settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Category of a failed fetch. The backoff policy treats each differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// Timeout, DNS failure, connection reset, truncated body.
    Network,
    /// Upstream answered with a non-success status (rate limit, 5xx, ...).
    UpstreamStatus,
    /// Upstream answered but the body could not be decoded.
    Parse,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchErrorKind::Network => "network",
            FetchErrorKind::UpstreamStatus => "upstream status",
            FetchErrorKind::Parse => "parse",
        };
        f.write_str(s)
    }
}

/// Error returned by a source reader.
#[derive(Error, Debug, Clone)]
#[error("{kind} error: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    /// HTTP status, set for `UpstreamStatus`.
    pub status: Option<u16>,
    /// Server-provided `Retry-After` hint.
    pub retry_after: Option<Duration>,
    pub message: String,
}

impl FetchError {
    pub fn network(message: impl fmt::Display) -> Self {
        Self {
            kind: FetchErrorKind::Network,
            status: None,
            retry_after: None,
            message: message.to_string(),
        }
    }

    pub fn upstream(status: u16, retry_after: Option<Duration>) -> Self {
        Self {
            kind: FetchErrorKind::UpstreamStatus,
            status: Some(status),
            retry_after,
            message: format!("upstream responded with status {status}"),
        }
    }

    pub fn parse(message: impl fmt::Display) -> Self {
        Self {
            kind: FetchErrorKind::Parse,
            status: None,
            retry_after: None,
            message: message.to_string(),
        }
    }
}

/// Error returned by a notifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// Worth retrying: timeouts, rate limits, 5xx.
    #[error("transient delivery failure: {0}")]
    Transient(String),

    /// Retrying cannot help: rejected message, bad credentials.
    #[error("permanent delivery failure: {0}")]
    Permanent(String),
}

impl NotifyError {
    pub fn is_transient(&self) -> bool {
        matches!(self, NotifyError::Transient(_))
    }
}
