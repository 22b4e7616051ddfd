//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::StrategyConfig;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Announcement source and extraction strategies
    #[serde(default)]
    pub source: SourceConfig,

    /// Title match rule
    #[serde(default)]
    pub rule: RuleConfig,

    /// Loop timing and escalation thresholds
    #[serde(default)]
    pub watch: WatchConfig,

    /// Persistent websocket side-channel
    #[serde(default)]
    pub keeper: KeeperConfig,

    /// Outbound notification settings
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration if the file exists.
    ///
    /// Returns `Ok(None)` only when there is no file; an unreadable or
    /// malformed file is an error, never silently replaced by defaults.
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(toml::from_str(&content)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.source.url)?;
        url::Url::parse(&self.source.link_base)?;
        if self.source.strategies.is_empty() {
            return Err(AppError::validation("source.strategies is empty"));
        }
        if self.rule.title_prefix.trim().is_empty() {
            return Err(AppError::validation("rule.title_prefix is empty"));
        }
        if self.watch.interval_secs == 0 {
            return Err(AppError::validation("watch.interval_secs must be > 0"));
        }
        if self.watch.backoff_base_secs == 0 {
            return Err(AppError::validation("watch.backoff_base_secs must be > 0"));
        }
        if self.watch.backoff_max_secs < self.watch.backoff_base_secs {
            return Err(AppError::validation(
                "watch.backoff_max_secs must be >= watch.backoff_base_secs",
            ));
        }
        if self.keeper.enabled {
            url::Url::parse(&self.keeper.url)?;
            if self.keeper.idle_timeout_secs == 0 {
                return Err(AppError::validation("keeper.idle_timeout_secs must be > 0"));
            }
        }
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Timeout for every fetch and notify call, in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// HTTP method used against the source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
}

/// Where and how announcements are fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Endpoint URL
    #[serde(default = "defaults::source_url")]
    pub url: String,

    #[serde(default)]
    pub method: HttpMethod,

    /// Static request headers
    #[serde(default = "defaults::source_headers")]
    pub headers: BTreeMap<String, String>,

    /// JSON body template for POST requests
    #[serde(default = "defaults::source_body")]
    pub body: Option<serde_json::Value>,

    /// Body field (or query parameter for GET) set to the current time on
    /// every request
    #[serde(default = "defaults::nonce_field")]
    pub nonce_field: Option<String>,

    /// Base URL for resolving relative links
    #[serde(default = "defaults::link_base")]
    pub link_base: String,

    /// Extraction strategies, most specific first
    #[serde(default = "crate::models::default_strategies")]
    pub strategies: Vec<StrategyConfig>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: defaults::source_url(),
            method: HttpMethod::default(),
            headers: defaults::source_headers(),
            body: defaults::source_body(),
            nonce_field: defaults::nonce_field(),
            link_base: defaults::link_base(),
            strategies: crate::models::default_strategies(),
        }
    }
}

/// Title match rule settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Case-insensitive prefix a title must start with
    #[serde(default = "defaults::title_prefix")]
    pub title_prefix: String,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            title_prefix: defaults::title_prefix(),
        }
    }
}

/// Loop timing and escalation thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Delay between successful cycles
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,

    /// First backoff delay after a failed fetch
    #[serde(default = "defaults::backoff_base")]
    pub backoff_base_secs: u64,

    /// Upper bound for any backoff delay
    #[serde(default = "defaults::backoff_max")]
    pub backoff_max_secs: u64,

    /// Multiplier applied when upstream answered with an error status
    #[serde(default = "defaults::upstream_backoff_factor")]
    pub upstream_backoff_factor: u32,

    /// How long an in-flight cycle may run after a stop request
    #[serde(default = "defaults::shutdown_grace")]
    pub shutdown_grace_secs: u64,

    /// Consecutive fetch failures before operators are alerted
    #[serde(default = "defaults::failure_alert_threshold")]
    pub failure_alert_threshold: u32,

    /// Consecutive empty extractions before operators are alerted
    #[serde(default = "defaults::ambiguity_threshold")]
    pub ambiguity_threshold: u32,
}

impl WatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
            backoff_base_secs: defaults::backoff_base(),
            backoff_max_secs: defaults::backoff_max(),
            upstream_backoff_factor: defaults::upstream_backoff_factor(),
            shutdown_grace_secs: defaults::shutdown_grace(),
            failure_alert_threshold: defaults::failure_alert_threshold(),
            ambiguity_threshold: defaults::ambiguity_threshold(),
        }
    }
}

/// Persistent websocket side-channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// Drive cycles from the keeper instead of a plain timer
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "defaults::keeper_url")]
    pub url: String,

    /// Message sent right after connecting
    #[serde(default = "defaults::subscribe_message")]
    pub subscribe_message: Option<serde_json::Value>,

    /// Text keepalive sent when the connection has been idle too long
    #[serde(default = "defaults::ping_message")]
    pub ping_message: String,

    #[serde(default = "defaults::idle_timeout")]
    pub idle_timeout_secs: u64,

    #[serde(default = "defaults::reconnect_delay")]
    pub reconnect_delay_secs: u64,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: defaults::keeper_url(),
            subscribe_message: defaults::subscribe_message(),
            ping_message: defaults::ping_message(),
            idle_timeout_secs: defaults::idle_timeout(),
            reconnect_delay_secs: defaults::reconnect_delay(),
        }
    }
}

/// Outbound notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Telegram Bot API base URL
    #[serde(default = "defaults::telegram_api")]
    pub api_base: String,

    /// Send messages with light HTML markup
    #[serde(default = "defaults::enabled")]
    pub html: bool,

    #[serde(default = "defaults::enabled")]
    pub disable_link_preview: bool,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::telegram_api(),
            html: true,
            disable_link_preview: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is not set
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::collections::BTreeMap;

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Source defaults
    pub fn source_url() -> String {
        "https://www.binance.com/bapi/composite/v1/public/cms/article/catalog/list/query".into()
    }
    pub fn source_headers() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Accept".to_string(), "application/json".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ])
    }
    pub fn source_body() -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "catalogId": "161",
            "pageNo": 1,
            "pageSize": 20,
        }))
    }
    pub fn nonce_field() -> Option<String> {
        Some("rnd".into())
    }
    pub fn link_base() -> String {
        "https://www.binance.com/en/".into()
    }

    // Rule defaults
    pub fn title_prefix() -> String {
        "Binance Will Delist".into()
    }

    // Watch defaults
    pub fn interval() -> u64 {
        300
    }
    pub fn backoff_base() -> u64 {
        30
    }
    pub fn backoff_max() -> u64 {
        300
    }
    pub fn upstream_backoff_factor() -> u32 {
        2
    }
    pub fn shutdown_grace() -> u64 {
        10
    }
    pub fn failure_alert_threshold() -> u32 {
        5
    }
    pub fn ambiguity_threshold() -> u32 {
        10
    }

    // Keeper defaults
    pub fn keeper_url() -> String {
        "wss://stream.binance.com:9443/ws".into()
    }
    pub fn subscribe_message() -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "method": "SET_PROPERTY",
            "params": ["combined", true],
            "id": 1,
        }))
    }
    pub fn ping_message() -> String {
        r#"{"method":"PING"}"#.into()
    }
    pub fn idle_timeout() -> u64 {
        180
    }
    pub fn reconnect_delay() -> u64 {
        5
    }

    // Notifier defaults
    pub fn telegram_api() -> String {
        "https://api.telegram.org".into()
    }
    pub fn enabled() -> bool {
        true
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}
