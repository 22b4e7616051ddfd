//! Announcement source reader.
//!
//! Fetches the configured endpoint and hands the body to the strategy chain.
//! Transport failures, error statuses and undecodable bodies are reported as
//! distinct [`FetchErrorKind`](crate::error::FetchErrorKind)s so the watch loop can back off accordingly.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use url::Url;

use crate::error::{AppError, FetchError, Result};
use crate::models::{HttpMethod, SourceConfig};
use crate::services::strategies::{Extraction, StrategyChain};
use crate::utils::http::retry_after;

/// Anything that can produce candidate announcement items.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Fetch the source and extract items, reporting which strategy won.
    ///
    /// An empty extraction means "nothing published right now", not an error.
    async fn fetch(&self, source: &SourceConfig) -> std::result::Result<Extraction, FetchError>;
}

/// Source reader backed by an HTTP endpoint.
pub struct HttpSourceReader {
    client: Client,
    chain: StrategyChain,
    link_base: Url,
}

impl HttpSourceReader {
    /// Create a reader for the given source, compiling its strategy chain.
    pub fn new(client: Client, source: &SourceConfig) -> Result<Self> {
        let chain = StrategyChain::from_config(&source.strategies)?;
        if chain.is_empty() {
            return Err(AppError::validation("source has no extraction strategies"));
        }
        Ok(Self {
            client,
            chain,
            link_base: Url::parse(&source.link_base)?,
        })
    }

    fn build_request(&self, source: &SourceConfig) -> RequestBuilder {
        let nonce = current_nonce();
        let request = match source.method {
            HttpMethod::Get => {
                let mut request = self.client.get(&source.url);
                if let Some(field) = &source.nonce_field {
                    request = request.query(&[(field.as_str(), nonce.to_string())]);
                }
                request
            }
            HttpMethod::Post => {
                let body = request_body(source.body.as_ref(), source.nonce_field.as_deref(), nonce);
                self.client.post(&source.url).json(&body)
            }
        };

        request.headers(header_map(source))
    }
}

#[async_trait]
impl SourceReader for HttpSourceReader {
    async fn fetch(&self, source: &SourceConfig) -> std::result::Result<Extraction, FetchError> {
        let response = self
            .build_request(source)
            .send()
            .await
            .map_err(FetchError::network)?;

        let status = response.status();
        if !status.is_success() {
            let hint = retry_after(response.headers());
            return Err(FetchError::upstream(status.as_u16(), hint));
        }

        let bytes = response.bytes().await.map_err(FetchError::network)?;
        let body = String::from_utf8(bytes.to_vec()).map_err(FetchError::parse)?;

        let extraction = self.chain.extract(&body, &self.link_base);
        match &extraction.strategy {
            Some(name) => log::debug!(
                "Fetched {} bytes, strategy '{}' produced {} item(s)",
                body.len(),
                name,
                extraction.items.len()
            ),
            None => log::debug!(
                "Fetched {} bytes, no strategy of {} produced items",
                body.len(),
                self.chain.len()
            ),
        }
        Ok(extraction)
    }
}

/// Static headers from config. Entries replace any header set by the
/// builder, so a configured `Content-Type` does not duplicate the JSON one.
fn header_map(source: &SourceConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in &source.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => log::warn!("Skipping invalid header '{}: {}'", name, value),
        }
    }
    headers
}

/// Millisecond timestamp; strictly changes between requests made more than
/// a millisecond apart.
fn current_nonce() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Fill the body template, stamping the nonce field when configured.
fn request_body(template: Option<&Value>, nonce_field: Option<&str>, nonce: u128) -> Value {
    let mut body = template
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()));
    if let (Some(field), Value::Object(map)) = (nonce_field, &mut body) {
        map.insert(field.to_string(), Value::from(nonce as u64));
    }
    body
}
