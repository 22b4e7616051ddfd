// src/services/strategies.rs

//! Extraction strategies.
//!
//! A strategy turns raw fetched content into announcement items. Strategies
//! never fail: content they do not understand simply yields no items. The
//! [`StrategyChain`] tries them in order and keeps the first non-empty result,
//! so structured strategies win over generic fallbacks and results from
//! overlapping selectors are never merged.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CssSelectors, Item, JsonFields, StrategyConfig, normalize_whitespace};
use crate::utils::{extract_announcement_id, resolve_url};

/// One way of turning raw content into items.
pub trait ExtractionStrategy: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Extract items from `raw`; relative links are resolved against `base`.
    fn extract(&self, raw: &str, base: &Url) -> Vec<Item>;
}

/// Result of running the chain over one response.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Strategy that produced the items, `None` when every strategy came up empty
    pub strategy: Option<String>,
    pub items: Vec<Item>,
}

/// Ordered list of strategies.
pub struct StrategyChain {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Build the chain from configuration, compiling every selector up front.
    pub fn from_config(configs: &[StrategyConfig]) -> Result<Self> {
        let strategies = configs
            .iter()
            .map(build_strategy)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(strategies))
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Run strategies in order until one yields items.
    pub fn extract(&self, raw: &str, base: &Url) -> Extraction {
        for strategy in &self.strategies {
            let items = strategy.extract(raw, base);
            if !items.is_empty() {
                log::debug!(
                    "Strategy '{}' extracted {} item(s)",
                    strategy.name(),
                    items.len()
                );
                return Extraction {
                    strategy: Some(strategy.name().to_string()),
                    items,
                };
            }
            log::debug!("Strategy '{}' found nothing", strategy.name());
        }
        Extraction::default()
    }
}

fn build_strategy(config: &StrategyConfig) -> Result<Box<dyn ExtractionStrategy>> {
    let strategy: Box<dyn ExtractionStrategy> = match config {
        StrategyConfig::JsonList(fields) => Box::new(JsonListStrategy::new(fields.clone())),
        StrategyConfig::EmbeddedJson {
            script_selector,
            fields,
        } => Box::new(EmbeddedJsonStrategy::new(script_selector, fields.clone())?),
        StrategyConfig::CssList(selectors) => Box::new(CssListStrategy::new(selectors)?),
        StrategyConfig::AnchorFallback { href_contains } => {
            Box::new(AnchorFallbackStrategy::new(href_contains)?)
        }
    };
    log::debug!("Compiled '{}' strategy", config.kind_name());
    Ok(strategy)
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

// --- JSON ---

/// Articles listed in a JSON API response.
pub struct JsonListStrategy {
    fields: JsonFields,
}

impl JsonListStrategy {
    pub fn new(fields: JsonFields) -> Self {
        Self { fields }
    }
}

impl ExtractionStrategy for JsonListStrategy {
    fn name(&self) -> &str {
        "json_list"
    }

    fn extract(&self, raw: &str, base: &Url) -> Vec<Item> {
        match serde_json::from_str::<Value>(raw) {
            Ok(doc) => items_from_json(&doc, &self.fields, base),
            Err(_) => Vec::new(),
        }
    }
}

/// Articles in a JSON blob embedded inside an HTML page.
pub struct EmbeddedJsonStrategy {
    script: Selector,
    fields: JsonFields,
}

impl EmbeddedJsonStrategy {
    pub fn new(script_selector: &str, fields: JsonFields) -> Result<Self> {
        Ok(Self {
            script: parse_selector(script_selector)?,
            fields,
        })
    }
}

impl ExtractionStrategy for EmbeddedJsonStrategy {
    fn name(&self) -> &str {
        "embedded_json"
    }

    fn extract(&self, raw: &str, base: &Url) -> Vec<Item> {
        let document = Html::parse_document(raw);
        document
            .select(&self.script)
            .filter_map(|el| serde_json::from_str::<Value>(&el.text().collect::<String>()).ok())
            .map(|doc| items_from_json(&doc, &self.fields, base))
            .find(|items| !items.is_empty())
            .unwrap_or_default()
    }
}

fn items_from_json(doc: &Value, fields: &JsonFields, base: &Url) -> Vec<Item> {
    let Some(articles) = fields
        .articles_pointers
        .iter()
        .filter_map(|pointer| doc.pointer(pointer).and_then(Value::as_array))
        .find(|arr| !arr.is_empty())
    else {
        return Vec::new();
    };

    articles
        .iter()
        .filter_map(|article| item_from_json(article, fields, base))
        .collect()
}

fn item_from_json(article: &Value, fields: &JsonFields, base: &Url) -> Option<Item> {
    let title = article.get(&fields.title_field)?.as_str()?;
    if normalize_whitespace(title).is_empty() {
        return None;
    }

    let id = fields
        .id_field
        .as_ref()
        .and_then(|field| article.get(field))
        .and_then(scalar_to_string);

    let link = fields
        .link_field
        .as_ref()
        .and_then(|field| article.get(field))
        .and_then(Value::as_str)
        .filter(|l| !l.trim().is_empty())
        .map(|l| resolve_url(base, l.trim()))
        .or_else(|| {
            let template = fields.link_template.as_ref()?;
            let id = id.as_ref()?;
            Some(resolve_url(base, &template.replace("{id}", id)))
        })?;

    let id = id.or_else(|| extract_announcement_id(&link));
    Some(Item::new(title, link, id.as_deref()))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// --- HTML ---

/// Announcement rows described by CSS selectors.
pub struct CssListStrategy {
    row: Selector,
    title: Selector,
    link: Option<Selector>,
    attr_name: String,
}

impl CssListStrategy {
    pub fn new(selectors: &CssSelectors) -> Result<Self> {
        Ok(Self {
            row: parse_selector(&selectors.row_selector)?,
            title: parse_selector(&selectors.title_selector)?,
            link: selectors
                .link_selector
                .as_deref()
                .map(parse_selector)
                .transpose()?,
            attr_name: selectors.attr_name.clone(),
        })
    }

    fn parse_row(&self, row: &ElementRef, base: &Url) -> Option<Item> {
        let title_elem = row.select(&self.title).next()?;
        let raw_title: String = title_elem.text().collect();
        if normalize_whitespace(&raw_title).is_empty() {
            return None;
        }

        let raw_link = self
            .link
            .as_ref()
            .and_then(|sel| row.select(sel).next())
            .and_then(|el| el.value().attr(&self.attr_name))
            .or_else(|| title_elem.value().attr(&self.attr_name))
            .or_else(|| row.value().attr(&self.attr_name))
            .map(str::trim)
            .filter(|l| !l.is_empty())?;

        let link = resolve_url(base, raw_link);
        let id = extract_announcement_id(&link);
        Some(Item::new(&raw_title, link, id.as_deref()))
    }
}

impl ExtractionStrategy for CssListStrategy {
    fn name(&self) -> &str {
        "css_list"
    }

    fn extract(&self, raw: &str, base: &Url) -> Vec<Item> {
        let document = Html::parse_document(raw);
        document
            .select(&self.row)
            .filter_map(|row| self.parse_row(&row, base))
            .collect()
    }
}

/// Any anchor pointing at an announcement path.
pub struct AnchorFallbackStrategy {
    anchor: Selector,
    href_contains: String,
}

impl AnchorFallbackStrategy {
    pub fn new(href_contains: &str) -> Result<Self> {
        Ok(Self {
            anchor: parse_selector("a[href]")?,
            href_contains: href_contains.to_string(),
        })
    }
}

impl ExtractionStrategy for AnchorFallbackStrategy {
    fn name(&self) -> &str {
        "anchor_fallback"
    }

    fn extract(&self, raw: &str, base: &Url) -> Vec<Item> {
        let document = Html::parse_document(raw);
        let mut seen_links = HashSet::new();
        let mut items = Vec::new();

        for anchor in document.select(&self.anchor) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if !href.contains(&self.href_contains) {
                continue;
            }
            let title: String = anchor.text().collect();
            if normalize_whitespace(&title).is_empty() {
                continue;
            }

            let link = resolve_url(base, href.trim());
            if !seen_links.insert(link.clone()) {
                continue;
            }
            let id = extract_announcement_id(&link);
            items.push(Item::new(&title, link, id.as_deref()));
        }
        items
    }
}
