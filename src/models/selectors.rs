// src/models/selectors.rs

//! Extraction strategy definitions.
//!
//! Each entry describes one way of turning a fetched page or API response
//! into announcement items. They are tried in the order they are listed.

use serde::{Deserialize, Serialize};

/// Configuration for a single extraction strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// The response body is JSON with an array of articles.
    JsonList(JsonFields),

    /// JSON embedded in an HTML element (usually a `<script>` tag).
    EmbeddedJson {
        /// CSS selector for the element holding the JSON text
        script_selector: String,
        #[serde(flatten)]
        fields: JsonFields,
    },

    /// HTML list with row/title/link selectors.
    CssList(CssSelectors),

    /// Every anchor whose href contains a fragment.
    AnchorFallback {
        /// Substring the href must contain (e.g. "/support/announcement/")
        href_contains: String,
    },
}

impl StrategyConfig {
    /// Short name for logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            StrategyConfig::JsonList(_) => "json_list",
            StrategyConfig::EmbeddedJson { .. } => "embedded_json",
            StrategyConfig::CssList(_) => "css_list",
            StrategyConfig::AnchorFallback { .. } => "anchor_fallback",
        }
    }
}

/// Where to find articles and their fields inside a JSON document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonFields {
    /// JSON pointers to article arrays; the first that resolves to a
    /// non-empty array is used (e.g. "/data/articles")
    pub articles_pointers: Vec<String>,

    /// Field holding the title
    #[serde(default = "default_title_field")]
    pub title_field: String,

    /// Field holding the upstream identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_field: Option<String>,

    /// Field holding a direct link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_field: Option<String>,

    /// Template used when no link field is present; `{id}` is replaced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_template: Option<String>,
}

fn default_title_field() -> String {
    "title".to_string()
}

/// CSS selectors for scraping an announcement list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CssSelectors {
    /// Selector for each row/item in the list
    pub row_selector: String,

    /// Selector for the title element within a row
    pub title_selector: String,

    /// Optional selector for the link element (defaults to the title
    /// element, then the row itself)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_selector: Option<String>,

    /// HTML attribute name for extracting links (usually "href")
    #[serde(default = "default_attr_name")]
    pub attr_name: String,
}

fn default_attr_name() -> String {
    "href".to_string()
}

impl CssSelectors {
    /// Create selectors from a row and title selector.
    pub fn from_pattern(row: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            row_selector: row.into(),
            title_selector: title.into(),
            link_selector: None,
            attr_name: default_attr_name(),
        }
    }
}

/// Default strategy chain for the Binance announcement catalog, most
/// structured first.
pub fn default_strategies() -> Vec<StrategyConfig> {
    let binance_fields = |pointers: &[&str]| JsonFields {
        articles_pointers: pointers.iter().map(|p| p.to_string()).collect(),
        title_field: default_title_field(),
        id_field: Some("code".to_string()),
        link_field: None,
        link_template: Some("https://www.binance.com/en/support/announcement/{id}".to_string()),
    };

    vec![
        StrategyConfig::JsonList(binance_fields(&["/data/articles", "/data/catalogs/0/articles"])),
        StrategyConfig::EmbeddedJson {
            script_selector: "script#__APP_DATA".to_string(),
            fields: binance_fields(&[
                "/appState/loader/dataByRouteId/d34e/catalogDetail/articles",
                "/routeProps/ce50/catalogDetail/articles",
            ]),
        },
        StrategyConfig::CssList(CssSelectors::from_pattern(
            "a[href*='/support/announcement/']:has(div)",
            "div",
        )),
        StrategyConfig::AnchorFallback {
            href_contains: "/support/announcement/".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_config_from_toml() {
        let toml_str = r#"
            [[strategies]]
            kind = "json_list"
            articles_pointers = ["/data/articles"]
            id_field = "code"
            link_template = "https://example.com/{id}"

            [[strategies]]
            kind = "embedded_json"
            script_selector = "script#data"
            articles_pointers = ["/items"]

            [[strategies]]
            kind = "anchor_fallback"
            href_contains = "/notice/"
        "#;

        #[derive(Deserialize)]
        struct Wrapper {
            strategies: Vec<StrategyConfig>,
        }

        let parsed: Wrapper = toml::from_str(toml_str).unwrap();
        assert_eq!(parsed.strategies.len(), 3);
        assert_eq!(parsed.strategies[0].kind_name(), "json_list");
        match &parsed.strategies[1] {
            StrategyConfig::EmbeddedJson { script_selector, fields } => {
                assert_eq!(script_selector, "script#data");
                assert_eq!(fields.title_field, "title");
            }
            other => panic!("unexpected strategy {other:?}"),
        }
    }

    #[test]
    fn test_default_chain_is_structured_first() {
        let chain = default_strategies();
        assert_eq!(chain.first().map(|s| s.kind_name()), Some("json_list"));
        assert_eq!(chain.last().map(|s| s.kind_name()), Some("anchor_fallback"));
    }
}
