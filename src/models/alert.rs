//! Outbound message kinds and their rendering.

use crate::models::Item;

/// Text formatting understood by a notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageFormat {
    Plain,
    /// Telegram-style light HTML (`<b>`, `<a href>`)
    #[default]
    Html,
}

/// A message pushed to the operator channel.
///
/// Every kind starts with its own marker so a reader can tell a delisting
/// alert from a status line or an error at a glance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    Delisting { title: String, link: String },
    Status(String),
    Warning(String),
    Error(String),
}

impl Alert {
    pub fn delisting(item: &Item) -> Self {
        Alert::Delisting {
            title: item.title.clone(),
            link: item.link.clone(),
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            Alert::Delisting { .. } => "🚨",
            Alert::Status(_) => "🟢",
            Alert::Warning(_) => "⚠️",
            Alert::Error(_) => "🔴",
        }
    }

    /// Render the message body for the given format.
    pub fn render(&self, format: MessageFormat) -> String {
        let esc = |s: &str| match format {
            MessageFormat::Plain => s.to_string(),
            MessageFormat::Html => html_escape::encode_text(s).to_string(),
        };

        match self {
            Alert::Delisting { title, link } => {
                let heading = match format {
                    MessageFormat::Plain => "New Delisting Announcement".to_string(),
                    MessageFormat::Html => "<b>New Delisting Announcement</b>".to_string(),
                };
                format!(
                    "{m} {heading} {m}\n\nTitle: {}\nLink: {}",
                    esc(title),
                    esc(link),
                    m = self.marker()
                )
            }
            Alert::Status(text) | Alert::Warning(text) | Alert::Error(text) => {
                format!("{} {}", self.marker(), esc(text))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delisting_contains_title_and_link() {
        let alert = Alert::Delisting {
            title: "Binance Will Delist ABC".into(),
            link: "https://www.binance.com/en/support/announcement/123".into(),
        };
        let text = alert.render(MessageFormat::Plain);
        assert!(text.starts_with("🚨"));
        assert!(text.contains("Title: Binance Will Delist ABC"));
        assert!(text.contains("Link: https://www.binance.com/en/support/announcement/123"));
    }

    #[test]
    fn test_html_escapes_title() {
        let alert = Alert::Delisting {
            title: "Delist A&B <C>".into(),
            link: "https://x/1".into(),
        };
        let text = alert.render(MessageFormat::Html);
        assert!(text.contains("A&amp;B &lt;C&gt;"));
        assert!(text.contains("<b>New Delisting Announcement</b>"));
    }

    #[test]
    fn test_markers_are_distinct() {
        let kinds = [
            Alert::Status("s".into()).render(MessageFormat::Plain),
            Alert::Warning("w".into()).render(MessageFormat::Plain),
            Alert::Error("e".into()).render(MessageFormat::Plain),
        ];
        assert!(kinds[0].starts_with("🟢"));
        assert!(kinds[1].starts_with("⚠️"));
        assert!(kinds[2].starts_with("🔴"));
    }
}
