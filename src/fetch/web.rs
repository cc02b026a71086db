use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{FetchError, HtmlSource, HttpHtmlSource, RawContent};
use crate::source::SourceType;

/// Content-container selectors tried in order before falling back to
/// concatenating every paragraph on the page
const CONTENT_SELECTORS: &[&str] = &["article", "main", ".post-content", ".entry-content"];

/// Fetches and scrapes plain web articles
pub struct WebFetcher {
    html: Arc<dyn HtmlSource>,
}

impl WebFetcher {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            html: Arc::new(HttpHtmlSource::new(timeout_secs)),
        }
    }

    pub fn with_source(html: Arc<dyn HtmlSource>) -> Self {
        Self { html }
    }

    /// Fetch a web page and extract its article text. Never raises: any
    /// failure degrades to empty `RawContent` so the caller can build an
    /// error envelope.
    pub async fn fetch(&self, url: &str) -> RawContent {
        match self.try_fetch(url).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Web fetch failed for {}: {}", url, e);
                RawContent::empty(SourceType::Web)
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<RawContent, FetchError> {
        debug!("Fetching web page: {}", url);
        let html = self.html.fetch_html(url, &[]).await?;
        let content = parse_article(&html);
        if content.is_empty() {
            return Err(FetchError::NoContent);
        }
        Ok(content)
    }
}

/// Parse an HTML document into article content: title, publish timestamp
/// from the `article:published_time` meta tag, and body text from the
/// first matching content container.
pub fn parse_article(html: &str) -> RawContent {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let published_at = Selector::parse(r#"meta[property="article:published_time"]"#)
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .and_then(|el| el.value().attr("content"))
        .and_then(parse_timestamp);

    let mut text = String::new();
    for selector_str in CONTENT_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(container) = document.select(&selector).next() {
                text = collect_text(container);
                if !text.trim().is_empty() {
                    debug!("Extracted body via selector: {}", selector_str);
                    break;
                }
            }
        }
    }

    // Last resort: every paragraph on the page
    if text.trim().is_empty() {
        if let Ok(p) = Selector::parse("p") {
            text = document
                .select(&p)
                .map(|el| el.text().collect::<String>())
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
        }
    }

    RawContent {
        text: normalize_whitespace(&text),
        source_type: SourceType::Web,
        title,
        published_at,
    }
}

fn collect_text(element: scraper::ElementRef<'_>) -> String {
    element
        .text()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_article_prefers_article_tag() {
        let html = r#"
            <html><head><title>Tokyo Guide</title></head>
            <body>
                <nav><p>Menu item</p></nav>
                <article><p>I visited the Eiffel Tower in Paris.</p></article>
            </body></html>
        "#;
        let content = parse_article(html);
        assert_eq!(content.title.as_deref(), Some("Tokyo Guide"));
        assert_eq!(content.text, "I visited the Eiffel Tower in Paris.");
    }

    #[test]
    fn test_parse_article_falls_back_to_paragraphs() {
        let html = r#"
            <html><body>
                <div><p>First stop: Senso-ji Temple.</p><p>Then Ueno Park.</p></div>
            </body></html>
        "#;
        let content = parse_article(html);
        assert_eq!(content.text, "First stop: Senso-ji Temple. Then Ueno Park.");
        assert!(content.title.is_none());
    }

    #[test]
    fn test_parse_article_published_time() {
        let html = r#"
            <html><head>
                <meta property="article:published_time" content="2024-03-15T10:30:00Z">
            </head><body><article><p>Some text</p></article></body></html>
        "#;
        let content = parse_article(html);
        let ts = content.published_at.unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-15T10:30:00+00:00");
    }

    #[test]
    fn test_parse_article_empty_page() {
        let content = parse_article("<html><body></body></html>");
        assert!(content.is_empty());
    }
}
