pub mod instagram;
pub mod web;
pub mod youtube;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::source::SourceType;

pub use instagram::InstagramFetcher;
pub use web::WebFetcher;
pub use youtube::YouTubeFetcher;

/// Default timeout for plain HTTP content fetches
pub const FETCH_TIMEOUT_SECS: u64 = 10;

/// Raw text corpus retrieved for one URL, fed once into extraction
#[derive(Debug, Clone)]
pub struct RawContent {
    pub text: String,
    pub source_type: SourceType,
    pub title: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl RawContent {
    /// Empty content carrying only the source classification. Returned when
    /// every fetch strategy for a URL has failed.
    pub fn empty(source_type: SourceType) -> Self {
        Self {
            text: String::new(),
            source_type,
            title: None,
            published_at: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Failure of a single fetch strategy attempt. Fetchers iterate an ordered
/// strategy list and only give up when the list is exhausted.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Http(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("no transcript or caption track available")]
    NoTranscript,
    #[error("no usable content found in page")]
    NoContent,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            FetchError::Http(status.as_u16())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Retrieves raw HTML for a URL. The production implementation is a
/// reqwest GET; tests inject canned or failing sources.
#[async_trait]
pub trait HtmlSource: Send + Sync {
    async fn fetch_html(&self, url: &str, headers: &[(&str, String)]) -> Result<String, FetchError>;
}

/// reqwest-backed HTML source
pub struct HttpHtmlSource {
    client: Client,
}

impl HttpHtmlSource {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            client: build_http_client(timeout_secs),
        }
    }
}

impl Default for HttpHtmlSource {
    fn default() -> Self {
        Self::new(FETCH_TIMEOUT_SECS)
    }
}

#[async_trait]
impl HtmlSource for HttpHtmlSource {
    async fn fetch_html(&self, url: &str, headers: &[(&str, String)]) -> Result<String, FetchError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Http(response.status().as_u16()));
        }
        Ok(response.text().await?)
    }
}

/// Build the shared HTTP client with an explicit per-request timeout
pub fn build_http_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
        .build()
        .unwrap_or_else(|_| Client::new())
}
