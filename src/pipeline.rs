use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::config::Config;
use crate::envelope::ExtractionEnvelope;
use crate::fetch::{InstagramFetcher, RawContent, WebFetcher, YouTubeFetcher};
use crate::llm::extraction::LocationExtractionEngine;
use crate::location::SourceInfo;
use crate::normalize::LocationNormalizer;
use crate::source::{classify, SourceType};
use crate::store::LocationStore;
use crate::transcribe::AudioTranscriber;

/// End-to-end extraction pipeline: classify, fetch, extract, normalize,
/// envelope. One logical request runs sequentially with no shared mutable
/// state between requests.
pub struct UrlProcessor {
    web: WebFetcher,
    youtube: YouTubeFetcher,
    instagram: InstagramFetcher,
    engine: LocationExtractionEngine,
    normalizer: LocationNormalizer,
    store: Option<Arc<dyn LocationStore>>,
}

impl UrlProcessor {
    /// Wire the pipeline from configuration with production collaborators
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let transcriber = Arc::new(AudioTranscriber::from_config(&config.transcription)?);
        Ok(Self {
            web: WebFetcher::new(config.http.fetch_timeout_secs),
            youtube: YouTubeFetcher::with_defaults(Arc::clone(&transcriber)),
            instagram: InstagramFetcher::new(
                config.http.fetch_timeout_secs,
                transcriber,
                config.instagram.session_cookie.clone(),
            ),
            engine: LocationExtractionEngine::new(&config.llm),
            normalizer: LocationNormalizer::new(),
            store: None,
        })
    }

    /// Wire the pipeline from explicit components (tests, embedders)
    pub fn new(
        web: WebFetcher,
        youtube: YouTubeFetcher,
        instagram: InstagramFetcher,
        engine: LocationExtractionEngine,
    ) -> Self {
        Self {
            web,
            youtube,
            instagram,
            engine,
            normalizer: LocationNormalizer::new(),
            store: None,
        }
    }

    /// Persist extracted locations to a store after each successful run
    pub fn with_store(mut self, store: Arc<dyn LocationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Process one URL end to end. Always resolves to a well-formed
    /// envelope; never raises to the caller.
    pub async fn process_url(&self, url: &str) -> ExtractionEnvelope {
        if let Err(message) = validate_url(url) {
            warn!("Rejected input URL {}: {}", url, message);
            return ExtractionEnvelope::error(url, message);
        }

        let source_type = classify(url);
        info!("🔎 Processing {} as {}", url, source_type.as_str());

        let raw = self.fetch(url, source_type).await;

        if raw.is_empty() {
            let message = match source_type {
                SourceType::Web => "failed to fetch web page content".to_string(),
                SourceType::Youtube => {
                    "no transcript, audio or metadata could be retrieved for video".to_string()
                }
                SourceType::Instagram => "failed to retrieve Instagram content".to_string(),
            };
            return ExtractionEnvelope::error(url, message);
        }

        let candidates = self.engine.extract(&raw.text, source_type).await;
        info!("📍 Extracted {} location candidates", candidates.len());

        let source = SourceInfo {
            url: url.to_string(),
            source_type,
            title: raw.title.clone().unwrap_or_default(),
            timestamp: raw.published_at,
        };

        let locations = self.normalizer.normalize(&candidates, &source);
        let duplicates = self.normalizer.find_duplicates(&locations);
        if !duplicates.is_empty() {
            info!("👯 {} duplicate pairs reported", duplicates.len());
        }

        if let Some(store) = &self.store {
            for location in &locations {
                if let Err(e) = store.insert(location.clone()).await {
                    warn!("Failed to persist {}: {}", location.id, e);
                }
            }
        }

        ExtractionEnvelope::success(url, locations, duplicates)
    }

    async fn fetch(&self, url: &str, source_type: SourceType) -> RawContent {
        match source_type {
            SourceType::Web => self.web.fetch(url).await,
            SourceType::Youtube => self.youtube.fetch(url).await,
            SourceType::Instagram => self.instagram.fetch(url).await,
        }
    }
}

fn validate_url(url: &str) -> Result<(), String> {
    let parsed = Url::parse(url).map_err(|e| format!("invalid URL: {}", e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported URL scheme: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com/a").is_ok());
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("not a url").is_err());
    }
}
