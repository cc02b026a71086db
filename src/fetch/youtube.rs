use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{build_http_client, FetchError, RawContent, FETCH_TIMEOUT_SECS};
use crate::source::{extract_video_id, SourceType};
use crate::transcribe::AudioTranscriber;

/// One caption segment from a transcript track
#[derive(Debug, Clone)]
pub struct TranscriptSegment {
    pub text: String,
    pub start: f64,
}

/// Caption/transcript track source for a video id
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn transcript(&self, video_id: &str) -> Result<Vec<TranscriptSegment>, FetchError>;
}

/// Video metadata (title, publish timestamp) for a video id
#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub title: String,
    pub published_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn metadata(&self, video_id: &str) -> Result<VideoMetadata, FetchError>;
}

/// Transcript source backed by YouTube's timedtext caption endpoint
pub struct TimedTextSource {
    client: Client,
}

impl TimedTextSource {
    pub fn new() -> Self {
        Self {
            client: build_http_client(FETCH_TIMEOUT_SECS),
        }
    }
}

impl Default for TimedTextSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptSource for TimedTextSource {
    async fn transcript(&self, video_id: &str) -> Result<Vec<TranscriptSegment>, FetchError> {
        let url = format!(
            "https://www.youtube.com/api/timedtext?lang=en&v={}",
            urlencoding::encode(video_id)
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Http(response.status().as_u16()));
        }
        let body = response.text().await?;
        let segments = parse_timedtext(&body);
        if segments.is_empty() {
            return Err(FetchError::NoTranscript);
        }
        Ok(segments)
    }
}

/// Metadata source backed by the keyless oEmbed endpoint. Publish dates
/// are not part of the oEmbed payload and stay `None` here.
pub struct OEmbedMetadataSource {
    client: Client,
}

impl OEmbedMetadataSource {
    pub fn new() -> Self {
        Self {
            client: build_http_client(FETCH_TIMEOUT_SECS),
        }
    }
}

impl Default for OEmbedMetadataSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: String,
}

#[async_trait]
impl MetadataSource for OEmbedMetadataSource {
    async fn metadata(&self, video_id: &str) -> Result<VideoMetadata, FetchError> {
        let url = format!(
            "https://www.youtube.com/oembed?url=https://www.youtube.com/watch?v={}&format=json",
            urlencoding::encode(video_id)
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Http(response.status().as_u16()));
        }
        let oembed: OEmbedResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(VideoMetadata {
            title: oembed.title,
            published_at: None,
        })
    }
}

/// Fetches a text corpus for a YouTube video: caption track first, audio
/// transcription as the fallback, metadata independently best-effort.
pub struct YouTubeFetcher {
    transcripts: Arc<dyn TranscriptSource>,
    metadata: Arc<dyn MetadataSource>,
    transcriber: Arc<AudioTranscriber>,
}

impl YouTubeFetcher {
    pub fn new(
        transcripts: Arc<dyn TranscriptSource>,
        metadata: Arc<dyn MetadataSource>,
        transcriber: Arc<AudioTranscriber>,
    ) -> Self {
        Self {
            transcripts,
            metadata,
            transcriber,
        }
    }

    pub fn with_defaults(transcriber: Arc<AudioTranscriber>) -> Self {
        Self::new(
            Arc::new(TimedTextSource::new()),
            Arc::new(OEmbedMetadataSource::new()),
            transcriber,
        )
    }

    /// Fetch the transcript corpus for a video URL. Never raises; an
    /// unextractable id or fully failed retrieval yields empty content.
    pub async fn fetch(&self, url: &str) -> RawContent {
        let video_id = match extract_video_id(url) {
            Some(id) => id,
            None => {
                warn!("Could not extract video id from {}", url);
                return RawContent::empty(SourceType::Youtube);
            }
        };

        info!("🎬 Fetching YouTube content for video {}", video_id);

        // Metadata is independent: its failure never blocks the transcript
        let metadata = match self.metadata.metadata(&video_id).await {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!("Metadata fetch failed for {}: {}", video_id, e);
                None
            }
        };

        // Primary: an existing caption track
        let transcript = match self.transcripts.transcript(&video_id).await {
            Ok(segments) => {
                debug!("Caption track found: {} segments", segments.len());
                segments
                    .iter()
                    .map(|s| s.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            }
            Err(e) => {
                // Fallback: download the audio stream and transcribe it.
                // This is the only path for caption-less videos, so it must
                // run before declaring failure.
                info!("No caption track ({}), falling back to audio transcription", e);
                self.transcriber.transcribe(url).await
            }
        };

        if transcript.is_empty() && metadata.is_none() {
            return RawContent::empty(SourceType::Youtube);
        }

        let title = metadata
            .as_ref()
            .map(|m| m.title.clone())
            .unwrap_or_else(|| "Unknown Title".to_string());
        let published_at = metadata.and_then(|m| m.published_at);

        RawContent {
            text: format!("Title: {}\n\nTranscript:\n{}", title, transcript),
            source_type: SourceType::Youtube,
            title: Some(title),
            published_at,
        }
    }
}

/// Parse YouTube timedtext XML into segments. The payload is a flat list
/// of `<text start="..." dur="...">...</text>` elements; a full XML parser
/// is overkill for it.
fn parse_timedtext(xml: &str) -> Vec<TranscriptSegment> {
    let re = match Regex::new(r#"<text start="([\d.]+)"[^>]*>([^<]*)</text>"#) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    re.captures_iter(xml)
        .filter_map(|caps| {
            let start: f64 = caps.get(1)?.as_str().parse().ok()?;
            let text = decode_entities(caps.get(2)?.as_str());
            if text.trim().is_empty() {
                None
            } else {
                Some(TranscriptSegment { text, start })
            }
        })
        .collect()
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timedtext() {
        let xml = r#"<?xml version="1.0"?><transcript>
            <text start="0.5" dur="3.2">Welcome to Tokyo</text>
            <text start="3.7" dur="2.0">let&#39;s visit Senso-ji Temple</text>
            <text start="5.7" dur="1.0">   </text>
        </transcript>"#;
        let segments = parse_timedtext(xml);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Welcome to Tokyo");
        assert_eq!(segments[0].start, 0.5);
        assert_eq!(segments[1].text, "let's visit Senso-ji Temple");
    }

    #[test]
    fn test_parse_timedtext_empty_payload() {
        assert!(parse_timedtext("").is_empty());
        assert!(parse_timedtext("<transcript></transcript>").is_empty());
    }
}
