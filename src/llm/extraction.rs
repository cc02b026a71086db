use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{create_llm, heuristic, ChatMessage, LLMConfig, LLMProvider, LLM};
use crate::location::LocationCandidate;
use crate::source::SourceType;

/// Character budget for text submitted to the model; always a prefix cut
pub const MAX_PROMPT_CHARS: usize = 8000;

const SYSTEM_PROMPT: &str = "You are a travel content analyst that returns only valid JSON.";

/// Either JSON shape models return for the extraction prompt: a bare array
/// of candidates or an object wrapping them under a `locations` key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LLMLocationResponse {
    List(Vec<LocationCandidate>),
    Object { locations: Vec<LocationCandidate> },
}

impl LLMLocationResponse {
    fn into_candidates(self) -> Vec<LocationCandidate> {
        match self {
            LLMLocationResponse::List(candidates) => candidates,
            LLMLocationResponse::Object { locations } => locations,
        }
    }
}

/// Extracts location candidates from a text corpus: source-aware prompt,
/// one LLM call, defensive JSON parsing, regex fallback on any failure.
pub struct LocationExtractionEngine {
    llm: Option<Box<dyn LLM>>,
}

impl LocationExtractionEngine {
    /// Build the engine from LLM configuration. A missing or empty API key
    /// for a hosted provider disables the model entirely; extraction then
    /// runs heuristic-only with no network attempt.
    pub fn new(config: &LLMConfig) -> Self {
        let key_missing = config
            .api_key
            .as_deref()
            .map_or(true, |k| k.trim().is_empty());

        if config.provider == LLMProvider::OpenAI && key_missing {
            debug!("No API key configured, extraction will use the heuristic fallback only");
            return Self { llm: None };
        }

        match create_llm(config) {
            Ok(llm) => Self { llm: Some(llm) },
            Err(e) => {
                warn!("LLM provider unavailable ({}), using heuristic fallback only", e);
                Self { llm: None }
            }
        }
    }

    /// Build the engine around an existing LLM implementation
    pub fn with_llm(llm: Box<dyn LLM>) -> Self {
        Self { llm: Some(llm) }
    }

    /// Engine that never calls a model
    pub fn heuristic_only() -> Self {
        Self { llm: None }
    }

    /// Extract location candidates from text. Never raises: model
    /// transport errors and malformed responses fall back to the regex
    /// extractor, which always yields a (possibly empty) list.
    pub async fn extract(&self, text: &str, source_type: SourceType) -> Vec<LocationCandidate> {
        let truncated = truncate_chars(text, MAX_PROMPT_CHARS);
        if truncated.trim().is_empty() {
            return Vec::new();
        }

        let llm = match &self.llm {
            Some(llm) => llm,
            None => return heuristic::extract_heuristic(truncated),
        };

        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_user_prompt(truncated, source_type)),
        ];

        match llm.chat(messages).await {
            Ok(response) => {
                debug!(
                    "LLM extraction call completed (tokens: {:?})",
                    response.tokens_used
                );
                match parse_response(&response.content) {
                    Some(candidates) => {
                        info!("🤖 Model returned {} location candidates", candidates.len());
                        candidates
                    }
                    None => {
                        warn!("Model response was not parseable JSON, using heuristic fallback");
                        heuristic::extract_heuristic(truncated)
                    }
                }
            }
            Err(e) => {
                warn!("LLM call failed ({}), using heuristic fallback", e);
                heuristic::extract_heuristic(truncated)
            }
        }
    }
}

/// Prefix truncation at a character boundary
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn build_user_prompt(text: &str, source_type: SourceType) -> String {
    let source_framing = match source_type {
        SourceType::Web => "The text below is a travel article scraped from a web page.",
        SourceType::Youtube => {
            "The text below is the title and spoken transcript of a travel video."
        }
        SourceType::Instagram => {
            "The text below is the caption and audio transcription of an Instagram travel post."
        }
    };

    format!(
        r#"{source_framing}

Extract every travel-related location mentioned. For each location provide:
- name: the official name if available, or a descriptive name
- type: type of location (restaurant, temple, park, landmark, etc.)
- details: key details about the location
- context: how or why it was mentioned
- source: where it appeared (title, transcript, description, audio, or both)

Return ONLY a valid JSON object of the form {{"locations": [{{"name": "...", "type": "...", "details": "...", "context": "...", "source": "..."}}]}}

Text:
{text}"#
    )
}

/// Defensive parse of a model response: strip markdown code fences, then
/// accept either a bare array or an object with a `locations` key.
fn parse_response(raw: &str) -> Option<Vec<LocationCandidate>> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str::<LLMLocationResponse>(cleaned)
        .ok()
        .map(LLMLocationResponse::into_candidates)
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct CannedLlm(String);

    #[async_trait]
    impl LLM for CannedLlm {
        async fn chat(&self, _messages: Vec<ChatMessage>) -> anyhow::Result<super::super::LLMResponse> {
            Ok(super::super::LLMResponse {
                content: self.0.clone(),
                tokens_used: None,
            })
        }

        fn provider_type(&self) -> LLMProvider {
            LLMProvider::OpenAI
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LLM for FailingLlm {
        async fn chat(&self, _messages: Vec<ChatMessage>) -> anyhow::Result<super::super::LLMResponse> {
            Err(anyhow!("transport error"))
        }

        fn provider_type(&self) -> LLMProvider {
            LLMProvider::OpenAI
        }
    }

    #[test]
    fn test_truncate_chars_exact_boundary() {
        let text = "a".repeat(9000);
        assert_eq!(truncate_chars(&text, MAX_PROMPT_CHARS).len(), 8000);
        let short = "short text";
        assert_eq!(truncate_chars(short, MAX_PROMPT_CHARS), short);
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        let text = "東".repeat(9000);
        let cut = truncate_chars(&text, MAX_PROMPT_CHARS);
        assert_eq!(cut.chars().count(), 8000);
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[]\n```"), "[]");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("[1,2]"), "[1,2]");
    }

    #[test]
    fn test_parse_response_bare_array() {
        let raw = r#"[{"name": "Eiffel Tower", "type": "landmark"}]"#;
        let candidates = parse_response(raw).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Eiffel Tower");
    }

    #[test]
    fn test_parse_response_object_with_locations_key() {
        let raw = r#"```json
{"locations": [{"name": "Senso-ji", "type": "temple", "details": "", "context": "opening shot"}]}
```"#;
        let candidates = parse_response(raw).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kind.as_deref(), Some("temple"));
    }

    #[test]
    fn test_parse_response_rejects_non_json() {
        assert!(parse_response("I found the Eiffel Tower!").is_none());
        assert!(parse_response("{\"unexpected\": true}").is_none());
    }

    #[tokio::test]
    async fn test_extract_with_model_response() {
        let engine = LocationExtractionEngine::with_llm(Box::new(CannedLlm(
            r#"{"locations": [{"name": "Eiffel Tower", "type": "landmark", "details": "", "context": "mentioned"}]}"#.to_string(),
        )));
        let candidates = engine
            .extract("I visited the Eiffel Tower in Paris.", SourceType::Web)
            .await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Eiffel Tower");
    }

    #[tokio::test]
    async fn test_extract_falls_back_on_transport_error() {
        let engine = LocationExtractionEngine::with_llm(Box::new(FailingLlm));
        let candidates = engine
            .extract("We visited the Eiffel Tower.", SourceType::Web)
            .await;
        // Heuristic fallback still finds the landmark; never raises
        assert!(candidates.iter().any(|c| c.name == "Eiffel Tower"));
    }

    #[tokio::test]
    async fn test_extract_falls_back_on_malformed_json() {
        let engine =
            LocationExtractionEngine::with_llm(Box::new(CannedLlm("not json at all".to_string())));
        let candidates = engine.extract("Plain text, no places.", SourceType::Web).await;
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_extract_empty_text_short_circuits() {
        let engine = LocationExtractionEngine::heuristic_only();
        assert!(engine.extract("   ", SourceType::Web).await.is_empty());
    }
}
