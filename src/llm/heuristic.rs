use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

use crate::location::LocationCandidate;

/// Capitalized phrases immediately following a travel-intent verb
const INTENT_PATTERN: &str = r"(?:visit(?:ed|ing)?|travel(?:l)?(?:ed|ing)?\s+to|went\s+to|stayed\s+at|located\s+in|head(?:ed)?\s+to|stop(?:ped)?\s+by|check\s+out|explore[d]?)\s+(?:the\s+)?([A-Z][A-Za-z'\-]*(?:\s+(?:of|de|la|the|[A-Z][A-Za-z'\-]*))*)";

/// Capitalized phrases ending in a location-type noun
const TYPE_NOUN_PATTERN: &str = r"\b((?:[A-Z][A-Za-z'\-]*\s+)+(?:Park|Museum|Temple|Tower|Castle|Beach|Market|Palace|Garden|Bridge|Cathedral|Shrine|Square|Mountain|Lake|Island|Cafe|Restaurant|Hotel|Bay|Falls|Valley))\b";

/// Keywords whose proximity upgrades a match to high confidence
const INTENT_KEYWORDS: &[&str] = &["visit", "travel", "trip", "tour", "stay", "explore", "went"];

/// Bytes of proximity that count as "near" an intent keyword
const INTENT_WINDOW: usize = 50;

/// Bytes of surrounding text captured as match context
const CONTEXT_WINDOW: usize = 100;

/// Regex-based location finder used when the language model is unavailable
/// or returns unparsable output. Always returns a (possibly empty) list.
pub fn extract_heuristic(text: &str) -> Vec<LocationCandidate> {
    let patterns = [INTENT_PATTERN, TYPE_NOUN_PATTERN];
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    for pattern in patterns {
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(_) => continue,
        };

        for caps in re.captures_iter(text) {
            let name_match = match caps.get(1) {
                Some(m) => m,
                None => continue,
            };
            let name = name_match.as_str().trim().to_string();
            if name.len() < 3 || !seen.insert(name.to_lowercase()) {
                continue;
            }

            let confidence = if has_nearby_intent(text, name_match.start()) {
                "high"
            } else {
                "medium"
            };

            candidates.push(LocationCandidate {
                name,
                kind: None,
                details: format!("confidence: {}", confidence),
                context: context_window(text, name_match.start(), name_match.end()),
                source: None,
            });
        }
    }

    debug!("Heuristic extractor found {} candidates", candidates.len());
    candidates
}

fn has_nearby_intent(text: &str, match_start: usize) -> bool {
    let window_start = floor_char_boundary(text, match_start.saturating_sub(INTENT_WINDOW));
    let window = &text[window_start..floor_char_boundary(text, match_start)];
    let lowered = window.to_lowercase();
    INTENT_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

fn context_window(text: &str, start: usize, end: usize) -> String {
    let from = floor_char_boundary(text, start.saturating_sub(CONTEXT_WINDOW));
    let to = ceil_char_boundary(text, (end + CONTEXT_WINDOW).min(text.len()));
    text[from..to].trim().to_string()
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
