use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::location::{Coordinates, Location, LocationCandidate, SourceInfo};

/// Jaccard similarity above which a pair of names is reported as duplicate
const DUPLICATE_THRESHOLD: f64 = 0.8;

/// Maximum business-hours entries kept per location
const MAX_HOURS_ENTRIES: usize = 3;

/// A reported near-duplicate pair. Duplicates are reported, never merged
/// or removed from the locations list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateEntry {
    pub original: String,
    pub duplicate: String,
    pub similarity_score: f64,
}

/// Maps extracted candidates into the canonical Location schema and
/// reports pairwise name duplicates.
pub struct LocationNormalizer {
    hours_phrase: Regex,
    hours_day: Regex,
    hours_range: Regex,
    busy: Regex,
    rating: Regex,
    dollars: Regex,
}

impl LocationNormalizer {
    pub fn new() -> Self {
        Self {
            hours_phrase: Regex::new(r"(?i)\b(?:open(?:s|ing)?(?:\s+hours)?|hours)\b[^.!?\n]{3,60}")
                .expect("static regex"),
            hours_day: Regex::new(
                r"(?i)\b(?:mon|tues?|wed(?:nes)?|thu(?:rs)?|fri|sat(?:ur)?|sun)(?:day)?s?\b[^.!?\n]{0,40}\d{1,2}(?::\d{2})?\s*(?:am|pm)",
            )
            .expect("static regex"),
            hours_range: Regex::new(
                r"(?i)\d{1,2}(?::\d{2})?\s*(?:am|pm)\s*(?:-|–|to)\s*\d{1,2}(?::\d{2})?\s*(?:am|pm)",
            )
            .expect("static regex"),
            busy: Regex::new(
                r"(?i)\b(?:busy|busiest|peak|crowded|avoid)\b[^.!?\n]{0,50}(?:\d{1,2}(?::\d{2})?\s*(?:am|pm)|mornings?|afternoons?|evenings?|weekends?|noon|nights?)[^.!?\n]{0,30}",
            )
            .expect("static regex"),
            rating: Regex::new(
                r"(\d+(?:\.\d+)?)\s*(?:stars?\b|star rating|rating|/\s*(?:5|10)\b|out of \d+)",
            )
            .expect("static regex"),
            dollars: Regex::new(r"\$+").expect("static regex"),
        }
    }

    /// Normalize candidates into canonical locations. Ids are positional
    /// within the batch (`loc1`, `loc2`, …); the same candidate list in the
    /// same order always yields the same ids.
    pub fn normalize(&self, candidates: &[LocationCandidate], source: &SourceInfo) -> Vec<Location> {
        let created_at = Utc::now();

        candidates
            .iter()
            .enumerate()
            .map(|(i, candidate)| {
                let description = join_description(&candidate.details, &candidate.context);
                let category = candidate
                    .kind
                    .as_deref()
                    .filter(|k| !k.trim().is_empty())
                    .map(|k| k.trim().to_lowercase())
                    .unwrap_or_else(|| "point_of_interest".to_string());

                let tags = match candidate.kind.as_deref().filter(|k| !k.trim().is_empty()) {
                    Some(kind) => vec![kind.trim().to_lowercase()],
                    None => vec!["travel".to_string()],
                };

                Location {
                    id: format!("loc{}", i + 1),
                    name: candidate.name.trim().to_string(),
                    address: String::new(),
                    category,
                    coordinates: Coordinates::default(),
                    business_hours: self.extract_business_hours(&description),
                    busy_periods: self.extract_busy_periods(&description),
                    rating: self.extract_rating(&description),
                    price_level: self.extract_price_level(&description),
                    photos: Vec::new(),
                    description,
                    source: source.clone(),
                    tags,
                    created_at,
                }
            })
            .collect()
    }

    /// Pairwise duplicate report over normalized locations. Entries are
    /// reported for every unordered pair with Jaccard name similarity
    /// above the threshold; the locations list itself is left untouched.
    pub fn find_duplicates(&self, locations: &[Location]) -> Vec<DuplicateEntry> {
        let mut duplicates = Vec::new();
        for i in 0..locations.len() {
            for j in (i + 1)..locations.len() {
                let score = jaccard_similarity(&locations[i].name, &locations[j].name);
                if score > DUPLICATE_THRESHOLD {
                    debug!(
                        "Duplicate pair: '{}' / '{}' ({:.2})",
                        locations[i].name, locations[j].name, score
                    );
                    duplicates.push(DuplicateEntry {
                        original: locations[i].id.clone(),
                        duplicate: locations[j].id.clone(),
                        similarity_score: score,
                    });
                }
            }
        }
        duplicates
    }

    fn extract_business_hours(&self, text: &str) -> Option<Vec<String>> {
        let mut entries: Vec<String> = Vec::new();
        for re in [&self.hours_phrase, &self.hours_day, &self.hours_range] {
            for m in re.find_iter(text) {
                let entry = m.as_str().trim().to_string();
                if !entries.iter().any(|e| e == &entry) {
                    entries.push(entry);
                }
                if entries.len() >= MAX_HOURS_ENTRIES {
                    return Some(entries);
                }
            }
        }
        if entries.is_empty() {
            None
        } else {
            Some(entries)
        }
    }

    fn extract_busy_periods(&self, text: &str) -> Option<Vec<String>> {
        let entries: Vec<String> = self
            .busy
            .find_iter(text)
            .map(|m| m.as_str().trim().to_string())
            .collect();
        if entries.is_empty() {
            None
        } else {
            Some(entries)
        }
    }

    fn extract_rating(&self, text: &str) -> Option<f64> {
        self.rating
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    fn extract_price_level(&self, text: &str) -> Option<u8> {
        // Longest run of dollar signs wins, capped at 4
        if let Some(run) = self.dollars.find_iter(text).map(|m| m.as_str().len()).max() {
            return Some(run.min(4) as u8);
        }

        let lowered = text.to_lowercase();
        if lowered.contains("very expensive") || lowered.contains("luxury") {
            Some(4)
        } else if lowered.contains("expensive") {
            Some(3)
        } else if lowered.contains("moderate") {
            Some(2)
        } else if lowered.contains("inexpensive")
            || lowered.contains("affordable")
            || lowered.contains("cheap")
            || lowered.contains("budget")
        {
            Some(1)
        } else {
            None
        }
    }
}

impl Default for LocationNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn join_description(details: &str, context: &str) -> String {
    match (details.trim(), context.trim()) {
        ("", "") => String::new(),
        (d, "") => d.to_string(),
        ("", c) => c.to_string(),
        (d, c) => format!("{} {}", d, c),
    }
}

/// Jaccard similarity over lower-cased word sets of two names
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let set_a: HashSet<String> = a.to_lowercase().split_whitespace().map(String::from).collect();
    let set_b: HashSet<String> = b.to_lowercase().split_whitespace().map(String::from).collect();

    if set_a.is_empty() && set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count() as f64;
    let union = set_a.union(&set_b).count() as f64;
    intersection / union
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceType;

    fn test_source() -> SourceInfo {
        SourceInfo {
            url: "https://example.com/blog".to_string(),
            source_type: SourceType::Web,
            title: "Test".to_string(),
            timestamp: None,
        }
    }

    fn candidate(name: &str, kind: Option<&str>, details: &str) -> LocationCandidate {
        LocationCandidate {
            name: name.to_string(),
            kind: kind.map(String::from),
            details: details.to_string(),
            context: String::new(),
            source: None,
        }
    }

    #[test]
    fn test_ids_are_positional_and_stable() {
        let normalizer = LocationNormalizer::new();
        let candidates = vec![candidate("A", None, ""), candidate("B", None, "")];
        let first = normalizer.normalize(&candidates, &test_source());
        let second = normalizer.normalize(&candidates, &test_source());
        assert_eq!(first[0].id, "loc1");
        assert_eq!(first[1].id, "loc2");
        assert_eq!(second[0].id, "loc1");
        assert_eq!(second[1].id, "loc2");
    }

    #[test]
    fn test_category_and_tags_defaults() {
        let normalizer = LocationNormalizer::new();
        let locations = normalizer.normalize(
            &[candidate("Somewhere", None, ""), candidate("Eiffel Tower", Some("Landmark"), "")],
            &test_source(),
        );
        assert_eq!(locations[0].category, "point_of_interest");
        assert_eq!(locations[0].tags, vec!["travel"]);
        assert_eq!(locations[1].category, "landmark");
        assert_eq!(locations[1].tags, vec!["landmark"]);
        assert!(!locations[0].tags.is_empty());
    }

    #[test]
    fn test_coordinates_stay_null() {
        let normalizer = LocationNormalizer::new();
        let locations = normalizer.normalize(&[candidate("X", None, "")], &test_source());
        assert!(locations[0].coordinates.lat.is_none());
        assert!(locations[0].coordinates.lng.is_none());
    }

    #[test]
    fn test_business_hours_heuristics() {
        let normalizer = LocationNormalizer::new();
        let locations = normalizer.normalize(
            &[candidate("Cafe", Some("cafe"), "Open daily from morning. Doors 9am - 5pm. Saturday until 11pm.")],
            &test_source(),
        );
        let hours = locations[0].business_hours.as_ref().unwrap();
        assert!(!hours.is_empty());
        assert!(hours.len() <= 3);
        assert!(hours.iter().any(|h| h.contains("9am - 5pm")));
    }

    #[test]
    fn test_busy_periods_heuristic() {
        let normalizer = LocationNormalizer::new();
        let locations = normalizer.normalize(
            &[candidate("Market", Some("market"), "Very crowded on weekends, avoid the afternoon rush.")],
            &test_source(),
        );
        let busy = locations[0].busy_periods.as_ref().unwrap();
        assert!(busy.iter().any(|b| b.to_lowercase().contains("weekend")));
    }

    #[test]
    fn test_rating_heuristic() {
        let normalizer = LocationNormalizer::new();
        let locations = normalizer.normalize(
            &[
                candidate("A", None, "Rated 4.5 stars by visitors"),
                candidate("B", None, "It scores 9/10 with locals"),
                candidate("C", None, "No rating talk here"),
            ],
            &test_source(),
        );
        assert_eq!(locations[0].rating, Some(4.5));
        assert_eq!(locations[1].rating, Some(9.0));
        assert_eq!(locations[2].rating, None);
    }

    #[test]
    fn test_price_level_heuristics() {
        let normalizer = LocationNormalizer::new();
        let locations = normalizer.normalize(
            &[
                candidate("A", None, "A $$$ dinner spot"),
                candidate("B", None, "very expensive omakase"),
                candidate("C", None, "cheap street food"),
                candidate("D", None, "nothing about cost"),
            ],
            &test_source(),
        );
        assert_eq!(locations[0].price_level, Some(3));
        assert_eq!(locations[1].price_level, Some(4));
        assert_eq!(locations[2].price_level, Some(1));
        assert_eq!(locations[3].price_level, None);
    }

    #[test]
    fn test_duplicate_detection_reports_but_keeps_both() {
        let normalizer = LocationNormalizer::new();
        let locations = normalizer.normalize(
            &[
                candidate("Tokyo Tower", None, ""),
                candidate("Tokyo Tower ", None, ""),
                candidate("Senso-ji Temple", None, ""),
            ],
            &test_source(),
        );
        let duplicates = normalizer.find_duplicates(&locations);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].original, "loc1");
        assert_eq!(duplicates[0].duplicate, "loc2");
        assert!(duplicates[0].similarity_score > 0.8);
        // Both entries stay in the list
        assert_eq!(locations.len(), 3);
    }

    #[test]
    fn test_jaccard_similarity() {
        assert_eq!(jaccard_similarity("Tokyo Tower", "tokyo tower"), 1.0);
        assert!(jaccard_similarity("Tokyo Tower", "Kyoto Station") < 0.5);
        assert_eq!(jaccard_similarity("", ""), 0.0);
    }
}
