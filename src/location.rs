use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::SourceType;

/// Where in the source material a candidate was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateOrigin {
    Title,
    Transcript,
    Description,
    Audio,
    Both,
}

/// An unvalidated location mention, as returned by the language model or
/// the heuristic fallback extractor. Field order and list order carry no
/// meaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationCandidate {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<CandidateOrigin>,
}

impl LocationCandidate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            details: String::new(),
            context: String::new(),
            source: None,
        }
    }
}

/// Geographic coordinates. Both fields stay null until a geocoding step
/// outside this pipeline resolves them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Provenance block attached to every normalized location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub url: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// The canonical, persisted location record.
///
/// `id` is positional within one extraction batch (`loc1`, `loc2`, …) and
/// is NOT globally unique. `tags` is never empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub address: String,
    pub category: String,
    pub coordinates: Coordinates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_hours: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub busy_periods: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_level: Option<u8>,
    pub photos: Vec<String>,
    pub description: String,
    pub source: SourceInfo,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}
