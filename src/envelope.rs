use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::location::Location;
use crate::normalize::DuplicateEntry;

/// Extraction outcome section: `success=false` always carries an empty
/// locations list and an error message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedLocations {
    pub success: bool,
    pub url: String,
    pub locations: Vec<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Duplicate report section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateCheck {
    pub success: bool,
    pub duplicates: Vec<DuplicateEntry>,
}

/// Derived details of the primary (first) location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceDetails {
    pub success: bool,
    pub place_id: Option<String>,
    pub updated_fields: Map<String, Value>,
}

/// The uniform success/error wrapper returned by the pipeline. Constructed
/// fresh per request and never mutated after return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionEnvelope {
    pub extracted_locations: ExtractedLocations,
    pub duplicate_check: DuplicateCheck,
    pub place_details: PlaceDetails,
}

impl ExtractionEnvelope {
    /// Build a success envelope around normalized locations and their
    /// duplicate report.
    pub fn success(url: &str, locations: Vec<Location>, duplicates: Vec<DuplicateEntry>) -> Self {
        let place_id = locations.first().map(|loc| loc.id.clone());

        let mut updated_fields = Map::new();
        if let Some(first) = locations.first() {
            if let Some(hours) = &first.business_hours {
                updated_fields.insert(
                    "business_hours".to_string(),
                    serde_json::to_value(hours).unwrap_or(Value::Null),
                );
            }
            if let Some(busy) = &first.busy_periods {
                updated_fields.insert(
                    "busy_periods".to_string(),
                    serde_json::to_value(busy).unwrap_or(Value::Null),
                );
            }
        }

        Self {
            extracted_locations: ExtractedLocations {
                success: true,
                url: url.to_string(),
                locations,
                error: None,
            },
            duplicate_check: DuplicateCheck {
                success: true,
                duplicates,
            },
            place_details: PlaceDetails {
                success: true,
                place_id,
                updated_fields,
            },
        }
    }

    /// Build an error envelope. All sections report failure and the
    /// locations list is forced empty.
    pub fn error(url: &str, message: impl Into<String>) -> Self {
        Self {
            extracted_locations: ExtractedLocations {
                success: false,
                url: url.to_string(),
                locations: Vec::new(),
                error: Some(message.into()),
            },
            duplicate_check: DuplicateCheck {
                success: false,
                duplicates: Vec::new(),
            },
            place_details: PlaceDetails {
                success: false,
                place_id: None,
                updated_fields: Map::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{Coordinates, SourceInfo};
    use crate::source::SourceType;
    use chrono::Utc;

    fn sample_location(id: &str, hours: Option<Vec<String>>) -> Location {
        Location {
            id: id.to_string(),
            name: "Eiffel Tower".to_string(),
            address: String::new(),
            category: "landmark".to_string(),
            coordinates: Coordinates::default(),
            business_hours: hours,
            busy_periods: None,
            rating: None,
            price_level: None,
            photos: Vec::new(),
            description: String::new(),
            source: SourceInfo {
                url: "https://example.com".to_string(),
                source_type: SourceType::Web,
                title: String::new(),
                timestamp: None,
            },
            tags: vec!["landmark".to_string()],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_success_envelope_fills_place_details() {
        let hours = Some(vec!["9am - 11pm".to_string()]);
        let envelope = ExtractionEnvelope::success(
            "https://example.com",
            vec![sample_location("loc1", hours)],
            Vec::new(),
        );
        assert!(envelope.extracted_locations.success);
        assert_eq!(envelope.place_details.place_id.as_deref(), Some("loc1"));
        assert!(envelope.place_details.updated_fields.contains_key("business_hours"));
    }

    #[test]
    fn test_success_envelope_empty_locations() {
        let envelope = ExtractionEnvelope::success("https://example.com", Vec::new(), Vec::new());
        assert!(envelope.extracted_locations.success);
        assert!(envelope.place_details.place_id.is_none());
        assert!(envelope.place_details.updated_fields.is_empty());
    }

    #[test]
    fn test_error_envelope_forces_empty_locations() {
        let envelope = ExtractionEnvelope::error("bad://url", "unsupported scheme");
        assert!(!envelope.extracted_locations.success);
        assert!(envelope.extracted_locations.locations.is_empty());
        assert!(!envelope.duplicate_check.success);
        assert!(envelope.duplicate_check.duplicates.is_empty());
        assert!(!envelope.place_details.success);
        assert_eq!(
            envelope.extracted_locations.error.as_deref(),
            Some("unsupported scheme")
        );
    }
}
