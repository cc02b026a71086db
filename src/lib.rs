//! Travel Location Extractor
//!
//! Extraction pipeline turning heterogeneous content sources (web
//! articles, YouTube videos, Instagram posts and reels) into structured
//! travel location records via language-model extraction with a regex
//! fallback.

pub mod config;
pub mod envelope;
pub mod fetch;
pub mod llm;
pub mod location;
pub mod normalize;
pub mod pipeline;
pub mod source;
pub mod store;
pub mod transcribe;

#[cfg(feature = "api")]
pub mod api;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder};
pub use crate::envelope::ExtractionEnvelope;
pub use crate::fetch::{InstagramFetcher, RawContent, WebFetcher, YouTubeFetcher};
pub use crate::llm::extraction::LocationExtractionEngine;
pub use crate::llm::{LLMConfig, LLMProvider};
pub use crate::location::{Location, LocationCandidate};
pub use crate::normalize::{DuplicateEntry, LocationNormalizer};
pub use crate::pipeline::UrlProcessor;
pub use crate::source::{classify, SourceType};
pub use crate::store::{LocationStore, MemoryStore};
pub use crate::transcribe::AudioTranscriber;
