use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::llm::{LLMConfig, LLMProvider};

/// Configuration for the travel location extraction pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP fetch settings
    pub http: HttpConfig,

    /// Language model settings
    pub llm: LLMConfig,

    /// Audio transcription settings
    pub transcription: TranscriptionConfig,

    /// Instagram fetch settings
    pub instagram: InstagramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Timeout for page/content fetches in seconds
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Use the hosted transcription API instead of the local whisper CLI
    pub use_hosted: bool,

    /// Whisper model name (local model size or hosted model id)
    pub model: String,

    /// API key for hosted transcription
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramConfig {
    /// Optional sessionid cookie for authenticated fetches
    pub session_cookie: Option<String>,
}

impl Config {
    /// Load configuration: toml file locations first, then environment
    pub fn load() -> Result<Self> {
        let config_paths = [
            "trip-extractor.toml",
            "config/trip-extractor.toml",
            "~/.config/trip-extractor/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        config.apply_env();
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Overlay environment variables onto the current values
    pub fn apply_env(&mut self) {
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            if !api_key.trim().is_empty() {
                self.llm.api_key = Some(api_key.clone());
                if self.transcription.api_key.is_none() {
                    self.transcription.api_key = Some(api_key);
                }
            }
        }

        if let Ok(endpoint) = std::env::var("TRIP_EXTRACTOR_LLM_ENDPOINT") {
            self.llm.endpoint = Some(endpoint);
            self.llm.provider = LLMProvider::LMStudio;
        }

        if let Ok(model) = std::env::var("TRIP_EXTRACTOR_LLM_MODEL") {
            self.llm.model = model;
        }

        if let Ok(cookie) = std::env::var("TRIP_EXTRACTOR_INSTAGRAM_SESSION") {
            self.instagram.session_cookie = Some(cookie);
        }

        if let Ok(timeout) = std::env::var("TRIP_EXTRACTOR_FETCH_TIMEOUT") {
            self.http.fetch_timeout_secs = timeout.parse().unwrap_or(self.http.fetch_timeout_secs);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.http.fetch_timeout_secs == 0 {
            return Err(anyhow!("fetch_timeout_secs must be greater than 0"));
        }

        if self.llm.max_tokens == 0 {
            return Err(anyhow!("llm.max_tokens must be greater than 0"));
        }

        if self.llm.provider == LLMProvider::LMStudio && self.llm.endpoint.is_none() {
            return Err(anyhow!("LMStudio provider requires an endpoint"));
        }

        if self.transcription.use_hosted && self.transcription.api_key.is_none() {
            return Err(anyhow!("hosted transcription requires an API key"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig {
                fetch_timeout_secs: 10,
            },
            llm: LLMConfig::default(),
            transcription: TranscriptionConfig {
                use_hosted: false,
                model: "base".to_string(),
                api_key: None,
            },
            instagram: InstagramConfig {
                session_cookie: None,
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.config.llm.api_key = Some(api_key);
        self
    }

    pub fn with_llm_endpoint(mut self, endpoint: String) -> Self {
        self.config.llm.endpoint = Some(endpoint);
        self.config.llm.provider = LLMProvider::LMStudio;
        self
    }

    pub fn with_llm_model(mut self, model: String) -> Self {
        self.config.llm.model = model;
        self
    }

    pub fn with_fetch_timeout(mut self, secs: u64) -> Self {
        self.config.http.fetch_timeout_secs = secs;
        self
    }

    pub fn with_session_cookie(mut self, cookie: String) -> Self {
        self.config.instagram.session_cookie = Some(cookie);
        self
    }

    pub fn with_hosted_transcription(mut self, api_key: String) -> Self {
        self.config.transcription.use_hosted = true;
        self.config.transcription.api_key = Some(api_key);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http.fetch_timeout_secs, 10);
        assert!(!config.transcription.use_hosted);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_api_key("sk-test".to_string())
            .with_fetch_timeout(30)
            .with_session_cookie("abc".to_string())
            .build();

        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.http.fetch_timeout_secs, 30);
        assert_eq!(config.instagram.session_cookie.as_deref(), Some("abc"));
    }

    #[test]
    fn test_validation_catches_bad_values() {
        let mut config = Config::default();
        config.http.fetch_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.transcription.use_hosted = true;
        config.transcription.api_key = None;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.llm.provider = LLMProvider::LMStudio;
        config.llm.endpoint = None;
        assert!(config.validate().is_err());
    }
}
