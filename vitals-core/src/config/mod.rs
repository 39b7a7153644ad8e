//! Configuration management for vitals.
//!
//! Secrets come from environment variables, settings from a TOML file.
//!
//! # Configuration Sources
//!
//! ## Secrets (Environment Variables)
//! - `OPENAI_API_KEY` - key for the embedding and chat completion endpoints
//!
//! ## Settings (TOML File)
//! Located at `~/.config/vitals/config.toml`:
//! ```toml
//! [gateway]
//! host = "127.0.0.1"
//! port = 8000
//!
//! [openai]
//! base_url = "https://api.openai.com"
//!
//! [completion]
//! model = "gpt-3.5-turbo"
//!
//! [retrieval]
//! use_optimized = true
//! cache_ttl_seconds = 300
//! enable_keyword_search = true
//! ```

pub mod retrieval;
mod secrets;
mod settings;

pub use retrieval::RetrievalSettings;
pub use secrets::{Secrets, SecretsError};
pub use settings::{
    CompletionSettings, GatewaySettings, LoggingSettings, OpenAiSettings, RetrievalToolsSettings,
    Settings, SettingsError,
};

/// Combined configuration containing both secrets and settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Secrets loaded from environment variables
    pub secrets: Secrets,
    /// Settings loaded from TOML configuration file
    pub settings: Settings,
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Secrets error: {0}")]
    Secrets(#[from] SecretsError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file cannot be read or parsed, or if a
    /// value is out of range (a zero timeout, top-k or cache size).
    pub fn load() -> Result<Self, ConfigError> {
        let secrets = Secrets::from_env()?;
        let settings = Settings::load()?;
        let config = Self { secrets, settings };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let retrieval = &self.settings.retrieval;
        if retrieval.chat_top_k == Some(0) {
            return Err(ConfigError::Invalid {
                field: "retrieval.chat_top_k",
                reason: "must be at least 1".to_string(),
            });
        }
        if retrieval.embedding_cache_size == Some(0) {
            return Err(ConfigError::Invalid {
                field: "retrieval.embedding_cache_size",
                reason: "must be at least 1 (omit it for an unbounded cache)".to_string(),
            });
        }
        if retrieval.timeout_secs == Some(0) {
            return Err(ConfigError::Invalid {
                field: "retrieval.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if retrieval.connect_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid {
                field: "retrieval.connect_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.settings.completion.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "completion.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Resolved retrieval settings for the knowledge crate.
    pub fn retrieval_settings(&self) -> RetrievalSettings {
        let mut resolved = RetrievalSettings::from(&self.settings.retrieval);
        resolved.base_url = self.settings.openai.base_url.clone();
        resolved.api_key = self.secrets.openai_api_key.clone();
        resolved
    }

    /// Get the HTTP bind address.
    pub fn bind_addr(&self) -> String {
        self.settings.bind_addr()
    }

    /// Get the OpenAI API key (if configured).
    pub fn openai_api_key(&self) -> Option<&str> {
        self.secrets.openai_api_key.as_deref()
    }
}

/// Load .env file if it exists (for development convenience).
///
/// This is called automatically by `Config::load()` but is also
/// exported for use in other contexts.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(settings: Settings) -> Config {
        Config {
            secrets: Secrets {
                openai_api_key: Some("sk-test".to_string()),
            },
            settings,
        }
    }

    #[test]
    fn retrieval_settings_carry_key_and_base_url() {
        let mut settings = Settings::default();
        settings.openai.base_url = "https://llm.example.com".to_string();
        let config = config_with(settings);

        let resolved = config.retrieval_settings();
        assert_eq!(resolved.base_url, "https://llm.example.com");
        assert_eq!(resolved.api_key.as_deref(), Some("sk-test"));
        assert_eq!(resolved.cache_ttl_seconds, 300);
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let mut settings = Settings::default();
        settings.retrieval.chat_top_k = Some(0);
        let config = config_with(settings);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "retrieval.chat_top_k",
                ..
            })
        ));
    }

    #[test]
    fn zero_cache_size_is_rejected() {
        let mut settings = Settings::default();
        settings.retrieval.embedding_cache_size = Some(0);
        assert!(config_with(settings).validate().is_err());
    }

    #[test]
    fn zero_retrieval_timeouts_are_rejected() {
        let mut settings = Settings::default();
        settings.retrieval.timeout_secs = Some(0);
        assert!(matches!(
            config_with(settings).validate(),
            Err(ConfigError::Invalid {
                field: "retrieval.timeout_secs",
                ..
            })
        ));

        let mut settings = Settings::default();
        settings.retrieval.connect_timeout_secs = Some(0);
        assert!(matches!(
            config_with(settings).validate(),
            Err(ConfigError::Invalid {
                field: "retrieval.connect_timeout_secs",
                ..
            })
        ));
    }

    #[test]
    fn defaults_validate() {
        assert!(config_with(Settings::default()).validate().is_ok());
    }
}
