//! Settings configuration loaded from TOML files.
//!
//! Non-sensitive configuration stored in the XDG config directory
//! (`~/.config/vitals/config.toml`).

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default TOML configuration file content
const DEFAULT_CONFIG_TOML: &str = r#"# vitals configuration file
# Located at: ~/.config/vitals/config.toml
#
# Secrets are loaded from environment variables:
#   - OPENAI_API_KEY

[gateway]
host = "127.0.0.1"
port = 8000

[logging]
level = "info"

[openai]
# "/v1" is appended when missing
base_url = "https://api.openai.com"

[completion]
model = "gpt-3.5-turbo"
temperature = 0.7
max_tokens = 800
connect_timeout_secs = 10
timeout_secs = 30

[retrieval]
# Keyword prefilter + embedding cache + vector snapshot. false = embed every query.
use_optimized = true
cache_ttl_seconds = 300
enable_keyword_search = true
embedding_model = "text-embedding-ada-002"
# embedding_dim = 1536
# Bound the query embedding cache; unbounded when omitted.
# embedding_cache_size = 1000
connect_timeout_secs = 10
timeout_secs = 30
chat_top_k = 3
# knowledge_db_path_override = "/var/lib/vitals/knowledge.sqlite3"
"#;

/// Settings loaded from TOML configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    /// Gateway server configuration
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Shared OpenAI-compatible endpoint settings
    #[serde(default)]
    pub openai: OpenAiSettings,

    /// Chat completion settings
    #[serde(default)]
    pub completion: CompletionSettings,

    /// Knowledge retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalToolsSettings,
}

/// Gateway server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewaySettings {
    /// Host to bind to
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Log level (error, warn, info, debug, trace), used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// OpenAI-compatible endpoint settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAiSettings {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

/// Chat completion settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompletionSettings {
    #[serde(default = "default_completion_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Retrieval configuration as written in the TOML file.
///
/// Every field is optional; [`crate::RetrievalSettings`] fills the gaps.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RetrievalToolsSettings {
    /// Use the optimized (cached, keyword-first) retriever
    pub use_optimized: Option<bool>,

    /// Vector snapshot time-to-live in seconds
    pub cache_ttl_seconds: Option<u64>,

    /// Try the keyword prefilter before embedding
    pub enable_keyword_search: Option<bool>,

    /// Maximum cached query embeddings (unbounded when absent)
    pub embedding_cache_size: Option<usize>,

    /// Embedding model name
    pub embedding_model: Option<String>,

    /// Expected embedding dimension (if known)
    pub embedding_dim: Option<usize>,

    pub connect_timeout_secs: Option<u64>,

    pub timeout_secs: Option<u64>,

    /// Snippets retrieved for a plain chat message
    pub chat_top_k: Option<usize>,

    /// Optional override for the knowledge DB path
    pub knowledge_db_path_override: Option<String>,
}

// Default value functions

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_completion_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    800
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
        }
    }
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: default_completion_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    ConfigDirNotFound,
}

impl Settings {
    /// Load settings from the TOML configuration file.
    ///
    /// If the config file doesn't exist, creates it with default values.
    pub fn load() -> Result<Self, SettingsError> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!("Creating default configuration at {:?}", config_path);
            Self::create_default_config(&config_path)?;
        }

        let content = fs::read_to_string(&config_path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(content)?;
        Ok(settings)
    }

    /// Serialize settings to TOML content.
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the configuration file path.
    ///
    /// `VITALS_CONFIG_PATH` wins; otherwise `~/.config/vitals/config.toml`.
    pub fn config_path() -> Result<PathBuf, SettingsError> {
        if let Ok(path) = std::env::var("VITALS_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_dir = dirs::config_dir()
            .ok_or(SettingsError::ConfigDirNotFound)?
            .join("vitals");

        Ok(config_dir.join("config.toml"))
    }

    fn create_default_config(path: &PathBuf) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, DEFAULT_CONFIG_TOML)?;

        Ok(())
    }

    /// Save settings to a specific file path.
    pub fn save_to_path(&self, path: &PathBuf) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = self.to_toml()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the HTTP bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.gateway.host, self.gateway.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.gateway.host, "127.0.0.1");
        assert_eq!(settings.gateway.port, 8000);
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.openai.base_url, "https://api.openai.com");
        assert_eq!(settings.completion.model, "gpt-3.5-turbo");
        assert_eq!(settings.completion.max_tokens, 800);
        assert_eq!(settings.completion.connect_timeout_secs, 10);
        assert_eq!(settings.completion.timeout_secs, 30);
        assert!(settings.retrieval.use_optimized.is_none());
        assert!(settings.retrieval.embedding_cache_size.is_none());
    }

    #[test]
    fn test_bind_addr() {
        let settings = Settings::default();
        assert_eq!(settings.bind_addr(), "127.0.0.1:8000");
    }

    #[test]
    fn test_default_toml_parses() {
        let settings = Settings::from_toml(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(settings.retrieval.use_optimized, Some(true));
        assert_eq!(settings.retrieval.cache_ttl_seconds, Some(300));
        assert_eq!(settings.retrieval.enable_keyword_search, Some(true));
        assert_eq!(settings.retrieval.chat_top_k, Some(3));
        assert!(settings.retrieval.embedding_cache_size.is_none());
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
[gateway]
host = "0.0.0.0"
port = 9000

[openai]
base_url = "https://proxy.example.com/v1"

[completion]
model = "gpt-4o-mini"
temperature = 0.2

[retrieval]
use_optimized = false
cache_ttl_seconds = 60
embedding_cache_size = 500
knowledge_db_path_override = "/tmp/kb.sqlite3"
"#;

        let settings = Settings::from_toml(toml).unwrap();

        assert_eq!(settings.bind_addr(), "0.0.0.0:9000");
        assert_eq!(settings.openai.base_url, "https://proxy.example.com/v1");
        assert_eq!(settings.completion.model, "gpt-4o-mini");
        assert!((settings.completion.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(settings.completion.max_tokens, 800);
        assert_eq!(settings.retrieval.use_optimized, Some(false));
        assert_eq!(settings.retrieval.cache_ttl_seconds, Some(60));
        assert_eq!(settings.retrieval.embedding_cache_size, Some(500));
        assert_eq!(
            settings.retrieval.knowledge_db_path_override.as_deref(),
            Some("/tmp/kb.sqlite3")
        );
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.gateway.port = 8123;
        settings.retrieval.enable_keyword_search = Some(false);
        settings.save_to_path(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let reloaded = Settings::from_toml(&content).unwrap();
        assert_eq!(reloaded.gateway.port, 8123);
        assert_eq!(reloaded.retrieval.enable_keyword_search, Some(false));
    }
}
