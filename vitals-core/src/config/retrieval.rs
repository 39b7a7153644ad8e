//! Resolved retrieval settings.
//!
//! These are the non-optional values used by `vitals-knowledge`. They are
//! created from the user-facing [`RetrievalToolsSettings`] TOML struct via
//! `From`; the endpoint and key are filled in by [`crate::Config`].

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::settings::RetrievalToolsSettings;

/// Resolved retrieval settings (all values filled with defaults).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Never serialized; comes from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default)]
    pub embedding_dim: Option<usize>,
    #[serde(default = "default_true")]
    pub use_optimized: bool,
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    #[serde(default = "default_true")]
    pub enable_keyword_search: bool,
    /// `None` keeps every query embedding until the cache is cleared.
    #[serde(default)]
    pub embedding_cache_size: Option<usize>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_chat_top_k")]
    pub chat_top_k: usize,
    #[serde(default)]
    pub knowledge_db_path_override: Option<PathBuf>,
    /// Override the data directory (primarily for tests).
    #[serde(default)]
    pub data_root_override: Option<PathBuf>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            embedding_model: default_embedding_model(),
            embedding_dim: None,
            use_optimized: true,
            cache_ttl_seconds: default_cache_ttl_seconds(),
            enable_keyword_search: true,
            embedding_cache_size: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: default_timeout_secs(),
            chat_top_k: default_chat_top_k(),
            knowledge_db_path_override: None,
            data_root_override: None,
        }
    }
}

impl RetrievalSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl_seconds() -> u64 {
    300
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_chat_top_k() -> usize {
    3
}

impl From<&RetrievalToolsSettings> for RetrievalSettings {
    fn from(value: &RetrievalToolsSettings) -> Self {
        let mut settings = RetrievalSettings::default();
        if let Some(use_optimized) = value.use_optimized {
            settings.use_optimized = use_optimized;
        }
        if let Some(ttl) = value.cache_ttl_seconds {
            settings.cache_ttl_seconds = ttl;
        }
        if let Some(enabled) = value.enable_keyword_search {
            settings.enable_keyword_search = enabled;
        }
        if let Some(size) = value.embedding_cache_size {
            settings.embedding_cache_size = Some(size);
        }
        if let Some(model) = &value.embedding_model {
            settings.embedding_model = model.clone();
        }
        if let Some(dim) = value.embedding_dim {
            settings.embedding_dim = Some(dim);
        }
        if let Some(secs) = value.connect_timeout_secs {
            settings.connect_timeout_secs = secs;
        }
        if let Some(secs) = value.timeout_secs {
            settings.timeout_secs = secs;
        }
        if let Some(k) = value.chat_top_k {
            settings.chat_top_k = k;
        }
        if let Some(path) = &value.knowledge_db_path_override {
            settings.knowledge_db_path_override = Some(PathBuf::from(path));
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_overrides_keep_defaults() {
        let resolved = RetrievalSettings::from(&RetrievalToolsSettings::default());
        assert!(resolved.use_optimized);
        assert!(resolved.enable_keyword_search);
        assert_eq!(resolved.cache_ttl(), Duration::from_secs(300));
        assert_eq!(resolved.connect_timeout(), Duration::from_secs(10));
        assert_eq!(resolved.timeout(), Duration::from_secs(30));
        assert_eq!(resolved.embedding_model, "text-embedding-ada-002");
        assert_eq!(resolved.chat_top_k, 3);
        assert!(resolved.embedding_cache_size.is_none());
    }

    #[test]
    fn overrides_apply() {
        let raw = RetrievalToolsSettings {
            use_optimized: Some(false),
            cache_ttl_seconds: Some(5),
            enable_keyword_search: Some(false),
            embedding_cache_size: Some(10),
            embedding_dim: Some(1536),
            knowledge_db_path_override: Some("/tmp/kb.sqlite3".to_string()),
            ..Default::default()
        };
        let resolved = RetrievalSettings::from(&raw);
        assert!(!resolved.use_optimized);
        assert!(!resolved.enable_keyword_search);
        assert_eq!(resolved.cache_ttl_seconds, 5);
        assert_eq!(resolved.embedding_cache_size, Some(10));
        assert_eq!(resolved.embedding_dim, Some(1536));
        assert_eq!(
            resolved.knowledge_db_path_override,
            Some(PathBuf::from("/tmp/kb.sqlite3"))
        );
    }
}
