//! Secrets configuration loaded from environment variables only.
//!
//! API keys never live in the TOML file.

use std::env;

/// Secrets loaded exclusively from environment variables.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    /// OpenAI-compatible API key (env: OPENAI_API_KEY)
    pub openai_api_key: Option<String>,
}

/// Errors that can occur when loading secrets
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("Secret {0} is set but empty")]
    EmptySecret(&'static str),
}

impl Secrets {
    /// Load secrets from environment variables.
    ///
    /// This function also loads .env file if present (for development),
    /// but production should rely on actual environment variables.
    pub fn from_env() -> Result<Self, SecretsError> {
        // Load .env file if present (development convenience)
        let _ = dotenvy::dotenv();

        Self::from_env_inner()
    }

    /// Internal method to load from environment without loading .env
    pub(crate) fn from_env_inner() -> Result<Self, SecretsError> {
        let openai_api_key = match env::var("OPENAI_API_KEY") {
            Ok(value) if value.trim().is_empty() => {
                return Err(SecretsError::EmptySecret("OPENAI_API_KEY"));
            }
            Ok(value) => Some(value),
            Err(_) => None,
        };

        Ok(Self { openai_api_key })
    }

    /// Whether an API key is available.
    pub fn has_openai_key(&self) -> bool {
        self.openai_api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Use a mutex to ensure tests that modify environment variables don't run concurrently
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_secrets_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { env::set_var("OPENAI_API_KEY", "sk-test") };

        let secrets = Secrets::from_env_inner().unwrap();
        assert_eq!(secrets.openai_api_key, Some("sk-test".to_string()));
        assert!(secrets.has_openai_key());
    }

    #[test]
    fn test_missing_key_is_not_fatal() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { env::remove_var("OPENAI_API_KEY") };

        let secrets = Secrets::from_env_inner().unwrap();
        assert!(secrets.openai_api_key.is_none());
        assert!(!secrets.has_openai_key());
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { env::set_var("OPENAI_API_KEY", "  ") };

        let result = Secrets::from_env_inner();
        unsafe { env::remove_var("OPENAI_API_KEY") };
        assert!(matches!(result, Err(SecretsError::EmptySecret("OPENAI_API_KEY"))));
    }
}
