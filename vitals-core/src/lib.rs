pub mod config;

pub use config::{
    CompletionSettings, Config, ConfigError, GatewaySettings, LoggingSettings, OpenAiSettings,
    RetrievalSettings, RetrievalToolsSettings, Secrets, SecretsError, Settings, SettingsError,
    load_dotenv,
};
