pub mod assistant;
pub mod providers;
pub mod server;
pub mod state;

pub use assistant::{AssistantError, HealthAssistant, HealthTask, UserProfile};
pub use providers::{CompletionProvider, CompletionStream, OpenAiCompatibleClient, ProviderError};
pub use state::AppState;
