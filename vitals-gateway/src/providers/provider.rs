//! Provider trait for text-completion backends.

use std::pin::Pin;

use futures::Stream;

/// Incremental completion text. The stream ends after the first error.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Provider error types
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("completion request timed out")]
    Timeout,
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },
    #[error("No content in response")]
    NoContent,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
}

/// A prompt-in, text-out completion service.
///
/// Implementations make a single attempt; there is no retry.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Current model
    fn model(&self) -> &str;

    /// Complete `user` under the `system` instructions.
    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError>;

    /// Same as [`CompletionProvider::complete`], delivered as it is generated.
    async fn complete_stream(
        &self,
        system: &str,
        user: &str,
    ) -> Result<CompletionStream, ProviderError>;
}
