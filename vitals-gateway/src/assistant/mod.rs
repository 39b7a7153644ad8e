//! Retrieval-augmented health assistant.

pub mod agent;
pub mod prompt;

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tracing::{error, info, warn};

use vitals_knowledge::RetrievalService;

use crate::providers::{CompletionProvider, ProviderError};
pub use agent::{AGENT_TOP_K, HealthTask, SleepSchedule, UserProfile, render_task_prompt};
pub use prompt::{SYSTEM_PROMPT, render_chat_prompt, render_reference_context};

/// Reply used when a profile consultation cannot be completed.
pub const AGENT_APOLOGY: &str = "抱歉，我现在无法处理您的请求。请稍后再试。";

/// Assistant error types
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("AI service call failed: {0}")]
    Provider(#[from] ProviderError),
}

/// Chat text streamed to the client. Failures arrive as a final apology
/// piece instead of an error.
pub type ReplyStream = BoxStream<'static, String>;

pub fn stream_apology(err: &dyn std::fmt::Display) -> String {
    format!("抱歉，AI服务暂时不可用: {err}")
}

#[derive(Clone)]
pub struct HealthAssistant {
    retrieval: Arc<RetrievalService>,
    provider: Arc<dyn CompletionProvider>,
    top_k: usize,
}

impl HealthAssistant {
    pub fn new(
        retrieval: Arc<RetrievalService>,
        provider: Arc<dyn CompletionProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            retrieval,
            provider,
            top_k: top_k.max(1),
        }
    }

    pub fn retrieval(&self) -> &Arc<RetrievalService> {
        &self.retrieval
    }

    /// Retrieve references for `message` and render the chat prompt.
    pub async fn build_prompt(&self, message: &str) -> String {
        let results = self.retrieval.rank_top_k(message, self.top_k).await;
        info!(references = results.len(), "references retrieved");
        render_chat_prompt(&render_reference_context(&results), message)
    }

    pub async fn respond(&self, message: &str) -> Result<String, AssistantError> {
        if message.trim().is_empty() {
            return Err(AssistantError::EmptyMessage);
        }
        let prompt = self.build_prompt(message).await;
        let reply = self.provider.complete(SYSTEM_PROMPT, &prompt).await?;
        Ok(reply)
    }

    pub async fn respond_stream(&self, message: &str) -> ReplyStream {
        let prompt = self.build_prompt(message).await;
        self.stream_prompt(prompt).await
    }

    /// Profile consultation. Never fails; errors become [`AGENT_APOLOGY`].
    pub async fn respond_with_profile(&self, message: &str, profile: &UserProfile) -> String {
        let (task, prompt) = self.build_agent_prompt(message, profile).await;
        match self.provider.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(reply) => reply,
            Err(err) => {
                error!(task = task.label(), error = %err, "health consultation failed");
                AGENT_APOLOGY.to_string()
            }
        }
    }

    pub async fn respond_with_profile_stream(
        &self,
        message: &str,
        profile: &UserProfile,
    ) -> ReplyStream {
        let (_, prompt) = self.build_agent_prompt(message, profile).await;
        self.stream_prompt(prompt).await
    }

    /// Store a knowledge snippet; `false` when embedding or persistence fails.
    pub async fn add_knowledge(&self, content: &str, source: Option<&str>) -> bool {
        self.retrieval.ingest(content, source).await
    }

    async fn build_agent_prompt(
        &self,
        message: &str,
        profile: &UserProfile,
    ) -> (HealthTask, String) {
        let task = HealthTask::classify(message);
        let results = self.retrieval.rank_top_k(message, AGENT_TOP_K).await;
        let context = results
            .iter()
            .map(|result| result.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        info!(task = task.label(), references = results.len(), "health task classified");
        (task, render_task_prompt(task, message, profile, &context))
    }

    async fn stream_prompt(&self, prompt: String) -> ReplyStream {
        match self.provider.complete_stream(SYSTEM_PROMPT, &prompt).await {
            Ok(pieces) => pieces
                .map(|piece| match piece {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(error = %err, "completion stream interrupted");
                        stream_apology(&err)
                    }
                })
                .boxed(),
            Err(err) => {
                error!(error = %err, "failed to start completion stream");
                stream::once(async move { stream_apology(&err) }).boxed()
            }
        }
    }
}
