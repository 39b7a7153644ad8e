use std::sync::Arc;

use vitals_knowledge::RetrievalService;

use crate::assistant::HealthAssistant;
use crate::providers::CompletionProvider;

/// Shared application state handed to every request handler.
pub struct AppState {
    pub retrieval: Arc<RetrievalService>,
    pub assistant: HealthAssistant,
}

impl AppState {
    pub fn new(
        retrieval: Arc<RetrievalService>,
        provider: Arc<dyn CompletionProvider>,
        chat_top_k: usize,
    ) -> Self {
        let assistant = HealthAssistant::new(Arc::clone(&retrieval), provider, chat_top_k);
        Self {
            retrieval,
            assistant,
        }
    }
}
