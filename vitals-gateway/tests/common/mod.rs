#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;

use vitals_gateway::providers::{CompletionProvider, CompletionStream, ProviderError};
use vitals_gateway::state::AppState;
use vitals_knowledge::{
    Embedder, KnowledgeError, KnowledgeResult, KnowledgeStore, RetrievalService,
    RetrievalSettings,
};

/// Deterministic bag-of-characters embedding.
#[derive(Debug, Default)]
pub struct CharEmbedder;

#[async_trait]
impl Embedder for CharEmbedder {
    async fn embed(&self, text: &str) -> KnowledgeResult<Vec<f32>> {
        let mut vector = vec![0.0f32; 64];
        for ch in text.chars().filter(|c| !c.is_whitespace()) {
            vector[(ch as usize) % 64] += 1.0;
        }
        Ok(vector)
    }
}

#[derive(Debug, Default)]
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> KnowledgeResult<Vec<f32>> {
        Err(KnowledgeError::EmbeddingTimeout)
    }
}

/// Completion provider with canned output that records every prompt.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    pieces: Option<Vec<String>>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedProvider {
    /// Streams `pieces`; `complete` returns them joined.
    pub fn replying(pieces: &[&str]) -> Self {
        Self {
            pieces: Some(pieces.iter().map(|p| p.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    /// `(system, user)` pairs in call order.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }

    fn record(&self, system: &str, user: &str) {
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));
    }

    fn unavailable() -> ProviderError {
        ProviderError::ApiError {
            status: 503,
            message: "upstream unavailable".to_string(),
        }
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        self.record(system, user);
        match &self.pieces {
            Some(pieces) => Ok(pieces.concat()),
            None => Err(Self::unavailable()),
        }
    }

    async fn complete_stream(
        &self,
        system: &str,
        user: &str,
    ) -> Result<CompletionStream, ProviderError> {
        self.record(system, user);
        match &self.pieces {
            Some(pieces) => {
                let items: Vec<Result<String, ProviderError>> =
                    pieces.iter().cloned().map(Ok).collect();
                Ok(futures::stream::iter(items).boxed())
            }
            None => Err(Self::unavailable()),
        }
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub provider: Arc<ScriptedProvider>,
    pub store: KnowledgeStore,
}

pub async fn test_app(
    use_optimized: bool,
    embedder: Arc<dyn Embedder>,
    provider: ScriptedProvider,
) -> TestApp {
    let settings = RetrievalSettings {
        use_optimized,
        ..Default::default()
    };
    let store = KnowledgeStore::open_in_memory()
        .await
        .expect("in-memory store");
    let retrieval = Arc::new(RetrievalService::new(settings, embedder, store.clone()));
    let provider = Arc::new(provider);
    let state = Arc::new(AppState::new(retrieval, provider.clone(), 3));
    TestApp {
        state,
        provider,
        store,
    }
}
