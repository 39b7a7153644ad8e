#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use vitals_knowledge::{
    Embedder, KeywordPrefilter, KnowledgeError, KnowledgeResult, KnowledgeStore,
    RetrievalService, RetrievalSettings,
};

pub const DIM: usize = 256;

/// Deterministic bag-of-characters embedding: texts sharing characters point
/// in similar directions.
#[derive(Debug, Default)]
pub struct HashingEmbedder;

impl HashingEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; DIM];
        for ch in text.chars().filter(|c| !c.is_whitespace()) {
            let mut hash: u32 = 0x811c_9dc5;
            for byte in (ch as u32).to_le_bytes() {
                hash ^= u32::from(byte);
                hash = hash.wrapping_mul(0x0100_0193);
            }
            vector[hash as usize % DIM] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> KnowledgeResult<Vec<f32>> {
        Ok(Self::vector(text))
    }
}

/// Always unreachable.
#[derive(Debug, Default)]
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> KnowledgeResult<Vec<f32>> {
        Err(KnowledgeError::Embedding(
            "embedding service unreachable".to_string(),
        ))
    }
}

/// Wraps [`HashingEmbedder`] and counts calls.
#[derive(Debug, Default)]
pub struct CountingEmbedder {
    calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    async fn embed(&self, text: &str) -> KnowledgeResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(HashingEmbedder::vector(text))
    }
}

pub fn settings(use_optimized: bool, enable_keyword_search: bool) -> RetrievalSettings {
    RetrievalSettings {
        use_optimized,
        enable_keyword_search,
        cache_ttl_seconds: 300,
        ..Default::default()
    }
}

pub async fn memory_store() -> KnowledgeStore {
    KnowledgeStore::open_in_memory().await.expect("in-memory store")
}

pub async fn open_service(
    settings: RetrievalSettings,
    embedder: Arc<dyn Embedder>,
) -> (RetrievalService, KnowledgeStore) {
    let store = memory_store().await;
    let service = RetrievalService::new(settings, embedder, store.clone());
    (service, store)
}

pub async fn open_service_without_topics(
    settings: RetrievalSettings,
    embedder: Arc<dyn Embedder>,
) -> (RetrievalService, KnowledgeStore) {
    let (service, store) = open_service(settings, embedder).await;
    (service.with_prefilter(KeywordPrefilter::new(Vec::new())), store)
}

/// Store `content` with the hashing embedding, bypassing any retriever.
pub async fn seed(store: &KnowledgeStore, content: &str, source: &str) -> i64 {
    store
        .insert_snippet(content, &HashingEmbedder::vector(content), Some(source), None)
        .await
        .expect("seed snippet")
}
