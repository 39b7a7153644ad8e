use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{Retriever, embed_and_store, is_blank_request};
use crate::RetrievalSettings;
use crate::cache::EmbeddingCache;
use crate::embeddings::Embedder;
use crate::errors::KnowledgeResult;
use crate::keyword::{KeywordPrefilter, is_high_quality};
use crate::models::{CacheStats, ScoredResult, ServiceInfo, ServiceKind};
use crate::snapshot::SnapshotManager;
use crate::storage::KnowledgeStore;

/// Tiered retrieval: keyword prefilter, cached query embedding, fresh
/// embedding, then the keyword result as a last resort.
pub struct OptimizedRetriever {
    embedder: Arc<dyn Embedder>,
    snapshots: SnapshotManager,
    cache: EmbeddingCache,
    prefilter: KeywordPrefilter,
    keyword_search: bool,
}

impl OptimizedRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: KnowledgeStore,
        settings: &RetrievalSettings,
    ) -> Self {
        Self {
            embedder,
            snapshots: SnapshotManager::new(store, settings.cache_ttl()),
            cache: EmbeddingCache::new(settings.embedding_cache_size),
            prefilter: KeywordPrefilter::builtin(),
            keyword_search: settings.enable_keyword_search,
        }
    }

    pub fn with_prefilter(mut self, prefilter: KeywordPrefilter) -> Self {
        self.prefilter = prefilter;
        self
    }

    pub fn embedding_cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    pub fn snapshots(&self) -> &SnapshotManager {
        &self.snapshots
    }

    async fn score(&self, embedding: &[f32], k: usize) -> Vec<ScoredResult> {
        let snapshot = self.snapshots.current().await;
        if snapshot.is_empty() {
            warn!("vector snapshot is empty");
            return Vec::new();
        }
        snapshot.score(embedding, k)
    }
}

#[async_trait]
impl Retriever for OptimizedRetriever {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Optimized
    }

    fn info(&self) -> ServiceInfo {
        ServiceInfo {
            service_type: ServiceKind::Optimized,
            service_class: ServiceKind::Optimized.class_name().to_string(),
            features: vec![
                "keyword_prefilter".to_string(),
                "embedding_cache".to_string(),
                "vector_snapshot".to_string(),
                "fallback_chain".to_string(),
            ],
            cache_ttl: self.snapshots.ttl().as_secs(),
            keyword_search: self.keyword_search,
            cache_size: self.cache.capacity(),
        }
    }

    async fn rank_top_k(&self, query: &str, k: usize) -> Vec<ScoredResult> {
        if is_blank_request(query, k) {
            return Vec::new();
        }
        let started = Instant::now();
        let keyword_results = self.prefilter.match_query(query, k);

        if self.keyword_search && is_high_quality(&keyword_results) {
            info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "keyword search answered query"
            );
            return keyword_results;
        }

        // A cached vector is never re-embedded; an empty score falls
        // through to the keyword results.
        let (embedding, cached) = match self.cache.get(query).await {
            Some(embedding) => (embedding, true),
            None => match self.embedder.embed(query).await {
                Ok(embedding) => {
                    self.cache.put(query, embedding.clone()).await;
                    (embedding, false)
                }
                Err(err) => {
                    warn!(error = %err, transient = err.is_transient(), "query embedding failed; falling back to keyword results");
                    return keyword_results;
                }
            },
        };

        let results = self.score(&embedding, k).await;
        if !results.is_empty() {
            info!(
                cached,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "vector search answered query"
            );
            return results;
        }

        warn!(
            results = keyword_results.len(),
            "vector search produced nothing; falling back to keyword results"
        );
        keyword_results
    }

    async fn try_ingest(&self, content: &str, source: Option<&str>) -> KnowledgeResult<i64> {
        let id = embed_and_store(
            self.embedder.as_ref(),
            self.snapshots.store(),
            content,
            source,
        )
        .await?;
        self.snapshots.invalidate().await;
        self.cache.clear().await;
        Ok(id)
    }

    async fn cache_stats(&self) -> Option<CacheStats> {
        Some(CacheStats {
            embedding_cache_size: self.cache.len().await,
            vector_cache_size: self.snapshots.cached_len().await,
            cache_ttl: self.snapshots.ttl().as_secs(),
            last_refresh: self.snapshots.last_refresh().await,
        })
    }

    async fn clear_cache(&self) -> bool {
        self.cache.clear().await;
        self.snapshots.invalidate().await;
        info!("retrieval caches cleared");
        true
    }
}
