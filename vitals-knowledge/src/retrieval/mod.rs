//! Retrieval strategies behind a common ranking and ingest contract.

mod optimized;
mod standard;

pub use optimized::OptimizedRetriever;
pub use standard::StandardRetriever;

use async_trait::async_trait;
use tracing::{error, info};

use crate::embeddings::Embedder;
use crate::errors::{KnowledgeError, KnowledgeResult};
use crate::models::{CacheStats, ScoredResult, ServiceInfo, ServiceKind};
use crate::storage::KnowledgeStore;

#[async_trait]
pub trait Retriever: Send + Sync {
    fn kind(&self) -> ServiceKind;

    fn info(&self) -> ServiceInfo;

    /// Rank at most `k` snippets for `query`, best first.
    ///
    /// Never fails: every error is logged and degrades to a smaller, possibly
    /// empty, result.
    async fn rank_top_k(&self, query: &str, k: usize) -> Vec<ScoredResult>;

    /// Embed and persist a snippet, returning its id.
    async fn try_ingest(&self, content: &str, source: Option<&str>) -> KnowledgeResult<i64>;

    async fn ingest(&self, content: &str, source: Option<&str>) -> bool {
        match self.try_ingest(content, source).await {
            Ok(id) => {
                info!(id, content_len = content.len(), "knowledge snippet stored");
                true
            }
            Err(err) => {
                error!(error = %err, "failed to store knowledge snippet");
                false
            }
        }
    }

    /// `None` when this strategy keeps no caches.
    async fn cache_stats(&self) -> Option<CacheStats> {
        None
    }

    /// Returns `false` when this strategy keeps no caches.
    async fn clear_cache(&self) -> bool {
        false
    }
}

/// Embed `content` and write it to `store` as one record.
pub(crate) async fn embed_and_store(
    embedder: &dyn Embedder,
    store: &KnowledgeStore,
    content: &str,
    source: Option<&str>,
) -> KnowledgeResult<i64> {
    if content.trim().is_empty() {
        return Err(KnowledgeError::EmptyContent);
    }
    let embedding = embedder.embed(content).await?;
    store.insert_snippet(content, &embedding, source, None).await
}

pub(crate) fn is_blank_request(query: &str, k: usize) -> bool {
    k == 0 || query.trim().is_empty()
}
