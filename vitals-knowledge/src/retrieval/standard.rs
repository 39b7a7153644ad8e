use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{Retriever, embed_and_store, is_blank_request};
use crate::embeddings::Embedder;
use crate::errors::KnowledgeResult;
use crate::models::{ScoredResult, ServiceInfo, ServiceKind};
use crate::snapshot::VectorSnapshot;
use crate::storage::KnowledgeStore;

/// Embeds every query and scores it against a fresh read of the store.
pub struct StandardRetriever {
    embedder: Arc<dyn Embedder>,
    store: KnowledgeStore,
}

impl StandardRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, store: KnowledgeStore) -> Self {
        Self { embedder, store }
    }

    async fn search(&self, query: &str, k: usize) -> KnowledgeResult<Vec<ScoredResult>> {
        let embedding = self.embedder.embed(query).await?;
        let snapshot = VectorSnapshot::load(&self.store).await?;
        Ok(snapshot.score(&embedding, k))
    }
}

#[async_trait]
impl Retriever for StandardRetriever {
    fn kind(&self) -> ServiceKind {
        ServiceKind::Standard
    }

    fn info(&self) -> ServiceInfo {
        ServiceInfo {
            service_type: ServiceKind::Standard,
            service_class: ServiceKind::Standard.class_name().to_string(),
            features: vec!["vector_search".to_string(), "live_embedding".to_string()],
            cache_ttl: 0,
            keyword_search: false,
            cache_size: Some(0),
        }
    }

    async fn rank_top_k(&self, query: &str, k: usize) -> Vec<ScoredResult> {
        if is_blank_request(query, k) {
            return Vec::new();
        }
        match self.search(query, k).await {
            Ok(results) => results,
            Err(err) => {
                warn!(error = %err, query_len = query.len(), "vector search failed");
                Vec::new()
            }
        }
    }

    async fn try_ingest(&self, content: &str, source: Option<&str>) -> KnowledgeResult<i64> {
        embed_and_store(self.embedder.as_ref(), &self.store, content, source).await
    }
}
