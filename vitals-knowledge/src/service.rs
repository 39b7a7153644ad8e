use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::info;

use crate::RetrievalSettings;
use crate::embeddings::{Embedder, EmbeddingClient};
use crate::errors::KnowledgeResult;
use crate::keyword::KeywordPrefilter;
use crate::models::{
    BenchmarkEntry, BenchmarkReport, CacheStats, PerformanceRating, ScoredResult, SearchReport,
    ServiceInfo, ServiceKind,
};
use crate::paths::knowledge_db_path;
use crate::retrieval::{OptimizedRetriever, Retriever, StandardRetriever};
use crate::storage::KnowledgeStore;

/// Probe queries used by [`RetrievalService::benchmark`].
pub const BENCHMARK_QUERIES: [&str; 5] = [
    "什么是健康饮食？",
    "如何保持良好的睡眠？",
    "运动对健康有什么好处？",
    "怎样管理压力？",
    "定期体检的重要性",
];

const BENCHMARK_TOP_K: usize = 2;

/// Process-wide retrieval handle.
///
/// Owns the configured [`Retriever`] and can swap it for a fresh instance,
/// which drops every cache it held. Construct once and share behind an `Arc`.
pub struct RetrievalService {
    settings: RetrievalSettings,
    embedder: Arc<dyn Embedder>,
    store: KnowledgeStore,
    prefilter: KeywordPrefilter,
    current: RwLock<Arc<dyn Retriever>>,
}

impl RetrievalService {
    /// Open the configured store and embedding client.
    pub async fn open(settings: RetrievalSettings) -> KnowledgeResult<Self> {
        let db_path = knowledge_db_path(&settings)?;
        let store = KnowledgeStore::open(&db_path).await?;
        let embedder: Arc<dyn Embedder> = Arc::new(EmbeddingClient::new(&settings)?);
        info!(
            db = %db_path.display(),
            optimized = settings.use_optimized,
            "retrieval service opened"
        );
        Ok(Self::new(settings, embedder, store))
    }

    pub fn new(
        settings: RetrievalSettings,
        embedder: Arc<dyn Embedder>,
        store: KnowledgeStore,
    ) -> Self {
        let prefilter = KeywordPrefilter::builtin();
        let current = build_retriever(&settings, &embedder, &store, &prefilter);
        Self {
            settings,
            embedder,
            store,
            prefilter,
            current: RwLock::new(current),
        }
    }

    /// Replace the keyword topics used by the optimized strategy.
    pub fn with_prefilter(mut self, prefilter: KeywordPrefilter) -> Self {
        self.current = RwLock::new(build_retriever(
            &self.settings,
            &self.embedder,
            &self.store,
            &prefilter,
        ));
        self.prefilter = prefilter;
        self
    }

    pub fn kind(&self) -> ServiceKind {
        if self.settings.use_optimized {
            ServiceKind::Optimized
        } else {
            ServiceKind::Standard
        }
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    pub async fn retriever(&self) -> Arc<dyn Retriever> {
        Arc::clone(&*self.current.read().await)
    }

    /// Discard the current retriever and its caches and build a new one.
    pub async fn reset(&self) {
        let fresh = build_retriever(&self.settings, &self.embedder, &self.store, &self.prefilter);
        *self.current.write().await = fresh;
        info!(service_type = %self.kind(), "retrieval service reset");
    }

    pub async fn rank_top_k(&self, query: &str, k: usize) -> Vec<ScoredResult> {
        self.retriever().await.rank_top_k(query, k).await
    }

    pub async fn ingest(&self, content: &str, source: Option<&str>) -> bool {
        self.retriever().await.ingest(content, source).await
    }

    pub async fn try_ingest(&self, content: &str, source: Option<&str>) -> KnowledgeResult<i64> {
        self.retriever().await.try_ingest(content, source).await
    }

    pub async fn cache_stats(&self) -> Option<CacheStats> {
        self.retriever().await.cache_stats().await
    }

    pub async fn clear_cache(&self) -> bool {
        self.retriever().await.clear_cache().await
    }

    pub async fn info(&self) -> ServiceInfo {
        self.retriever().await.info()
    }

    /// Run one timed retrieval.
    pub async fn test_query(&self, query: &str, k: usize) -> SearchReport {
        let retriever = self.retriever().await;
        let started = Instant::now();
        let results = retriever.rank_top_k(query, k).await;
        SearchReport {
            query: query.to_string(),
            results,
            duration: started.elapsed().as_secs_f64(),
            service_type: retriever.kind(),
        }
    }

    /// Time the fixed probe queries and rate the average latency.
    pub async fn benchmark(&self) -> BenchmarkReport {
        let retriever = self.retriever().await;
        let mut entries = Vec::with_capacity(BENCHMARK_QUERIES.len());
        let mut total_time = 0.0;

        for query in BENCHMARK_QUERIES {
            let started = Instant::now();
            let results = retriever.rank_top_k(query, BENCHMARK_TOP_K).await;
            let duration = started.elapsed().as_secs_f64();
            total_time += duration;
            entries.push(BenchmarkEntry {
                query: query.to_string(),
                duration,
                result_count: results.len(),
                results,
            });
        }

        let average_time = total_time / BENCHMARK_QUERIES.len() as f64;
        info!(
            service_type = %retriever.kind(),
            average_ms = (average_time * 1000.0) as u64,
            "retrieval benchmark finished"
        );
        BenchmarkReport {
            service_type: retriever.kind(),
            total_queries: BENCHMARK_QUERIES.len(),
            total_time,
            average_time,
            results: entries,
            performance_rating: PerformanceRating::from_average(average_time),
        }
    }
}

fn build_retriever(
    settings: &RetrievalSettings,
    embedder: &Arc<dyn Embedder>,
    store: &KnowledgeStore,
    prefilter: &KeywordPrefilter,
) -> Arc<dyn Retriever> {
    if settings.use_optimized {
        Arc::new(
            OptimizedRetriever::new(Arc::clone(embedder), store.clone(), settings)
                .with_prefilter(prefilter.clone()),
        )
    } else {
        Arc::new(StandardRetriever::new(Arc::clone(embedder), store.clone()))
    }
}
