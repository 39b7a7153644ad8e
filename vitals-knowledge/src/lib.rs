//! Retrieval core for the health assistant.
//!
//! Ranks knowledge snippets for a query through a keyword prefilter, a
//! query-embedding cache and a TTL-bound in-memory vector snapshot backed by
//! SQLite, falling back tier by tier when the embedding service fails.

pub mod cache;
pub mod embeddings;
pub mod errors;
pub mod keyword;
pub mod models;
pub mod paths;
pub mod retrieval;
pub mod service;
pub mod snapshot;
pub mod storage;

pub use vitals_core::RetrievalSettings;

pub use cache::EmbeddingCache;
pub use embeddings::{Embedder, EmbeddingClient};
pub use errors::{KnowledgeError, KnowledgeResult};
pub use keyword::{KeywordPrefilter, KeywordTopic};
pub use models::{
    BenchmarkEntry, BenchmarkReport, CacheStats, KnowledgeSnippet, MatchOrigin,
    PerformanceRating, ScoredResult, SearchReport, ServiceInfo, ServiceKind,
};
pub use retrieval::{OptimizedRetriever, Retriever, StandardRetriever};
pub use service::{BENCHMARK_QUERIES, RetrievalService};
pub use snapshot::{SnapshotManager, VectorSnapshot, cosine_similarity};
pub use storage::KnowledgeStore;
