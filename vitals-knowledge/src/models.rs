use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored knowledge snippet with its decoded embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSnippet {
    pub id: i64,
    pub content: String,
    pub embedding: Vec<f32>,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which tier produced a result.
///
/// Vector results carry a cosine similarity in [-1, 1]; keyword results carry
/// an integer match score. The two scales are not comparable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchOrigin {
    Keyword,
    Vector,
}

/// A ranked retrieval result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredResult {
    pub content: String,
    pub similarity: f32,
    pub source: Option<String>,
    pub origin: MatchOrigin,
}

/// Retrieval strategy chosen at construction time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Embed every query and score against a fresh read of the store.
    Standard,
    /// Keyword prefilter, embedding cache and TTL vector snapshot.
    Optimized,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Optimized => "optimized",
        }
    }

    /// Name of the retriever type behind this kind.
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Standard => "StandardRetriever",
            Self::Optimized => "OptimizedRetriever",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache occupancy reported by the optimized retriever.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheStats {
    pub embedding_cache_size: usize,
    pub vector_cache_size: usize,
    /// Snapshot TTL in seconds.
    pub cache_ttl: u64,
    pub last_refresh: Option<DateTime<Utc>>,
}

/// Static description of the configured retrieval service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceInfo {
    pub service_type: ServiceKind,
    pub service_class: String,
    pub features: Vec<String>,
    pub cache_ttl: u64,
    pub keyword_search: bool,
    /// `None` means the embedding cache is unbounded.
    pub cache_size: Option<usize>,
}

/// Outcome of a single timed retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    pub query: String,
    pub results: Vec<ScoredResult>,
    /// Seconds.
    pub duration: f64,
    pub service_type: ServiceKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceRating {
    Excellent,
    Good,
    NeedsImprovement,
}

impl PerformanceRating {
    /// Rate an average per-query latency in seconds.
    pub fn from_average(seconds: f64) -> Self {
        if seconds < 0.1 {
            Self::Excellent
        } else if seconds < 0.5 {
            Self::Good
        } else {
            Self::NeedsImprovement
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    pub query: String,
    pub duration: f64,
    pub result_count: usize,
    pub results: Vec<ScoredResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub service_type: ServiceKind,
    pub total_queries: usize,
    pub total_time: f64,
    pub average_time: f64,
    pub results: Vec<BenchmarkEntry>,
    pub performance_rating: PerformanceRating,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_thresholds() {
        assert_eq!(PerformanceRating::from_average(0.0), PerformanceRating::Excellent);
        assert_eq!(PerformanceRating::from_average(0.099), PerformanceRating::Excellent);
        assert_eq!(PerformanceRating::from_average(0.1), PerformanceRating::Good);
        assert_eq!(PerformanceRating::from_average(0.499), PerformanceRating::Good);
        assert_eq!(
            PerformanceRating::from_average(0.5),
            PerformanceRating::NeedsImprovement
        );
    }

    #[test]
    fn scored_result_serializes_origin() {
        let result = ScoredResult {
            content: "drink water".to_string(),
            similarity: 2.0,
            source: Some("水分补充指南".to_string()),
            origin: MatchOrigin::Keyword,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["origin"], "keyword");
        assert_eq!(json["similarity"], 2.0);
        assert_eq!(json["source"], "水分补充指南");
    }

    #[test]
    fn service_kind_names() {
        assert_eq!(ServiceKind::Optimized.to_string(), "optimized");
        assert_eq!(ServiceKind::Standard.class_name(), "StandardRetriever");
        assert_eq!(
            serde_json::to_value(ServiceKind::Standard).unwrap(),
            "standard"
        );
    }
}
