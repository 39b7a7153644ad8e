use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::errors::KnowledgeResult;
use crate::models::{MatchOrigin, ScoredResult};
use crate::storage::KnowledgeStore;

#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub id: i64,
    pub content: String,
    pub embedding: Vec<f32>,
    pub source: Option<String>,
}

/// Immutable copy of every stored vector, taken from one read of the store.
#[derive(Debug, Clone)]
pub struct VectorSnapshot {
    entries: Vec<SnapshotEntry>,
    captured_at: DateTime<Utc>,
    captured: Instant,
}

impl VectorSnapshot {
    pub fn new(entries: Vec<SnapshotEntry>) -> Self {
        Self {
            entries,
            captured_at: Utc::now(),
            captured: Instant::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Read every row of `store` into a new snapshot. Rows whose stored
    /// vector does not parse are logged and skipped.
    pub async fn load(store: &KnowledgeStore) -> KnowledgeResult<Self> {
        let started = Instant::now();
        let rows = store.list_rows().await?;
        let total = rows.len();

        let mut entries = Vec::with_capacity(total);
        for row in rows {
            match row.decode() {
                Ok(snippet) => entries.push(SnapshotEntry {
                    id: snippet.id,
                    content: snippet.content,
                    embedding: snippet.embedding,
                    source: snippet.source,
                }),
                Err(err) => warn!(error = %err, "skipping malformed stored vector"),
            }
        }

        debug!(
            entries = entries.len(),
            skipped = total - entries.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "vector snapshot loaded"
        );
        Ok(Self::new(entries))
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.captured.elapsed() > ttl
    }

    /// Full scan: score every entry against `query`, best first, at most `k`.
    ///
    /// Ties keep snapshot order. Entries whose dimensionality differs from
    /// the query are skipped.
    pub fn score(&self, query: &[f32], k: usize) -> Vec<ScoredResult> {
        if k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<ScoredResult> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let Some(similarity) = cosine_similarity(query, &entry.embedding) else {
                debug!(
                    id = entry.id,
                    expected = query.len(),
                    actual = entry.embedding.len(),
                    "skipping snapshot entry with mismatched dimension"
                );
                continue;
            };
            scored.push(ScoredResult {
                content: entry.content.clone(),
                similarity,
                source: entry.source.clone(),
                origin: MatchOrigin::Vector,
            });
        }

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(CmpOrdering::Equal)
        });
        scored.truncate(k);
        scored
    }
}

/// Cosine similarity of two vectors of equal length.
///
/// Returns `None` when the lengths differ or either is empty, and `0.0` when
/// either vector has zero magnitude. The result is clamped to `[-1, 1]`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return Some(0.0);
    }
    Some((dot / denom).clamp(-1.0, 1.0) as f32)
}

/// Holds the current [`VectorSnapshot`] and rebuilds it on expiry.
///
/// A rebuild reads the store without holding the lock and then swaps the
/// shared reference, so readers only ever see complete snapshots. Concurrent
/// rebuilds may overlap; the last to finish wins. An invalidation that lands
/// while a rebuild is in flight prevents that rebuild from being published.
#[derive(Debug)]
pub struct SnapshotManager {
    store: KnowledgeStore,
    ttl: Duration,
    current: RwLock<Option<Arc<VectorSnapshot>>>,
    generation: AtomicU64,
}

impl SnapshotManager {
    pub fn new(store: KnowledgeStore, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            current: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    /// The current snapshot, rebuilding it first when absent or expired.
    ///
    /// Never fails: if the store cannot be read the previous snapshot is
    /// served, or an empty one when there is none.
    pub async fn current(&self) -> Arc<VectorSnapshot> {
        {
            let guard = self.current.read().await;
            if let Some(snapshot) = guard.as_ref() {
                if !snapshot.is_expired(self.ttl) {
                    return Arc::clone(snapshot);
                }
            }
        }

        let generation = self.generation();
        match self.rebuild().await {
            Ok(snapshot) => self.publish(generation, snapshot).await,
            Err(err) => {
                let previous = self.current.read().await.clone();
                match previous {
                    Some(previous) => {
                        warn!(error = %err, entries = previous.len(), "snapshot rebuild failed; serving previous snapshot");
                        previous
                    }
                    None => {
                        error!(error = %err, "snapshot rebuild failed and no previous snapshot exists");
                        Arc::new(VectorSnapshot::empty())
                    }
                }
            }
        }
    }

    /// Drop the current snapshot so the next read rebuilds it.
    pub async fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        *self.current.write().await = None;
    }

    /// Number of entries in the published snapshot, 0 when absent.
    pub async fn cached_len(&self) -> usize {
        self.current
            .read()
            .await
            .as_ref()
            .map(|snapshot| snapshot.len())
            .unwrap_or(0)
    }

    pub async fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|snapshot| snapshot.captured_at())
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Publish `snapshot` unless the manager was invalidated after
    /// `generation` was read. The snapshot is returned either way.
    async fn publish(&self, generation: u64, snapshot: VectorSnapshot) -> Arc<VectorSnapshot> {
        let snapshot = Arc::new(snapshot);
        let mut guard = self.current.write().await;
        if self.generation() == generation {
            *guard = Some(Arc::clone(&snapshot));
        } else {
            debug!("discarding snapshot built before an invalidation");
        }
        snapshot
    }

    async fn rebuild(&self) -> KnowledgeResult<VectorSnapshot> {
        let snapshot = VectorSnapshot::load(&self.store).await?;
        info!(entries = snapshot.len(), "vector snapshot refreshed");
        Ok(snapshot)
    }
}
