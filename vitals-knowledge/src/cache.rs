use std::collections::{HashMap, VecDeque};

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

/// Query-embedding cache keyed by a hash of the exact query text.
///
/// Unbounded unless a capacity is given; with a capacity the oldest
/// insertion is evicted first. `clear` is the only other way entries leave.
#[derive(Debug)]
pub struct EmbeddingCache {
    capacity: Option<usize>,
    inner: RwLock<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    map: HashMap<String, Vec<f32>>,
    order: VecDeque<String>,
}

impl EmbeddingCache {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            inner: RwLock::new(CacheInner::default()),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub async fn get(&self, query: &str) -> Option<Vec<f32>> {
        let key = query_key(query);
        let inner = self.inner.read().await;
        inner.map.get(&key).cloned()
    }

    pub async fn put(&self, query: &str, embedding: Vec<f32>) {
        let key = query_key(query);
        let mut inner = self.inner.write().await;
        if inner.map.insert(key.clone(), embedding).is_some() {
            return;
        }
        inner.order.push_back(key);

        if let Some(capacity) = self.capacity {
            while inner.map.len() > capacity {
                let Some(oldest) = inner.order.pop_front() else {
                    break;
                };
                inner.map.remove(&oldest);
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.map.clear();
        inner.order.clear();
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Case-sensitive: only byte-identical queries share a key.
pub fn query_key(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_put_clear() {
        let cache = EmbeddingCache::unbounded();
        assert!(cache.get("如何减肥").await.is_none());

        cache.put("如何减肥", vec![1.0, 0.0]).await;
        assert_eq!(cache.get("如何减肥").await, Some(vec![1.0, 0.0]));
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
        assert!(cache.get("如何减肥").await.is_none());
    }

    #[tokio::test]
    async fn keys_are_case_sensitive() {
        let cache = EmbeddingCache::unbounded();
        cache.put("Sleep", vec![1.0]).await;
        assert!(cache.get("sleep").await.is_none());
        assert!(cache.get("Sleep ").await.is_none());
    }

    #[tokio::test]
    async fn repeated_put_replaces_without_growing() {
        let cache = EmbeddingCache::unbounded();
        cache.put("q", vec![1.0]).await;
        cache.put("q", vec![2.0]).await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("q").await, Some(vec![2.0]));
    }

    #[tokio::test]
    async fn bounded_cache_evicts_oldest_insertion() {
        let cache = EmbeddingCache::new(Some(2));
        cache.put("a", vec![1.0]).await;
        cache.put("b", vec![2.0]).await;
        cache.put("c", vec![3.0]).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get("a").await.is_none());
        assert_eq!(cache.get("b").await, Some(vec![2.0]));
        assert_eq!(cache.get("c").await, Some(vec![3.0]));
    }

    #[test]
    fn query_key_is_hex_sha256() {
        let key = query_key("abc");
        assert_eq!(
            key,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
