//! TTL cache for per-branch search results and query embeddings.
//!
//! Backed by moka: concurrent reads are lock-free and inserts are atomic
//! per key, so duplicate in-flight computations for the same key race
//! harmlessly (last writer wins, both writers produced the same value —
//! everything cached here is deterministic). Cache failure modes reduce
//! to recomputation; nothing here can fail a request.

use moka::sync::Cache;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use twox_hash::XxHash64;

use ragdb_core::types::{SearchCandidate, StrategyKind};

const MAX_ENTRIES: u64 = 10_000;

pub struct RetrievalCache {
    results: Option<Cache<u64, Arc<Vec<SearchCandidate>>>>,
    embeddings: Option<Cache<u64, Arc<Vec<f32>>>>,
}

impl RetrievalCache {
    pub fn new(enabled: bool, ttl: Duration) -> Self {
        if !enabled {
            return Self { results: None, embeddings: None };
        }
        let results = Cache::builder().max_capacity(MAX_ENTRIES).time_to_live(ttl).build();
        let embeddings = Cache::builder().max_capacity(MAX_ENTRIES).time_to_live(ttl).build();
        Self { results: Some(results), embeddings: Some(embeddings) }
    }

    /// Key over everything that determines a branch result.
    pub fn result_key(query: &str, strategy: StrategyKind, k: usize, params: &str) -> u64 {
        let mut hasher = XxHash64::with_seed(0);
        query.hash(&mut hasher);
        strategy.as_str().hash(&mut hasher);
        k.hash(&mut hasher);
        params.hash(&mut hasher);
        hasher.finish()
    }

    pub fn embedding_key(model_id: &str, text: &str) -> u64 {
        let mut hasher = XxHash64::with_seed(1);
        model_id.hash(&mut hasher);
        text.hash(&mut hasher);
        hasher.finish()
    }

    pub fn get_results(&self, key: u64) -> Option<Arc<Vec<SearchCandidate>>> {
        self.results.as_ref().and_then(|c| c.get(&key))
    }

    pub fn put_results(&self, key: u64, value: Arc<Vec<SearchCandidate>>) {
        if let Some(c) = &self.results {
            c.insert(key, value);
        }
    }

    pub fn get_embedding(&self, key: u64) -> Option<Arc<Vec<f32>>> {
        self.embeddings.as_ref().and_then(|c| c.get(&key))
    }

    pub fn put_embedding(&self, key: u64, value: Arc<Vec<f32>>) {
        if let Some(c) = &self.embeddings {
            c.insert(key, value);
        }
    }

    pub fn invalidate_all(&self) {
        if let Some(c) = &self.results {
            c.invalidate_all();
        }
        if let Some(c) = &self.embeddings {
            c.invalidate_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> SearchCandidate {
        SearchCandidate {
            chunk_id: "a".to_string(),
            score: 0.5,
            strategy: StrategyKind::Similarity,
            rank: 0,
        }
    }

    #[test]
    fn round_trips_results() {
        let cache = RetrievalCache::new(true, Duration::from_secs(60));
        let key = RetrievalCache::result_key("q", StrategyKind::Similarity, 10, "p");
        assert!(cache.get_results(key).is_none());
        cache.put_results(key, Arc::new(vec![candidate()]));
        assert_eq!(cache.get_results(key).map(|v| v.len()), Some(1));
    }

    #[test]
    fn result_and_embedding_sides_store_their_own_value_types() {
        let cache = RetrievalCache::new(true, Duration::from_secs(60));
        let rk = RetrievalCache::result_key("q", StrategyKind::Similarity, 10, "p");
        let ek = RetrievalCache::embedding_key("m", "q");
        cache.put_results(rk, Arc::new(vec![candidate()]));
        cache.put_embedding(ek, Arc::new(vec![1.0, 2.0]));
        assert_eq!(cache.get_results(rk).map(|v| v.len()), Some(1));
        assert_eq!(cache.get_embedding(ek).as_deref(), Some(&vec![1.0, 2.0]));
    }

    #[test]
    fn disabled_cache_stores_nothing() {
        let cache = RetrievalCache::new(false, Duration::from_secs(60));
        let key = RetrievalCache::result_key("q", StrategyKind::Similarity, 10, "p");
        cache.put_results(key, Arc::new(vec![candidate()]));
        assert!(cache.get_results(key).is_none());
    }

    #[test]
    fn key_depends_on_strategy_and_params() {
        let a = RetrievalCache::result_key("q", StrategyKind::Similarity, 10, "p");
        let b = RetrievalCache::result_key("q", StrategyKind::Hybrid, 10, "p");
        let c = RetrievalCache::result_key("q", StrategyKind::Similarity, 10, "p2");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn invalidate_all_clears_entries() {
        let cache = RetrievalCache::new(true, Duration::from_secs(60));
        let key = RetrievalCache::embedding_key("m", "q");
        cache.put_embedding(key, Arc::new(vec![1.0]));
        cache.invalidate_all();
        assert!(cache.get_embedding(key).is_none());
    }
}
