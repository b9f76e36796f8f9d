//! In-process reference implementation of the index adapter.
//!
//! Combines a read-mostly chunk store with brute-force cosine scan on
//! the vector side and a tantivy index on the lexical side. Production
//! deployments swap this for an adapter over a real vector database;
//! tests and the CLI run against this one.

use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use ragdb_core::traits::IndexAdapter;
use ragdb_core::types::{Chunk, ChunkId, IndexHit};
use ragdb_text::TextIndex;

pub struct CorpusIndex {
    chunks: RwLock<HashMap<ChunkId, Chunk>>,
    text: TextIndex,
}

impl CorpusIndex {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self { chunks: RwLock::new(HashMap::new()), text: TextIndex::in_memory()? })
    }

    pub fn len(&self) -> usize {
        self.chunks.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl IndexAdapter for CorpusIndex {
    async fn upsert(&self, chunks: &[Chunk]) -> anyhow::Result<()> {
        {
            let mut store = self.chunks.write().map_err(|_| anyhow!("chunk store poisoned"))?;
            for c in chunks {
                store.insert(c.id.clone(), c.clone());
            }
        }
        self.text.add(chunks)
    }

    async fn vector_search(&self, vector: &[f32], k: usize) -> anyhow::Result<Vec<IndexHit>> {
        let store = self.chunks.read().map_err(|_| anyhow!("chunk store poisoned"))?;
        let mut hits: Vec<IndexHit> = store
            .values()
            .filter_map(|c| {
                c.embedding.as_ref().map(|e| IndexHit {
                    id: c.id.clone(),
                    score: cosine_similarity(vector, e),
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn text_search(&self, query: &str, k: usize) -> anyhow::Result<Vec<IndexHit>> {
        self.text.search(query, k)
    }

    async fn get(&self, id: &ChunkId) -> anyhow::Result<Option<Chunk>> {
        let store = self.chunks.read().map_err(|_| anyhow!("chunk store poisoned"))?;
        Ok(store.get(id).cloned())
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na <= f32::EPSILON || nb <= f32::EPSILON {
        return 0.0;
    }
    dot / (na * nb)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, text: &str, embedding: Option<Vec<f32>>) -> Chunk {
        Chunk {
            id: id.to_string(),
            doc_id: "doc".to_string(),
            text: text.to_string(),
            embedding,
            parent_id: None,
            section: None,
            chunk_index: 0,
            char_start: 0,
            char_end: text.chars().count(),
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn vector_search_ranks_by_cosine() {
        let index = CorpusIndex::new().expect("index");
        index
            .upsert(&[
                chunk("a", "alpha", Some(vec![1.0, 0.0])),
                chunk("b", "beta", Some(vec![0.0, 1.0])),
                chunk("c", "gamma", None),
            ])
            .await
            .expect("upsert");

        let hits = index.vector_search(&[1.0, 0.1], 10).await.expect("search");
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits.len(), 2, "chunks without embeddings are not scanned");
    }

    #[tokio::test]
    async fn get_returns_stored_chunk() {
        let index = CorpusIndex::new().expect("index");
        index.upsert(&[chunk("a", "alpha", None)]).await.expect("upsert");
        let found = index.get(&"a".to_string()).await.expect("get");
        assert_eq!(found.map(|c| c.text), Some("alpha".to_string()));
        assert!(index.get(&"zzz".to_string()).await.expect("get").is_none());
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
