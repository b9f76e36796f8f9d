//! Strategy executors.
//!
//! A closed set of implementations selected at engine construction from
//! the enabled feature flags; request handling dispatches through the
//! `StrategyExecutor` trait, never on strategy names. Every executor
//! returns an ordered candidate list; an empty list is a valid result,
//! not an error.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use ragdb_core::config::RagConfig;
use ragdb_core::traits::IndexAdapter;
use ragdb_core::types::{ChunkId, IndexHit, SearchCandidate, StrategyKind};

/// How many extra hits the child-precision pass fetches before
/// collapsing children onto their parents.
const PARENT_CHILD_FANOUT: usize = 4;

/// One query variant, embedded once and shared by all executors.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub text: String,
    pub vector: Vec<f32>,
}

#[async_trait]
pub trait StrategyExecutor: Send + Sync {
    fn kind(&self) -> StrategyKind;
    async fn search(&self, query: &QueryContext, k: usize) -> anyhow::Result<Vec<SearchCandidate>>;
}

/// Build the executor set from the feature flags. A disabled strategy is
/// never constructed, regardless of `strategy_weights` entries.
pub fn build_executors(
    config: &RagConfig,
    index: Arc<dyn IndexAdapter>,
) -> Vec<Arc<dyn StrategyExecutor>> {
    config
        .enabled_strategies()
        .into_iter()
        .map(|kind| -> Arc<dyn StrategyExecutor> {
            match kind {
                StrategyKind::Similarity => Arc::new(SimilarityExecutor { index: index.clone() }),
                StrategyKind::Contextual => Arc::new(ContextualExecutor { index: index.clone() }),
                StrategyKind::ParentChild => Arc::new(ParentChildExecutor { index: index.clone() }),
                StrategyKind::Hybrid => Arc::new(HybridExecutor {
                    index: index.clone(),
                    vector_weight: config.search.vector_weight,
                    text_weight: config.search.text_weight,
                }),
            }
        })
        .collect()
}

fn to_candidates(hits: Vec<IndexHit>, strategy: StrategyKind) -> Vec<SearchCandidate> {
    hits.into_iter()
        .enumerate()
        .map(|(rank, h)| SearchCandidate { chunk_id: h.id, score: h.score, strategy, rank })
        .collect()
}

fn sort_hits(hits: &mut [IndexHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Plain vector similarity over all embedded chunks.
pub struct SimilarityExecutor {
    index: Arc<dyn IndexAdapter>,
}

#[async_trait]
impl StrategyExecutor for SimilarityExecutor {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Similarity
    }

    async fn search(&self, query: &QueryContext, k: usize) -> anyhow::Result<Vec<SearchCandidate>> {
        let hits = self.index.vector_search(&query.vector, k).await?;
        Ok(to_candidates(hits, StrategyKind::Similarity))
    }
}

/// Similarity search biased toward chunks embedded with a context
/// prefix. When the corpus has contextualized chunks only those are
/// kept; otherwise the plain hits pass through so the strategy stays
/// useful on corpora chunked without context.
pub struct ContextualExecutor {
    index: Arc<dyn IndexAdapter>,
}

#[async_trait]
impl StrategyExecutor for ContextualExecutor {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Contextual
    }

    async fn search(&self, query: &QueryContext, k: usize) -> anyhow::Result<Vec<SearchCandidate>> {
        let hits = self.index.vector_search(&query.vector, k * 2).await?;
        let mut contextual = Vec::new();
        for hit in &hits {
            if let Some(chunk) = self.index.get(&hit.id).await? {
                if chunk.metadata.contains_key("contextualized") {
                    contextual.push(hit.clone());
                }
            }
        }
        let mut chosen = if contextual.is_empty() { hits } else { contextual };
        chosen.truncate(k);
        Ok(to_candidates(chosen, StrategyKind::Contextual))
    }
}

/// Precision-then-context-expansion: search fine-grained child chunks,
/// then hand back their parents, deduplicated by parent id with the best
/// child score.
pub struct ParentChildExecutor {
    index: Arc<dyn IndexAdapter>,
}

#[async_trait]
impl StrategyExecutor for ParentChildExecutor {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ParentChild
    }

    async fn search(&self, query: &QueryContext, k: usize) -> anyhow::Result<Vec<SearchCandidate>> {
        let hits = self.index.vector_search(&query.vector, k * PARENT_CHILD_FANOUT).await?;
        let mut by_parent: HashMap<ChunkId, f32> = HashMap::new();
        for hit in hits {
            let Some(chunk) = self.index.get(&hit.id).await? else { continue };
            let Some(parent_id) = chunk.parent_id else { continue };
            let best = by_parent.entry(parent_id).or_insert(f32::NEG_INFINITY);
            if hit.score > *best {
                *best = hit.score;
            }
        }
        let mut parents: Vec<IndexHit> =
            by_parent.into_iter().map(|(id, score)| IndexHit { id, score }).collect();
        sort_hits(&mut parents);
        parents.truncate(k);
        Ok(to_candidates(parents, StrategyKind::ParentChild))
    }
}

/// Linear combination of vector and lexical scores. Vector scores are
/// clamped to [0,1]; lexical scores are scaled down by their max when
/// the engine behind `text_search` returns unbounded scores (BM25), so
/// both sides weigh in on the same scale.
pub struct HybridExecutor {
    index: Arc<dyn IndexAdapter>,
    vector_weight: f32,
    text_weight: f32,
}

#[async_trait]
impl StrategyExecutor for HybridExecutor {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Hybrid
    }

    async fn search(&self, query: &QueryContext, k: usize) -> anyhow::Result<Vec<SearchCandidate>> {
        let vector_hits = self.index.vector_search(&query.vector, k * 2).await?;
        let text_hits = self.index.text_search(&query.text, k * 2).await?;

        let text_scale = text_hits
            .iter()
            .map(|h| h.score)
            .fold(f32::NEG_INFINITY, f32::max)
            .max(1.0);

        let mut combined: HashMap<ChunkId, f32> = HashMap::new();
        for hit in vector_hits {
            let entry = combined.entry(hit.id).or_insert(0.0);
            *entry += self.vector_weight * hit.score.clamp(0.0, 1.0);
        }
        for hit in text_hits {
            let entry = combined.entry(hit.id).or_insert(0.0);
            *entry += self.text_weight * (hit.score / text_scale);
        }

        let mut hits: Vec<IndexHit> =
            combined.into_iter().map(|(id, score)| IndexHit { id, score }).collect();
        sort_hits(&mut hits);
        hits.truncate(k);
        Ok(to_candidates(hits, StrategyKind::Hybrid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdb_core::types::Chunk;

    struct FixedIndex {
        vector: Vec<IndexHit>,
        text: Vec<IndexHit>,
        chunks: HashMap<ChunkId, Chunk>,
    }

    #[async_trait]
    impl IndexAdapter for FixedIndex {
        async fn upsert(&self, _chunks: &[Chunk]) -> anyhow::Result<()> {
            Ok(())
        }
        async fn vector_search(&self, _v: &[f32], k: usize) -> anyhow::Result<Vec<IndexHit>> {
            Ok(self.vector.iter().take(k).cloned().collect())
        }
        async fn text_search(&self, _q: &str, k: usize) -> anyhow::Result<Vec<IndexHit>> {
            Ok(self.text.iter().take(k).cloned().collect())
        }
        async fn get(&self, id: &ChunkId) -> anyhow::Result<Option<Chunk>> {
            Ok(self.chunks.get(id).cloned())
        }
    }

    fn chunk(id: &str, parent: Option<&str>) -> Chunk {
        Chunk {
            id: id.to_string(),
            doc_id: "doc".to_string(),
            text: id.to_string(),
            embedding: None,
            parent_id: parent.map(String::from),
            section: None,
            chunk_index: 0,
            char_start: 0,
            char_end: 0,
            metadata: Default::default(),
        }
    }

    fn query() -> QueryContext {
        QueryContext { text: "q".to_string(), vector: vec![1.0] }
    }

    #[tokio::test]
    async fn hybrid_combines_weighted_vector_and_text_scores() {
        let index = Arc::new(FixedIndex {
            vector: vec![IndexHit { id: "a".to_string(), score: 0.9 }],
            text: vec![IndexHit { id: "a".to_string(), score: 0.4 }],
            chunks: HashMap::new(),
        });
        let exec = HybridExecutor { index, vector_weight: 0.7, text_weight: 0.3 };
        let candidates = exec.search(&query(), 5).await.expect("search");
        // 0.7 * 0.9 + 0.3 * 0.4 = 0.75
        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].score - 0.75).abs() < 1e-6);
    }

    #[tokio::test]
    async fn hybrid_scales_unbounded_text_scores() {
        let index = Arc::new(FixedIndex {
            vector: vec![],
            text: vec![
                IndexHit { id: "a".to_string(), score: 8.0 },
                IndexHit { id: "b".to_string(), score: 4.0 },
            ],
            chunks: HashMap::new(),
        });
        let exec = HybridExecutor { index, vector_weight: 0.7, text_weight: 0.3 };
        let candidates = exec.search(&query(), 5).await.expect("search");
        assert!((candidates[0].score - 0.3).abs() < 1e-6);
        assert!((candidates[1].score - 0.15).abs() < 1e-6);
    }

    #[tokio::test]
    async fn parent_child_collapses_children_onto_parents() {
        let mut chunks = HashMap::new();
        chunks.insert("p0:c0".to_string(), chunk("p0:c0", Some("p0")));
        chunks.insert("p0:c1".to_string(), chunk("p0:c1", Some("p0")));
        chunks.insert("p1:c0".to_string(), chunk("p1:c0", Some("p1")));
        chunks.insert("plain".to_string(), chunk("plain", None));
        let index = Arc::new(FixedIndex {
            vector: vec![
                IndexHit { id: "p0:c0".to_string(), score: 0.9 },
                IndexHit { id: "p0:c1".to_string(), score: 0.8 },
                IndexHit { id: "p1:c0".to_string(), score: 0.7 },
                IndexHit { id: "plain".to_string(), score: 0.95 },
            ],
            text: vec![],
            chunks,
        });
        let exec = ParentChildExecutor { index };
        let candidates = exec.search(&query(), 5).await.expect("search");
        let ids: Vec<&str> = candidates.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["p0", "p1"], "parentless hits are ignored, parents deduplicated");
        assert!((candidates[0].score - 0.9).abs() < 1e-6, "best child score wins");
    }

    #[tokio::test]
    async fn empty_index_yields_empty_candidate_list() {
        let index = Arc::new(FixedIndex { vector: vec![], text: vec![], chunks: HashMap::new() });
        let exec = SimilarityExecutor { index };
        let candidates = exec.search(&query(), 5).await.expect("search");
        assert!(candidates.is_empty());
    }
}
