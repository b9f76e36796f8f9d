//! Near-duplicate removal over the fused ranking.
//!
//! Greedy: walk the ranking top-down, drop any passage whose similarity
//! to an already-accepted one exceeds the configured threshold. Relative
//! order of survivors is untouched. Similarity is cosine over chunk
//! embeddings, with token Jaccard as the fallback when either chunk has
//! no embedding.

use ragdb_core::types::{Chunk, FusedResult};
use std::collections::HashSet;

use crate::index::cosine_similarity;

pub fn apply(
    items: Vec<(FusedResult, Chunk)>,
    threshold: f32,
) -> Vec<(FusedResult, Chunk)> {
    let mut accepted: Vec<(FusedResult, Chunk)> = Vec::with_capacity(items.len());
    for (result, chunk) in items {
        let redundant = accepted
            .iter()
            .any(|(_, kept)| chunk_similarity(kept, &chunk) > threshold);
        if redundant {
            tracing::debug!(chunk_id = %result.chunk_id, "dropped as redundant");
        } else {
            accepted.push((result, chunk));
        }
    }
    accepted
}

fn chunk_similarity(a: &Chunk, b: &Chunk) -> f32 {
    match (&a.embedding, &b.embedding) {
        (Some(ea), Some(eb)) => cosine_similarity(ea, eb),
        _ => token_jaccard(&a.text, &b.text),
    }
}

fn token_jaccard(a: &str, b: &str) -> f32 {
    let ta: HashSet<String> = a.to_lowercase().split_whitespace().map(String::from).collect();
    let tb: HashSet<String> = b.to_lowercase().split_whitespace().map(String::from).collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let intersection = ta.intersection(&tb).count() as f32;
    let union = ta.union(&tb).count() as f32;
    intersection / union
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, score: f32, text: &str, embedding: Option<Vec<f32>>) -> (FusedResult, Chunk) {
        (
            FusedResult { chunk_id: id.to_string(), score, strategies: vec![], rank: 0 },
            Chunk {
                id: id.to_string(),
                doc_id: "doc".to_string(),
                text: text.to_string(),
                embedding,
                parent_id: None,
                section: None,
                chunk_index: 0,
                char_start: 0,
                char_end: 0,
                metadata: Default::default(),
            },
        )
    }

    #[test]
    fn near_duplicates_are_dropped_lower_rank_first() {
        let items = vec![
            item("a", 0.9, "x", Some(vec![1.0, 0.0])),
            item("b", 0.8, "y", Some(vec![0.999, 0.01])),
            item("c", 0.7, "z", Some(vec![0.0, 1.0])),
        ];
        let kept = apply(items, 0.92);
        let ids: Vec<&str> = kept.iter().map(|(r, _)| r.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn order_of_survivors_is_preserved() {
        let items = vec![
            item("a", 0.9, "alpha text", Some(vec![1.0, 0.0])),
            item("b", 0.8, "beta text", Some(vec![0.5, 0.5])),
            item("c", 0.7, "gamma text", Some(vec![0.0, 1.0])),
        ];
        let kept = apply(items, 0.99);
        let ids: Vec<&str> = kept.iter().map(|(r, _)| r.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn text_overlap_fallback_when_embeddings_missing() {
        let items = vec![
            item("a", 0.9, "the queen bee lays eggs", None),
            item("b", 0.8, "the queen bee lays eggs", None),
            item("c", 0.7, "diesel engines need oil", None),
        ];
        let kept = apply(items, 0.92);
        let ids: Vec<&str> = kept.iter().map(|(r, _)| r.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
