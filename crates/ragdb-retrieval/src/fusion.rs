//! Weighted fusion of per-strategy rankings.
//!
//! Scores are min-max normalized to [0,1] within each strategy's list
//! before weighting, so strategies with different native score ranges
//! (cosine vs BM25-derived) combine fairly. The result is a pure
//! function of its inputs: permuting the input lists, or re-running with
//! identical inputs, yields byte-identical output.

use std::collections::BTreeMap;

use ragdb_core::types::{ChunkId, FusedResult, SearchCandidate, StrategyKind};

/// Merge one strategy's candidate lists across sub-queries into a single
/// ranking, keeping the best raw score per chunk.
pub fn merge_subqueries(lists: Vec<Vec<SearchCandidate>>) -> Vec<SearchCandidate> {
    let mut best: BTreeMap<ChunkId, SearchCandidate> = BTreeMap::new();
    for list in lists {
        for cand in list {
            match best.get(&cand.chunk_id) {
                Some(existing) if existing.score >= cand.score => {}
                _ => {
                    best.insert(cand.chunk_id.clone(), cand);
                }
            }
        }
    }
    let mut merged: Vec<SearchCandidate> = best.into_values().collect();
    merged.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    for (i, c) in merged.iter_mut().enumerate() {
        c.rank = i;
    }
    merged
}

/// Fuse per-strategy rankings into one. Input lists are one per
/// strategy; order of the lists does not matter.
pub fn fuse(
    lists: &[Vec<SearchCandidate>],
    weights: &BTreeMap<StrategyKind, f32>,
) -> Vec<FusedResult> {
    // per chunk: normalized contribution per strategy, summed in fixed
    // strategy order so float accumulation is order-independent
    let mut contributions: BTreeMap<ChunkId, BTreeMap<StrategyKind, f32>> = BTreeMap::new();
    for list in lists {
        let normalized = min_max_normalize(list);
        for (cand, norm) in list.iter().zip(normalized) {
            let per_strategy = contributions.entry(cand.chunk_id.clone()).or_default();
            let entry = per_strategy.entry(cand.strategy).or_insert(0.0);
            if norm > *entry {
                *entry = norm;
            }
        }
    }

    let mut scored: Vec<(f32, FusedResult)> = contributions
        .into_iter()
        .map(|(chunk_id, per_strategy)| {
            let mut score = 0.0;
            let mut max_single = 0.0f32;
            let mut strategies = Vec::with_capacity(per_strategy.len());
            for (kind, norm) in &per_strategy {
                let weight = weights.get(kind).copied().unwrap_or(1.0);
                score += norm * weight;
                if *norm > max_single {
                    max_single = *norm;
                }
                strategies.push(*kind);
            }
            (max_single, FusedResult { chunk_id, score, strategies, rank: 0 })
        })
        .collect();

    // ties on fused score break on the highest individual strategy
    // score, then chunk id, so identical inputs always rank identically
    scored.sort_by(|(a_max, a), (b_max, b)| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b_max.partial_cmp(a_max).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });

    let mut fused: Vec<FusedResult> = scored.into_iter().map(|(_, r)| r).collect();
    for (i, r) in fused.iter_mut().enumerate() {
        r.rank = i;
    }
    fused
}

/// Single-strategy path: the ranking passes through unchanged.
pub fn pass_through(list: Vec<SearchCandidate>) -> Vec<FusedResult> {
    list.into_iter()
        .enumerate()
        .map(|(i, c)| FusedResult {
            chunk_id: c.chunk_id,
            score: c.score,
            strategies: vec![c.strategy],
            rank: i,
        })
        .collect()
}

/// Scores scaled to [0,1] within one list. A list with no spread (single
/// element, or all scores equal) expressed no preference and maps to 1.0
/// everywhere.
fn min_max_normalize(list: &[SearchCandidate]) -> Vec<f32> {
    if list.is_empty() {
        return Vec::new();
    }
    let min = list.iter().map(|c| c.score).fold(f32::INFINITY, f32::min);
    let max = list.iter().map(|c| c.score).fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if range <= f32::EPSILON {
        return vec![1.0; list.len()];
    }
    list.iter().map(|c| (c.score - min) / range).collect()
}
