//! Optional second-pass reranking of the fused shortlist.
//!
//! The rerank model is an external collaborator; its contract here is a
//! stable sort by its returned scores over the top `top_k` entries, ties
//! broken by pre-rerank order. Entries beyond `top_k` are dropped.

use ragdb_core::traits::RerankModel;
use ragdb_core::types::{Chunk, FusedResult};

pub async fn apply(
    model: &dyn RerankModel,
    query: &str,
    mut items: Vec<(FusedResult, Chunk)>,
    top_k: usize,
) -> anyhow::Result<Vec<(FusedResult, Chunk)>> {
    items.truncate(top_k);
    if items.is_empty() {
        return Ok(items);
    }
    let passages: Vec<String> = items.iter().map(|(_, c)| c.text.clone()).collect();
    let scores = model.score(query, &passages).await?;
    if scores.len() != items.len() {
        anyhow::bail!("rerank model returned {} scores for {} passages", scores.len(), items.len());
    }

    let mut rescored: Vec<(f32, (FusedResult, Chunk))> = scores.into_iter().zip(items).collect();
    // sort_by is stable: equal rerank scores keep pre-rerank order
    rescored.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    Ok(rescored
        .into_iter()
        .enumerate()
        .map(|(i, (score, (mut result, chunk)))| {
            result.score = score;
            result.rank = i;
            (result, chunk)
        })
        .collect())
}
