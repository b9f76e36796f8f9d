//! Deterministic hash-based embedding model.
//!
//! Buckets token hashes into a fixed-dimension vector. Not a semantic
//! model; it exists so the engine, tests and the CLI can run fully
//! offline with stable, reproducible vectors. Identical texts always
//! map to identical embeddings, which keeps caching and idempotence
//! guarantees testable.

use async_trait::async_trait;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use ragdb_core::traits::EmbeddingModel;

pub struct HashEmbedding {
    id: String,
    dim: usize,
}

impl HashEmbedding {
    pub fn new(id: impl Into<String>, dim: usize) -> Self {
        Self { id: id.into(), dim }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.to_lowercase().split_whitespace() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + 0.1;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

#[async_trait]
impl EmbeddingModel for HashEmbedding {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_text_embeds_identically() {
        let model = HashEmbedding::new("hash-384", 384);
        let a = model.embed_batch(&["bees make honey".to_string()]).await.expect("embed");
        let b = model.embed_batch(&["bees make honey".to_string()]).await.expect("embed");
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn related_texts_score_higher_than_unrelated() {
        let model = HashEmbedding::new("hash-384", 384);
        let vs = model
            .embed_batch(&[
                "bees make honey in the hive".to_string(),
                "honey bees and the hive".to_string(),
                "diesel engine maintenance".to_string(),
            ])
            .await
            .expect("embed");
        let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
        assert!(dot(&vs[0], &vs[1]) > dot(&vs[0], &vs[2]));
    }
}
