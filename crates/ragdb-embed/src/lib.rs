//! Batched embedding with model fallback.
//!
//! `BatchEmbedder` wraps a primary `EmbeddingModel` and an ordered list
//! of fallbacks. Batches are sized by configuration, every vector is
//! checked against the configured dimension, and normalization to unit
//! norm happens here so no model has to care about it.

pub mod hash;

use std::sync::Arc;

use ragdb_core::config::EmbeddingConfig;
use ragdb_core::error::{RagError, Result};
use ragdb_core::traits::EmbeddingModel;

pub use hash::HashEmbedding;

pub struct BatchEmbedder {
    /// Primary model first, fallbacks in configured order.
    models: Vec<Arc<dyn EmbeddingModel>>,
    batch_size: usize,
    dimensions: usize,
    normalize: bool,
}

impl BatchEmbedder {
    /// Fails with a configuration error when no model is given or any
    /// model reports a dimension other than the configured one. This is
    /// the startup check; dimension mismatches never reach query time.
    pub fn new(config: &EmbeddingConfig, models: Vec<Arc<dyn EmbeddingModel>>) -> Result<Self> {
        if models.is_empty() {
            return Err(RagError::Configuration(
                "at least one embedding model is required".to_string(),
            ));
        }
        for model in &models {
            if model.dim() != config.dimensions {
                return Err(RagError::Configuration(format!(
                    "model {} has dimension {}, configured dimensions = {}",
                    model.id(),
                    model.dim(),
                    config.dimensions
                )));
            }
        }
        Ok(Self {
            models,
            batch_size: config.batch_size,
            dimensions: config.dimensions,
            normalize: config.normalize_embeddings,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed all `texts`, in batches of the configured size.
    ///
    /// Each batch tries the primary model first and walks the fallback
    /// chain on failure; `EmbeddingUnavailable` is returned only when
    /// every model failed for some batch. No partial result escapes.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size.max(1)) {
            let mut vectors = self.embed_one_batch(batch).await?;
            if self.normalize {
                for v in &mut vectors {
                    l2_normalize(v);
                }
            }
            out.append(&mut vectors);
        }
        Ok(out)
    }

    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(std::slice::from_ref(&text.to_string())).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::EmbeddingUnavailable("empty batch result".to_string()))
    }

    async fn embed_one_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut last_error = String::new();
        for model in &self.models {
            match model.embed_batch(batch).await {
                Ok(vectors) => match check_batch(&vectors, batch.len(), self.dimensions) {
                    Ok(()) => return Ok(vectors),
                    Err(reason) => {
                        tracing::warn!(model = model.id(), %reason, "embedding model misbehaved");
                        last_error = format!("{}: {}", model.id(), reason);
                    }
                },
                Err(e) => {
                    tracing::warn!(model = model.id(), error = %e, "embedding model failed");
                    last_error = format!("{}: {}", model.id(), e);
                }
            }
        }
        Err(RagError::EmbeddingUnavailable(last_error))
    }
}

fn check_batch(
    vectors: &[Vec<f32>],
    expected_len: usize,
    dimensions: usize,
) -> std::result::Result<(), String> {
    if vectors.len() != expected_len {
        return Err(format!("returned {} vectors for {} texts", vectors.len(), expected_len));
    }
    for v in vectors {
        if v.len() != dimensions {
            return Err(format!("returned vector of dimension {}, expected {}", v.len(), dimensions));
        }
    }
    Ok(())
}

/// Scale `v` to unit L2 norm in place. Zero vectors are left as-is.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
