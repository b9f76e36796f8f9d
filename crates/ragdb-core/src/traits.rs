//! Collaborator interfaces.
//!
//! The real embedding model, vector database and rerank model live
//! outside this workspace; the engine only ever talks to them through
//! these traits. Every call is async and is expected to be wrapped in
//! the configured request timeout by the caller.

use async_trait::async_trait;
use std::time::Duration;

use crate::types::{Chunk, ChunkId, IndexHit};

/// Abstract chunk store supporting vector similarity and lexical lookup.
///
/// Read-mostly: nothing but the ingestion path calls `upsert` once the
/// process is serving queries.
#[async_trait]
pub trait IndexAdapter: Send + Sync {
    async fn upsert(&self, chunks: &[Chunk]) -> anyhow::Result<()>;
    async fn vector_search(&self, vector: &[f32], k: usize) -> anyhow::Result<Vec<IndexHit>>;
    async fn text_search(&self, query: &str, k: usize) -> anyhow::Result<Vec<IndexHit>>;
    async fn get(&self, id: &ChunkId) -> anyhow::Result<Option<Chunk>>;
}

/// A single embedding model. Batching, fallback and normalization are
/// handled one level up by the embedder.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Second-pass relevance scorer applied to a shortlist.
#[async_trait]
pub trait RerankModel: Send + Sync {
    /// Returns one score per passage, same order as the input.
    async fn score(&self, query: &str, passages: &[String]) -> anyhow::Result<Vec<f32>>;
}

/// Observability hook. The engine reports (event, elapsed, result count)
/// tuples; what happens with them is not its concern.
pub trait MetricsSink: Send + Sync {
    fn record(&self, event: &str, elapsed: Duration, result_count: usize);
}

/// Sink that drops everything. Used when metrics are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record(&self, _event: &str, _elapsed: Duration, _result_count: usize) {}
}
