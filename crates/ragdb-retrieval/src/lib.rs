//! Multi-strategy retrieval and fusion.
//!
//! The pipeline for one query: expand into sub-queries, run every
//! enabled strategy per sub-query against the index adapter, fuse the
//! rankings with configured weights, strip near-duplicates, optionally
//! rerank the shortlist, then threshold-filter and truncate. The
//! `RetrievalEngine` front door owns admission control, per-branch
//! timeouts and the result cache.

pub mod cache;
pub mod diversity;
pub mod engine;
pub mod expand;
pub mod fusion;
pub mod index;
pub mod rerank;
pub mod strategy;

pub use engine::{RetrievalEngine, RetrievalOptions};
pub use expand::QueryExpander;
pub use index::CorpusIndex;
