//! Domain types shared by the chunking, embedding and retrieval crates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type ChunkId = String;
pub type Meta = HashMap<String, String>;

/// An immutable source document handed over by the ingestion side.
///
/// The engine never mutates a document; it only derives chunks from it.
/// `quality_score` is computed upstream and carried through as provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: Option<String>,
    pub source_url: Option<String>,
    pub text: String,
    pub quality_score: Option<f32>,
    #[serde(default)]
    pub metadata: Meta,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            source_url: None,
            text: text.into(),
            quality_score: None,
            metadata: Meta::new(),
        }
    }
}

/// A retrievable unit derived from a document.
///
/// `char_start..char_end` is the span in the source document, in
/// characters. Contextual chunking prefixes `text` with surrounding
/// context but never moves the span. `parent_id` is a non-owning
/// back-reference: children hold ids only, the chunk store owns
/// every chunk's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
    pub parent_id: Option<ChunkId>,
    pub section: Option<String>,
    pub chunk_index: usize,
    pub char_start: usize,
    pub char_end: usize,
    #[serde(default)]
    pub metadata: Meta,
}

impl Chunk {
    pub fn is_child(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// The retrieval strategies the engine can run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Similarity,
    Contextual,
    ParentChild,
    Hybrid,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Similarity => "similarity",
            StrategyKind::Contextual => "contextual",
            StrategyKind::ParentChild => "parent_child",
            StrategyKind::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The minimal surface returned by the index adapter.
///
/// `score` is engine-specific but higher is always better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexHit {
    pub id: ChunkId,
    pub score: f32,
}

/// A scored candidate produced by one strategy for one query. Never
/// persisted; lives only for the duration of a `retrieve` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub chunk_id: ChunkId,
    pub score: f32,
    pub strategy: StrategyKind,
    pub rank: usize,
}

/// One entry of the fused ranking. `score` is a deterministic function
/// of the contributing candidates and the configured strategy weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedResult {
    pub chunk_id: ChunkId,
    pub score: f32,
    pub strategies: Vec<StrategyKind>,
    pub rank: usize,
}

/// Where a returned passage came from, for display by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub doc_id: String,
    pub source_url: Option<String>,
    pub section: Option<String>,
    pub strategies: Vec<StrategyKind>,
}

/// The unit handed to the generation/API layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub chunk_id: ChunkId,
    pub text: String,
    pub score: f32,
    pub provenance: Provenance,
}
