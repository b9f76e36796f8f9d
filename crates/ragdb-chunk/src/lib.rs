//! Document chunking.
//!
//! Splits a `Document` into retrievable `Chunk`s under one of four
//! strategies: basic sliding windows, contextual (windows prefixed with
//! document/section context), parent_child (coarse parents re-split into
//! fine children), and adaptive (per-document strategy selection).
//!
//! Spans are always character offsets into the original document text;
//! contextual prefixes only ever change the chunk's `text`.

pub mod adaptive;
pub mod basic;
pub mod contextual;
pub mod parent_child;

mod section;
mod window;

pub use section::section_for_offset;
pub use window::windows;

use ragdb_core::config::{ChunkStrategy, ChunkingConfig};
use ragdb_core::types::{Chunk, Document};

pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split `doc` under the configured strategy.
    ///
    /// An empty document produces no chunks; any non-empty document
    /// produces at least one (parent_child: at least one parent/child
    /// pair, even when the document is shorter than `child_chunk_size`).
    pub fn chunk(&self, doc: &Document) -> Vec<Chunk> {
        self.chunk_with(doc, self.config.strategy)
    }

    fn chunk_with(&self, doc: &Document, strategy: ChunkStrategy) -> Vec<Chunk> {
        if doc.text.is_empty() {
            return Vec::new();
        }
        match strategy {
            ChunkStrategy::Basic => basic::chunk(doc, &self.config),
            ChunkStrategy::Contextual => contextual::chunk(doc, &self.config),
            ChunkStrategy::ParentChild => parent_child::chunk(doc, &self.config),
            ChunkStrategy::Adaptive => {
                let chosen = adaptive::choose(&doc.text, &self.config);
                tracing::debug!(doc_id = %doc.id, strategy = ?chosen, "adaptive chunking");
                self.chunk_with(doc, chosen)
            }
        }
    }
}

/// Metadata every chunk inherits from its document.
pub(crate) fn base_metadata(doc: &Document) -> ragdb_core::types::Meta {
    let mut meta = doc.metadata.clone();
    if let Some(title) = &doc.title {
        meta.insert("title".to_string(), title.clone());
    }
    if let Some(url) = &doc.source_url {
        meta.insert("source_url".to_string(), url.clone());
    }
    if let Some(score) = doc.quality_score {
        meta.insert("quality_score".to_string(), score.to_string());
    }
    meta
}
