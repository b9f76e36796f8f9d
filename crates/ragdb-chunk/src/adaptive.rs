//! Per-document strategy selection.
//!
//! The heuristic is deterministic: long documents get the parent/child
//! split, structured documents get contextual windows, everything else
//! falls back to basic. The fallback is explicit, not silent.

use ragdb_core::config::{ChunkStrategy, ChunkingConfig};

use crate::section::has_section_headers;

/// A document at least this many parent windows long is considered
/// "long" and chunked parent/child.
pub const LONG_DOCUMENT_PARENT_FACTOR: usize = 4;

/// Pick the concrete strategy for one document.
pub fn choose(text: &str, config: &ChunkingConfig) -> ChunkStrategy {
    let len = text.chars().count();
    if len >= LONG_DOCUMENT_PARENT_FACTOR * config.parent_chunk_size {
        ChunkStrategy::ParentChild
    } else if has_section_headers(text) {
        ChunkStrategy::Contextual
    } else {
        ChunkStrategy::Basic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_documents_use_parent_child() {
        let config = ChunkingConfig::default();
        let text = "x".repeat(LONG_DOCUMENT_PARENT_FACTOR * config.parent_chunk_size);
        assert_eq!(choose(&text, &config), ChunkStrategy::ParentChild);
    }

    #[test]
    fn structured_documents_use_contextual() {
        let config = ChunkingConfig::default();
        assert_eq!(choose("# Title\nshort body", &config), ChunkStrategy::Contextual);
    }

    #[test]
    fn unstructured_short_documents_fall_back_to_basic() {
        let config = ChunkingConfig::default();
        assert_eq!(choose("short body, no structure", &config), ChunkStrategy::Basic);
    }

    #[test]
    fn choice_is_deterministic() {
        let config = ChunkingConfig::default();
        let text = "# A\nbody";
        assert_eq!(choose(text, &config), choose(text, &config));
    }
}
