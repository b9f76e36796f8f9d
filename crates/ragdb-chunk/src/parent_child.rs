//! Two-pass parent/child chunking.
//!
//! Coarse parent windows give the context handed to generation, fine
//! child windows give retrieval precision. Children hold their parent's
//! id only; ownership stays with the chunk store.

use ragdb_core::config::ChunkingConfig;
use ragdb_core::types::{Chunk, Document};

use crate::section::{section_for_offset, section_headers};
use crate::window::windows;

/// Returns parents and children in one sequence, each parent directly
/// followed by its children. A document shorter than `child_chunk_size`
/// still yields one parent and one child spanning the whole document.
pub fn chunk(doc: &Document, config: &ChunkingConfig) -> Vec<Chunk> {
    let chars: Vec<char> = doc.text.chars().collect();
    let headers = section_headers(&doc.text);
    let meta = crate::base_metadata(doc);

    let mut out = Vec::new();
    let parent_windows = windows(chars.len(), config.parent_chunk_size, config.parent_overlap);
    for (pi, (p_start, p_end)) in parent_windows.into_iter().enumerate() {
        let parent_id = format!("{}:p{}", doc.id, pi);
        out.push(Chunk {
            id: parent_id.clone(),
            doc_id: doc.id.clone(),
            text: chars[p_start..p_end].iter().collect(),
            embedding: None,
            parent_id: None,
            section: section_for_offset(&headers, p_start),
            chunk_index: pi,
            char_start: p_start,
            char_end: p_end,
            metadata: meta.clone(),
        });

        let child_windows = windows(p_end - p_start, config.child_chunk_size, config.child_overlap);
        for (ci, (c_start, c_end)) in child_windows.into_iter().enumerate() {
            let start = p_start + c_start;
            let end = p_start + c_end;
            out.push(Chunk {
                id: format!("{}:c{}", parent_id, ci),
                doc_id: doc.id.clone(),
                text: chars[start..end].iter().collect(),
                embedding: None,
                parent_id: Some(parent_id.clone()),
                section: section_for_offset(&headers, start),
                chunk_index: ci,
                char_start: start,
                char_end: end,
                metadata: meta.clone(),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ChunkingConfig {
        ChunkingConfig {
            parent_chunk_size: 2000,
            parent_overlap: 400,
            child_chunk_size: 400,
            child_overlap: 100,
            ..ChunkingConfig::default()
        }
    }

    #[test]
    fn children_lie_within_their_parent_span() {
        let doc = Document::new("d", "z".repeat(5000));
        let chunks = chunk(&doc, &cfg());
        let parents: Vec<&Chunk> = chunks.iter().filter(|c| c.parent_id.is_none()).collect();
        for child in chunks.iter().filter(|c| c.parent_id.is_some()) {
            let pid = child.parent_id.as_ref().expect("child has parent");
            let parent = parents.iter().find(|p| &p.id == pid).expect("parent exists");
            assert!(child.char_start >= parent.char_start);
            assert!(child.char_end <= parent.char_end);
        }
    }

    #[test]
    fn parent_windows_cover_document_with_configured_overlap() {
        let doc = Document::new("d", "z".repeat(5000));
        let chunks = chunk(&doc, &cfg());
        let parents: Vec<&Chunk> = chunks.iter().filter(|c| c.parent_id.is_none()).collect();
        assert_eq!(parents[0].char_start, 0);
        assert_eq!(parents.last().expect("at least one parent").char_end, 5000);
        for pair in parents.windows(2) {
            // step = parent_chunk_size - parent_overlap
            assert_eq!(pair[1].char_start, pair[0].char_start + 1600);
        }
    }

    #[test]
    fn short_document_yields_one_parent_and_one_child() {
        let doc = Document::new("d", "tiny");
        let chunks = chunk(&doc, &cfg());
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].parent_id.is_none());
        assert_eq!(chunks[1].parent_id.as_deref(), Some(chunks[0].id.as_str()));
        assert_eq!(chunks[1].char_end, 4);
        assert_eq!(chunks[0].text, "tiny");
        assert_eq!(chunks[1].text, "tiny");
    }
}
