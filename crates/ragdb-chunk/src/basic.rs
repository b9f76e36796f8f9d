//! Fixed-size sliding-window chunking.

use ragdb_core::config::ChunkingConfig;
use ragdb_core::types::{Chunk, Document};

use crate::section::{section_for_offset, section_headers};
use crate::window::windows;

pub fn chunk(doc: &Document, config: &ChunkingConfig) -> Vec<Chunk> {
    let chars: Vec<char> = doc.text.chars().collect();
    let headers = section_headers(&doc.text);
    let meta = crate::base_metadata(doc);

    windows(chars.len(), config.chunk_size, config.chunk_overlap)
        .into_iter()
        .enumerate()
        .map(|(i, (start, end))| Chunk {
            id: format!("{}:{}", doc.id, i),
            doc_id: doc.id.clone(),
            text: chars[start..end].iter().collect(),
            embedding: None,
            parent_id: None,
            section: section_for_offset(&headers, start),
            chunk_index: i,
            char_start: start,
            char_end: end,
            metadata: meta.clone(),
        })
        .collect()
}
