use ragdb_core::config::{ChunkStrategy, ChunkingConfig};
use ragdb_core::types::Document;
use ragdb_chunk::Chunker;

fn doc_with_sections() -> Document {
    let mut text = String::from("# Beekeeping\n");
    text.push_str(&"bees and hives. ".repeat(40));
    text.push_str("\n# Composting\n");
    text.push_str(&"soil and worms. ".repeat(40));
    let mut doc = Document::new("notes", text);
    doc.title = Some("Homestead notes".to_string());
    doc
}

#[test]
fn basic_strategy_windows_the_whole_document() {
    let config = ChunkingConfig {
        strategy: ChunkStrategy::Basic,
        chunk_size: 300,
        chunk_overlap: 50,
        ..Default::default()
    };
    let doc = doc_with_sections();
    let total: usize = doc.text.chars().count();
    let chunks = Chunker::new(config).chunk(&doc);

    assert!(!chunks.is_empty());
    assert_eq!(chunks[0].char_start, 0);
    assert_eq!(chunks.last().expect("non-empty").char_end, total);
    for c in &chunks {
        assert!(c.parent_id.is_none());
        assert_eq!(c.doc_id, "notes");
    }
}

#[test]
fn contextual_chunks_carry_section_headers() {
    let config = ChunkingConfig {
        strategy: ChunkStrategy::Contextual,
        chunk_size: 300,
        chunk_overlap: 50,
        ..Default::default()
    };
    let chunks = Chunker::new(config).chunk(&doc_with_sections());
    assert!(chunks[0].text.contains("Section: Beekeeping"));
    let last = chunks.last().expect("non-empty");
    assert!(last.text.contains("Section: Composting"));
}

#[test]
fn parent_child_children_always_have_a_resolvable_parent() {
    let config = ChunkingConfig { strategy: ChunkStrategy::ParentChild, ..Default::default() };
    let chunks = Chunker::new(config).chunk(&doc_with_sections());
    for child in chunks.iter().filter(|c| c.is_child()) {
        let pid = child.parent_id.as_ref().expect("child");
        let parent = chunks.iter().find(|p| &p.id == pid).expect("parent present");
        assert!(child.char_start >= parent.char_start && child.char_end <= parent.char_end);
    }
}

#[test]
fn adaptive_routes_by_document_shape() {
    let config = ChunkingConfig { strategy: ChunkStrategy::Adaptive, ..Default::default() };
    let chunker = Chunker::new(config);

    // long unstructured document -> parent/child pairs
    let long_doc = Document::new("long", "w".repeat(9000));
    assert!(chunker.chunk(&long_doc).iter().any(|c| c.is_child()));

    // short structured document -> contextual prefixes
    let structured = chunker.chunk(&doc_with_sections());
    assert!(structured.iter().all(|c| !c.is_child()));
    assert!(structured[0].text.starts_with("Document: "));

    // short plain document -> basic
    let plain = chunker.chunk(&Document::new("plain", "a few plain words"));
    assert_eq!(plain.len(), 1);
    assert_eq!(plain[0].text, "a few plain words");
}

#[test]
fn empty_document_produces_no_chunks() {
    let config = ChunkingConfig::default();
    assert!(Chunker::new(config).chunk(&Document::new("empty", "")).is_empty());
}

#[test]
fn document_metadata_is_inherited() {
    let mut doc = doc_with_sections();
    doc.source_url = Some("https://example.org/notes".to_string());
    doc.quality_score = Some(0.83);
    let chunks = Chunker::new(ChunkingConfig::default()).chunk(&doc);
    let meta = &chunks[0].metadata;
    assert_eq!(meta.get("source_url").map(String::as_str), Some("https://example.org/notes"));
    assert_eq!(meta.get("title").map(String::as_str), Some("Homestead notes"));
    assert!(meta.contains_key("quality_score"));
}
