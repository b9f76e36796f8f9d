use anyhow::Result;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::{doc, Index, TantivyDocument};

use ragdb_core::types::{Chunk, IndexHit};

use crate::schema::{build_schema, register_tokenizer};

const WRITER_HEAP_BYTES: usize = 50_000_000;

pub struct TextIndex {
    index: Index,
    id_field: tantivy::schema::Field,
    doc_id_field: tantivy::schema::Field,
    section_field: tantivy::schema::Field,
    text_field: tantivy::schema::Field,
}

impl TextIndex {
    /// Create a fresh on-disk index, replacing whatever was there.
    pub fn create_in_dir(index_dir: &Path) -> Result<Self> {
        let schema = build_schema();
        if index_dir.exists() {
            std::fs::remove_dir_all(index_dir)?;
        }
        std::fs::create_dir_all(index_dir)?;
        let index = Index::create_in_dir(index_dir, schema)?;
        Self::from_index(index)
    }

    /// In-memory index for tests and the bundled corpus index.
    pub fn in_memory() -> Result<Self> {
        let index = Index::create_in_ram(build_schema());
        Self::from_index(index)
    }

    fn from_index(index: Index) -> Result<Self> {
        register_tokenizer(&index);
        let schema = index.schema();
        let id_field = schema.get_field("id")?;
        let doc_id_field = schema.get_field("doc_id")?;
        let section_field = schema.get_field("section")?;
        let text_field = schema.get_field("text")?;
        Ok(Self { index, id_field, doc_id_field, section_field, text_field })
    }

    pub fn add(&self, chunks: &[Chunk]) -> Result<()> {
        let mut index_writer = self.index.writer(WRITER_HEAP_BYTES)?;
        for c in chunks {
            let d = doc!(
                self.id_field => c.id.clone(),
                self.doc_id_field => c.doc_id.clone(),
                self.section_field => c.section.clone().unwrap_or_default(),
                self.text_field => c.text.clone(),
            );
            index_writer.add_document(d)?;
        }
        index_writer.commit()?;
        Ok(())
    }

    /// Top-k BM25 hits. Scores are unbounded; normalization is the
    /// caller's concern.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<IndexHit>> {
        let reader = self.index.reader()?;
        let searcher = reader.searcher();
        let qp = QueryParser::for_index(&self.index, vec![self.text_field]);
        // tolerate free-form user queries; syntax errors degrade to
        // whatever terms did parse
        let (q, _errors) = qp.parse_query_lenient(query);
        let top_docs = searcher.search(&q, &TopDocs::with_limit(k))?;
        let mut hits = Vec::new();
        for (score, addr) in top_docs {
            let d: TantivyDocument = searcher.doc(addr)?;
            let id = d
                .get_first(self.id_field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            hits.push(IndexHit { id, score });
        }
        Ok(hits)
    }
}
