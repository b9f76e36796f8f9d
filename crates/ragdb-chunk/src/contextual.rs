//! Contextual chunking: basic windows whose text is prefixed with
//! document-level context and/or the nearest section header, so the
//! embedding carries surrounding context the raw window lacks.

use ragdb_core::config::ChunkingConfig;
use ragdb_core::types::{Chunk, Document};

/// Used when `context_template` is not configured.
pub const DEFAULT_CONTEXT_TEMPLATE: &str = "Document: {document}\nSection: {section}\n\n{chunk}";

/// Marker set on chunks whose text carries a context prefix. The
/// contextual strategy executor prefers chunks carrying it.
pub const CONTEXTUALIZED_KEY: &str = "contextualized";

pub fn chunk(doc: &Document, config: &ChunkingConfig) -> Vec<Chunk> {
    let mut chunks = crate::basic::chunk(doc, config);
    let document_label = doc.title.clone().unwrap_or_else(|| doc.id.clone());

    for c in &mut chunks {
        let section = if config.add_section_headers {
            c.section.clone().unwrap_or_default()
        } else {
            String::new()
        };
        let document = if config.add_document_context {
            document_label.clone()
        } else {
            String::new()
        };
        if document.is_empty() && section.is_empty() {
            continue;
        }
        let template = config
            .context_template
            .as_deref()
            .unwrap_or(DEFAULT_CONTEXT_TEMPLATE);
        c.text = render(template, &document, &section, &c.text);
        c.metadata.insert(CONTEXTUALIZED_KEY.to_string(), "true".to_string());
    }
    chunks
}

fn render(template: &str, document: &str, section: &str, chunk: &str) -> String {
    template
        .replace("{document}", document)
        .replace("{section}", section)
        .replace("{chunk}", chunk)
}
