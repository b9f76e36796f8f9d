//! ragdb-text
//!
//! Tantivy-based lexical index over chunks. Serves the `text_search`
//! half of the index adapter contract; the vector half lives with
//! whatever vector store backs the deployment.

pub mod index;
pub mod schema;

pub use index::TextIndex;
