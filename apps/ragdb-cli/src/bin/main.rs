use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use ragdb_chunk::Chunker;
use ragdb_core::config::RagConfig;
use ragdb_core::traits::IndexAdapter;
use ragdb_core::types::{Chunk, Document};
use ragdb_embed::{BatchEmbedder, HashEmbedding};
use ragdb_retrieval::{CorpusIndex, RetrievalEngine, RetrievalOptions};

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {prog} <ingest|query> [args...]");
        eprintln!("  ingest <data_dir>            chunk and index a directory of .txt files");
        eprintln!("  query <data_dir> \"<text>\"    index a directory, then retrieve passages");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RagConfig::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => {
            let data_dir = args
                .first()
                .map(PathBuf::from)
                .ok_or_else(|| anyhow::anyhow!("ingest requires a data directory"))?;
            let (index, chunks) = ingest(&config, &data_dir).await?;
            println!("✅ Ingest complete ({} chunks, {} indexed)", chunks, index.len());
        }
        "query" => {
            let data_dir = args
                .first()
                .map(PathBuf::from)
                .ok_or_else(|| anyhow::anyhow!("query requires a data directory"))?;
            let query = args
                .get(1)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Usage: ragdb query <data_dir> \"<text>\""))?;

            let (index, _) = ingest(&config, &data_dir).await?;
            let embedder = build_embedder(&config)?;
            let engine = RetrievalEngine::new(config, index, embedder)?;
            let passages = engine.retrieve(&query, &RetrievalOptions::default()).await?;

            if passages.is_empty() {
                println!("No passages cleared the quality bar for: {query}");
                return Ok(());
            }
            println!("📚 Top {} passages for: {query}\n", passages.len());
            for (i, p) in passages.iter().enumerate() {
                let strategies: Vec<&str> =
                    p.provenance.strategies.iter().map(|s| s.as_str()).collect();
                println!("{}. [{:.3}] {} ({})", i + 1, p.score, p.chunk_id, strategies.join("+"));
                println!("   doc: {}", p.provenance.doc_id);
                if let Some(section) = &p.provenance.section {
                    println!("   section: {section}");
                }
                if let Some(url) = &p.provenance.source_url {
                    println!("   source: {url}");
                }
                println!("   {}\n", snippet(&p.text, 240));
            }
        }
        _ => {
            eprintln!("Unknown command: {cmd}");
            std::process::exit(1);
        }
    }
    Ok(())
}

fn build_embedder(config: &RagConfig) -> anyhow::Result<Arc<BatchEmbedder>> {
    let mut models: Vec<Arc<dyn ragdb_core::traits::EmbeddingModel>> = vec![Arc::new(
        HashEmbedding::new(config.embedding.primary_model.clone(), config.embedding.dimensions),
    )];
    for fallback in &config.embedding.fallback_models {
        models.push(Arc::new(HashEmbedding::new(fallback.clone(), config.embedding.dimensions)));
    }
    Ok(Arc::new(BatchEmbedder::new(&config.embedding, models)?))
}

/// Walk `data_dir` for .txt files, chunk and embed them, and load the
/// result into an in-process index.
async fn ingest(config: &RagConfig, data_dir: &Path) -> anyhow::Result<(Arc<CorpusIndex>, usize)> {
    let documents = read_documents(data_dir)?;
    if documents.is_empty() {
        anyhow::bail!("no .txt files found under {}", data_dir.display());
    }
    println!("Ingesting {} documents from {}", documents.len(), data_dir.display());

    let chunker = Chunker::new(config.chunking.clone());
    let bar = ProgressBar::new(documents.len() as u64);
    bar.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")?);
    let mut chunks: Vec<Chunk> = Vec::new();
    for doc in &documents {
        bar.set_message(doc.id.clone());
        chunks.extend(chunker.chunk(doc));
        bar.inc(1);
    }
    bar.finish_with_message("chunked");

    let embedder = build_embedder(config)?;
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed(&texts).await?;
    for (chunk, vector) in chunks.iter_mut().zip(vectors) {
        chunk.embedding = Some(vector);
    }

    let index = Arc::new(CorpusIndex::new()?);
    index.upsert(&chunks).await?;
    Ok((index, chunks.len()))
}

fn read_documents(data_dir: &Path) -> anyhow::Result<Vec<Document>> {
    let mut documents = Vec::new();
    for entry in WalkDir::new(data_dir).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        let text = fs::read_to_string(path)?;
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mut doc = Document::new(id, text);
        doc.title = path.file_stem().map(|s| s.to_string_lossy().into_owned());
        doc.source_url = Some(format!("file://{}", path.display()));
        documents.push(doc);
    }
    documents.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(documents)
}

fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{cut}…")
    }
}
