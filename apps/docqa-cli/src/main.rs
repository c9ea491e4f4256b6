use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docqa_answer::{ExtractiveGenerator, QaEngine};
use docqa_core::config::Config;
use docqa_core::data_processor::DataProcessor;
use docqa_core::traits::{Embedder, Generator};
use docqa_core::types::OutcomeKind;
use docqa_embed::{use_fake_embeddings, HashEmbedder};
use docqa_llm::GeminiClient;
use docqa_store::MemoryStore;

/// Chunks embedded per request while ingesting.
const INGEST_BATCH: usize = 32;

/// Answer questions from your own documents
#[derive(Parser, Debug)]
#[command(name = "docqa", version, about, long_about = None)]
struct Cli {
    /// Use the hashing embedder and the extractive generator; no network calls
    #[arg(long, global = true)]
    offline: bool,

    /// Directory holding config.toml and config.<env>.toml
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chunk, embed and store documents (files or directories)
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Ask a question about the stored documents
    Ask {
        question: String,
        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what the store holds
    Status,
    /// Remove every stored chunk
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let env_name = std::env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
    let config = Config::load_for_env(&cli.config_dir, &env_name).context("loading configuration")?;
    let store_path = config.store()?.resolved_path(&cli.config_dir);

    match cli.command {
        Command::Ingest { paths } => ingest(&config, &store_path, &paths, cli.offline).await,
        Command::Ask { question, json } => ask(&config, &store_path, &question, json, cli.offline).await,
        Command::Status => status(&store_path).await,
        Command::Clear => clear(&store_path).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_embedder(config: &Config, offline: bool) -> Result<Arc<dyn Embedder>> {
    if offline || use_fake_embeddings() {
        return Ok(Arc::new(HashEmbedder::default()));
    }
    let client = GeminiClient::new(&config.llm()?).context("configuring Gemini embeddings")?;
    Ok(Arc::new(client))
}

fn build_generator(config: &Config, offline: bool) -> Result<Arc<dyn Generator>> {
    if offline {
        info!("offline mode, answers are extracted from the context");
        return Ok(Arc::new(ExtractiveGenerator::default()));
    }
    let client = GeminiClient::new(&config.llm()?).context("configuring Gemini generation")?;
    Ok(Arc::new(client))
}

async fn ingest(config: &Config, store_path: &Path, paths: &[PathBuf], offline: bool) -> Result<()> {
    let processor = DataProcessor::with_config(config.chunking()?);
    let batch = processor.process_paths(paths)?;
    for skipped in &batch.skipped {
        warn!(file = %skipped, "skipped file");
    }
    if batch.chunks.is_empty() {
        println!("Nothing to ingest ({} files skipped).", batch.skipped.len());
        return Ok(());
    }

    let embedder = build_embedder(config, offline)?;
    let store = MemoryStore::open(store_path).await.with_context(|| format!("opening {}", store_path.display()))?;
    let documents = batch.document_count();

    let bar = ProgressBar::new(batch.chunks.len() as u64);
    bar.set_style(ProgressStyle::with_template("{spinner} embedding [{bar:40}] {pos}/{len} chunks ({eta})")?.progress_chars("=> "));
    let mut chunks = Vec::with_capacity(batch.chunks.len());
    for group in batch.chunks.chunks(INGEST_BATCH) {
        let texts: Vec<String> = group.iter().map(|c| c.content.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await.context("embedding chunks")?;
        chunks.extend(group.iter().cloned().zip(vectors).map(|(chunk, embedding)| chunk.into_chunk(embedding)));
        bar.inc(group.len() as u64);
    }
    bar.finish_and_clear();

    let added = store.add_documents(chunks).await?;
    store.save(store_path).await?;
    println!("Ingested {added} chunks from {documents} documents into {}.", store_path.display());
    if !batch.skipped.is_empty() {
        println!("Skipped: {}", batch.skipped.join(", "));
    }
    Ok(())
}

async fn ask(config: &Config, store_path: &Path, question: &str, json: bool, offline: bool) -> Result<()> {
    let store = Arc::new(MemoryStore::open(store_path).await.with_context(|| format!("opening {}", store_path.display()))?);
    let engine = QaEngine::new(store, build_embedder(config, offline)?, build_generator(config, offline)?, config.pipeline()?)?;
    let outcome = engine.answer_question(question).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    println!("{}", outcome.answer_text);
    if outcome.kind == OutcomeKind::Grounded {
        if let Some(source) = &outcome.source {
            println!("\nSource: {source} (confidence {:.3})", outcome.confidence);
        }
    }
    Ok(())
}

async fn status(store_path: &Path) -> Result<()> {
    let store = MemoryStore::open(store_path).await?;
    let status = store.status().await;
    println!("Store: {}", store_path.display());
    println!("  chunks:    {}", status.chunk_count);
    println!("  documents: {}", status.document_count);
    match status.dim {
        Some(dim) => println!("  dimension: {dim}"),
        None => println!("  dimension: (empty)"),
    }
    for name in store.documents().await {
        println!("  - {name}");
    }
    Ok(())
}

async fn clear(store_path: &Path) -> Result<()> {
    let store = MemoryStore::open(store_path).await?;
    let before = store.status().await.chunk_count;
    store.clear().await;
    store.save(store_path).await?;
    println!("Cleared {before} chunks from {}.", store_path.display());
    Ok(())
}
