//! Subcommand implementations: run a batch, run a worker pool over a
//! directory of batches, print store statistics, look up a proposition's
//! lineage, and show/validate the config file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use mnemo_archive::ArchiveStore;
use mnemo_config::PipelineConfig;
use mnemo_graph::GraphStore;
use mnemo_llm::{LlmCompletion, OllamaCompletionClient};
use mnemo_pipeline::{EmbeddingProvider, OllamaEmbeddingProvider, Orchestrator, WorkerPool};
use uuid::Uuid;

use crate::batch_file::BatchFile;

/// `LlmConfig` has no dedicated base URL field (only `EmbeddingConfig`
/// does); both providers default to the same local Ollama endpoint unless
/// overridden by `OLLAMA_BASE_URL`.
fn llm_base_url() -> String {
    std::env::var("OLLAMA_BASE_URL").unwrap_or_else(|_| "http://localhost:11434".to_string())
}

fn build_llm(config: &PipelineConfig) -> Arc<dyn LlmCompletion> {
    Arc::new(OllamaCompletionClient::new(
        llm_base_url(),
        config.llm.model.clone(),
        Duration::from_secs(config.llm.timeout_secs),
        config.worker.retry_max_attempts,
    ))
}

fn build_embedder(config: &PipelineConfig) -> Arc<dyn EmbeddingProvider> {
    Arc::new(OllamaEmbeddingProvider::new(config.embedding.model.clone(), &config.embedding.base_url, config.embedding.timeout_secs))
}

fn build_orchestrator(config: &PipelineConfig) -> Result<Orchestrator> {
    let graph = GraphStore::open(&config.graph.uri).with_context(|| format!("opening graph store at {}", config.graph.uri))?;
    let archive = ArchiveStore::open(&config.archive.path).with_context(|| format!("opening archive store at {}", config.archive.path))?;
    Ok(Orchestrator::new(build_llm(config), build_embedder(config), Arc::new(graph), Arc::new(archive), config.clone()))
}

fn read_batch_file(path: &Path) -> Result<BatchFile> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading batch file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing batch file {}", path.display()))
}

pub async fn run_batch(config: &PipelineConfig, path: &str, as_json: bool) -> Result<()> {
    let batch = read_batch_file(Path::new(path))?.into_batch_input();
    let orchestrator = build_orchestrator(config)?;
    let result = orchestrator.run(batch).await;

    if as_json {
        let timings: Vec<serde_json::Value> = result.stage_timings.iter().map(|t| serde_json::json!({ "stage": t.stage, "elapsed_secs": t.elapsed.as_secs_f64() })).collect();
        let rendered = serde_json::json!({
            "user_semantic_unit": serde_json::to_value(&result.user_su)?,
            "secondary_semantic_unit": serde_json::to_value(&result.secondary_su)?,
            "user_proposition_count": result.user_proposition_count,
            "secondary_proposition_count": result.secondary_proposition_count,
            "stored_proposition_ids": result.stored_proposition_ids.iter().map(Uuid::to_string).collect::<Vec<_>>(),
            "stage_timings": timings,
            "error": result.error,
        });
        println!("{}", serde_json::to_string_pretty(&rendered)?);
    } else {
        println!("── batch result ──────────────────────────────────────");
        println!("  user SU content       : {}", result.user_su.content);
        println!("  secondary SU content  : {}", result.secondary_su.content);
        println!("  user propositions     : {}", result.user_proposition_count);
        println!("  secondary propositions: {}", result.secondary_proposition_count);
        println!("  stored proposition ids: {}", result.stored_proposition_ids.len());
        for timing in &result.stage_timings {
            println!("    {:<16} {:>8.3}ms", timing.stage, timing.elapsed.as_secs_f64() * 1000.0);
        }
        match &result.error {
            Some(error) => println!("  error                 : {error}"),
            None => println!("  error                 : none"),
        }
    }

    Ok(())
}

pub async fn run_worker(config: &PipelineConfig, dir: &str, pool_size: Option<usize>) -> Result<()> {
    let dir = Path::new(dir);
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    if paths.is_empty() {
        println!("no *.json batch files found in {}", dir.display());
        return Ok(());
    }

    let orchestrator = Arc::new(build_orchestrator(config)?);
    let pool = WorkerPool::spawn(orchestrator, pool_size.unwrap_or(config.worker.pool_size), config.worker.queue_capacity);

    let mut submissions = Vec::with_capacity(paths.len());
    for path in &paths {
        let batch = read_batch_file(path)?.into_batch_input();
        submissions.push((path.clone(), pool.submit(batch)));
    }

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    for (path, submission) in submissions {
        match submission.await {
            Ok(result) if result.error.is_none() => succeeded += 1,
            Ok(result) => {
                failed += 1;
                eprintln!("{}: {}", path.display(), result.error.unwrap_or_default());
            }
            Err(err) => {
                failed += 1;
                eprintln!("{}: worker pool error: {err}", path.display());
            }
        }
    }

    pool.shutdown().await;
    println!("processed {} batch files: {succeeded} succeeded, {failed} failed", paths.len());
    Ok(())
}

pub async fn run_stats(config: &PipelineConfig) -> Result<()> {
    let graph = GraphStore::open(&config.graph.uri)?;
    let archive = ArchiveStore::open(&config.archive.path)?;

    let archive_stats = archive.get_stats()?;
    let proposition_count = graph.count_propositions()?;
    let edge_counts = graph.count_edges()?;

    println!("── archive ───────────────────────────────────────────");
    println!("  messages       : {}", archive_stats.messages);
    println!("  semantic units : {}", archive_stats.semantic_units);
    println!("  propositions   : {}", archive_stats.propositions);
    println!("── graph ─────────────────────────────────────────────");
    println!("  propositions   : {proposition_count}");
    println!("  NEXT edges     : {}", edge_counts.next);
    println!("  COHERENT edges : {}", edge_counts.coherent);
    Ok(())
}

pub fn run_lineage(config: &PipelineConfig, id: &str) -> Result<()> {
    let proposition_id = Uuid::parse_str(id).with_context(|| format!("{id} is not a valid UUID"))?;
    let archive = ArchiveStore::open(&config.archive.path)?;

    match archive.get_full_lineage(proposition_id)? {
        Some(lineage) => {
            println!("── lineage for {proposition_id} ──");
            println!("  message         : {} ({})", lineage.message.message_id, lineage.message.content);
            println!("  semantic unit   : {} ({})", lineage.semantic_unit.unit_id, lineage.semantic_unit.content);
            println!("  proposition     : {}", lineage.proposition.content);
        }
        None => println!("no proposition found with id {proposition_id}"),
    }
    Ok(())
}

pub fn config_show(config: &PipelineConfig) -> Result<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

pub fn config_validate(config: &PipelineConfig, path: &str) -> Result<()> {
    if !Path::new(path).exists() {
        config.save_to(path)?;
        println!("no configuration file found at {path}; wrote defaults");
    } else {
        println!("configuration file at {path} loaded successfully");
    }
    println!("  extraction_version : {}", config.llm.extraction_version);
    println!("  worker.pool_size    : {}", config.worker.pool_size);
    println!("  graph.uri           : {}", config.graph.uri);
    println!("  archive.path        : {}", config.archive.path);
    Ok(())
}
