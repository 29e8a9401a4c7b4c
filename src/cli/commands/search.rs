use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::documents::{build_index, load_documents, resolve_chunker};
use crate::cli::output::{Formatter, get_formatter};
use crate::models::{BackendPreference, Config, OutputFormat, SearchResults};
use crate::services::{Embedder, ExportFormat, HybridRanker, export};

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(required = true, help = "Search query text")]
    pub query: String,

    #[arg(required = true, help = "Files or directories to search")]
    pub paths: Vec<PathBuf>,

    #[arg(long, short = 'k', help = "Number of results to return")]
    pub k: Option<u32>,

    #[arg(long, help = "Segment length in characters")]
    pub chunk_size: Option<u32>,

    #[arg(long, help = "Characters shared by consecutive segments")]
    pub overlap: Option<u32>,

    #[arg(long, help = "Vector index backend: auto or exact")]
    pub backend: Option<BackendPreference>,

    #[arg(long, help = "Minimum fused score threshold (0.0-1.0)")]
    pub min_score: Option<f32>,

    #[arg(long, short = 'e', help = "Write results to a .txt or .md file")]
    pub export: Option<PathBuf>,
}

pub async fn handle_search(args: SearchArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let mut config = Config::load()?.config;
    let formatter = get_formatter(format);
    let start_time = Instant::now();

    if let Some(score) = args.min_score
        && !(0.0..=1.0).contains(&score)
    {
        anyhow::bail!("min_score must be between 0.0 and 1.0");
    }
    if let Some(backend) = args.backend {
        config.vector_index.backend = backend;
    }

    let k = args.k.unwrap_or(config.search.default_limit) as usize;
    let chunker = resolve_chunker(&config.chunking, args.chunk_size, args.overlap)?;

    let paths = args.paths.clone();
    let indexing = config.indexing.clone();
    let loaded = tokio::task::spawn_blocking(move || load_documents(&paths, &indexing))
        .await
        .context("document loading task failed")??;
    let files = loaded.file_names();

    let embedder = Embedder::from_config(&config.embedding);
    let ranker = HybridRanker::new(embedder.clone(), &config.search);
    let vector_config = config.vector_index.clone();
    let query = args.query.clone();
    let documents = loaded.documents;

    let (index, results) = tokio::task::spawn_blocking(move || {
        let index = build_index(&documents, chunker, &embedder, &vector_config)?;
        let results = ranker.search(&index, &query, k)?;
        Ok::<_, crate::error::SearchError>((index, results))
    })
    .await
    .context("search task failed")?
    .context("search failed")?;

    if verbose {
        let mut stats = loaded.stats;
        stats.segments = index.len() as u64;
        stats.backend = index.backend().to_string();
        stats.duration_ms = index.build_time().as_millis() as u64;
        eprint!("{}", formatter.format_index_stats(&stats));
        eprintln!();
    }

    let duration_ms = start_time.elapsed().as_millis() as u64;
    let mut search_results =
        SearchResults::new(args.query.clone(), results, index.len() as u64, duration_ms);
    if let Some(score) = args.min_score {
        search_results.retain_min_score(score);
    }

    print!("{}", formatter.format_search_results(&search_results));

    if let Some(ref path) = args.export {
        write_export(path, &search_results, &files, formatter.as_ref())?;
    }

    Ok(())
}

pub(crate) fn write_export(
    path: &Path,
    results: &SearchResults,
    files: &[String],
    formatter: &dyn Formatter,
) -> Result<()> {
    let generated = chrono::Local::now().naive_local();
    let content = export::render(ExportFormat::from_path(path), results, files, generated);
    std::fs::write(path, content)
        .with_context(|| format!("failed to write export to {}", path.display()))?;
    eprint!(
        "{}",
        formatter.format_message(&format!(
            "Exported {} results to {}",
            results.len(),
            path.display()
        ))
    );
    Ok(())
}
