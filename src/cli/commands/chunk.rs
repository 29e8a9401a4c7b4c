use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use super::documents::{read_document, resolve_chunker};
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Args)]
pub struct ChunkArgs {
    #[arg(required = true, help = "Document to split")]
    pub path: PathBuf,

    #[arg(long, help = "Segment length in characters")]
    pub chunk_size: Option<u32>,

    #[arg(long, help = "Characters shared by consecutive segments")]
    pub overlap: Option<u32>,
}

/// Print the segments of one document. Needs no embedding model.
pub async fn handle_chunk(args: ChunkArgs, format: OutputFormat) -> Result<()> {
    let config = Config::load()?.config;
    let formatter = get_formatter(format);

    let chunker = resolve_chunker(&config.chunking, args.chunk_size, args.overlap)?;
    let document = read_document(&args.path, config.indexing.max_file_size)
        .with_context(|| format!("failed to load {}", args.path.display()))?;

    let segments = chunker.chunk(&document);
    print!("{}", formatter.format_segments(&document.id, &segments));

    Ok(())
}
