use anyhow::{Context, Result};
use clap::Args;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::documents::{build_index, load_documents, resolve_chunker};
use super::search::write_export;
use crate::cli::output::{Formatter, IndexStats, get_formatter};
use crate::models::{BackendPreference, Config, Document, OutputFormat, SearchResults, VectorIndexConfig};
use crate::services::{CorpusIndex, Embedder, HybridRanker, IndexCache, TextChunker};

#[derive(Debug, Args)]
pub struct InteractiveArgs {
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
}

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Query(String),
    SetK(usize),
    Rechunk { size: u32, overlap: u32 },
    Export(PathBuf),
    Help,
    Quit,
    Empty,
}

const HELP: &str = "\
Type a query to search, or:
  :k N                 return N results
  :chunk SIZE OVERLAP  re-chunk and rebuild the index
  :export FILE         save the last results (.md for Markdown)
  :help                show this help
  :quit                exit";

impl std::str::FromStr for ReplCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix(':') else {
            return Ok(if line.is_empty() {
                ReplCommand::Empty
            } else {
                ReplCommand::Query(line.to_string())
            });
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        match (name, args.as_slice()) {
            ("q" | "quit" | "exit", []) => Ok(ReplCommand::Quit),
            ("h" | "help", []) => Ok(ReplCommand::Help),
            ("k", [n]) => n
                .parse()
                .map(ReplCommand::SetK)
                .map_err(|_| format!("not a number: {}", n)),
            ("chunk", [size, overlap]) => {
                let size = size.parse().map_err(|_| format!("not a number: {}", size))?;
                let overlap = overlap
                    .parse()
                    .map_err(|_| format!("not a number: {}", overlap))?;
                Ok(ReplCommand::Rechunk { size, overlap })
            }
            ("export", [path]) => Ok(ReplCommand::Export(PathBuf::from(path))),
            _ => Err(format!("unknown command: {} (try :help)", line)),
        }
    }
}

struct Session {
    documents: Arc<Vec<Document>>,
    files: Vec<String>,
    stats: IndexStats,
    embedder: Embedder,
    ranker: Arc<HybridRanker>,
    vector_config: VectorIndexConfig,
    cache: IndexCache,
    chunker: TextChunker,
    k: usize,
    verbose: bool,
    last: Option<SearchResults>,
}

impl Session {
    /// The index for the current chunker. The cache travels into the worker
    /// thread so a miss is built there and stored on return.
    async fn index(&mut self) -> Result<Arc<CorpusIndex>> {
        let mut cache = std::mem::take(&mut self.cache);
        let documents = Arc::clone(&self.documents);
        let embedder = self.embedder.clone();
        let vector_config = self.vector_config.clone();
        let chunker = self.chunker;

        let (cache, index) = tokio::task::spawn_blocking(move || {
            let index = cache.get_or_build(&documents, chunker, |docs, chunker| {
                build_index(docs, chunker, &embedder, &vector_config)
            });
            (cache, index)
        })
        .await
        .context("index build task failed")?;

        self.cache = cache;
        index.context("failed to build index")
    }

    fn report(&self, index: &CorpusIndex, formatter: &dyn Formatter) {
        if !self.verbose {
            return;
        }
        let stats = IndexStats {
            segments: index.len() as u64,
            backend: index.backend().to_string(),
            duration_ms: index.build_time().as_millis() as u64,
            ..self.stats.clone()
        };
        eprint!("{}", formatter.format_index_stats(&stats));
    }

    async fn search(&mut self, query: String) -> Result<SearchResults> {
        let index = self.index().await?;
        let ranker = Arc::clone(&self.ranker);
        let k = self.k;
        let start = Instant::now();

        let q = query.clone();
        let search_index = Arc::clone(&index);
        let results = tokio::task::spawn_blocking(move || ranker.search(&search_index, &q, k))
            .await
            .context("search task failed")?
            .context("search failed")?;

        Ok(SearchResults::new(
            query,
            results,
            index.len() as u64,
            start.elapsed().as_millis() as u64,
        ))
    }
}

pub async fn handle_interactive(
    args: InteractiveArgs,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let mut config = Config::load()?.config;
    let formatter = get_formatter(format);
    if let Some(backend) = args.backend {
        config.vector_index.backend = backend;
    }

    let paths = args.paths.clone();
    let indexing = config.indexing.clone();
    let loaded = tokio::task::spawn_blocking(move || load_documents(&paths, &indexing))
        .await
        .context("document loading task failed")??;

    let embedder = Embedder::from_config(&config.embedding);
    let mut session = Session {
        files: loaded.file_names(),
        stats: loaded.stats,
        documents: Arc::new(loaded.documents),
        ranker: Arc::new(HybridRanker::new(embedder.clone(), &config.search)),
        embedder,
        vector_config: config.vector_index.clone(),
        cache: IndexCache::new(),
        chunker: resolve_chunker(&config.chunking, args.chunk_size, args.overlap)?,
        k: args.k.unwrap_or(config.search.default_limit) as usize,
        verbose,
        last: None,
    };

    let index = session.index().await?;
    session.report(&index, formatter.as_ref());
    eprintln!(
        "Indexed {} documents into {} segments ({} backend). Type :help for commands.",
        session.documents.len(),
        index.len(),
        index.backend()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        std::io::stderr().flush().ok();

        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };

        let command = match line.parse::<ReplCommand>() {
            Ok(command) => command,
            Err(e) => {
                eprint!("{}", formatter.format_error(&e));
                continue;
            }
        };

        if let Err(e) = run_command(&mut session, command.clone(), formatter.as_ref()).await {
            eprint!("{}", formatter.format_error(&format!("{:#}", e)));
        }
        if command == ReplCommand::Quit {
            break;
        }
    }

    Ok(())
}

async fn run_command(
    session: &mut Session,
    command: ReplCommand,
    formatter: &dyn Formatter,
) -> Result<()> {
    match command {
        ReplCommand::Query(query) => {
            let results = session.search(query).await?;
            print!("{}", formatter.format_search_results(&results));
            session.last = Some(results);
        }
        ReplCommand::SetK(k) => {
            if k == 0 {
                anyhow::bail!("k must be at least 1");
            }
            session.k = k;
            eprint!("{}", formatter.format_message(&format!("Returning {} results", k)));
        }
        ReplCommand::Rechunk { size, overlap } => {
            let config = Config::load()?.config;
            session.chunker = resolve_chunker(&config.chunking, Some(size), Some(overlap))?;
            let index = session.index().await?;
            session.report(&index, formatter);
            eprint!(
                "{}",
                formatter.format_message(&format!(
                    "Rebuilt index: {} segments of {} chars, overlap {}",
                    index.len(),
                    size,
                    overlap
                ))
            );
        }
        ReplCommand::Export(path) => match session.last {
            Some(ref results) => write_export(&path, results, &session.files, formatter)?,
            None => anyhow::bail!("nothing to export yet"),
        },
        ReplCommand::Help => eprintln!("{}", HELP),
        ReplCommand::Quit | ReplCommand::Empty => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::output::TextFormatter;
    use crate::models::SearchConfig;
    use crate::test_utils::hashing_embedder;

    fn session(verbose: bool) -> Session {
        let embedder = hashing_embedder(32);
        let documents = vec![
            Document::new("a.txt", "Tokio is an asynchronous runtime for Rust programs."),
            Document::new("b.txt", "Quarterly revenue grew while costs stayed flat."),
        ];
        Session {
            files: documents.iter().map(|d| d.id.clone()).collect(),
            stats: IndexStats::default(),
            documents: Arc::new(documents),
            ranker: Arc::new(HybridRanker::new(embedder.clone(), &SearchConfig::default())),
            embedder,
            vector_config: VectorIndexConfig::default(),
            cache: IndexCache::new(),
            chunker: TextChunker::new(40, 10).unwrap(),
            k: 2,
            verbose,
            last: None,
        }
    }

    #[tokio::test]
    async fn test_session_reuses_cached_index() {
        let mut session = session(true);

        let first = session.index().await.unwrap();
        let second = session.index().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        session.report(&first, &TextFormatter);

        session.chunker = TextChunker::new(30, 5).unwrap();
        let rebuilt = session.index().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(rebuilt.chunker(), Some(session.chunker));
        assert!(Arc::ptr_eq(&session.cache.current().unwrap(), &rebuilt));
    }

    #[tokio::test]
    async fn test_session_search_uses_current_k() {
        let mut session = session(false);
        session.k = 1;
        let results = session.search("revenue".to_string()).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.total_segments, session.cache.current().unwrap().len() as u64);
    }

    fn parse(line: &str) -> Result<ReplCommand, String> {
        line.parse()
    }

    #[test]
    fn test_plain_text_is_a_query() {
        assert_eq!(
            parse("  data visualization  ").unwrap(),
            ReplCommand::Query("data visualization".to_string())
        );
        assert_eq!(parse("   ").unwrap(), ReplCommand::Empty);
    }

    #[test]
    fn test_commands() {
        assert_eq!(parse(":quit").unwrap(), ReplCommand::Quit);
        assert_eq!(parse(":q").unwrap(), ReplCommand::Quit);
        assert_eq!(parse(":k 7").unwrap(), ReplCommand::SetK(7));
        assert_eq!(
            parse(":chunk 600 120").unwrap(),
            ReplCommand::Rechunk {
                size: 600,
                overlap: 120
            }
        );
        assert_eq!(
            parse(":export out.md").unwrap(),
            ReplCommand::Export(PathBuf::from("out.md"))
        );
    }

    #[test]
    fn test_malformed_commands() {
        assert!(parse(":k seven").is_err());
        assert!(parse(":chunk 600").is_err());
        assert!(parse(":frobnicate").is_err());
        assert!(parse(":").is_err());
    }
}
