//! Command-line interface for docfinder.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Hybrid semantic and keyword search over local documents.
#[derive(Debug, Parser)]
#[command(name = "docfinder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Index the given files and run one query against them
    Search(commands::SearchArgs),

    /// Show how a document is split into segments
    Chunk(commands::ChunkArgs),

    /// Index once, then answer queries from stdin
    Interactive(commands::InteractiveArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search() {
        let cli = Cli::parse_from([
            "docfinder", "search", "async runtime", "notes.md", "docs", "-k", "3", "-f", "json",
        ]);
        assert_eq!(cli.format, Some(OutputFormat::Json));
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.query, "async runtime");
                assert_eq!(args.paths.len(), 2);
                assert_eq!(args.k, Some(3));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_search_requires_paths() {
        assert!(Cli::try_parse_from(["docfinder", "search", "query"]).is_err());
    }

    #[test]
    fn test_verbose_after_interactive() {
        let cli = Cli::parse_from(["docfinder", "interactive", "docs", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Interactive(_)));

        let cli = Cli::parse_from(["docfinder", "chunk", "notes.md"]);
        assert!(!cli.verbose);
    }
}
