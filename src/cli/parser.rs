//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros. Commands run
//! against the current working directory's `.contextkit/` project.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ContextKit: local-first context selection for LLMs.
///
/// Index one or more source roots, then select a token-bounded, ranked
/// slice of code for any natural-language query.
#[derive(Parser, Debug)]
#[command(name = "contextkit")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Emit machine-readable JSON on success.
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable color and progress decorations.
    #[arg(long, global = true)]
    pub plain: bool,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create `.contextkit/` with a default config.
    Init {
        /// Re-initialize, discarding the existing project directory.
        #[arg(long)]
        force: bool,
    },

    /// Manage source roots.
    #[command(subcommand)]
    Source(SourceCommands),

    /// Build or update the index.
    Index {
        /// Index only this source.
        #[arg(long)]
        source: Option<String>,
    },

    /// Produce context for a query.
    Select {
        /// The natural-language query.
        query: String,

        /// Token budget for the selection.
        #[arg(short = 'b', long)]
        budget: Option<usize>,

        /// Output format: markdown, xml, json or plain.
        #[arg(short = 'f', long)]
        format: Option<String>,

        /// Selection mode: full or map.
        #[arg(short = 'm', long, default_value = "full")]
        mode: String,

        /// Restrict to these sources (comma separated).
        #[arg(short = 's', long, value_delimiter = ',')]
        sources: Vec<String>,

        /// Append the scoring breakdown (markdown only).
        #[arg(long)]
        explain: bool,

        /// Apply the import-graph boost.
        #[arg(long)]
        include_imports: bool,

        /// Bypass the query cache.
        #[arg(long)]
        no_cache: bool,
    },

    /// Find a symbol by name in the indexed chunks.
    Symbol {
        /// Symbol name (or substring) to search for.
        name: String,

        /// Exact matches only; fails with exit code 4 when none exist.
        #[arg(long)]
        exact: bool,

        /// Maximum number of results.
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Restrict to these sources (comma separated).
        #[arg(long, value_delimiter = ',')]
        sources: Vec<String>,
    },

    /// Show added/modified/removed files since the last index.
    Diff {
        /// Diff only this source.
        #[arg(long)]
        source: Option<String>,
    },

    /// Manage the query cache.
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Inspect or re-run past queries.
    History {
        /// Re-run the query with this history id.
        #[arg(long)]
        run: Option<i64>,

        /// Clear the history log.
        #[arg(long)]
        clear: bool,

        /// Number of entries to show.
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Dump the index as JSON.
    Export {
        /// Output file (stdout when omitted).
        path: Option<PathBuf>,

        /// Leave embedding vectors out of the dump.
        #[arg(long)]
        no_embeddings: bool,
    },

    /// Report initialization, source count and index statistics.
    Status,
}

/// Source management subcommands.
#[derive(Subcommand, Debug)]
pub enum SourceCommands {
    /// Register a source root.
    Add {
        /// Root directory to register.
        path: PathBuf,

        /// Source name (defaults to the directory name).
        #[arg(long)]
        name: Option<String>,

        /// Include globs (comma separated).
        #[arg(long, value_delimiter = ',')]
        include: Vec<String>,

        /// Exclude globs (comma separated).
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
    },

    /// List registered sources.
    List,

    /// Remove a source and its indexed data.
    Remove {
        /// Name of the source to remove.
        name: String,
    },
}

/// Cache management subcommands.
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Drop all cached query results.
    Clear,
    /// Show cache statistics.
    Stats,
}
