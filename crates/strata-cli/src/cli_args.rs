use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// strata — multi-language source analysis and incremental symbol index.
#[derive(Parser)]
#[command(name = "strata", version, about)]
pub struct Cli {
    /// Project root (defaults to the current directory).
    #[arg(long, global = true, env = "STRATA_ROOT")]
    pub root: Option<PathBuf>,

    /// Emit machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index the project and print stats.
    Index,
    /// List supported languages and extensions.
    Languages,
    /// Search symbols by case-insensitive substring.
    Search { query: String },
    /// Look up the first definition of a name.
    Def {
        name: String,
        /// Restrict to a symbol kind (e.g. function, class, method).
        #[arg(long)]
        kind: Option<String>,
    },
    /// List symbols in one project-relative file.
    File { path: String },
    /// List symbols of one kind.
    Kind { kind: String },
    /// Print index statistics.
    Stats,
    /// One-hop callers of a call-graph node id.
    Callers { id: String },
    /// One-hop callees of a call-graph node id.
    Callees { id: String },
    /// Enumerate call paths between two node ids.
    Chain {
        from: String,
        to: String,
        #[arg(long, default_value_t = 5)]
        depth: u32,
    },
    /// Transitive callers of a node id.
    Impact {
        id: String,
        #[arg(long, default_value_t = 5)]
        depth: u32,
    },
    /// Files a file imports, and the shortest path to another file.
    Deps {
        file: String,
        /// When given, print the shortest import path to this file.
        #[arg(long)]
        to: Option<String>,
        #[arg(long, default_value_t = 10)]
        depth: u32,
    },
    /// Report cyclic import chains.
    Cycles,
    /// Mermaid export of the call or dependency graph.
    Mermaid {
        /// "calls" or "deps".
        #[arg(default_value = "calls")]
        graph: String,
        #[arg(long, default_value_t = 100)]
        max_nodes: usize,
    },
    /// Find textual references to a symbol name (capped at 50).
    Refs {
        name: String,
        #[arg(long)]
        kind: Option<String>,
        /// Drop the definition itself from the results.
        #[arg(long)]
        usages: bool,
    },
    /// Print the body of a function found in a file.
    Body { file: String, name: String },
    /// Watch the project and keep the index fresh until interrupted.
    Watch,
}
