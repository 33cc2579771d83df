//! CLI parse: clap types for provgraph. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// provgraph - consistency checking for repository provenance graphs
#[derive(Parser)]
#[command(name = "provgraph")]
#[command(about = "Check and repair the repo/branch/commit provenance graph")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Verify graph invariants, printing one message per violation
    Fsck {
        /// Apply mechanical repairs after the scan
        #[arg(long)]
        fix: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Check a JSON graph dump instead of the configured store
        #[arg(long)]
        dump: Option<PathBuf>,
    },
    /// Write every record of a JSON graph dump into the store
    ///
    /// Record names are checked before anything is written. Records are
    /// upserted one at a time, so a storage failure mid-load leaves the
    /// records written so far in place.
    Load {
        /// Dump file produced by `provgraph dump`
        file: PathBuf,
    },
    /// Print every record of the store as a JSON graph dump
    Dump,
    /// Show per-repo branch and commit counts
    Stats {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}
