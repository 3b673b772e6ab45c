//! Command-line interface definitions for linkdupe.
//!
//! # Example
//!
//! ```bash
//! # Replace duplicates under /srv/data with hardlinks
//! linkdupe /srv/data
//!
//! # Show what would be linked, as JSON
//! linkdupe --dry-run --output json /srv/data
//!
//! # Verbose mode for debugging
//! linkdupe -vv /srv/data
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replace identical files with hardlinks to reclaim disk space.
///
/// Files are merged only when they live on the same filesystem and share
/// permission bits, owner and group, so no user sees different access
/// rights after the merge.
#[derive(Debug, Parser)]
#[command(name = "linkdupe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory tree to deduplicate
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print fatal errors as JSON objects on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Output format for the run report
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Show what would be linked without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Number of I/O threads for hashing (default: 4)
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Ignore zero-length files
    #[arg(long)]
    pub skip_empty: bool,

    /// Maximum attempts at finding a free temporary name per file (default: 16)
    #[arg(long, value_name = "N")]
    pub max_suffix_attempts: Option<usize>,

    /// Configuration file to use instead of the platform default
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,
}

/// Report output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// JSON document for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
