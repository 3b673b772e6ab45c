//! linkdupe - hardlink-based file deduplication
//!
//! Walks a directory tree, finds regular files with identical content that
//! share device, permission bits, owner and group, and replaces every copy
//! but one with a hardlink to the survivor.
//!
//! ```no_run
//! use std::path::Path;
//!
//! let report = linkdupe::deduplicate(Path::new("/srv/data")).unwrap();
//! println!("{} files merged", report.stats.merged);
//! ```

#[cfg(not(unix))]
compile_error!("linkdupe relies on Unix device and inode numbers and only builds on Unix");

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod report;
pub mod scanner;
pub mod signal;

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::error::ExitCode;
use crate::output::{JsonOutput, TextOutput};
use crate::progress::Progress;

pub use duplicates::{deduplicate, DedupConfig, Deduplicator};
pub use report::{Outcome, Report};

/// Run the CLI application with parsed arguments.
///
/// # Errors
///
/// Returns an error for fatal problems: bad configuration, an unusable
/// root, or a failure writing the report. Per-file failures are part of
/// the report and only affect the returned exit code.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let color = !cli.no_color;
    logging::init_logging(cli.verbose, cli.quiet, color);
    if !color {
        yansi::disable();
    }

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.merge_cli(&cli)?;
    log::debug!("Effective configuration: {:?}", config);

    let shutdown = signal::install_handler();

    let mut dedup_config = config
        .dedup_config()
        .with_shutdown_flag(shutdown.get_flag());
    let show_progress = !cli.quiet && !cli.no_progress && cli.output == OutputFormat::Text;
    if show_progress {
        dedup_config = dedup_config.with_progress_callback(Arc::new(Progress::new()));
    }

    let report = Deduplicator::new(dedup_config)
        .deduplicate(&cli.path)
        .with_context(|| format!("Cannot deduplicate {}", cli.path.display()))?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    match cli.output {
        OutputFormat::Json => {
            JsonOutput::new(&report, config.dry_run).write_to(&mut handle, true)?;
        }
        OutputFormat::Text => {
            if !cli.quiet {
                TextOutput::new(&report, config.dry_run).write_to(&mut handle)?;
            }
        }
    }
    handle.flush()?;

    Ok(report.exit_code())
}
