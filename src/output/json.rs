//! JSON output formatter for run reports.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "outcomes": [
//!     {
//!       "outcome": "merged",
//!       "path": "/data/b",
//!       "representative": "/data/a",
//!       "released_inode": 1234,
//!       "inode_freed": true,
//!       "size": 1024
//!     },
//!     {
//!       "outcome": "failed",
//!       "path": "/data/c",
//!       "cause": { "kind": "link_failed", "message": "..." }
//!     }
//!   ],
//!   "summary": {
//!     "files_scanned": 100,
//!     "merged": 1,
//!     "failures": 1,
//!     "bytes_reclaimed": 1024,
//!     "interrupted": false,
//!     "dry_run": false,
//!     "exit_code": 3,
//!     "exit_code_name": "LD003",
//!     ...
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::report::{Outcome, Report, RunStats};

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Run counters
    #[serde(flatten)]
    pub stats: RunStats,
    /// Whether the run was a dry run
    pub dry_run: bool,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "LD000")
    pub exit_code_name: String,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// Per-file outcomes in processing order
    pub outcomes: &'a [Outcome],
    /// Run summary
    pub summary: JsonSummary,
}

impl<'a> JsonOutput<'a> {
    /// Create JSON output for a report.
    #[must_use]
    pub fn new(report: &'a Report, dry_run: bool) -> Self {
        let exit_code = report.exit_code();
        Self {
            outcomes: &report.outcomes,
            summary: JsonSummary {
                stats: report.stats.clone(),
                dry_run,
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
