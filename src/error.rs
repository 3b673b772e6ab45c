//! Fatal engine errors, exit codes and structured error output.

use std::path::PathBuf;

use serde::Serialize;

/// Errors that stop a run before any file is touched.
///
/// Everything that goes wrong for an individual file is recorded in the
/// [`Report`](crate::report::Report) instead.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// The root path exists but is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The root path cannot be stat'ed.
    #[error("Cannot access {path}: {source}")]
    InaccessibleRoot {
        /// The root that was requested
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The root directory cannot be listed, so traversal cannot begin.
    #[error("Cannot walk {path}: {source}")]
    Walk {
        /// The root that was requested
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Exit codes for the linkdupe binary.
///
/// - 0: Success (every eligible file processed without failure)
/// - 1: General error (fatal error, nothing processed)
/// - 3: Partial success (completed with per-file failures)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the run completed without per-file failures.
    Success = 0,
    /// General error: a fatal error occurred.
    GeneralError = 1,
    /// Partial success: the run completed but some files failed.
    PartialSuccess = 3,
    /// Interrupted: the run was stopped by the user.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "LD000",
            Self::GeneralError => "LD001",
            Self::PartialSuccess => "LD003",
            Self::Interrupted => "LD130",
        }
    }
}

/// Structured error information for `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "LD001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
}

impl StructuredError {
    /// Create a structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}
