//! Run report: per-file outcomes and summary statistics.
//!
//! A [`Report`] is what one deduplication run hands back to its caller.
//! It lists one [`Outcome`] per merged (or, in dry-run mode, mergeable)
//! file and one per failure, plus counters for the whole run.

use std::path::PathBuf;

use serde::Serialize;

use crate::actions::merge::MergeError;
use crate::error::ExitCode;
use crate::scanner::{HashError, ScanError};

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The file was replaced by a hardlink to `representative`.
    Merged {
        /// Path that now shares the representative's inode
        path: PathBuf,
        /// Path it was linked to
        representative: PathBuf,
        /// Inode the path pointed to before the merge
        released_inode: u64,
        /// Whether the released inode had no other links and was freed
        inode_freed: bool,
        /// File size in bytes
        size: u64,
    },
    /// Dry run: the file would have been replaced by a hardlink.
    Planned {
        /// Path that would be linked
        path: PathBuf,
        /// Path it would be linked to
        representative: PathBuf,
        /// File size in bytes
        size: u64,
    },
    /// The file could not be processed.
    Failed {
        /// Path the failure concerns
        path: PathBuf,
        /// What went wrong
        cause: Failure,
    },
}

impl Outcome {
    /// Path the outcome refers to.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Merged { path, .. } | Self::Planned { path, .. } | Self::Failed { path, .. } => {
                path
            }
        }
    }

    /// Whether this outcome is a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The entry could not be stat'ed or listed during the walk.
    StatFailed,
    /// The file could not be read for hashing.
    HashFailed,
    /// The file or its representative changed after it was scanned.
    Modified,
    /// No free staging name was found within the retry bound.
    SuffixExhausted,
    /// The file could not be moved to its staging name.
    StageFailed,
    /// The hardlink could not be created; the original was restored.
    LinkFailed,
    /// The hardlink failed and the original could not be moved back.
    RestoreFailed,
    /// The hardlink was created but the staged original could not be removed.
    CleanupFailed,
}

/// A failure and its cause, in a form that can be cloned and serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Failure category
    pub kind: FailureKind,
    /// Human-readable cause
    pub message: String,
    /// Where the original content now lives, if not at its own path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staged_path: Option<PathBuf>,
}

impl From<&ScanError> for Failure {
    fn from(err: &ScanError) -> Self {
        Self {
            kind: FailureKind::StatFailed,
            message: err.to_string(),
            staged_path: None,
        }
    }
}

impl From<&HashError> for Failure {
    fn from(err: &HashError) -> Self {
        Self {
            kind: FailureKind::HashFailed,
            message: err.to_string(),
            staged_path: None,
        }
    }
}

impl From<&MergeError> for Failure {
    fn from(err: &MergeError) -> Self {
        let (kind, staged_path) = match err {
            MergeError::Modified { .. } => (FailureKind::Modified, None),
            MergeError::SuffixExhausted { .. } => (FailureKind::SuffixExhausted, None),
            MergeError::StageFailed { .. } => (FailureKind::StageFailed, None),
            MergeError::LinkFailed { .. } => (FailureKind::LinkFailed, None),
            MergeError::RestoreFailed { staged, .. } => {
                (FailureKind::RestoreFailed, Some(staged.clone()))
            }
            MergeError::CleanupFailed { staged, .. } => {
                (FailureKind::CleanupFailed, Some(staged.clone()))
            }
        };
        Self {
            kind,
            message: err.to_string(),
            staged_path,
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Distinct files collected
    pub files_scanned: usize,
    /// Total size of collected files in bytes
    pub bytes_scanned: u64,
    /// Paths skipped because they already shared an inode with a collected file
    pub linked_paths_skipped: usize,
    /// Candidate groups (same device, permissions, owner, group and size)
    pub candidate_groups: usize,
    /// Files in candidate groups
    pub candidate_files: usize,
    /// Files hashed successfully
    pub files_hashed: usize,
    /// Groups of byte-identical files
    pub content_groups: usize,
    /// Files replaced by hardlinks
    pub merged: usize,
    /// Files that would be replaced (dry run)
    pub planned: usize,
    /// Members skipped because they already shared the representative's inode
    pub already_linked: usize,
    /// Members skipped because they live on another device
    pub cross_device: usize,
    /// Failures of any kind
    pub failures: usize,
    /// Bytes freed by releasing inodes with no remaining links
    pub bytes_reclaimed: u64,
    /// Whether the run stopped early on a shutdown request
    pub interrupted: bool,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
}

/// Result of a deduplication run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    /// Per-file outcomes, in processing order
    pub outcomes: Vec<Outcome>,
    /// Run counters
    pub stats: RunStats,
}

impl Report {
    /// Outcomes that are merges.
    pub fn merges(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, Outcome::Merged { .. }))
    }

    /// Outcomes that are failures.
    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// Number of merged files.
    #[must_use]
    pub fn merge_count(&self) -> usize {
        self.merges().count()
    }

    /// Number of failures.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Exit code the CLI should use for this report.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.stats.interrupted {
            ExitCode::Interrupted
        } else if self.failure_count() > 0 {
            ExitCode::PartialSuccess
        } else {
            ExitCode::Success
        }
    }
}
