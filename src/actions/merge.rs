//! Hardlink merging with a crash-safe swap.
//!
//! # Overview
//!
//! For every content group the first member (discovery order) is kept as
//! the representative and every other member is replaced by a hardlink to
//! it. A hardlink cannot be created over an existing path, so each
//! replacement goes through a staging name:
//!
//! 1. pick `member + <random suffix>` that does not exist (bounded retries)
//! 2. rename `member` to the staging name
//! 3. link `representative` to `member`
//!    - success: remove the staging name
//!    - failure: rename the staging name back to `member`
//!
//! At every point `member` either holds its original content or the
//! identical linked content, or the original is still reachable under its
//! staging name and reported as such.
//!
//! Members are skipped without touching the filesystem when they already
//! share the representative's inode or live on another device. When a
//! member had other paths in the tree (its aliases), each of them is
//! relinked the same way right after the member.
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::actions::merge::{MergeConfig, Merger};
//! use linkdupe::duplicates::ContentGroup;
//!
//! let groups: Vec<ContentGroup> = Vec::new();
//! let summary = Merger::new(MergeConfig::default()).merge_all(&groups);
//! println!("{} merged, {} failed", summary.merged, summary.failed);
//! ```

use std::ffi::OsString;
use std::fs::{self, Metadata};
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;

use crate::duplicates::ContentGroup;
use crate::progress::ProgressCallback;
use crate::report::{Failure, Outcome};
use crate::scanner::FileRecord;

/// Length of the random staging suffix.
pub const SUFFIX_LEN: usize = 12;

/// Default bound on staging-name draws per member.
pub const DEFAULT_MAX_SUFFIX_ATTEMPTS: usize = 16;

/// Filesystem operations used by the merger.
pub trait LinkOps {
    /// Whether anything (including a dangling symlink) exists at `path`.
    fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Metadata of `path` without following symlinks.
    fn stat(&self, path: &Path) -> io::Result<Metadata>;

    /// Atomically rename `from` to `to`.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Create `link` as a new name for `original`.
    fn hard_link(&self, original: &Path, link: &Path) -> io::Result<()>;

    /// Remove the directory entry `path`.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// [`LinkOps`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsLinkOps;

impl LinkOps for OsLinkOps {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        match fs::symlink_metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn stat(&self, path: &Path) -> io::Result<Metadata> {
        fs::symlink_metadata(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn hard_link(&self, original: &Path, link: &Path) -> io::Result<()> {
        fs::hard_link(original, link)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Per-member merge failures. None of them abort the run.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The member or representative no longer matches what was scanned.
    #[error("{path} changed since scan: {reason}")]
    Modified {
        /// File that changed
        path: PathBuf,
        /// What differs
        reason: String,
    },

    /// Every drawn staging name already existed.
    #[error("no free staging name for {path} after {attempts} attempts")]
    SuffixExhausted {
        /// Member being replaced
        path: PathBuf,
        /// Number of names tried
        attempts: usize,
    },

    /// The member could not be moved to its staging name; nothing changed.
    #[error("cannot stage {path}: {source}")]
    StageFailed {
        /// Member being replaced
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The hardlink could not be created; the original was restored.
    #[error("cannot link {path} to {representative}: {source}")]
    LinkFailed {
        /// Member being replaced
        path: PathBuf,
        /// Representative it was to be linked to
        representative: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The hardlink failed and the original could not be moved back.
    #[error("cannot restore {path}: original content left at {staged}: {source}")]
    RestoreFailed {
        /// Member being replaced
        path: PathBuf,
        /// Where the original content now lives
        staged: PathBuf,
        /// The error from the restoring rename
        #[source]
        source: io::Error,
    },

    /// The hardlink was created but the staged original could not be removed.
    #[error("{path} linked but staged copy {staged} not removed: {source}")]
    CleanupFailed {
        /// Member that was replaced
        path: PathBuf,
        /// Leftover staged copy
        staged: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl MergeError {
    /// Member path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Modified { path, .. }
            | Self::SuffixExhausted { path, .. }
            | Self::StageFailed { path, .. }
            | Self::LinkFailed { path, .. }
            | Self::RestoreFailed { path, .. }
            | Self::CleanupFailed { path, .. } => path,
        }
    }
}

/// What happened to a member that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    /// Replaced by a hardlink.
    Linked,
    /// Dry run: would have been replaced.
    Planned,
    /// Already the representative's inode; nothing done.
    AlreadyLinked,
    /// On another device; nothing done.
    CrossDevice,
}

/// Configuration for merging.
#[derive(Clone)]
pub struct MergeConfig {
    /// Report what would be linked without touching the filesystem.
    pub dry_run: bool,
    /// Bound on staging-name draws per member.
    pub max_suffix_attempts: usize,
    /// Optional shutdown flag, polled between members.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for MergeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeConfig")
            .field("dry_run", &self.dry_run)
            .field("max_suffix_attempts", &self.max_suffix_attempts)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_suffix_attempts: DEFAULT_MAX_SUFFIX_ATTEMPTS,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl MergeConfig {
    /// Enable or disable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the staging-name retry bound (minimum 1).
    #[must_use]
    pub fn with_max_suffix_attempts(mut self, attempts: usize) -> Self {
        self.max_suffix_attempts = attempts.max(1);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Totals and outcomes of a merge pass.
#[derive(Debug, Default)]
pub struct MergeSummary {
    /// Merged, planned and failed members, in processing order
    pub outcomes: Vec<Outcome>,
    /// Members replaced by hardlinks
    pub merged: usize,
    /// Members that would be replaced (dry run)
    pub planned: usize,
    /// Members already sharing the representative's inode
    pub already_linked: usize,
    /// Members on another device
    pub cross_device: usize,
    /// Members that failed
    pub failed: usize,
    /// Bytes freed by releasing unlinked inodes
    pub bytes_reclaimed: u64,
    /// Whether the pass stopped early on a shutdown request
    pub interrupted: bool,
}

/// Replaces duplicate files with hardlinks, one member at a time.
#[derive(Debug)]
pub struct Merger<O: LinkOps = OsLinkOps> {
    config: MergeConfig,
    ops: O,
}

impl Merger<OsLinkOps> {
    /// Create a merger operating on the real filesystem.
    #[must_use]
    pub fn new(config: MergeConfig) -> Self {
        Self::with_ops(config, OsLinkOps)
    }
}

impl<O: LinkOps> Merger<O> {
    /// Create a merger using custom filesystem operations.
    #[must_use]
    pub fn with_ops(config: MergeConfig, ops: O) -> Self {
        Self { config, ops }
    }

    /// The filesystem operations in use.
    #[must_use]
    pub fn ops(&self) -> &O {
        &self.ops
    }

    /// Merge every group in order.
    #[must_use]
    pub fn merge_all(&self, groups: &[ContentGroup]) -> MergeSummary {
        let mut summary = MergeSummary::default();
        let total: usize = groups
            .iter()
            .flat_map(|g| g.others())
            .map(|member| 1 + member.aliases.len())
            .sum();

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("merge", total);
        }
        let duplicated: u64 = groups.iter().map(ContentGroup::wasted_space).sum();
        log::info!(
            "Merging: {} members in {} groups ({} duplicated bytes){}",
            total,
            groups.len(),
            duplicated,
            if self.config.dry_run { " (dry run)" } else { "" }
        );

        for group in groups {
            self.merge_group(group, &mut summary);
            if summary.interrupted {
                break;
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("merge");
        }
        log::info!(
            "Merging: {} merged, {} already linked, {} cross-device, {} failed",
            summary.merged,
            summary.already_linked,
            summary.cross_device,
            summary.failed
        );
        summary
    }

    /// Merge one group into `summary`.
    pub fn merge_group(&self, group: &ContentGroup, summary: &mut MergeSummary) {
        let Some(representative) = group.representative() else {
            return;
        };

        for member in group.others() {
            if self.config.is_shutdown_requested() {
                log::debug!("Merging: Shutdown requested, stopping");
                summary.interrupted = true;
                return;
            }

            if let Some(ref callback) = self.config.progress_callback {
                let done = summary.merged
                    + summary.planned
                    + summary.already_linked
                    + summary.cross_device
                    + summary.failed
                    + 1;
                callback.on_progress(done, &member.path.to_string_lossy());
            }

            match self.replace_with_link(representative, member) {
                Ok(LinkAction::Linked) => {
                    let index = summary.outcomes.len();
                    summary.merged += 1;
                    summary.outcomes.push(Outcome::Merged {
                        path: member.path.clone(),
                        representative: representative.path.clone(),
                        released_inode: member.inode,
                        inode_freed: false,
                        size: member.size,
                    });

                    let all_aliases = self.merge_aliases(representative, member, summary);
                    let paths = 1 + member.aliases.len() as u64;
                    if all_aliases && member.nlink <= paths {
                        summary.bytes_reclaimed += member.size;
                        if let Some(Outcome::Merged { inode_freed, .. }) =
                            summary.outcomes.get_mut(index)
                        {
                            *inode_freed = true;
                        }
                    }
                }
                Ok(LinkAction::Planned) => {
                    summary.planned += 1;
                    summary.outcomes.push(Outcome::Planned {
                        path: member.path.clone(),
                        representative: representative.path.clone(),
                        size: member.size,
                    });
                    self.merge_aliases(representative, member, summary);
                }
                Ok(LinkAction::AlreadyLinked) => summary.already_linked += 1,
                Ok(LinkAction::CrossDevice) => summary.cross_device += 1,
                Err(e) => record_failure(&member.path, &e, summary),
            }
        }
    }

    /// Relink the other paths of `member`'s inode once `member` itself went
    /// through, so no path is left on the old inode.
    ///
    /// Returns whether every alias was linked (or planned).
    fn merge_aliases(
        &self,
        representative: &FileRecord,
        member: &FileRecord,
        summary: &mut MergeSummary,
    ) -> bool {
        let mut all_linked = true;
        for alias in &member.aliases {
            let record = member.alias_record(alias);
            match self.replace_with_link(representative, &record) {
                Ok(LinkAction::Linked) => {
                    summary.merged += 1;
                    summary.outcomes.push(Outcome::Merged {
                        path: record.path,
                        representative: representative.path.clone(),
                        released_inode: record.inode,
                        inode_freed: false,
                        size: record.size,
                    });
                }
                Ok(LinkAction::Planned) => {
                    summary.planned += 1;
                    summary.outcomes.push(Outcome::Planned {
                        path: record.path,
                        representative: representative.path.clone(),
                        size: record.size,
                    });
                }
                Ok(LinkAction::AlreadyLinked) => summary.already_linked += 1,
                Ok(LinkAction::CrossDevice) => {
                    all_linked = false;
                    summary.cross_device += 1;
                }
                Err(e) => {
                    all_linked = false;
                    record_failure(alias, &e, summary);
                }
            }
        }
        all_linked
    }

    /// Replace `member` with a hardlink to `representative`.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError`] for a member that could not be replaced. In
    /// every case except [`MergeError::RestoreFailed`] the member path still
    /// holds its original content afterwards.
    pub fn replace_with_link(
        &self,
        representative: &FileRecord,
        member: &FileRecord,
    ) -> Result<LinkAction, MergeError> {
        if member.same_inode(representative) {
            log::trace!("Already linked: {}", member.path.display());
            return Ok(LinkAction::AlreadyLinked);
        }
        if member.device_id != representative.device_id {
            log::debug!(
                "Skipping cross-device member {} (device {} vs {})",
                member.path.display(),
                member.device_id,
                representative.device_id
            );
            return Ok(LinkAction::CrossDevice);
        }

        self.verify_unchanged(representative)?;
        self.verify_unchanged(member)?;

        if self.config.dry_run {
            log::info!(
                "Would link {} -> {}",
                member.path.display(),
                representative.path.display()
            );
            return Ok(LinkAction::Planned);
        }

        let staged = self.reserve_staged_path(&member.path)?;
        self.ops
            .rename(&member.path, &staged)
            .map_err(|source| MergeError::StageFailed {
                path: member.path.clone(),
                source,
            })?;

        match self.ops.hard_link(&representative.path, &member.path) {
            Ok(()) => {
                self.ops
                    .remove_file(&staged)
                    .map_err(|source| MergeError::CleanupFailed {
                        path: member.path.clone(),
                        staged: staged.clone(),
                        source,
                    })?;
                log::debug!(
                    "Linked {} -> {}",
                    member.path.display(),
                    representative.path.display()
                );
                Ok(LinkAction::Linked)
            }
            Err(link_error) => match self.ops.rename(&staged, &member.path) {
                Ok(()) => Err(MergeError::LinkFailed {
                    path: member.path.clone(),
                    representative: representative.path.clone(),
                    source: link_error,
                }),
                Err(source) => {
                    log::error!(
                        "Link of {} failed ({}) and restore failed; original is at {}",
                        member.path.display(),
                        link_error,
                        staged.display()
                    );
                    Err(MergeError::RestoreFailed {
                        path: member.path.clone(),
                        staged,
                        source,
                    })
                }
            },
        }
    }

    /// Check that `record` still names the same, unmodified inode.
    fn verify_unchanged(&self, record: &FileRecord) -> Result<(), MergeError> {
        let modified = |reason: String| MergeError::Modified {
            path: record.path.clone(),
            reason,
        };

        let metadata = self
            .ops
            .stat(&record.path)
            .map_err(|e| modified(e.to_string()))?;

        if !metadata.is_file() {
            return Err(modified("no longer a regular file".into()));
        }
        if metadata.dev() != record.device_id || metadata.ino() != record.inode {
            return Err(modified("replaced by another file".into()));
        }
        if metadata.len() != record.size {
            return Err(modified(format!(
                "size changed from {} to {}",
                record.size,
                metadata.len()
            )));
        }
        if metadata.modified().ok() != Some(record.modified) {
            return Err(modified("modification time changed".into()));
        }
        Ok(())
    }

    /// Draw staging names until one is free.
    fn reserve_staged_path(&self, path: &Path) -> Result<PathBuf, MergeError> {
        for attempt in 1..=self.config.max_suffix_attempts {
            let candidate = staged_path(path, &random_suffix());
            match self.ops.exists(&candidate) {
                Ok(false) => return Ok(candidate),
                Ok(true) => {
                    log::debug!(
                        "Staging name {} taken (attempt {})",
                        candidate.display(),
                        attempt
                    );
                }
                Err(source) => {
                    return Err(MergeError::StageFailed {
                        path: path.to_path_buf(),
                        source,
                    })
                }
            }
        }
        Err(MergeError::SuffixExhausted {
            path: path.to_path_buf(),
            attempts: self.config.max_suffix_attempts,
        })
    }
}

fn record_failure(path: &Path, error: &MergeError, summary: &mut MergeSummary) {
    log::warn!("Merge failed: {}", error);
    summary.failed += 1;
    summary.outcomes.push(Outcome::Failed {
        path: path.to_path_buf(),
        cause: Failure::from(error),
    });
}

/// `path` with `suffix` appended to its final component.
#[must_use]
pub fn staged_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect()
}
