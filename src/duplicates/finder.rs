//! Deduplication run orchestration.
//!
//! # Overview
//!
//! A run is a strictly linear pipeline over one owned [`Catalog`]:
//! 1. **Collect** - walk the tree (see [`crate::scanner::walker`])
//! 2. **Group** - partition by merge-eligibility key (see [`super::groups`])
//! 3. **Match** - confirm identical content by hash (see [`super::matcher`])
//! 4. **Merge** - swap duplicates for hardlinks (see [`crate::actions::merge`])
//!
//! Every per-file problem ends up in the returned [`Report`]; only
//! problems with the root itself abort the run.
//!
//! [`Catalog`]: crate::scanner::Catalog
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::duplicates::{DedupConfig, Deduplicator};
//! use std::path::Path;
//!
//! let report = Deduplicator::new(DedupConfig::default().with_dry_run(true))
//!     .deduplicate(Path::new("/srv/data"))
//!     .unwrap();
//! println!("{} files would be linked", report.stats.planned);
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::groups::group_candidates;
use super::matcher::{match_contents, MatcherConfig};
use crate::actions::merge::{MergeConfig, Merger, DEFAULT_MAX_SUFFIX_ATTEMPTS};
use crate::error::EngineError;
use crate::progress::ProgressCallback;
use crate::report::{Failure, Outcome, Report};
use crate::scanner::{Hasher, Walker, WalkerConfig};

/// Configuration for a whole deduplication run.
#[derive(Clone)]
pub struct DedupConfig {
    /// Number of I/O threads for parallel hashing.
    pub io_threads: usize,
    /// Bound on staging-name draws per member.
    pub max_suffix_attempts: usize,
    /// Report merges without performing them.
    pub dry_run: bool,
    /// Walker configuration.
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for DedupConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupConfig")
            .field("io_threads", &self.io_threads)
            .field("max_suffix_attempts", &self.max_suffix_attempts)
            .field("dry_run", &self.dry_run)
            .field("walker_config", &self.walker_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            io_threads: 4,
            max_suffix_attempts: DEFAULT_MAX_SUFFIX_ATTEMPTS,
            dry_run: false,
            walker_config: WalkerConfig::default(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl DedupConfig {
    /// Set the I/O thread count (minimum 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the staging-name retry bound (minimum 1).
    #[must_use]
    pub fn with_max_suffix_attempts(mut self, attempts: usize) -> Self {
        self.max_suffix_attempts = attempts.max(1);
        self
    }

    /// Enable or disable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
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

/// Runs the collect, group, match and merge stages over one directory tree.
#[derive(Debug)]
pub struct Deduplicator {
    config: DedupConfig,
    hasher: Hasher,
}

impl Deduplicator {
    /// Create a deduplicator with the given configuration.
    #[must_use]
    pub fn new(config: DedupConfig) -> Self {
        Self {
            config,
            hasher: Hasher::new(),
        }
    }

    /// Create a deduplicator with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DedupConfig::default())
    }

    /// Deduplicate every regular file under `root`.
    ///
    /// When shutdown is requested the stages stop at the next file
    /// boundary and the partial report is returned with
    /// `stats.interrupted` set. Merging never starts on an interrupted
    /// catalog.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the root cannot be stat'ed, is not a
    /// directory, or cannot be listed.
    pub fn deduplicate(&self, root: &Path) -> Result<Report, EngineError> {
        let start_time = Instant::now();
        let mut report = Report::default();

        log::info!("Starting deduplication of {}", root.display());

        // Collect
        let mut walker = Walker::new(root, self.config.walker_config.clone());
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(flag.clone());
        }
        if let Some(ref callback) = self.config.progress_callback {
            walker = walker.with_progress_callback(callback.clone());
        }
        let catalog = walker.collect()?;

        report.stats.files_scanned = catalog.len();
        report.stats.bytes_scanned = catalog.total_size();
        report.stats.linked_paths_skipped = catalog.linked_paths_skipped;
        for error in &catalog.errors {
            report.outcomes.push(Outcome::Failed {
                path: error.path().to_path_buf(),
                cause: Failure::from(error),
            });
        }

        if catalog.interrupted || self.config.is_shutdown_requested() {
            return Ok(self.finish_interrupted(report, start_time));
        }

        // Group
        let (candidates, grouping) = group_candidates(catalog.records);
        report.stats.candidate_groups = grouping.candidate_groups;
        report.stats.candidate_files = grouping.candidate_files;

        if candidates.is_empty() {
            log::info!("No candidate groups, nothing to merge");
            return Ok(self.finish(report, start_time));
        }

        // Match
        let mut matcher_config = MatcherConfig::default().with_io_threads(self.config.io_threads);
        if let Some(ref flag) = self.config.shutdown_flag {
            matcher_config = matcher_config.with_shutdown_flag(flag.clone());
        }
        if let Some(ref callback) = self.config.progress_callback {
            matcher_config = matcher_config.with_progress_callback(callback.clone());
        }
        let (content_groups, matching) = match_contents(candidates, &self.hasher, &matcher_config);

        report.stats.files_hashed = matching.hashed_files;
        report.stats.content_groups = matching.content_groups;
        for error in &matching.errors {
            report.outcomes.push(Outcome::Failed {
                path: error.path().to_path_buf(),
                cause: Failure::from(error),
            });
        }

        if matching.interrupted || self.config.is_shutdown_requested() {
            return Ok(self.finish_interrupted(report, start_time));
        }

        // Merge
        let mut merge_config = MergeConfig::default()
            .with_dry_run(self.config.dry_run)
            .with_max_suffix_attempts(self.config.max_suffix_attempts);
        if let Some(ref flag) = self.config.shutdown_flag {
            merge_config = merge_config.with_shutdown_flag(flag.clone());
        }
        if let Some(ref callback) = self.config.progress_callback {
            merge_config = merge_config.with_progress_callback(callback.clone());
        }
        let merged = Merger::new(merge_config).merge_all(&content_groups);

        report.stats.merged = merged.merged;
        report.stats.planned = merged.planned;
        report.stats.already_linked = merged.already_linked;
        report.stats.cross_device = merged.cross_device;
        report.stats.bytes_reclaimed = merged.bytes_reclaimed;
        report.stats.interrupted = merged.interrupted;
        report.outcomes.extend(merged.outcomes);

        Ok(self.finish(report, start_time))
    }

    fn finish_interrupted(&self, mut report: Report, start_time: Instant) -> Report {
        log::warn!("Run interrupted, nothing further will be merged");
        report.stats.interrupted = true;
        self.finish(report, start_time)
    }

    fn finish(&self, mut report: Report, start_time: Instant) -> Report {
        report.stats.failures = report.failure_count();
        report.stats.duration_ms =
            u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);
        log::info!(
            "Deduplication complete: {} {}, {} failures, {} bytes reclaimed in {} ms",
            if self.config.dry_run {
                report.stats.planned
            } else {
                report.stats.merged
            },
            if self.config.dry_run { "planned" } else { "merged" },
            report.stats.failures,
            report.stats.bytes_reclaimed,
            report.stats.duration_ms
        );
        report
    }
}

/// Deduplicate `root` with default configuration.
///
/// # Errors
///
/// See [`Deduplicator::deduplicate`].
pub fn deduplicate(root: &Path) -> Result<Report, EngineError> {
    Deduplicator::with_defaults().deduplicate(root)
}
