//! Content matching: full-file hashing of candidate groups.
//!
//! # Overview
//!
//! Every member of every candidate group is hashed with BLAKE3 over its
//! full byte stream. Members are then sub-partitioned by hash; partitions
//! with a single member are dropped, either because the file is unique or
//! because its sibling could not be hashed.
//!
//! Candidate groups are disjoint and hashing is read-only, so groups are
//! hashed in parallel on a dedicated rayon pool. Members of one group are
//! hashed in discovery order on a single worker.
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::duplicates::{group_candidates, match_contents, MatcherConfig};
//! use linkdupe::scanner::{Hasher, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let catalog = Walker::new(Path::new("."), WalkerConfig::default()).collect().unwrap();
//! let (candidates, _) = group_candidates(catalog.records);
//! let (groups, stats) = match_contents(candidates, &Hasher::new(), &MatcherConfig::default());
//! println!("{} content groups ({} hash failures)", groups.len(), stats.failed_files);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use super::groups::{CandidateGroup, ContentGroup};
use crate::progress::ProgressCallback;
use crate::scanner::hasher::hash_to_hex;
use crate::scanner::{FileRecord, Hash, HashError, Hasher};

/// Configuration for content matching.
#[derive(Clone)]
pub struct MatcherConfig {
    /// Number of I/O threads for parallel hashing.
    /// Default is 4 to prevent disk thrashing.
    pub io_threads: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for MatcherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatcherConfig")
            .field("io_threads", &self.io_threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            io_threads: 4,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl MatcherConfig {
    /// Set the I/O thread count (minimum 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
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

/// Statistics from content matching.
#[derive(Debug, Default)]
pub struct MatchStats {
    /// Files that entered matching
    pub input_files: usize,
    /// Files hashed successfully
    pub hashed_files: usize,
    /// Files that could not be hashed
    pub failed_files: usize,
    /// Hash failures, one per failed file
    pub errors: Vec<HashError>,
    /// Content groups with two or more members
    pub content_groups: usize,
    /// Files in those groups
    pub duplicate_files: usize,
    /// Whether matching stopped early on a shutdown request
    pub interrupted: bool,
}

struct GroupMatch {
    groups: Vec<ContentGroup>,
    hashed: usize,
    errors: Vec<HashError>,
    interrupted: bool,
}

/// Hash every candidate and partition each candidate group by content.
///
/// Output groups follow the order of the input groups; members keep their
/// discovery order. A candidate group cut short by shutdown produces no
/// content groups at all, so nothing is merged on partial information.
#[must_use]
pub fn match_contents(
    candidates: Vec<CandidateGroup>,
    hasher: &Hasher,
    config: &MatcherConfig,
) -> (Vec<ContentGroup>, MatchStats) {
    let input_files: usize = candidates.iter().map(CandidateGroup::len).sum();
    let mut stats = MatchStats {
        input_files,
        ..Default::default()
    };

    if candidates.is_empty() {
        log::debug!("Matching: No candidate groups");
        return (Vec::new(), stats);
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_start("hash", input_files);
    }
    log::info!(
        "Matching: Hashing {} files in {} candidate groups",
        input_files,
        candidates.len()
    );

    let counter = AtomicUsize::new(0);
    let run = || -> Vec<GroupMatch> {
        candidates
            .into_par_iter()
            .map(|group| partition_group(group, hasher, config, &counter))
            .collect()
    };

    let results = match rayon::ThreadPoolBuilder::new()
        .num_threads(config.io_threads.max(1))
        .build()
    {
        Ok(pool) => pool.install(run),
        Err(e) => {
            log::warn!("Failed to create hashing thread pool, using global pool: {}", e);
            run()
        }
    };

    let mut content_groups = Vec::new();
    for result in results {
        stats.hashed_files += result.hashed;
        stats.failed_files += result.errors.len();
        stats.errors.extend(result.errors);
        stats.interrupted |= result.interrupted;
        content_groups.extend(result.groups);
    }

    stats.content_groups = content_groups.len();
    stats.duplicate_files = content_groups.iter().map(ContentGroup::len).sum();

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_end("hash");
    }
    log::info!(
        "Matching: {} content groups, {} files, {} hash failures",
        stats.content_groups,
        stats.duplicate_files,
        stats.failed_files
    );
    (content_groups, stats)
}

fn partition_group(
    group: CandidateGroup,
    hasher: &Hasher,
    config: &MatcherConfig,
    counter: &AtomicUsize,
) -> GroupMatch {
    let mut result = GroupMatch {
        groups: Vec::new(),
        hashed: 0,
        errors: Vec::new(),
        interrupted: false,
    };

    let mut index: HashMap<Hash, usize> = HashMap::new();
    let mut partitions: Vec<(Hash, Vec<FileRecord>)> = Vec::new();

    for mut file in group.files {
        if config.is_shutdown_requested() {
            log::debug!("Matching: Shutdown requested, abandoning group");
            result.interrupted = true;
            return result;
        }

        let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(ref callback) = config.progress_callback {
            callback.on_progress(done, &file.path.to_string_lossy());
        }

        match file.content_hash_with(hasher) {
            Ok(hash) => {
                result.hashed += 1;
                match index.get(&hash) {
                    Some(&i) => partitions[i].1.push(file),
                    None => {
                        index.insert(hash, partitions.len());
                        partitions.push((hash, vec![file]));
                    }
                }
            }
            Err(e) => {
                log::warn!("Failed to hash {}: {}", file.path.display(), e);
                result.errors.push(e);
            }
        }
    }

    result.groups = partitions
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|(hash, files)| ContentGroup {
            hash: hash_to_hex(&hash),
            size: group.key.size,
            files,
        })
        .collect();
    result
}
