//! Candidate grouping and content group types.
//!
//! # Overview
//!
//! Two files can only be merged when collapsing them to one inode does not
//! change anybody's view of them: same device, same permission bits, same
//! owner and group. Size is added to the key as a cheap exclusion filter,
//! since files of different size cannot have identical content.
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::duplicates::group_candidates;
//! use linkdupe::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let catalog = Walker::new(Path::new("."), WalkerConfig::default()).collect().unwrap();
//! let (groups, stats) = group_candidates(catalog.records);
//! println!("{} candidate groups, {} files", stats.candidate_groups, stats.candidate_files);
//! ```

use std::collections::BTreeMap;

use crate::scanner::FileRecord;

/// Merge-eligibility key of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidateKey {
    /// Device id
    pub device_id: u64,
    /// Permission bits
    pub permissions: u32,
    /// Owner user id
    pub uid: u32,
    /// Owner group id
    pub gid: u32,
    /// File size in bytes
    pub size: u64,
}

impl CandidateKey {
    /// Key of a record.
    #[must_use]
    pub fn of(record: &FileRecord) -> Self {
        Self {
            device_id: record.device_id,
            permissions: record.permissions,
            uid: record.uid,
            gid: record.gid,
            size: record.size,
        }
    }
}

/// Files that might be duplicates, pending content verification.
#[derive(Debug, Clone)]
pub struct CandidateGroup {
    /// Shared key of every member
    pub key: CandidateKey,
    /// Members in discovery order
    pub files: Vec<FileRecord>,
}

impl CandidateGroup {
    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Files confirmed to have byte-identical content.
#[derive(Debug, Clone)]
pub struct ContentGroup {
    /// Hex-encoded BLAKE3 hash shared by every member
    pub hash: String,
    /// File size in bytes
    pub size: u64,
    /// Members in discovery order; the first is the representative
    pub files: Vec<FileRecord>,
}

impl ContentGroup {
    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The file every other member will be linked to.
    #[must_use]
    pub fn representative(&self) -> Option<&FileRecord> {
        self.files.first()
    }

    /// All members except the representative.
    pub fn others(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.iter().skip(1)
    }

    /// Bytes that would be reclaimed if every other member were linked.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.files.len().saturating_sub(1) as u64
    }
}

/// Statistics from candidate grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Files that entered grouping
    pub total_files: usize,
    /// Groups with two or more members
    pub candidate_groups: usize,
    /// Files in those groups
    pub candidate_files: usize,
}

/// Partition records by [`CandidateKey`], dropping singleton groups.
///
/// Groups come out in key order; members keep their discovery order.
#[must_use]
pub fn group_candidates(records: Vec<FileRecord>) -> (Vec<CandidateGroup>, GroupingStats) {
    let mut stats = GroupingStats {
        total_files: records.len(),
        ..Default::default()
    };

    let mut by_key: BTreeMap<CandidateKey, Vec<FileRecord>> = BTreeMap::new();
    for record in records {
        by_key.entry(CandidateKey::of(&record)).or_default().push(record);
    }

    let groups: Vec<CandidateGroup> = by_key
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|(key, files)| CandidateGroup { key, files })
        .collect();

    stats.candidate_groups = groups.len();
    stats.candidate_files = groups.iter().map(CandidateGroup::len).sum();

    log::info!(
        "Grouping: {} of {} files in {} candidate groups",
        stats.candidate_files,
        stats.total_files,
        stats.candidate_groups
    );
    (groups, stats)
}
