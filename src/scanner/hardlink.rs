//! Inode tracking so that paths already sharing storage are recorded once.
//!
//! Hardlinks are multiple directory entries pointing to the same inode.
//! They are the same file, not duplicates, so the collector keeps one
//! record per `(device, inode)` pair and attaches every later path to it
//! as an alias.
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::scanner::hardlink::HardlinkTracker;
//!
//! let mut tracker = HardlinkTracker::new();
//! let meta = std::fs::symlink_metadata("some/file.txt").unwrap();
//! if let Some(index) = tracker.track(&meta, 0) {
//!     println!("already recorded as record {index}");
//! }
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;

/// `(device, inode)` identity of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InodeKey {
    /// Device id
    pub dev: u64,
    /// Inode number
    pub ino: u64,
}

impl InodeKey {
    /// Identity of the file described by `metadata`.
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        }
    }
}

/// Per-run map from each inode to the catalog index of its first path.
///
/// Not thread-safe; the walk that owns it is sequential.
#[derive(Debug, Default)]
pub struct HardlinkTracker {
    seen: HashMap<InodeKey, usize>,
}

impl HardlinkTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up this inode, recording it under `index` if it is new.
    ///
    /// Returns `None` for the first path of an inode and the index given
    /// for that first path on every later one.
    pub fn track(&mut self, metadata: &Metadata, index: usize) -> Option<usize> {
        match self.seen.entry(InodeKey::from_metadata(metadata)) {
            Entry::Occupied(entry) => Some(*entry.get()),
            Entry::Vacant(entry) => {
                entry.insert(index);
                None
            }
        }
    }
}
