//! Scanner module for inventory collection and file hashing.
//!
//! This module provides functionality for:
//! - Sequential directory walking using walkdir
//! - Per-inode deduplication of discovered paths
//! - Content hashing with BLAKE3
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and [`FileRecord`] collection
//! - [`hardlink`]: Tracking of already-seen `(device, inode)` pairs
//! - [`hasher`]: BLAKE3 file hashing (streaming)
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! let catalog = walker.collect().unwrap();
//! for record in &catalog.records {
//!     println!("{}: {} bytes", record.path.display(), record.size);
//! }
//! ```

pub mod hardlink;
pub mod hasher;
pub mod walker;

use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;
use std::time::SystemTime;

pub use hardlink::HardlinkTracker;
pub use hasher::{Hash, Hasher};
pub use walker::Walker;

/// Mask selecting the permission bits (including setuid/setgid/sticky) of `st_mode`.
pub const PERMISSION_MASK: u32 = 0o7777;

/// One regular file discovered during a walk.
///
/// Identity and access-control fields are read once from `stat` and never
/// change afterwards. The content hash is filled in lazily by the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path of the file as produced by the walk (root-joined)
    pub path: PathBuf,
    /// Device the file resides on
    pub device_id: u64,
    /// Inode number on that device
    pub inode: u64,
    /// Hardlink count at discovery time
    pub nlink: u64,
    /// Permission bits (`st_mode & 0o7777`)
    pub permissions: u32,
    /// Owner user id
    pub uid: u32,
    /// Owner group id
    pub gid: u32,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
    /// Later paths of the same inode found by the walk, in discovery order
    pub aliases: Vec<PathBuf>,
    content_hash: Option<Hash>,
}

impl FileRecord {
    /// Create a record with the given path and size and zeroed identity fields.
    ///
    /// Callers fill in the remaining public fields; the walker uses
    /// [`FileRecord::from_metadata`] instead.
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            device_id: 0,
            inode: 0,
            nlink: 1,
            permissions: 0,
            uid: 0,
            gid: 0,
            size,
            modified: SystemTime::UNIX_EPOCH,
            aliases: Vec::new(),
            content_hash: None,
        }
    }

    /// Build a record from a path and its (non-following) metadata.
    #[must_use]
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        Self {
            path,
            device_id: metadata.dev(),
            inode: metadata.ino(),
            nlink: metadata.nlink(),
            permissions: metadata.mode() & PERMISSION_MASK,
            uid: metadata.uid(),
            gid: metadata.gid(),
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            aliases: Vec::new(),
            content_hash: None,
        }
    }

    /// The content hash, if the matcher has computed it.
    #[must_use]
    pub fn content_hash(&self) -> Option<&Hash> {
        self.content_hash.as_ref()
    }

    /// Return the cached content hash, computing it with `hasher` on first use.
    ///
    /// A failed computation leaves the cache empty.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn content_hash_with(&mut self, hasher: &Hasher) -> Result<Hash, HashError> {
        if let Some(hash) = self.content_hash {
            return Ok(hash);
        }
        let hash = hasher.full_hash(&self.path)?;
        self.content_hash = Some(hash);
        Ok(hash)
    }

    /// The same inode seen through `path`, without aliases.
    #[must_use]
    pub fn alias_record(&self, path: &std::path::Path) -> Self {
        Self {
            path: path.to_path_buf(),
            aliases: Vec::new(),
            ..self.clone()
        }
    }

    /// Whether `other` names the same on-disk inode.
    #[must_use]
    pub fn same_inode(&self, other: &FileRecord) -> bool {
        self.device_id == other.device_id && self.inode == other.inode
    }
}

/// The inventory of a single run: every collected record in discovery
/// order, plus the non-fatal errors hit along the way.
#[derive(Debug, Default)]
pub struct Catalog {
    /// Collected records, one per distinct inode
    pub records: Vec<FileRecord>,
    /// Entries that could not be inspected
    pub errors: Vec<ScanError>,
    /// Paths attached as aliases because their inode was already recorded
    pub linked_paths_skipped: usize,
    /// Whether collection stopped early on a shutdown request
    pub interrupted: bool,
}

impl Catalog {
    /// Number of collected records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of the sizes of all collected records.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.records.iter().map(|r| r.size).sum()
    }
}

/// Non-fatal errors for individual entries during the walk.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Metadata for an entry could not be read.
    #[error("stat failed for {path}: {source}")]
    StatFailed {
        /// Entry whose metadata was unavailable
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The walk could not descend into or list an entry.
    #[error("walk error at {path}: {message}")]
    Walk {
        /// Entry the walk failed on
        path: PathBuf,
        /// Description from the walk mechanism
        message: String,
    },
}

impl ScanError {
    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::StatFailed { path, .. } | Self::Walk { path, .. } => path,
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The file disappeared between stat and hash.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while hashing `path`.
    #[must_use]
    pub fn from_io(path: &std::path::Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::Io { path: p, .. } => p,
        }
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Skip zero-length files instead of treating them as duplicates of each other.
    pub skip_empty: bool,
}

impl WalkerConfig {
    /// Enable or disable skipping of empty files.
    #[must_use]
    pub fn with_skip_empty(mut self, skip_empty: bool) -> Self {
        self.skip_empty = skip_empty;
        self
    }
}
