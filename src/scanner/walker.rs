//! Inventory collection using walkdir.
//!
//! # Overview
//!
//! The [`Walker`] descends a directory tree sequentially and builds the
//! run's [`Catalog`]: one [`FileRecord`] per distinct regular-file inode.
//!
//! - Directories are descended, never recorded
//! - Symlinks, devices, sockets and fifos are skipped silently
//! - One record per inode; later paths become its aliases (see [`HardlinkTracker`])
//! - Per-entry failures are collected, not raised
//! - Children are visited in file-name order, so discovery order is stable
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let catalog = Walker::new(Path::new("/srv/media"), WalkerConfig::default())
//!     .collect()
//!     .unwrap();
//! println!("{} files, {} errors", catalog.len(), catalog.errors.len());
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::WalkDir;

use super::hardlink::HardlinkTracker;
use super::{Catalog, FileRecord, ScanError, WalkerConfig};
use crate::error::EngineError;
use crate::progress::ProgressCallback;

/// Sequential directory walker producing the run catalog.
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Walker {
    /// Create a new walker for the given root.
    #[must_use]
    pub fn new(root: &Path, config: WalkerConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Set the shutdown flag, polled between entries.
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

    /// Check that the root can be stat'ed and is a directory.
    ///
    /// # Errors
    ///
    /// [`EngineError::InaccessibleRoot`] or [`EngineError::NotADirectory`].
    pub fn validate_root(&self) -> Result<(), EngineError> {
        let metadata = fs::metadata(&self.root).map_err(|source| EngineError::InaccessibleRoot {
            path: self.root.clone(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(EngineError::NotADirectory(self.root.clone()));
        }
        Ok(())
    }

    /// Walk the tree and build the catalog.
    ///
    /// # Errors
    ///
    /// Fails only on root-level problems: the root cannot be stat'ed, is not
    /// a directory, or cannot be listed at all. Everything below the root
    /// is recorded in [`Catalog::errors`] instead.
    pub fn collect(&self) -> Result<Catalog, EngineError> {
        self.validate_root()?;

        let mut catalog = Catalog::default();
        let mut tracker = HardlinkTracker::new();
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start("walk", 0);
        }

        let walk = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walk {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping collection");
                catalog.interrupted = true;
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map_or_else(|| self.root.clone(), Path::to_path_buf);
                    if e.depth() == 0 {
                        return Err(EngineError::Walk {
                            path,
                            source: e
                                .into_io_error()
                                .unwrap_or_else(|| std::io::Error::other("walk failed")),
                        });
                    }
                    log::warn!("Walker error for {}: {}", path.display(), e);
                    catalog.errors.push(ScanError::Walk {
                        path,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if !file_type.is_file() {
                log::trace!("Skipping non-regular entry: {}", entry.path().display());
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("Cannot stat {}: {}", entry.path().display(), e);
                    catalog.errors.push(ScanError::StatFailed {
                        path: entry.path().to_path_buf(),
                        source: e
                            .into_io_error()
                            .unwrap_or_else(|| std::io::Error::other("stat failed")),
                    });
                    continue;
                }
            };

            if self.config.skip_empty && metadata.len() == 0 {
                log::trace!("Skipping empty file: {}", entry.path().display());
                continue;
            }

            if let Some(index) = tracker.track(&metadata, catalog.records.len()) {
                log::debug!("Recording linked path as alias: {}", entry.path().display());
                if let Some(first) = catalog.records.get_mut(index) {
                    first.aliases.push(entry.into_path());
                }
                catalog.linked_paths_skipped += 1;
                continue;
            }

            let record = FileRecord::from_metadata(entry.into_path(), &metadata);
            if let Some(ref callback) = self.progress_callback {
                callback.on_progress(catalog.records.len() + 1, &record.path.to_string_lossy());
            }
            catalog.records.push(record);
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end("walk");
        }
        log::info!(
            "Collected {} files ({} linked paths skipped, {} errors)",
            catalog.records.len(),
            catalog.linked_paths_skipped,
            catalog.errors.len()
        );
        Ok(catalog)
    }
}
