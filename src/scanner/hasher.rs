//! BLAKE3 file hasher with streaming support.
//!
//! Files are read sequentially from start to end through a fixed-size
//! buffer, so memory use does not depend on file size.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::HashError;

/// A 256-bit BLAKE3 digest.
pub type Hash = [u8; 32];

/// Default read buffer size (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Streaming whole-file hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Use a custom read buffer size (minimum 1 byte).
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Hash the full contents of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or a read fails.
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let reader = BufReader::with_capacity(self.buffer_size, file);
        let mut hasher = blake3::Hasher::new();
        hasher
            .update_reader(reader)
            .map_err(|e| HashError::from_io(path, e))?;

        log::trace!("Hashed {}", path.display());
        Ok(*hasher.finalize().as_bytes())
    }
}

/// Lower-case hex encoding of a hash (64 characters).
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    blake3::Hash::from(*hash).to_hex().to_string()
}
