//! Ctrl+C handling for cooperative cancellation.
//!
//! The handler owns an `Arc<AtomicBool>` that every engine stage polls
//! between files. A run that sees the flag stops before the next file and
//! returns a partial report; a file is never left in its staged state.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request shutdown.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clone of the flag for the engine configs.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process Ctrl+C hook, or reuse the one already installed.
///
/// `ctrlc` allows a single hook per process; repeated calls (several runs
/// in one test binary) get the existing handler with its flag cleared.
#[must_use]
pub fn install_handler() -> ShutdownHandler {
    let mut fresh = false;
    let handler = GLOBAL_HANDLER.get_or_init(|| {
        fresh = true;
        ShutdownHandler::new()
    });
    if !fresh {
        handler.reset();
        return handler.clone();
    }

    let flag = handler.get_flag();
    let installed = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let _ = writeln!(std::io::stderr(), "\nInterrupted. Finishing current file...");
        let _ = std::io::stderr().flush();
        log::info!("Shutdown signal received");
    });

    if let Err(e) = installed {
        log::debug!("Ctrl+C handler not installed: {}", e);
    }
    handler.clone()
}
