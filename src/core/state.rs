//! Process-wide shutdown state for the CLI host.
//!
//! The orchestrator keeps no globals; only the host loop consults this flag.

use std::sync::atomic::{AtomicBool, Ordering};

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Setup the global Ctrl+C handler. Call once at program start.
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(request_shutdown)
        .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Ask the host loop to stop after the current tick.
pub fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// Check if shutdown has been requested
///
/// Uses Relaxed ordering - worst case the loop runs one more tick.
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
