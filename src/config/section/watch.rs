//! `[watch]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! directories = ["src", "include"]  # empty = common directory of all sources
//! recreate_ticks = 10               # ticks between watcher teardown and recreation
//! debounce_ms = 50                  # quiet period before forwarding changes
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::ConfigError;

/// Smallest countdown that still leaves one tick with no watcher alive.
pub(crate) const MIN_RECREATE_TICKS: u32 = 3;

/// File watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Explicit directories to monitor.
    pub directories: Vec<PathBuf>,

    /// Watcher recreation countdown after the set of compilation units changed.
    /// The old watcher is dropped when the countdown starts and the new one
    /// is created when it reaches 1.
    pub recreate_ticks: u32,

    /// Debounce window for raw filesystem events.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            recreate_ticks: 10,
            debounce_ms: 50,
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recreate_ticks < MIN_RECREATE_TICKS {
            return Err(ConfigError::Validation(format!(
                "watch.recreate_ticks must be at least {MIN_RECREATE_TICKS}, got {}",
                self.recreate_ticks
            )));
        }
        Ok(())
    }
}
