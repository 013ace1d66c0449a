//! `[live]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [live]
//! compile_commands = "build/compile_commands.json"
//! reload_on_signal = true     # SIGUSR1 triggers a reload
//! tick_ms = 16                # CLI host polling interval
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Orchestrator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSectionConfig {
    /// Path to `compile_commands.json`.
    /// `None` searches `compile_commands.json` and `build/compile_commands.json`
    /// under the project root.
    pub compile_commands: Option<PathBuf>,

    /// Reload when the process receives SIGUSR1.
    pub reload_on_signal: bool,

    /// Interval between `update` calls in the CLI host.
    pub tick_ms: u64,
}

impl Default for LiveSectionConfig {
    fn default() -> Self {
        Self {
            compile_commands: None,
            reload_on_signal: false,
            tick_ms: 16,
        }
    }
}
