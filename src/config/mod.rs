//! Orchestrator configuration and `livelink.toml` loading.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [live], [watch], [toolchain]
//! ├── error.rs       # ConfigError
//! ├── util.rs        # config / compilation database discovery
//! └── mod.rs         # LiveConfig (this file)
//! ```
//!
//! A host program embedding the orchestrator usually builds a [`LiveConfig`]
//! in code; the CLI loads it from `livelink.toml` and applies flag overrides.

mod error;
pub mod section;
mod util;

pub use error::ConfigError;
pub use section::{LiveSectionConfig, ToolchainConfig, WatchConfig};
pub(crate) use section::MIN_RECREATE_TICKS;
pub use util::{find_compile_commands, find_config_file};

use crate::cli::{Cli, Commands};
use crate::log;
use crate::utils::path::{expand_tilde, normalize_path};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing livelink.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Orchestrator settings
    pub live: LiveSectionConfig,

    /// File watcher settings
    pub watch: WatchConfig,

    /// External tools
    pub toolchain: ToolchainConfig,
}

impl LiveConfig {
    /// Load configuration for the CLI.
    ///
    /// Searches upward from cwd for the config file; a missing file means
    /// defaults rooted at cwd.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(|e| ConfigError::Io(PathBuf::from("."), e))?;

        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
                config.config_path = path;
                config
            }
            None => Self {
                root: cwd,
                ..Self::default()
            },
        };

        config.apply_cli(cli);
        config.finalize();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    // ========================================================================
    // accessors
    // ========================================================================

    /// Explicit directories to monitor (empty = derive from sources).
    pub fn directories_to_monitor(&self) -> &[PathBuf] {
        &self.watch.directories
    }

    pub const fn reload_on_signal(&self) -> bool {
        self.live.reload_on_signal
    }

    /// Compilation database path, explicit or discovered under the root.
    pub fn compile_commands_path(&self) -> Option<PathBuf> {
        self.live
            .compile_commands
            .clone()
            .or_else(|| find_compile_commands(&self.root))
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_cli(&mut self, cli: &Cli) {
        crate::logger::set_verbose(cli.verbose);

        let project = cli.project();
        if let Some(path) = &project.compile_commands {
            self.live.compile_commands = Some(path.clone());
        }
        if !project.directories.is_empty() {
            self.watch.directories = project.directories.clone();
        }

        if let Commands::Watch {
            reload_on_signal,
            tick_ms,
            ..
        } = &cli.command
        {
            Self::update_option(&mut self.live.reload_on_signal, reload_on_signal.as_ref());
            Self::update_option(&mut self.live.tick_ms, tick_ms.as_ref());
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Resolve every configured path against the root.
    pub fn finalize(&mut self) {
        let root = normalize_path(&self.root);
        let resolve = |p: &Path| normalize_path(&root.join(expand_tilde(p)));

        self.live.compile_commands = self.live.compile_commands.as_deref().map(resolve);
        self.watch.directories = self.watch.directories.iter().map(|p| resolve(p)).collect();
        self.toolchain.reload_dir = self.toolchain.reload_dir.as_deref().map(resolve);
        self.root = root;
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.watch.validate()?;
        if self.toolchain.linker.trim().is_empty() {
            return Err(ConfigError::Validation("toolchain.linker is empty".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (to catch typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> LiveConfig {
    let (parsed, ignored) = LiveConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
