//! `[toolchain]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [toolchain]
//! linker = "c++"
//! link_flags = ["-fuse-ld=lld"]
//! nm = "nm"
//! reload_dir = "build/livelink"   # where lib_reload<N>.so files are written
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// External tools used by the default compiler and program info loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Driver used to link reload libraries.
    pub linker: String,

    /// Extra flags appended to every link.
    pub link_flags: Vec<String>,

    /// Symbol table dumper.
    pub nm: String,

    /// Output directory for reload libraries.
    /// `None` uses `<temp>/livelink/<pid>`.
    pub reload_dir: Option<PathBuf>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            linker: "c++".to_string(),
            link_flags: Vec::new(),
            nm: "nm".to_string(),
            reload_dir: None,
        }
    }
}

impl ToolchainConfig {
    /// Resolved reload library directory.
    pub fn reload_dir(&self) -> PathBuf {
        self.reload_dir
            .clone()
            .unwrap_or_else(|| {
                std::env::temp_dir()
                    .join("livelink")
                    .join(std::process::id().to_string())
            })
    }
}
