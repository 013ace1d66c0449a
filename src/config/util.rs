//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Well-known compilation database locations, relative to the project root.
const COMPILE_COMMANDS_CANDIDATES: &[&str] = &[
    "compile_commands.json",
    "build/compile_commands.json",
    "cmake-build-debug/compile_commands.json",
];

/// Find config file by searching upward from current directory
///
/// Starts from cwd and walks up parent directories until finding `config_name`
/// Returns the absolute path to the config file if found
///
/// # Example
/// ```text
/// /home/user/game/src/engine/  ← cwd
/// /home/user/game/livelink.toml ← found!
/// ```
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let cwd = std::env::current_dir().ok()?;
    find_upward(&cwd, config_name)
}

/// Walk up from `start` looking for `name`.
fn find_upward(start: &Path, name: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let candidate = current.join(name);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

/// Locate `compile_commands.json` under the project root.
pub fn find_compile_commands(root: &Path) -> Option<PathBuf> {
    COMPILE_COMMANDS_CANDIDATES
        .iter()
        .map(|candidate| root.join(candidate))
        .find(|path| path.is_file())
}

// ============================================================================
// tests
// ============================================================================
