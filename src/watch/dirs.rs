//! Choosing the directories to watch.

use std::path::{Path, PathBuf};

use crate::emit;
use crate::event::EventQueue;

/// Explicit directories win; otherwise watch the deepest directory that
/// contains every source, plus the compilation database's directory when it
/// lies outside (out-of-source builds).
///
/// Problems are reported to `events`; an empty result means nothing is watched.
pub fn select_directories(
    explicit: &[PathBuf],
    sources: &[PathBuf],
    database: Option<&Path>,
    events: &EventQueue,
) -> Vec<PathBuf> {
    if explicit.is_empty() {
        let Some(common) = common_directory(sources) else {
            emit!(events, Error, "Cannot find a common directory of the compilation units");
            return Vec::new();
        };
        let database_dir = database
            .and_then(Path::parent)
            .filter(|dir| dir.is_dir() && !dir.starts_with(&common))
            .map(Path::to_path_buf);

        let mut dirs = vec![common];
        if let Some(dir) = database_dir {
            emit!(
                events,
                Debug,
                "Compilation database is outside the sources, watching {} too",
                dir.display()
            );
            dirs.push(dir);
        }
        return dirs;
    }

    let dirs: Vec<PathBuf> = explicit
        .iter()
        .filter(|dir| {
            let valid = dir.is_dir();
            if !valid {
                emit!(
                    events,
                    Warning,
                    "Directory doesn't exist or isn't a directory: {}",
                    dir.display()
                );
            }
            valid
        })
        .cloned()
        .collect();

    if dirs.is_empty() {
        emit!(events, Error, "No valid directories to monitor");
    }
    dirs
}

/// Longest common prefix of `paths`, walked up until it is an existing
/// directory.
pub fn common_directory(paths: &[PathBuf]) -> Option<PathBuf> {
    let (first, rest) = paths.split_first()?;

    let mut prefix: Vec<_> = first.components().collect();
    for path in rest {
        let shared = prefix
            .iter()
            .zip(path.components())
            .take_while(|(a, b)| **a == *b)
            .count();
        prefix.truncate(shared);
    }

    let mut dir: PathBuf = prefix.iter().collect();
    while !dir.is_dir() {
        if !dir.pop() {
            return None;
        }
    }
    (dir != Path::new("")).then_some(dir)
}
