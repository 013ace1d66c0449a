//! File watching.
//!
//! ```text
//! WatcherFactory ──create──> FileWatch (notify + debouncer)
//!        ^                        │ FileChanged
//! WatchLifecycle (tick)           v
//!   countdown / recreate     EventQueue
//! ```
//!
//! The lifecycle owns at most one watch handle. When the set of compilation
//! units changes it drops the handle and builds a new one over freshly
//! selected directories a few ticks later.

mod backend;
mod debouncer;
mod dirs;
mod lifecycle;
mod roots;


pub use backend::NotifyWatcherFactory;
pub use dirs::{common_directory, select_directories};
pub use lifecycle::WatchLifecycle;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::ToolError;
use crate::event::EventQueue;

/// Decides whether a changed path is forwarded as `FileChanged`.
pub type PathFilter = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// A live watch handle. Dropping it stops watching.
pub trait FileWatch: Send {
    /// Forward changes observed since the last call. Called once per tick.
    fn update(&mut self);
}

/// Creates watch handles.
pub trait WatcherFactory: Send {
    /// Watch `dirs` recursively, pushing every changed path accepted by
    /// `filter` to `events`.
    fn create(
        &self,
        dirs: &[PathBuf],
        filter: PathFilter,
        events: Arc<EventQueue>,
    ) -> Result<Box<dyn FileWatch>, ToolError>;
}

/// Objects, depfiles and temporaries written by our own builds.
pub fn is_build_byproduct(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("o" | "tmp" | "d")
    )
}

/// Forward everything except build byproducts.
pub fn default_filter() -> PathFilter {
    Arc::new(|path: &Path| !is_build_byproduct(path))
}
