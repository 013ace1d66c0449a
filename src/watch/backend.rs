//! Default watch handle: a notify `RecommendedWatcher` feeding a debouncer.
//!
//! ```text
//! notify thread ──> channel ──> update(): Debouncer ──> filter ──> EventQueue
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver};
use notify::RecommendedWatcher;

use super::debouncer::Debouncer;
use super::roots::WatchRoots;
use super::{FileWatch, PathFilter, WatcherFactory};
use crate::core::ToolError;
use crate::emit;
use crate::event::EventQueue;

/// Builds [`NotifyWatch`] handles.
#[derive(Debug, Clone, Copy)]
pub struct NotifyWatcherFactory {
    debounce: Duration,
}

impl NotifyWatcherFactory {
    pub const fn new(debounce: Duration) -> Self {
        Self { debounce }
    }
}

impl WatcherFactory for NotifyWatcherFactory {
    fn create(
        &self,
        dirs: &[PathBuf],
        filter: PathFilter,
        events: Arc<EventQueue>,
    ) -> Result<Box<dyn FileWatch>, ToolError> {
        Ok(Box::new(NotifyWatch::new(
            dirs.to_vec(),
            self.debounce,
            filter,
            events,
        )?))
    }
}

struct NotifyWatch {
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    notify_rx: Receiver<notify::Result<notify::Event>>,
    roots: WatchRoots,
    debouncer: Debouncer,
    filter: PathFilter,
    events: Arc<EventQueue>,
}

impl NotifyWatch {
    fn new(
        dirs: Vec<PathBuf>,
        debounce: Duration,
        filter: PathFilter,
        events: Arc<EventQueue>,
    ) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = notify_tx.send(res);
        })?;

        let mut roots = WatchRoots::new(dirs);
        roots.attach_existing(&mut watcher)?;
        emit!(events, Debug, "Watching {} directories", roots.attached_count());

        Ok(Self {
            watcher,
            notify_rx,
            roots,
            debouncer: Debouncer::new(debounce),
            filter,
            events,
        })
    }
}

impl FileWatch for NotifyWatch {
    fn update(&mut self) {
        while let Ok(result) = self.notify_rx.try_recv() {
            match result {
                Ok(event) => self.debouncer.add_event(&event),
                Err(e) => emit!(self.events, Warning, "notify error: {e}"),
            }
        }

        for root in self.roots.maintain(&mut self.watcher) {
            emit!(self.events, Debug, "Re-attached watch: {}", root.display());
        }

        let Some(paths) = self.debouncer.take_if_ready() else {
            return;
        };
        for path in paths {
            if (self.filter)(&path) {
                emit!(self.events, Debug, "File changed: {}", path.display());
                self.events.add_file_changed(path);
            }
        }
    }
}
