use crate::emit;
use crate::live::LiveContext;

use super::{FileWatch, PathFilter, WatcherFactory, default_filter, select_directories};

/// Owns the watch handle and recreates it after the unit set changes.
///
/// Recreation is a countdown of `recreate_ticks` ticks: on the first tick the
/// old handle is dropped, and the tick that brings the counter down to 1
/// creates the new one. In between nothing is watched.
pub struct WatchLifecycle {
    factory: Box<dyn WatcherFactory>,
    filter: PathFilter,
    watcher: Option<Box<dyn FileWatch>>,
    countdown: u32,
    recreate_ticks: u32,
}

impl WatchLifecycle {
    pub fn new(factory: Box<dyn WatcherFactory>, recreate_ticks: u32) -> Self {
        Self {
            factory,
            filter: default_filter(),
            watcher: None,
            countdown: 0,
            recreate_ticks,
        }
    }

    /// Select directories and create a watch handle over them.
    pub fn start(&mut self, ctx: &mut LiveContext) {
        self.watcher = None;
        let database = ctx.config.compile_commands_path();
        ctx.dirs_to_monitor = select_directories(
            ctx.config.directories_to_monitor(),
            &ctx.units.sources(),
            database.as_deref(),
            &ctx.events,
        );
        if ctx.dirs_to_monitor.is_empty() {
            return;
        }

        for dir in &ctx.dirs_to_monitor {
            emit!(ctx.events, Debug, "Monitoring {}", dir.display());
        }
        match self.factory.create(
            &ctx.dirs_to_monitor,
            self.filter.clone(),
            ctx.events.clone(),
        ) {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(e) => emit!(ctx.events, Error, "Cannot create file watcher: {}", e.chain()),
        }
    }

    /// Begin the recreation countdown.
    pub fn schedule_recreate(&mut self) {
        self.countdown = self.recreate_ticks;
    }

    /// Advance the countdown, then let the current handle forward changes.
    pub fn tick(&mut self, ctx: &mut LiveContext) {
        if self.countdown == self.recreate_ticks && self.watcher.take().is_some() {
            emit!(ctx.events, Debug, "File watcher dropped, recreating");
        }
        if self.countdown > 0 {
            self.countdown -= 1;
            if self.countdown == 1 {
                self.start(ctx);
            }
        }

        if let Some(watcher) = self.watcher.as_mut() {
            watcher.update();
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    pub const fn countdown(&self) -> u32 {
        self.countdown
    }
}
