//! The reload orchestrator.
//!
//! # Architecture
//!
//! ```text
//!            ┌──────────── livelink-init thread ────────────┐
//! Live::new ─┤ units → watcher → symbols → exports → deps   ├─> Bootstrap
//!            └──────────────────────────────────────────────┘      │ join (once)
//!                                                                  v
//! Live::update (host loop): logs → watcher tick → build events → file events
//! ```
//!
//! # Modules
//!
//! - `context` - `LiveContext`, the state the orchestrator owns
//! - `init` - the five-phase bootstrap
//! - `reconcile` - file changes → recompiles, dependency updates
//! - `sequencer` - link completion → load → pipeline
//! - `listener` - host notifications
//! - `signal` - SIGUSR1 reload trigger

mod context;
mod init;
mod listener;
mod reconcile;
mod sequencer;
mod signal;

#[cfg(test)]
pub(crate) mod fakes;
#[cfg(test)]
mod tests;

pub use context::{Collaborators, LiveContext};
pub use listener::{ConsoleListener, LiveListener};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::build::{BuildEvent, Compiler, ProcessCompiler};
use crate::config::{LiveConfig, MIN_RECREATE_TICKS};
use crate::dependency::{DepfileResolver, DependencyResolver};
use crate::emit;
use crate::event::{Event, EventQueue};
use crate::program::{DlopenLoader, DynamicLoader, NmProgramInfoLoader, ProgramInfoLoader};
use crate::reload::ReloadPipeline;
use crate::unit::{CompilationUnitParser, CompileCommandsParser};
use crate::utils::plural::plural_count;
use crate::watch::{NotifyWatcherFactory, WatchLifecycle, WatcherFactory};

use init::Bootstrap;
use sequencer::flush_logs;
use signal::SignalReloader;

/// Live code reloading for the current process.
///
/// Call [`update`](Self::update) regularly from one thread (once per frame or
/// tick) and [`try_reload`](Self::try_reload) when the new code should be
/// loaded.
pub struct Live {
    events: Arc<EventQueue>,
    listener: Box<dyn LiveListener>,
    compiler: Box<dyn Compiler>,
    pipeline: ReloadPipeline,
    initialized: Arc<AtomicBool>,
    init_thread: Option<JoinHandle<Bootstrap>>,
    state: Option<Bootstrap>,
    signal: Option<SignalReloader>,
}

impl Live {
    /// Start with the default collaborators.
    pub fn new(listener: Box<dyn LiveListener>, config: LiveConfig) -> Self {
        Self::builder(config).with_listener(listener).start()
    }

    pub fn builder(config: LiveConfig) -> LiveBuilder {
        LiveBuilder::new(config)
    }

    /// Poll everything once. Never blocks, except for the one-time join of
    /// the initializer right after it finished.
    pub fn update(&mut self) {
        flush_logs(&self.events, self.listener.as_mut());
        if !self.finish_init() {
            return;
        }

        if self
            .signal
            .as_ref()
            .is_some_and(SignalReloader::take_request)
        {
            self.try_reload();
        }

        let Some(state) = self.state.as_mut() else {
            return;
        };
        state.watch.tick(&mut state.context);

        for event in self.compiler.poll() {
            match event {
                BuildEvent::Compiled(outcome) => reconcile::on_compiled(&mut state.context, outcome),
                BuildEvent::Linked(outcome) => sequencer::on_linked(
                    &mut state.context,
                    &mut self.pipeline,
                    self.listener.as_mut(),
                    outcome,
                ),
            }
        }

        // No new compiles while a link is in flight
        if !self.compiler.is_linking() {
            while let Some(event) = self.events.pop_event() {
                match event {
                    Event::FileChanged(path) => reconcile::on_file_changed(
                        &mut state.context,
                        self.compiler.as_mut(),
                        &mut state.watch,
                        &path,
                    ),
                    Event::Log(record) => self.listener.on_log(record.severity, &record.message),
                }
            }
        }

        flush_logs(&self.events, self.listener.as_mut());
    }

    /// Link everything compiled since the last reload and load it.
    ///
    /// The result arrives through the listener's load hooks during a later
    /// [`update`](Self::update).
    pub fn try_reload(&mut self) {
        if !self.finish_init() {
            emit!(self.events, Warning, "Cannot reload code while initializing");
            return;
        }
        if self.compiler.is_linking() {
            emit!(self.events, Warning, "Reload already in progress");
            return;
        }

        emit!(self.events, Info, "Trying to reload code...");
        self.compiler.link();
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// The context, once the initializer has been joined.
    pub fn context(&self) -> Option<&LiveContext> {
        self.state.as_ref().map(|state| &state.context)
    }

    /// Join the initializer once it is done. Returns whether the context is
    /// available.
    fn finish_init(&mut self) -> bool {
        if self.state.is_some() {
            return true;
        }

        // Read `finished` first: the flag is set before the thread returns
        let finished = self.init_thread.as_ref().is_some_and(JoinHandle::is_finished);
        if !self.is_initialized() {
            if finished {
                self.init_thread = None;
                emit!(self.events, Error, "Initialization failed");
            }
            return false;
        }

        let Some(handle) = self.init_thread.take() else {
            return false;
        };
        match handle.join() {
            Ok(state) => {
                self.state = Some(state);
                emit!(self.events, Info, "Ready");
                true
            }
            Err(_) => {
                emit!(self.events, Error, "Initialization failed");
                false
            }
        }
    }
}

impl Drop for Live {
    fn drop(&mut self) {
        self.signal = None;
        emit!(self.events, Debug, "Live reloading stopped");
        flush_logs(&self.events, self.listener.as_mut());
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles a [`Live`], replacing default collaborators where given.
pub struct LiveBuilder {
    config: LiveConfig,
    listener: Option<Box<dyn LiveListener>>,
    units: Option<Box<dyn CompilationUnitParser>>,
    dependencies: Option<Box<dyn DependencyResolver>>,
    programs: Option<Box<dyn ProgramInfoLoader>>,
    loader: Option<Box<dyn DynamicLoader>>,
    compiler: Option<Box<dyn Compiler>>,
    watcher: Option<Box<dyn WatcherFactory>>,
    pipeline: Option<ReloadPipeline>,
}

impl LiveBuilder {
    pub fn new(config: LiveConfig) -> Self {
        Self {
            config,
            listener: None,
            units: None,
            dependencies: None,
            programs: None,
            loader: None,
            compiler: None,
            watcher: None,
            pipeline: None,
        }
    }

    pub fn with_listener(mut self, listener: Box<dyn LiveListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn with_units_parser(mut self, parser: Box<dyn CompilationUnitParser>) -> Self {
        self.units = Some(parser);
        self
    }

    pub fn with_dependency_resolver(mut self, resolver: Box<dyn DependencyResolver>) -> Self {
        self.dependencies = Some(resolver);
        self
    }

    pub fn with_program_info(mut self, programs: Box<dyn ProgramInfoLoader>) -> Self {
        self.programs = Some(programs);
        self
    }

    pub fn with_loader(mut self, loader: Box<dyn DynamicLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_compiler(mut self, compiler: Box<dyn Compiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub fn with_watcher_factory(mut self, factory: Box<dyn WatcherFactory>) -> Self {
        self.watcher = Some(factory);
        self
    }

    pub fn with_pipeline(mut self, pipeline: ReloadPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Spawn the initializer and hand back the orchestrator.
    pub fn start(self) -> Live {
        let config = self.config;
        let events = Arc::new(EventQueue::new());
        emit!(events, Info, "Initializing...");

        let compiler = self.compiler.unwrap_or_else(|| {
            let compiler = ProcessCompiler::new(config.toolchain.clone());
            if !compiler.linker_available() {
                emit!(events, Warning, "Linker `{}` not found in PATH", config.toolchain.linker);
            }
            Box::new(compiler)
        });

        let collaborators = Collaborators {
            units: self.units.unwrap_or_else(|| {
                Box::new(CompileCommandsParser::new(config.compile_commands_path()))
            }),
            dependencies: self.dependencies.unwrap_or_else(|| Box::new(DepfileResolver)),
            programs: self
                .programs
                .unwrap_or_else(|| Box::new(NmProgramInfoLoader::new(config.toolchain.nm.clone()))),
            loader: self.loader.unwrap_or_else(|| Box::new(DlopenLoader::new())),
        };

        let factory = self.watcher.unwrap_or_else(|| {
            Box::new(NotifyWatcherFactory::new(Duration::from_millis(
                config.watch.debounce_ms,
            )))
        });
        let watch = WatchLifecycle::new(
            factory,
            config.watch.recreate_ticks.max(MIN_RECREATE_TICKS),
        );

        let signal = if config.reload_on_signal() {
            SignalReloader::install(&events)
        } else {
            None
        };

        let initialized = Arc::new(AtomicBool::new(false));
        let context = LiveContext::new(config, Arc::clone(&events), collaborators);
        let flag = Arc::clone(&initialized);
        let init_thread = thread::Builder::new()
            .name("livelink-init".into())
            .spawn(move || {
                let state = init::run(context, watch);
                flag.store(true, Ordering::Release);
                state
            });
        let init_thread = match init_thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                emit!(events, Error, "Cannot start initializer thread: {e}");
                None
            }
        };

        let pipeline = self.pipeline.unwrap_or_else(ReloadPipeline::standard);
        if pipeline.is_empty() {
            emit!(events, Debug, "Reload pipeline is empty, libraries are only loaded");
        } else {
            emit!(events, Debug, "Reload pipeline: {}", plural_count(pipeline.len(), "step"));
        }

        Live {
            events,
            listener: self.listener.unwrap_or_else(|| Box::new(ConsoleListener::new())),
            compiler,
            pipeline,
            initialized,
            init_thread,
            state: None,
            signal,
        }
    }
}
