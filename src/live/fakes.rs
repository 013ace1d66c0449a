//! In-memory collaborators for orchestrator tests.
//!
//! Every fake shares one [`FakeState`], so a test can script behavior and
//! inspect calls after the collaborators moved into `Live`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam::channel::Receiver;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::{Collaborators, LiveContext, LiveListener};
use crate::build::{BuildEvent, CompileOutcome, Compiler, LinkOutcome};
use crate::config::LiveConfig;
use crate::core::ToolError;
use crate::dependency::DependencyResolver;
use crate::event::{EventQueue, LogSeverity};
use crate::program::{DynamicLoader, ProgramInfoLoader, Symbols};
use crate::unit::{CompilationUnit, CompilationUnitParser, UnitsDelta};
use crate::watch::{FileWatch, PathFilter, WatcherFactory};

#[derive(Default)]
pub(crate) struct FakeState {
    // scripted behavior
    pub units: Vec<CompilationUnit>,
    /// changed path → delta returned once
    pub deltas: FxHashMap<PathBuf, UnitsDelta>,
    /// source → dependencies; unknown sources depend on themselves
    pub deps: FxHashMap<PathBuf, Vec<PathBuf>>,
    pub host_programs: Vec<(PathBuf, Symbols)>,
    /// Symbols of any path not in `host_programs`
    pub library_symbols: Symbols,
    pub exported: FxHashMap<PathBuf, Vec<String>>,
    pub fail_open: bool,
    pub link_status: i32,
    /// Keep links in flight until cleared
    pub hold_link: bool,

    // observed calls
    pub compiled: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub link_requests: usize,
    pub opened: Vec<PathBuf>,
    pub watchers_created: Vec<Vec<PathBuf>>,
    pub watchers_alive: usize,
    pub watcher_updates: usize,
}

pub(crate) type Shared = Arc<Mutex<FakeState>>;

pub(crate) fn shared() -> Shared {
    Arc::new(Mutex::new(FakeState::default()))
}

// ============================================================================
// Units, dependencies, programs, loader
// ============================================================================

pub(crate) struct FakeParser {
    pub state: Shared,
    /// Blocks `parse_units` until a message arrives or the sender drops.
    pub gate: Option<Receiver<()>>,
}

impl CompilationUnitParser for FakeParser {
    fn parse_units(&mut self) -> Result<Vec<CompilationUnit>, ToolError> {
        if let Some(gate) = self.gate.take() {
            let _ = gate.recv();
        }
        Ok(self.state.lock().units.clone())
    }

    fn update_units(&mut self, changed: &Path) -> Result<UnitsDelta, ToolError> {
        Ok(self.state.lock().deltas.remove(changed).unwrap_or_default())
    }
}

pub(crate) struct FakeResolver(pub Shared);

impl DependencyResolver for FakeResolver {
    fn dependencies(&self, unit: &CompilationUnit) -> Result<Vec<PathBuf>, ToolError> {
        let state = self.0.lock();
        Ok(state
            .deps
            .get(&unit.source_path)
            .cloned()
            .unwrap_or_else(|| vec![unit.source_path.clone()]))
    }
}

pub(crate) struct FakeProgramInfo(pub Shared);

impl ProgramInfoLoader for FakeProgramInfo {
    fn loaded_programs(&self) -> Vec<PathBuf> {
        self.0.lock().host_programs.iter().map(|(p, _)| p.clone()).collect()
    }

    fn program_symbols(&self, path: &Path) -> Result<Symbols, ToolError> {
        let state = self.0.lock();
        Ok(state
            .host_programs
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, s)| s.clone())
            .unwrap_or_else(|| state.library_symbols.clone()))
    }

    fn exported_symbols(&self, object: &Path) -> Result<Vec<String>, ToolError> {
        self.0
            .lock()
            .exported
            .get(object)
            .cloned()
            .ok_or_else(|| ToolError::NotFound(object.display().to_string()))
    }
}

pub(crate) struct FakeLoader(pub Shared);

impl DynamicLoader for FakeLoader {
    fn open(&mut self, path: &Path) -> Result<(), ToolError> {
        let mut state = self.0.lock();
        if state.fail_open {
            return Err(ToolError::Load {
                path: path.to_path_buf(),
                reason: "undefined symbol: missing".into(),
            });
        }
        state.opened.push(path.to_path_buf());
        Ok(())
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles instantly; links complete on the next poll unless held.
pub(crate) struct FakeCompiler {
    state: Shared,
    finished: Vec<BuildEvent>,
    pending: Vec<PathBuf>,
    linking: bool,
    libraries: usize,
}

impl FakeCompiler {
    pub fn new(state: Shared) -> Self {
        Self {
            state,
            finished: Vec::new(),
            pending: Vec::new(),
            linking: false,
            libraries: 0,
        }
    }
}

impl Compiler for FakeCompiler {
    fn compile(&mut self, unit: &CompilationUnit) {
        self.state.lock().compiled.push(unit.source_path.clone());
        if !self.pending.contains(&unit.obj_path) {
            self.pending.push(unit.obj_path.clone());
        }
        self.finished.push(BuildEvent::Compiled(CompileOutcome {
            source: unit.source_path.clone(),
            status: 0,
            output: String::new(),
        }));
    }

    fn remove(&mut self, source: &Path) {
        self.state.lock().removed.push(source.to_path_buf());
        self.pending.retain(|obj| obj.with_extension("cpp") != source);
    }

    fn link(&mut self) {
        self.state.lock().link_requests += 1;
        self.linking = true;
    }

    fn is_linking(&self) -> bool {
        self.linking
    }

    fn poll(&mut self) -> Vec<BuildEvent> {
        let mut events = std::mem::take(&mut self.finished);
        let state = self.state.lock();
        if self.linking && !state.hold_link {
            self.linking = false;
            self.libraries += 1;
            events.push(BuildEvent::Linked(LinkOutcome {
                status: state.link_status,
                library: PathBuf::from(format!("/reload/lib_reload{}.so", self.libraries)),
                objects: std::mem::take(&mut self.pending),
                output: if state.link_status == 0 {
                    String::new()
                } else {
                    "ld: undefined reference".into()
                },
            }));
        }
        events
    }
}

// ============================================================================
// Watcher
// ============================================================================

pub(crate) struct FakeWatcherFactory(pub Shared);

struct FakeWatch(Shared);

impl WatcherFactory for FakeWatcherFactory {
    fn create(
        &self,
        dirs: &[PathBuf],
        _filter: PathFilter,
        _events: Arc<EventQueue>,
    ) -> Result<Box<dyn FileWatch>, ToolError> {
        let mut state = self.0.lock();
        state.watchers_created.push(dirs.to_vec());
        state.watchers_alive += 1;
        Ok(Box::new(FakeWatch(Arc::clone(&self.0))))
    }
}

impl FileWatch for FakeWatch {
    fn update(&mut self) {
        self.0.lock().watcher_updates += 1;
    }
}

impl Drop for FakeWatch {
    fn drop(&mut self) {
        self.0.lock().watchers_alive -= 1;
    }
}

// ============================================================================
// Listener
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Note {
    Log(LogSeverity, String),
    PreLoad,
    PostLoad,
}

#[derive(Clone, Default)]
pub(crate) struct RecordingListener(pub Arc<Mutex<Vec<Note>>>);

impl RecordingListener {
    pub fn notes(&self) -> Vec<Note> {
        self.0.lock().clone()
    }

    pub fn count(&self, wanted: &Note) -> usize {
        self.0.lock().iter().filter(|n| *n == wanted).count()
    }

    pub fn logs(&self, severity: LogSeverity) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter_map(|n| match n {
                Note::Log(s, message) if *s == severity => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

impl LiveListener for RecordingListener {
    fn on_log(&mut self, severity: LogSeverity, message: &str) {
        self.0.lock().push(Note::Log(severity, message.to_string()));
    }

    fn on_code_pre_load(&mut self) {
        self.0.lock().push(Note::PreLoad);
    }

    fn on_code_post_load(&mut self) {
        self.0.lock().push(Note::PostLoad);
    }
}

// ============================================================================
// Assembly
// ============================================================================

pub(crate) fn collaborators(state: &Shared) -> Collaborators {
    Collaborators {
        units: Box::new(FakeParser {
            state: Arc::clone(state),
            gate: None,
        }),
        dependencies: Box::new(FakeResolver(Arc::clone(state))),
        programs: Box::new(FakeProgramInfo(Arc::clone(state))),
        loader: Box::new(FakeLoader(Arc::clone(state))),
    }
}

/// A context with fake collaborators and an empty registry.
pub(crate) fn context(state: &Shared, config: LiveConfig) -> LiveContext {
    LiveContext::new(config, Arc::new(EventQueue::new()), collaborators(state))
}

/// Drain every queued log record of `ctx`.
pub(crate) fn drain_logs(events: &EventQueue) -> Vec<(LogSeverity, String)> {
    std::iter::from_fn(|| events.pop_log())
        .map(|r| (r.severity, r.message))
        .collect()
}
