use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;
use tempfile::TempDir;

use super::fakes::*;
use super::*;
use crate::event::LogSeverity;
use crate::program::{Program, Symbol, Symbols};
use crate::reload::ReloadStep;
use crate::unit::{UnitsDelta, test_unit};

const DB: &str = "/build/compile_commands.json";

fn path(s: &str) -> PathBuf {
    PathBuf::from(s)
}

fn symbols(functions: &[&str], variables: &[&str]) -> Symbols {
    Symbols {
        functions: functions.iter().map(|n| Symbol::new(*n, 0x1000, 16)).collect(),
        variables: variables.iter().map(|n| Symbol::new(*n, 0x2000, 8)).collect(),
    }
}

struct Harness {
    live: Live,
    state: Shared,
    listener: RecordingListener,
}

impl Harness {
    fn start(state: Shared, config: LiveConfig) -> Self {
        Self::start_with(state, config, None, ReloadPipeline::standard())
    }

    fn start_with(
        state: Shared,
        config: LiveConfig,
        gate: Option<channel::Receiver<()>>,
        pipeline: ReloadPipeline,
    ) -> Self {
        let listener = RecordingListener::default();
        let live = Live::builder(config)
            .with_listener(Box::new(listener.clone()))
            .with_units_parser(Box::new(FakeParser {
                state: Arc::clone(&state),
                gate,
            }))
            .with_dependency_resolver(Box::new(FakeResolver(Arc::clone(&state))))
            .with_program_info(Box::new(FakeProgramInfo(Arc::clone(&state))))
            .with_loader(Box::new(FakeLoader(Arc::clone(&state))))
            .with_compiler(Box::new(FakeCompiler::new(Arc::clone(&state))))
            .with_watcher_factory(Box::new(FakeWatcherFactory(Arc::clone(&state))))
            .with_pipeline(pipeline)
            .start();
        Self {
            live,
            state,
            listener,
        }
    }

    /// Poll `update` until the initializer has been joined.
    fn wait_ready(&mut self) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while self.live.context().is_none() {
            assert!(Instant::now() < deadline, "initialization timed out");
            self.live.update();
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn change(&mut self, file: &str) {
        self.live.events.add_file_changed(path(file));
        self.live.update();
    }

    fn ctx(&self) -> &LiveContext {
        self.live.context().unwrap()
    }

    fn compiled(&self) -> Vec<PathBuf> {
        let mut compiled = self.state.lock().compiled.clone();
        compiled.sort();
        compiled
    }
}

/// a.cpp includes common.h, b.cpp includes b.h.
fn project() -> Shared {
    let state = shared();
    {
        let mut s = state.lock();
        s.units = vec![test_unit("/src/a.cpp"), test_unit("/src/b.cpp")];
        s.deps.insert(path("/src/a.cpp"), vec![path("/src/a.cpp"), path("/src/common.h")]);
        s.deps.insert(path("/src/b.cpp"), vec![path("/src/b.cpp"), path("/src/b.h")]);
        s.host_programs = vec![(path("/bin/host"), symbols(&["main", "compute"], &["counter"]))];
        s.exported.insert(path("/src/a.o"), vec!["compute".into()]);
        s.exported.insert(path("/src/b.o"), vec!["helper".into()]);
        s.library_symbols = symbols(&["compute"], &[]);
    }
    state
}

fn ready(state: Shared) -> Harness {
    let mut h = Harness::start(state, LiveConfig::default());
    h.wait_ready();
    h
}

// ============================================================================
// Initialization
// ============================================================================

#[test]
fn init_populates_context() {
    let h = ready(project());
    let ctx = h.ctx();

    assert_eq!(ctx.units.len(), 2);
    assert_eq!(ctx.programs.len(), 1);
    assert_eq!(ctx.programs[0].path, path("/bin/host"));
    assert_eq!(ctx.exported.owner("compute"), Some(Path::new("/src/a.o")));
    assert_eq!(ctx.exported.owner("helper"), Some(Path::new("/src/b.o")));
    assert!(ctx.graph.used_by(Path::new("/src/common.h")).unwrap().contains(&path("/src/a.cpp")));
    assert!(ctx.graph.is_consistent());
    assert_eq!(h.state.lock().watchers_alive, 1);

    let info = h.listener.logs(LogSeverity::Info);
    assert_eq!(info.first().map(String::as_str), Some("Initializing..."));
    assert!(info.iter().any(|m| m == "Ready"));
    assert!(h.live.is_initialized());
}

#[test]
fn host_without_symbols_is_skipped() {
    let state = project();
    state.lock().host_programs = vec![(path("/bin/stripped"), Symbols::default())];
    let h = ready(state);
    assert!(h.ctx().programs.is_empty());
}

#[test]
fn no_units_is_logged_and_inert() {
    let state = shared();
    let mut h = ready(state);

    assert!(
        h.listener
            .logs(LogSeverity::Error)
            .iter()
            .any(|m| m == "No compilation units found")
    );
    h.change("/src/a.cpp");
    assert!(h.compiled().is_empty());
}

#[test]
fn try_reload_before_init_only_warns() {
    let state = project();
    let (gate_tx, gate_rx): (Sender<()>, _) = channel::bounded(1);
    let mut h = Harness::start_with(
        Arc::clone(&state),
        LiveConfig::default(),
        Some(gate_rx),
        ReloadPipeline::standard(),
    );

    h.live.try_reload();
    h.live.update();

    assert!(!h.live.is_initialized());
    assert_eq!(h.listener.logs(LogSeverity::Warning).len(), 1);
    assert_eq!(state.lock().link_requests, 0);
    assert!(state.lock().compiled.is_empty());

    // Events wait for initialization
    h.live.events.add_file_changed(path("/src/a.cpp"));
    h.live.update();
    assert!(state.lock().compiled.is_empty());

    gate_tx.send(()).unwrap();
    h.wait_ready();
    h.live.update();
    assert_eq!(h.compiled(), vec![path("/src/a.cpp")]);
}

// ============================================================================
// Change propagation
// ============================================================================

#[test]
fn header_change_recompiles_dependents_only() {
    let mut h = ready(project());
    h.change("/src/common.h");
    assert_eq!(h.compiled(), vec![path("/src/a.cpp")]);
}

#[test]
fn shared_header_recompiles_every_dependent() {
    let state = project();
    state
        .lock()
        .deps
        .insert(path("/src/b.cpp"), vec![path("/src/b.cpp"), path("/src/common.h")]);
    let mut h = ready(state);

    h.change("/src/common.h");
    assert_eq!(h.compiled(), vec![path("/src/a.cpp"), path("/src/b.cpp")]);
}

#[test]
fn source_change_recompiles_its_unit() {
    let mut h = ready(project());
    h.change("/src/b.cpp");
    assert_eq!(h.compiled(), vec![path("/src/b.cpp")]);
}

#[test]
fn compile_completion_refreshes_dependencies() {
    let mut h = ready(project());
    h.state
        .lock()
        .deps
        .insert(path("/src/a.cpp"), vec![path("/src/a.cpp"), path("/src/new.h")]);

    h.change("/src/a.cpp");
    // Completion is polled on the next tick
    h.live.update();

    let graph = &h.ctx().graph;
    assert!(graph.used_by(Path::new("/src/common.h")).is_none());
    assert!(graph.used_by(Path::new("/src/new.h")).unwrap().contains(&path("/src/a.cpp")));
    assert!(graph.is_consistent());
}

#[test]
fn unknown_file_is_ignored() {
    let mut h = ready(project());
    h.change("/docs/readme.md");

    assert!(h.compiled().is_empty());
    assert!(h.listener.logs(LogSeverity::Error).is_empty());
}

#[test]
fn added_unit_is_compiled_and_watcher_recreated() {
    let state = project();
    state.lock().deltas.insert(
        path(DB),
        UnitsDelta {
            added: vec![test_unit("/src/c.cpp")],
            ..UnitsDelta::default()
        },
    );
    let mut h = ready(state);

    h.change(DB);
    assert!(h.ctx().units.contains(Path::new("/src/c.cpp")));
    assert_eq!(h.compiled(), vec![path("/src/c.cpp")]);
    // Completion adds the new unit's edges
    h.live.update();
    assert!(h.ctx().graph.used_by(Path::new("/src/c.cpp")).is_some());

    // The update above was the first countdown tick: old watcher gone
    assert_eq!(h.state.lock().watchers_alive, 0);

    let mut ticks = 1;
    while h.state.lock().watchers_created.len() < 2 {
        h.live.update();
        ticks += 1;
        assert!(ticks <= 10, "watcher never recreated");
    }
    // 10 → 1 takes nine ticks
    assert_eq!(ticks, 9);
    assert_eq!(h.state.lock().watchers_alive, 1);
}

#[test]
fn modified_unit_replaces_registry_entry() {
    let state = project();
    let mut modified = test_unit("/src/a.cpp");
    modified.flags.push("-O2".into());
    state.lock().deltas.insert(
        path(DB),
        UnitsDelta {
            added: vec![test_unit("/src/c.cpp")],
            modified: vec![modified.clone()],
            removed: Vec::new(),
        },
    );
    let mut h = ready(state);

    h.change(DB);
    assert_eq!(h.ctx().units.get(Path::new("/src/a.cpp")), Some(&modified));
    // Added units are compiled before modified ones
    assert_eq!(
        h.state.lock().compiled,
        vec![path("/src/c.cpp"), path("/src/a.cpp")]
    );
}

#[test]
fn removed_unit_is_forgotten() {
    let state = project();
    state.lock().deltas.insert(
        path(DB),
        UnitsDelta {
            removed: vec![path("/src/a.cpp")],
            ..UnitsDelta::default()
        },
    );
    let mut h = ready(state);

    h.change(DB);
    let ctx = h.ctx();
    assert!(!ctx.units.contains(Path::new("/src/a.cpp")));
    assert!(ctx.graph.uses(Path::new("/src/a.cpp")).is_none());
    assert!(ctx.graph.used_by(Path::new("/src/common.h")).is_none());
    assert!(ctx.graph.is_consistent());
    assert_eq!(h.state.lock().removed, vec![path("/src/a.cpp")]);

    h.change("/src/common.h");
    assert!(h.compiled().is_empty());
}

#[test]
fn compile_finishing_after_removal_is_ignored() {
    let state = project();
    state.lock().deltas.insert(
        path(DB),
        UnitsDelta {
            removed: vec![path("/src/a.cpp")],
            ..UnitsDelta::default()
        },
    );
    let mut h = ready(state);

    // a.cpp starts compiling, then the database drops it in the same tick
    h.live.events.add_file_changed(path("/src/a.cpp"));
    h.change(DB);
    assert_eq!(h.compiled(), vec![path("/src/a.cpp")]);
    assert!(!h.ctx().units.contains(Path::new("/src/a.cpp")));

    // The completion arrives for a unit that no longer exists
    h.live.update();

    let ctx = h.ctx();
    assert!(ctx.graph.uses(Path::new("/src/a.cpp")).is_none());
    assert!(ctx.graph.used_by(Path::new("/src/a.cpp")).is_none());
    assert!(ctx.graph.used_by(Path::new("/src/common.h")).is_none());
    assert!(ctx.graph.is_consistent());
    assert!(h.listener.logs(LogSeverity::Error).is_empty());
}

// ============================================================================
// Reload sequencing
// ============================================================================

#[test]
fn successful_reload_appends_program() {
    let mut h = ready(project());
    h.state
        .lock()
        .exported
        .insert(path("/src/a.o"), vec!["compute".into(), "fresh".into()]);

    h.change("/src/a.cpp");
    h.live.try_reload();
    h.live.update();

    let ctx = h.ctx();
    assert_eq!(ctx.programs.len(), 2);
    let program = &ctx.programs[1];
    assert_eq!(program.path, path("/reload/lib_reload1.so"));
    assert_eq!(program.obj_paths, vec![path("/src/a.o")]);
    assert!(!program.symbols.is_empty());
    assert_eq!(ctx.exported.owner("fresh"), Some(Path::new("/src/a.o")));
    assert_eq!(h.state.lock().opened, vec![path("/reload/lib_reload1.so")]);

    assert_eq!(h.listener.count(&Note::PreLoad), 1);
    assert_eq!(h.listener.count(&Note::PostLoad), 1);
    assert!(
        h.listener
            .count(&Note::Log(LogSeverity::Info, "Code reloaded".into()))
            == 1
    );
    assert!(!h.live.compiler.is_linking());
}

#[test]
fn logs_reach_listener_between_hooks() {
    let mut h = ready(project());
    h.change("/src/a.cpp");
    h.live.try_reload();
    h.live.update();

    let notes = h.listener.notes();
    let pre = notes.iter().position(|n| *n == Note::PreLoad).unwrap();
    let post = notes.iter().position(|n| *n == Note::PostLoad).unwrap();
    let reloaded = notes
        .iter()
        .position(|n| *n == Note::Log(LogSeverity::Info, "Code reloaded".into()))
        .unwrap();
    assert!(pre < reloaded && reloaded < post);
}

#[test]
fn failed_link_keeps_history() {
    let state = project();
    state.lock().link_status = 1;
    let mut h = ready(state);

    h.change("/src/a.cpp");
    h.live.try_reload();
    h.live.update();

    assert_eq!(h.ctx().programs.len(), 1);
    assert!(h.state.lock().opened.is_empty());
    assert_eq!(h.listener.count(&Note::PreLoad), 1);
    assert_eq!(h.listener.count(&Note::PostLoad), 1);
    assert!(
        h.listener
            .logs(LogSeverity::Error)
            .iter()
            .any(|m| m.contains("ld: undefined reference"))
    );
}

#[test]
fn nothing_to_reload_warns() {
    let state = project();
    state.lock().link_status = 1;
    let mut h = ready(state);

    h.live.try_reload();
    h.live.update();

    assert_eq!(h.ctx().programs.len(), 1);
    assert!(
        h.listener
            .logs(LogSeverity::Warning)
            .iter()
            .any(|m| m == "Nothing to reload")
    );
    assert_eq!(h.listener.count(&Note::PostLoad), 1);
}

#[test]
fn load_failure_keeps_previous_code() {
    let state = project();
    state.lock().fail_open = true;
    let mut h = ready(state);

    h.change("/src/a.cpp");
    h.live.try_reload();
    h.live.update();

    assert_eq!(h.ctx().programs.len(), 1);
    let errors = h.listener.logs(LogSeverity::Error);
    assert!(errors.iter().any(|m| m.contains("undefined symbol: missing")));
    assert_eq!(h.listener.count(&Note::PreLoad), 1);
    assert_eq!(h.listener.count(&Note::PostLoad), 1);
}

#[test]
fn events_wait_while_linking() {
    let state = project();
    state.lock().hold_link = true;
    let mut h = ready(state);

    h.live.try_reload();
    h.change("/src/a.cpp");
    assert!(h.compiled().is_empty());
    assert_eq!(h.live.events.pending_events(), 1);

    // A second request while linking is refused
    h.live.try_reload();
    h.live.update();
    assert_eq!(h.state.lock().link_requests, 1);
    assert!(
        h.listener
            .logs(LogSeverity::Warning)
            .iter()
            .any(|m| m == "Reload already in progress")
    );

    h.state.lock().hold_link = false;
    h.live.update();
    assert_eq!(h.compiled(), vec![path("/src/a.cpp")]);
}

struct RecordStep {
    name: &'static str,
    seen: Arc<Mutex<Vec<(String, usize)>>>,
}

impl ReloadStep for RecordStep {
    fn name(&self) -> &str {
        self.name
    }

    fn apply(&mut self, ctx: &mut LiveContext, program: &Program) {
        assert!(program.path.ends_with("lib_reload1.so"));
        self.seen.lock().push((self.name.to_string(), ctx.programs.len()));
    }
}

#[test]
fn pipeline_runs_in_order_before_history_append() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let pipeline = ReloadPipeline::new()
        .with_step(RecordStep {
            name: "first",
            seen: Arc::clone(&seen),
        })
        .with_step(RecordStep {
            name: "second",
            seen: Arc::clone(&seen),
        });
    let mut h = Harness::start_with(project(), LiveConfig::default(), None, pipeline);
    h.wait_ready();

    h.change("/src/a.cpp");
    h.live.try_reload();
    h.live.update();

    assert_eq!(
        *seen.lock(),
        vec![("first".to_string(), 1), ("second".to_string(), 1)]
    );
    assert_eq!(h.ctx().programs.len(), 2);
}

#[test]
fn pipeline_shape_is_logged_at_start() {
    let mut h = Harness::start_with(project(), LiveConfig::default(), None, ReloadPipeline::new());
    h.wait_ready();
    assert!(
        h.listener
            .logs(LogSeverity::Debug)
            .iter()
            .any(|m| m == "Reload pipeline is empty, libraries are only loaded")
    );

    let h = ready(project());
    assert!(
        h.listener
            .logs(LogSeverity::Debug)
            .iter()
            .any(|m| m == "Reload pipeline: 1 step")
    );
}

// ============================================================================
// Directories
// ============================================================================

#[test]
fn explicit_directories_skip_missing() {
    let temp = TempDir::new().unwrap();
    let valid = crate::utils::path::normalize_path(temp.path());
    let missing = valid.join("missing");

    let mut config = LiveConfig::default();
    config.watch.directories = vec![missing.clone(), valid.clone()];
    let mut h = Harness::start(project(), config);
    h.wait_ready();

    let warnings = h.listener.logs(LogSeverity::Warning);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains(&missing.display().to_string()));
    assert_eq!(h.ctx().dirs_to_monitor, vec![valid.clone()]);
    assert_eq!(h.state.lock().watchers_created, vec![vec![valid]]);
}

#[test]
fn drop_logs_teardown() {
    let h = ready(project());
    let listener = h.listener.clone();
    drop(h);
    assert!(
        listener
            .logs(LogSeverity::Debug)
            .iter()
            .any(|m| m == "Live reloading stopped")
    );
}
