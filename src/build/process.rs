//! Default compiler: runs the unit's own compiler and the configured linker
//! as child processes on a small rayon pool.

use crossbeam::channel::{self, Receiver, Sender};
use rustc_hash::FxHashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{BuildEvent, CompileOutcome, Compiler, LinkOutcome};
use crate::config::ToolchainConfig;
use crate::unit::CompilationUnit;
use crate::utils::exec::{Cmd, combined_output, exit_code};

/// Worker threads for compile jobs.
const COMPILE_THREADS: usize = 4;

/// Message from a pool job back to the compiler.
enum Completion {
    Compiled {
        job: u64,
        obj: PathBuf,
        outcome: CompileOutcome,
    },
    Linked(LinkOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Idle,
    /// Requested, waiting for in-flight compiles.
    Requested,
    Running,
}

/// Compiles with `<compiler> <flags> -MD -MF <depfile> -c <src> -o <obj>` and
/// links with `<linker> -shared <link_flags> -o <lib> <objs>`.
///
/// Objects must be position independent (`-fPIC` in the project flags) to
/// link into a shared library.
pub struct ProcessCompiler {
    toolchain: ToolchainConfig,
    pool: Option<rayon::ThreadPool>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    /// source → id of the latest compile job
    in_flight: FxHashMap<PathBuf, u64>,
    next_job: u64,
    /// source → object compiled since the last successful link
    pending: FxHashMap<PathBuf, PathBuf>,
    link_state: LinkState,
    libraries_built: usize,
}

impl ProcessCompiler {
    pub fn new(toolchain: ToolchainConfig) -> Self {
        let (tx, rx) = channel::unbounded();
        // Falls back to the global pool if a dedicated one can't be built
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(COMPILE_THREADS)
            .thread_name(|i| format!("livelink-build-{i}"))
            .build()
            .ok();

        Self {
            toolchain,
            pool,
            tx,
            rx,
            in_flight: FxHashMap::default(),
            next_job: 0,
            pending: FxHashMap::default(),
            link_state: LinkState::Idle,
            libraries_built: 0,
        }
    }

    /// Whether the configured linker can be found on `PATH`.
    pub fn linker_available(&self) -> bool {
        which::which(&self.toolchain.linker).is_ok()
    }

    /// Objects waiting for the next link.
    pub fn pending_objects(&self) -> Vec<PathBuf> {
        let mut objects: Vec<_> = self.pending.values().cloned().collect();
        objects.sort();
        objects
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.pool {
            Some(pool) => pool.spawn(job),
            None => rayon::spawn(job),
        }
    }

    fn handle_completion(&mut self, completion: Completion, events: &mut Vec<BuildEvent>) {
        match completion {
            Completion::Compiled { job, obj, outcome } => {
                // Only the latest job for a live unit touches the pending set
                if self.in_flight.get(&outcome.source) == Some(&job) {
                    self.in_flight.remove(&outcome.source);
                    if outcome.status == 0 {
                        self.pending.insert(outcome.source.clone(), obj);
                    } else {
                        self.pending.remove(&outcome.source);
                    }
                }
                events.push(BuildEvent::Compiled(outcome));
            }
            Completion::Linked(outcome) => {
                self.link_state = LinkState::Idle;
                if outcome.is_success() {
                    self.pending.retain(|_, obj| !outcome.objects.contains(obj));
                }
                events.push(BuildEvent::Linked(outcome));
            }
        }
    }

    fn start_link(&mut self, events: &mut Vec<BuildEvent>) {
        let objects = self.pending_objects();
        if objects.is_empty() {
            self.link_state = LinkState::Idle;
            events.push(BuildEvent::Linked(LinkOutcome {
                status: 1,
                library: PathBuf::new(),
                objects,
                output: "nothing to link".into(),
            }));
            return;
        }

        self.libraries_built += 1;
        let reload_dir = self.toolchain.reload_dir();
        let library = reload_dir.join(format!("lib_reload{}.so", self.libraries_built));
        let cmd = Cmd::new(&self.toolchain.linker)
            .args(shared_library_flags())
            .args(&self.toolchain.link_flags)
            .arg("-o")
            .arg(&library)
            .args(&objects);

        self.link_state = LinkState::Running;
        let tx = self.tx.clone();
        self.spawn(move || {
            let outcome = match fs::create_dir_all(&reload_dir) {
                Ok(()) => run_tool(cmd),
                Err(e) => (-1, format!("cannot create {}: {e}", reload_dir.display())),
            };
            let _ = tx.send(Completion::Linked(LinkOutcome {
                status: outcome.0,
                library,
                objects,
                output: outcome.1,
            }));
        });
    }
}

impl Compiler for ProcessCompiler {
    fn compile(&mut self, unit: &CompilationUnit) {
        self.next_job += 1;
        let job = self.next_job;
        self.in_flight.insert(unit.source_path.clone(), job);

        let cmd = Cmd::new(&unit.compiler)
            .args(&unit.flags)
            .args(["-MD", "-MF"])
            .arg(&unit.depfile_path)
            .arg("-c")
            .arg(&unit.source_path)
            .arg("-o")
            .arg(&unit.obj_path)
            .cwd(&unit.working_dir);
        let source = unit.source_path.clone();
        let obj = unit.obj_path.clone();

        let tx = self.tx.clone();
        self.spawn(move || {
            let (status, output) = run_tool(cmd);
            let _ = tx.send(Completion::Compiled {
                job,
                obj,
                outcome: CompileOutcome {
                    source,
                    status,
                    output,
                },
            });
        });
    }

    fn remove(&mut self, source: &Path) {
        self.in_flight.remove(source);
        self.pending.remove(source);
    }

    fn link(&mut self) {
        if self.link_state == LinkState::Idle {
            self.link_state = LinkState::Requested;
        }
    }

    fn is_linking(&self) -> bool {
        self.link_state != LinkState::Idle
    }

    fn poll(&mut self) -> Vec<BuildEvent> {
        let mut events = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            self.handle_completion(completion, &mut events);
        }
        if self.link_state == LinkState::Requested && self.in_flight.is_empty() {
            self.start_link(&mut events);
        }
        events
    }
}

/// Status and diagnostics of a tool run; spawn failures become status -1.
fn run_tool(cmd: Cmd) -> (i32, String) {
    let line = cmd.display();
    match cmd.output() {
        Ok(output) => (exit_code(&output), combined_output(&output)),
        Err(e) => (-1, format!("{e:#}\n  while running: {line}")),
    }
}

fn shared_library_flags() -> &'static [&'static str] {
    if cfg!(target_os = "macos") {
        &["-dynamiclib", "-undefined", "dynamic_lookup"]
    } else {
        &["-shared"]
    }
}
