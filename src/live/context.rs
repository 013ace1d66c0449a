use std::path::PathBuf;
use std::sync::Arc;

use crate::config::LiveConfig;
use crate::dependency::{DependencyGraph, DependencyResolver};
use crate::event::EventQueue;
use crate::program::{DynamicLoader, Program, ProgramInfoLoader, SymbolIndex};
use crate::unit::{CompilationUnitParser, UnitRegistry};

/// Collaborators used while holding the context.
pub struct Collaborators {
    pub units: Box<dyn CompilationUnitParser>,
    pub dependencies: Box<dyn DependencyResolver>,
    pub programs: Box<dyn ProgramInfoLoader>,
    pub loader: Box<dyn DynamicLoader>,
}

/// Everything the orchestrator knows about the running program.
///
/// Built on the initializer thread, then owned by [`Live`](super::Live).
pub struct LiveContext {
    pub config: LiveConfig,
    pub events: Arc<EventQueue>,
    pub units: UnitRegistry,
    pub graph: DependencyGraph,
    /// Exported symbol name → defining object.
    pub exported: SymbolIndex,
    /// Host program first, then every loaded reload library.
    pub programs: Vec<Program>,
    pub dirs_to_monitor: Vec<PathBuf>,
    pub collaborators: Collaborators,
}

impl LiveContext {
    pub fn new(config: LiveConfig, events: Arc<EventQueue>, collaborators: Collaborators) -> Self {
        Self {
            config,
            events,
            units: UnitRegistry::new(),
            graph: DependencyGraph::new(),
            exported: SymbolIndex::new(),
            programs: Vec::new(),
            dirs_to_monitor: Vec::new(),
            collaborators,
        }
    }
}
