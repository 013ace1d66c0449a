//! Compiling units and linking reload libraries.
//!
//! Builds run off the consumer thread. Their results come back as
//! [`BuildEvent`]s from [`Compiler::poll`], which `Live::update` calls once
//! per tick and dispatches with full access to the context.

mod process;

pub use process::ProcessCompiler;

use std::path::{Path, PathBuf};

use crate::unit::CompilationUnit;

/// Result of one compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutcome {
    pub source: PathBuf,
    pub status: i32,
    /// Compiler diagnostics.
    pub output: String,
}

/// Result of one link request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    pub status: i32,
    pub library: PathBuf,
    /// Objects linked into `library`. Empty when there was nothing to link.
    pub objects: Vec<PathBuf>,
    pub output: String,
}

impl LinkOutcome {
    pub const fn is_success(&self) -> bool {
        self.status == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    Compiled(CompileOutcome),
    Linked(LinkOutcome),
}

/// Compiler and linker driver.
pub trait Compiler: Send {
    /// Start compiling a unit. A newer request for the same source supersedes
    /// an older one still running.
    fn compile(&mut self, unit: &CompilationUnit);

    /// Forget a unit: drop its pending object and ignore running compiles.
    fn remove(&mut self, source: &Path);

    /// Request a link of every object compiled since the last link.
    ///
    /// Exactly one [`BuildEvent::Linked`] answers each request.
    fn link(&mut self);

    /// A link was requested and its outcome not yet returned by `poll`.
    fn is_linking(&self) -> bool;

    /// Collect finished work.
    fn poll(&mut self) -> Vec<BuildEvent>;
}
