//! Loaded programs and their symbol tables.
//!
//! A [`Program`] is a binary image mapped into the process: the host
//! executable or one of the reload libraries. Programs are appended to the
//! history and never change afterwards.

mod dylib;
mod nm;

pub use dylib::DlopenLoader;
pub use nm::NmProgramInfoLoader;

use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

use crate::core::ToolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub address: u64,
    pub size: u64,
}

impl Symbol {
    pub fn new(name: impl Into<String>, address: u64, size: u64) -> Self {
        Self {
            name: name.into(),
            address,
            size,
        }
    }
}

/// Symbol table of one program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Symbols {
    pub functions: Vec<Symbol>,
    pub variables: Vec<Symbol>,
}

impl Symbols {
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.variables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.functions.len() + self.variables.len()
    }
}

#[derive(Debug, Clone)]
pub struct Program {
    pub path: PathBuf,
    pub symbols: Symbols,
    /// Object files linked into this program (empty for the host).
    pub obj_paths: Vec<PathBuf>,
}

/// Exported symbol name → object file currently defining it.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    owners: FxHashMap<String, PathBuf>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every name as defined by `object`, overriding earlier owners.
    pub fn merge<I>(&mut self, object: &Path, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        for name in names {
            self.owners.insert(name, object.to_path_buf());
        }
    }

    pub fn owner(&self, name: &str) -> Option<&Path> {
        self.owners.get(name).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// Reads symbol information from binaries.
pub trait ProgramInfoLoader: Send {
    /// Programs already mapped into the process at startup.
    fn loaded_programs(&self) -> Vec<PathBuf>;

    /// Defined functions and variables of a program or library.
    fn program_symbols(&self, path: &Path) -> Result<Symbols, ToolError>;

    /// Names of the global symbols an object file defines.
    fn exported_symbols(&self, object: &Path) -> Result<Vec<String>, ToolError>;
}

/// Maps a shared library into the running process.
pub trait DynamicLoader: Send {
    /// Open `path` with its symbols visible to later loads.
    fn open(&mut self, path: &Path) -> Result<(), ToolError>;
}
