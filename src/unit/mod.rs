//! Compilation units and the registry that owns them.
//!
//! A unit is one source file plus everything needed to rebuild its object:
//! compiler, flags, working directory and the depfile the compiler writes.

mod compile_commands;

pub use compile_commands::CompileCommandsParser;

use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

use crate::core::ToolError;

/// One translation unit, keyed by its source path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    pub source_path: PathBuf,
    pub obj_path: PathBuf,
    pub compiler: String,
    /// Flags without `-c`, `-o`, the source itself and depfile options.
    pub flags: Vec<String>,
    pub working_dir: PathBuf,
    pub depfile_path: PathBuf,
}

/// Result of re-reading build metadata after a change.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UnitsDelta {
    pub added: Vec<CompilationUnit>,
    pub modified: Vec<CompilationUnit>,
    /// Source paths of units that no longer exist.
    pub removed: Vec<PathBuf>,
}

impl UnitsDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }
}

/// Source of compilation units (a compilation database, a build system...).
pub trait CompilationUnitParser: Send {
    /// Read every unit from the build metadata.
    fn parse_units(&mut self) -> Result<Vec<CompilationUnit>, ToolError>;

    /// React to a changed file.
    ///
    /// Returns an empty delta when `changed` is not build metadata this
    /// parser knows about.
    fn update_units(&mut self, changed: &Path) -> Result<UnitsDelta, ToolError>;
}

// ============================================================================
// Registry
// ============================================================================

/// Known compilation units keyed by source path.
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: FxHashMap<PathBuf, CompilationUnit>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a unit.
    pub fn insert(&mut self, unit: CompilationUnit) {
        self.units.insert(unit.source_path.clone(), unit);
    }

    pub fn get(&self, source: &Path) -> Option<&CompilationUnit> {
        self.units.get(source)
    }

    pub fn remove(&mut self, source: &Path) -> Option<CompilationUnit> {
        self.units.remove(source)
    }

    pub fn contains(&self, source: &Path) -> bool {
        self.units.contains_key(source)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompilationUnit> {
        self.units.values()
    }

    /// Source paths in sorted order.
    pub fn sources(&self) -> Vec<PathBuf> {
        let mut sources: Vec<_> = self.units.keys().cloned().collect();
        sources.sort();
        sources
    }
}

impl FromIterator<CompilationUnit> for UnitRegistry {
    fn from_iter<I: IntoIterator<Item = CompilationUnit>>(iter: I) -> Self {
        let mut registry = Self::new();
        for unit in iter {
            registry.insert(unit);
        }
        registry
    }
}

/// Build a unit for `source` with conventional paths (tests only).
#[cfg(test)]
pub fn test_unit(source: &str) -> CompilationUnit {
    let source_path = PathBuf::from(source);
    let obj_path = source_path.with_extension("o");
    CompilationUnit {
        depfile_path: compile_commands::default_depfile(&obj_path),
        obj_path,
        source_path: source_path.clone(),
        compiler: "c++".into(),
        flags: vec!["-fPIC".into()],
        working_dir: source_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    }
}
