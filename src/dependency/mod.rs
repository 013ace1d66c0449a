//! Dependency tracking for selective recompilation.
//!
//! - `DependencyGraph`: pure data structure with forward/reverse mappings
//! - `DependencyResolver`: where a unit's dependency list comes from
//! - `depfile`: the default resolver, reading compiler-written depfiles

mod depfile;

pub use depfile::DepfileResolver;

use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};

use crate::core::ToolError;
use crate::unit::CompilationUnit;

pub type PathSet = FxHashSet<PathBuf>;
type PathSetMap = FxHashMap<PathBuf, PathSet>;

/// Produces the files a unit's build depends on.
pub trait DependencyResolver: Send {
    fn dependencies(&self, unit: &CompilationUnit) -> Result<Vec<PathBuf>, ToolError>;
}

// =============================================================================
// Data Structure
// =============================================================================

/// Bidirectional dependency graph between units and files.
///
/// Maintains both forward (unit → files) and reverse (file → units) mappings
/// for efficient lookups in either direction.
///
/// # Invariants
/// - Reverse is the exact transpose of forward
/// - No empty reverse entries
/// - Self edges are kept: a unit lists its own source, so editing the source
///   finds the unit through `used_by`
///
/// Callers pass normalized paths; the graph doesn't touch the filesystem.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    forward: PathSetMap,
    reverse: PathSetMap,
}

impl DependencyGraph {
    /// Create an empty dependency graph.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record dependencies for a unit.
    ///
    /// Replaces any existing dependencies for this unit.
    pub fn record<I>(&mut self, unit: &Path, files: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        // Remove old mappings first (maintains invariant)
        self.remove(unit);

        let deps: PathSet = files.into_iter().collect();
        for dep in &deps {
            self.reverse
                .entry(dep.clone())
                .or_default()
                .insert(unit.to_path_buf());
        }
        self.forward.insert(unit.to_path_buf(), deps);
    }

    /// Forget a unit and clean up its reverse mappings.
    pub fn remove(&mut self, unit: &Path) {
        let Some(old_deps) = self.forward.remove(unit) else {
            return;
        };

        for dep in old_deps {
            if let Some(dependents) = self.reverse.get_mut(&dep) {
                dependents.remove(unit);
                if dependents.is_empty() {
                    self.reverse.remove(&dep);
                }
            }
        }
    }

    /// Units that depend on the given file.
    #[inline]
    pub fn used_by(&self, file: &Path) -> Option<&PathSet> {
        self.reverse.get(file)
    }

    /// Files a unit depends on.
    #[inline]
    pub fn uses(&self, unit: &Path) -> Option<&PathSet> {
        self.forward.get(unit)
    }

    /// Number of tracked units.
    #[inline]
    pub fn unit_count(&self) -> usize {
        self.forward.len()
    }

    /// Number of tracked files (for debugging).
    #[inline]
    pub fn reverse_count(&self) -> usize {
        self.reverse.len()
    }

    /// Forward map, sorted, for display.
    pub fn sorted_forward(&self) -> Vec<(&Path, Vec<&Path>)> {
        sorted(&self.forward)
    }

    /// Reverse map, sorted, for display.
    pub fn sorted_reverse(&self) -> Vec<(&Path, Vec<&Path>)> {
        sorted(&self.reverse)
    }

    /// Check that reverse is the exact transpose of forward.
    #[cfg(test)]
    pub fn is_consistent(&self) -> bool {
        let mut transposed = PathSetMap::default();
        for (unit, deps) in &self.forward {
            for dep in deps {
                transposed
                    .entry(dep.clone())
                    .or_default()
                    .insert(unit.clone());
            }
        }
        transposed == self.reverse
    }
}

fn sorted(map: &PathSetMap) -> Vec<(&Path, Vec<&Path>)> {
    let mut entries: Vec<_> = map
        .iter()
        .map(|(key, set)| {
            let mut values: Vec<&Path> = set.iter().map(PathBuf::as_path).collect();
            values.sort();
            (key.as_path(), values)
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

// =============================================================================
// Tests
// =============================================================================
