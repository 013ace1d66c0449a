//! Keeping units, graph and compiler in step with the filesystem.

use std::path::{Path, PathBuf};

use super::LiveContext;
use crate::build::{CompileOutcome, Compiler};
use crate::emit;
use crate::watch::WatchLifecycle;

/// Re-resolve a unit's dependencies and replace its edges.
///
/// Units missing from the registry (removed while compiling) are skipped.
pub(super) fn update_dependencies(ctx: &mut LiveContext, source: &Path) {
    let Some(unit) = ctx.units.get(source) else {
        emit!(
            ctx.events,
            Debug,
            "Skipping dependencies of unknown unit {}",
            source.display()
        );
        return;
    };

    match ctx.collaborators.dependencies.dependencies(unit) {
        Ok(deps) => ctx.graph.record(source, deps),
        Err(e) => emit!(
            ctx.events,
            Error,
            "Cannot resolve dependencies of {}: {}",
            source.display(),
            e.chain()
        ),
    }
}

/// Compile completion: report, then refresh the unit's dependencies.
pub(super) fn on_compiled(ctx: &mut LiveContext, outcome: CompileOutcome) {
    let source = outcome.source.display();
    if outcome.status != 0 {
        emit!(
            ctx.events,
            Error,
            "Failed to compile {source} (exit code {}):\n{}",
            outcome.status,
            outcome.output
        );
    } else if outcome.output.is_empty() {
        emit!(ctx.events, Info, "Compiled {source}");
    } else {
        emit!(ctx.events, Warning, "Compiled {source}:\n{}", outcome.output);
    }
    update_dependencies(ctx, &outcome.source);
}

/// React to one changed file.
pub(super) fn on_file_changed(
    ctx: &mut LiveContext,
    compiler: &mut dyn Compiler,
    watch: &mut WatchLifecycle,
    path: &Path,
) {
    if let Some(dependents) = ctx.graph.used_by(path) {
        let mut dependents: Vec<PathBuf> = dependents.iter().cloned().collect();
        dependents.sort();

        emit!(ctx.events, Debug, "{} changed", path.display());
        for source in dependents {
            match ctx.units.get(&source) {
                Some(unit) => compiler.compile(unit),
                None => emit!(
                    ctx.events,
                    Error,
                    "Cannot find compilation unit {} depending on {}",
                    source.display(),
                    path.display()
                ),
            }
        }
        return;
    }

    let delta = match ctx.collaborators.units.update_units(path) {
        Ok(delta) => delta,
        Err(e) => {
            emit!(ctx.events, Error, "Cannot update compilation units: {}", e.chain());
            return;
        }
    };
    if delta.is_empty() {
        return;
    }

    emit!(
        ctx.events,
        Info,
        "Compilation units changed: {} added, {} modified, {} removed",
        delta.added.len(),
        delta.modified.len(),
        delta.removed.len()
    );

    for unit in delta.added.into_iter().chain(delta.modified) {
        compiler.compile(&unit);
        ctx.units.insert(unit);
    }
    for source in &delta.removed {
        compiler.remove(source);
        ctx.graph.remove(source);
        ctx.units.remove(source);
    }

    watch.schedule_recreate();
}
