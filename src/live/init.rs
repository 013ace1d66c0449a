//! One-time bootstrap, run on the `livelink-init` thread.
//!
//! Phases run in order; each one logs its failures and lets the next run.

use super::LiveContext;
use super::reconcile::update_dependencies;
use crate::emit;
use crate::program::Program;
use crate::utils::plural::plural_count;
use crate::watch::WatchLifecycle;

/// Initializer output handed to the update loop through the join handle.
pub(super) struct Bootstrap {
    pub(super) context: LiveContext,
    pub(super) watch: WatchLifecycle,
}

pub(super) fn run(mut context: LiveContext, mut watch: WatchLifecycle) -> Bootstrap {
    load_compilation_units(&mut context);

    watch.start(&mut context);
    emit!(context.events, Info, "Setup file watcher: done");

    load_symbols(&mut context);
    load_exported_symbols(&mut context);
    load_dependencies(&mut context);

    Bootstrap { context, watch }
}

fn load_compilation_units(ctx: &mut LiveContext) {
    match ctx.collaborators.units.parse_units() {
        Ok(units) if units.is_empty() => {
            emit!(ctx.events, Error, "No compilation units found");
        }
        Ok(units) => {
            for unit in units {
                ctx.units.insert(unit);
            }
            emit!(
                ctx.events,
                Info,
                "Loading compilation units: done, {}",
                plural_count(ctx.units.len(), "unit")
            );
        }
        Err(e) => emit!(ctx.events, Error, "Cannot load compilation units: {}", e.chain()),
    }
}

fn load_symbols(ctx: &mut LiveContext) {
    let programs = &ctx.collaborators.programs;
    for path in programs.loaded_programs() {
        match programs.program_symbols(&path) {
            Ok(symbols) if symbols.is_empty() => {
                emit!(ctx.events, Debug, "No symbols in {}, skipping", path.display());
            }
            Ok(symbols) => {
                emit!(
                    ctx.events,
                    Debug,
                    "{}: {} functions, {} variables",
                    path.display(),
                    symbols.functions.len(),
                    symbols.variables.len()
                );
                ctx.programs.push(Program {
                    path,
                    symbols,
                    obj_paths: Vec::new(),
                });
            }
            Err(e) => emit!(ctx.events, Error, "Cannot read symbols: {}", e.chain()),
        }
    }
    emit!(
        ctx.events,
        Info,
        "Loading symbols: done, {}",
        plural_count(ctx.programs.len(), "program")
    );
}

fn load_exported_symbols(ctx: &mut LiveContext) {
    for unit in ctx.units.iter() {
        match ctx.collaborators.programs.exported_symbols(&unit.obj_path) {
            Ok(names) => ctx.exported.merge(&unit.obj_path, names),
            Err(e) => emit!(
                ctx.events,
                Debug,
                "No exported symbols for {}: {}",
                unit.obj_path.display(),
                e.chain()
            ),
        }
    }
    emit!(
        ctx.events,
        Info,
        "Loading exported symbols: done, {}",
        plural_count(ctx.exported.len(), "symbol")
    );
}

fn load_dependencies(ctx: &mut LiveContext) {
    for source in ctx.units.sources() {
        update_dependencies(ctx, &source);
    }
    emit!(
        ctx.events,
        Info,
        "Loading dependencies: done, {} tracked",
        plural_count(ctx.graph.reverse_count(), "file")
    );
}
