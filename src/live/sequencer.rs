//! Link → load → symbols → pipeline, as one reload.
//!
//! ```text
//! try_reload ──> Compiler::link ··· poll ──> Linked ──> on_linked
//!                                                 pre-load
//!                                                 open library
//!                                                 read symbols
//!                                                 reload pipeline
//!                                                 post-load
//! ```

use super::{LiveContext, LiveListener};
use crate::build::LinkOutcome;
use crate::emit;
use crate::event::EventQueue;
use crate::program::{Program, Symbols};
use crate::reload::ReloadPipeline;

/// Forward queued log records so they reach the listener before a hook.
pub(super) fn flush_logs(events: &EventQueue, listener: &mut dyn LiveListener) {
    while let Some(record) = events.pop_log() {
        listener.on_log(record.severity, &record.message);
    }
}

/// Finish a reload once its link completed.
pub(super) fn on_linked(
    ctx: &mut LiveContext,
    pipeline: &mut ReloadPipeline,
    listener: &mut dyn LiveListener,
    outcome: LinkOutcome,
) {
    flush_logs(&ctx.events, listener);
    listener.on_code_pre_load();

    if let Some(program) = load(ctx, pipeline, outcome) {
        ctx.programs.push(program);
        emit!(ctx.events, Info, "Code reloaded");
    }

    flush_logs(&ctx.events, listener);
    listener.on_code_post_load();
}

/// Open the library and apply it. `None` leaves the previous code in charge.
fn load(
    ctx: &mut LiveContext,
    pipeline: &mut ReloadPipeline,
    outcome: LinkOutcome,
) -> Option<Program> {
    if !outcome.is_success() {
        if outcome.objects.is_empty() {
            emit!(ctx.events, Warning, "Nothing to reload");
        } else {
            emit!(
                ctx.events,
                Error,
                "Failed to link {} (exit code {}):\n{}",
                outcome.library.display(),
                outcome.status,
                outcome.output
            );
        }
        return None;
    }

    let library = outcome.library;
    emit!(ctx.events, Debug, "Opening {}", library.display());
    if let Err(e) = ctx.collaborators.loader.open(&library) {
        emit!(ctx.events, Error, "Cannot open library {}: {}", library.display(), e.chain());
        return None;
    }
    emit!(ctx.events, Debug, "Library opened successfully");

    let symbols = match ctx.collaborators.programs.program_symbols(&library) {
        Ok(symbols) => symbols,
        Err(e) => {
            emit!(ctx.events, Error, "Cannot read symbols of {}: {}", library.display(), e.chain());
            Symbols::default()
        }
    };

    for object in &outcome.objects {
        match ctx.collaborators.programs.exported_symbols(object) {
            Ok(names) => ctx.exported.merge(object, names),
            Err(e) => emit!(
                ctx.events,
                Warning,
                "Cannot read exported symbols of {}: {}",
                object.display(),
                e.chain()
            ),
        }
    }

    let program = Program {
        path: library,
        symbols,
        obj_paths: outcome.objects,
    };
    pipeline.reload(ctx, &program);
    Some(program)
}
