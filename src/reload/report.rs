use rustc_hash::FxHashSet;

use super::ReloadStep;
use crate::emit;
use crate::live::LiveContext;
use crate::program::{Program, Symbol};

/// Logs how much of the new library replaces code already loaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymbolsReportStep;

impl ReloadStep for SymbolsReportStep {
    fn name(&self) -> &str {
        "symbols report"
    }

    fn apply(&mut self, ctx: &mut LiveContext, program: &Program) {
        let mut functions = FxHashSet::default();
        let mut variables = FxHashSet::default();
        for loaded in &ctx.programs {
            functions.extend(loaded.symbols.functions.iter().map(|s| s.name.as_str()));
            variables.extend(loaded.symbols.variables.iter().map(|s| s.name.as_str()));
        }

        let name = program.path.file_name().unwrap_or(program.path.as_os_str());
        emit!(
            ctx.events,
            Info,
            "{}: {}/{} functions and {}/{} variables replace loaded code",
            name.to_string_lossy(),
            replaced(&program.symbols.functions, &functions),
            program.symbols.functions.len(),
            replaced(&program.symbols.variables, &variables),
            program.symbols.variables.len()
        );
    }
}

fn replaced(symbols: &[Symbol], known: &FxHashSet<&str>) -> usize {
    symbols
        .iter()
        .filter(|s| known.contains(s.name.as_str()))
        .count()
}
