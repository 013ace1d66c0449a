//! Reload pipeline: what happens to a freshly loaded library.
//!
//! Steps run in registration order with exclusive access to the context.
//! Patching old code to jump into new code would be one more step.

mod report;

pub use report::SymbolsReportStep;

use crate::emit;
use crate::live::LiveContext;
use crate::program::Program;

/// One stage of a reload.
pub trait ReloadStep: Send {
    fn name(&self) -> &str;

    /// Apply `program` (not yet in `ctx.programs`) to the running process.
    fn apply(&mut self, ctx: &mut LiveContext, program: &Program);
}

/// Ordered list of [`ReloadStep`]s.
#[derive(Default)]
pub struct ReloadPipeline {
    steps: Vec<Box<dyn ReloadStep>>,
}

impl ReloadPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline used when the host doesn't provide one.
    pub fn standard() -> Self {
        Self::new().with_step(SymbolsReportStep)
    }

    pub fn with_step(mut self, step: impl ReloadStep + 'static) -> Self {
        self.add_step(Box::new(step));
        self
    }

    pub fn add_step(&mut self, step: Box<dyn ReloadStep>) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn reload(&mut self, ctx: &mut LiveContext, program: &Program) {
        for step in &mut self.steps {
            emit!(ctx.events, Debug, "Reload step: {}", step.name());
            step.apply(ctx, program);
        }
    }
}
