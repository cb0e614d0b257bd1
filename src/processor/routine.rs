//! Routine code generator.
//!
//! A name is looked up in the routine's own frame first and only then in
//! the static segment; that order is the whole scoping rule.

use tracing::debug;

use crate::error::CompileResult;
use crate::model::{Instruction, MemoryLocation};
use crate::processor::ast::FunctionDef;
use crate::processor::codegen::{CallTable, CodeGen, Emitters, NameScope};
use crate::processor::memory::{FrameLayout, StaticLayout};

pub struct RoutineScope<'a> {
    frame: &'a FrameLayout,
    globals: &'a StaticLayout,
}

impl NameScope for RoutineScope<'_> {
    fn resolve(&self, name: &str) -> Option<&MemoryLocation> {
        self.frame
            .resolve(name)
            .or_else(|| self.globals.resolve(name))
    }

    fn routine(&self) -> Option<&str> {
        Some(self.frame.routine.as_str())
    }

    fn return_target(&self) -> Option<(&MemoryLocation, &str)> {
        Some((&self.frame.return_slot, self.frame.exit_label.as_str()))
    }
}

pub fn generate_routine(
    def: &FunctionDef,
    frame: &FrameLayout,
    globals: &StaticLayout,
    calls: &CallTable<'_>,
    out: Emitters<'_>,
) -> CompileResult<Vec<Instruction>> {
    let mut cg = CodeGen::new(RoutineScope { frame, globals }, calls, out);
    cg.block(&def.body)?;
    let code = cg.finalize();
    debug!(routine = %def.name, instructions = code.len(), "routine generated");
    Ok(code)
}
