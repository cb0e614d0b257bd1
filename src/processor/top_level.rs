//! Top-level code generator: the module body minus routine definitions.
//! Every name resolves in the static segment.

use tracing::debug;

use crate::error::CompileResult;
use crate::model::{Instruction, MemoryLocation};
use crate::processor::ast::{Module, StmtKind};
use crate::processor::codegen::{CallTable, CodeGen, Emitters, NameScope};
use crate::processor::memory::StaticLayout;

pub struct TopLevelScope<'a> {
    globals: &'a StaticLayout,
}

impl NameScope for TopLevelScope<'_> {
    fn resolve(&self, name: &str) -> Option<&MemoryLocation> {
        self.globals.resolve(name)
    }

    fn routine(&self) -> Option<&str> {
        None
    }

    fn return_target(&self) -> Option<(&MemoryLocation, &str)> {
        None
    }
}

pub fn generate_top_level(
    module: &Module,
    globals: &StaticLayout,
    calls: &CallTable<'_>,
    out: Emitters<'_>,
) -> CompileResult<Vec<Instruction>> {
    let mut cg = CodeGen::new(TopLevelScope { globals }, calls, out);
    for stmt in &module.body {
        if matches!(stmt.kind, StmtKind::FunctionDef(_)) {
            continue;
        }
        cg.stmt(stmt)?;
    }
    let code = cg.finalize();
    debug!(instructions = code.len(), "top level generated");
    Ok(code)
}
