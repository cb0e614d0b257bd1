//! The functional core: scoping, layout and code generation.
//!
//! Phase order is fixed: globals, static segment, every routine's locals
//! and frame, then the top level, then each routine in source order.
pub mod ast;
pub mod codegen;
pub mod entry;
pub mod globals;
pub mod labels;
pub mod locals;
pub mod memory;
pub mod routine;
pub mod top_level;

use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::{CompileError, CompileResult};
use crate::model::{Block, CompiledProgram};
use ast::Module;
use codegen::{CallTable, Emitters};
use labels::LabelGen;
use memory::{ENTRY_LABEL, FrameLayout, StringPool};

/// Compiles `module` with a fresh label counter.
pub fn run(module: &Module, source: &str) -> CompileResult<CompiledProgram> {
    compile_with(module, source, &mut LabelGen::new())
}

/// Compiles `module`, drawing generated labels from `labels`.
pub fn compile_with(
    module: &Module,
    source: &str,
    labels: &mut LabelGen,
) -> CompileResult<CompiledProgram> {
    // 1. ── Globals ────────────────────────────────────────────────────
    let global_scope = globals::extract_globals(module);
    info!(globals = global_scope.len(), "globals extracted");

    // 2. ── Static segment ─────────────────────────────────────────────
    let static_layout = memory::allocate_static(&global_scope);
    if static_layout.contains(ENTRY_LABEL) {
        return Err(CompileError::LabelClash {
            name: ENTRY_LABEL.to_string(),
            line: first_assignment_line(module, ENTRY_LABEL),
        });
    }

    // 3. ── Locals and frames, all before any code ─────────────────────
    let mut seen = HashSet::new();
    let mut frames: Vec<FrameLayout> = Vec::new();
    for (def, line) in module.routines() {
        if !seen.insert(def.name.as_str()) {
            return Err(CompileError::DuplicateRoutine {
                name: def.name.clone(),
                line,
            });
        }
        if def.name == ENTRY_LABEL || static_layout.contains(&def.name) {
            return Err(CompileError::LabelClash {
                name: def.name.clone(),
                line,
            });
        }
        let local_scope = locals::extract_locals(def, &global_scope)?;
        let frame = memory::allocate_frame(&def.name, &local_scope);
        debug!(routine = %def.name, slots = frame.size, "frame laid out");
        frames.push(frame);
    }
    let calls = CallTable::new(&frames);
    let mut strings = StringPool::new();

    // 4. ── Top level ──────────────────────────────────────────────────
    let top_code = top_level::generate_top_level(
        module,
        &static_layout,
        &calls,
        Emitters {
            labels: &mut *labels,
            strings: &mut strings,
        },
    )?;
    let top_level = entry::program_entry(top_code);

    // 5. ── Routines, source order ─────────────────────────────────────
    let mut routines = Vec::with_capacity(frames.len());
    for ((def, _), frame) in module.routines().zip(&frames) {
        let code = routine::generate_routine(
            def,
            frame,
            &static_layout,
            &calls,
            Emitters {
                labels: &mut *labels,
                strings: &mut strings,
            },
        )?;
        routines.push(entry::routine_entry(frame, code));
    }

    info!(
        routines = routines.len(),
        strings = !strings.is_empty(),
        "compilation finished"
    );

    Ok(CompiledProgram {
        source: source.to_string(),
        data: Block {
            title: "static data".to_string(),
            code: static_layout.declarations.clone(),
        },
        strings: (!strings.is_empty()).then(|| Block {
            title: "string constants".to_string(),
            code: strings.declarations(),
        }),
        routines,
        top_level,
    })
}

fn first_assignment_line(module: &Module, name: &str) -> u32 {
    module
        .body
        .iter()
        .find(|s| match &s.kind {
            ast::StmtKind::Assign { targets, .. } => targets
                .iter()
                .any(|t| matches!(t, ast::Expr::Name { id } if id == name)),
            _ => false,
        })
        .map(|s| s.line)
        .unwrap_or_default()
}
