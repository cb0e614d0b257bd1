//! Global variable extraction: every name assigned at module scope.
//!
//! Routine bodies are not entered. Compound statements at module level
//! (`if`, `while`) are, since their assignments still bind globals.

use crate::model::{Role, ScopeMapping, VarDescriptor, VarKind};
use crate::processor::ast::{Expr, Module, Stmt, StmtKind, UnaryOp};

pub fn extract_globals(module: &Module) -> ScopeMapping {
    let mut globals = ScopeMapping::new();
    visit_block(&module.body, &mut globals);
    globals
}

fn visit_block(body: &[Stmt], globals: &mut ScopeMapping) {
    for stmt in body {
        match &stmt.kind {
            StmtKind::Assign { targets, value } => {
                for target in targets {
                    if let Expr::Name { id } = target {
                        globals.insert(VarDescriptor {
                            name: id.clone(),
                            kind: infer_kind(value),
                            role: Role::Global,
                        });
                    }
                }
            }
            StmtKind::If { body, orelse, .. } => {
                visit_block(body, globals);
                visit_block(orelse, globals);
            }
            StmtKind::While { body, .. } => visit_block(body, globals),
            // `x += e` reads x first, so it never introduces a name.
            StmtKind::AugAssign { .. }
            | StmtKind::FunctionDef(_)
            | StmtKind::Return { .. }
            | StmtKind::Expr { .. }
            | StmtKind::Pass
            | StmtKind::Unsupported { .. } => {}
        }
    }
}

/// Kind from the literal shape of the first assigned value; integer
/// otherwise.
pub(crate) fn infer_kind(value: &Expr) -> VarKind {
    match value {
        Expr::Literal { value } => VarKind::of_literal(value),
        Expr::UnaryOp {
            op: UnaryOp::Neg,
            operand,
        } => match operand.as_ref() {
            Expr::Literal { value } => VarKind::of_literal(value),
            _ => VarKind::Integer,
        },
        _ => VarKind::Integer,
    }
}
