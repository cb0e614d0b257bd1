//! Local variable extraction for one routine.
//!
//! Parameters come first, in declared order, then every name the body
//! assigns that is neither already local nor a known global. A name that
//! is global and not declared by the routine stays a reference to the
//! global, even when the routine assigns it.
//!
//! Once the mapping is complete every name the body reads is checked
//! against it and the globals, so an unresolved name is reported before
//! any code is generated.

use crate::error::{CompileError, CompileResult};
use crate::model::{Role, ScopeMapping, VarDescriptor, VarKind};
use crate::processor::ast::{Expr, FunctionDef, Stmt, StmtKind};
use crate::processor::globals::infer_kind;

pub fn extract_locals(def: &FunctionDef, globals: &ScopeMapping) -> CompileResult<ScopeMapping> {
    let mut locals = ScopeMapping::new();

    for param in &def.params {
        let kind = param
            .annotation
            .as_deref()
            .and_then(VarKind::from_annotation)
            .unwrap_or(VarKind::Integer);
        locals.insert(VarDescriptor {
            name: param.name.clone(),
            kind,
            role: Role::Parameter,
        });
    }

    let mut walker = LocalWalker {
        routine: &def.name,
        globals,
        locals,
    };
    walker.collect(&def.body)?;
    walker.check_block(&def.body)?;

    Ok(walker.locals)
}

struct LocalWalker<'a> {
    routine: &'a str,
    globals: &'a ScopeMapping,
    locals: ScopeMapping,
}

impl LocalWalker<'_> {
    fn collect(&mut self, body: &[Stmt]) -> CompileResult<()> {
        for stmt in body {
            match &stmt.kind {
                StmtKind::Assign { targets, value } => {
                    for target in targets {
                        if let Expr::Name { id } = target {
                            self.declare(id, infer_kind(value));
                        }
                    }
                }
                StmtKind::If { body, orelse, .. } => {
                    self.collect(body)?;
                    self.collect(orelse)?;
                }
                StmtKind::While { body, .. } => self.collect(body)?,
                StmtKind::FunctionDef(inner) => {
                    return Err(CompileError::Unsupported {
                        construct: format!("nested routine `{}`", inner.name),
                        routine: Some(self.routine.to_string()),
                        line: stmt.line,
                    });
                }
                StmtKind::AugAssign { .. }
                | StmtKind::Return { .. }
                | StmtKind::Expr { .. }
                | StmtKind::Pass
                | StmtKind::Unsupported { .. } => {}
            }
        }
        Ok(())
    }

    fn declare(&mut self, name: &str, kind: VarKind) {
        if self.locals.contains(name) || self.globals.contains(name) {
            return;
        }
        self.locals.insert(VarDescriptor {
            name: name.to_string(),
            kind,
            role: Role::Local,
        });
    }

    fn check_block(&self, body: &[Stmt]) -> CompileResult<()> {
        for stmt in body {
            match &stmt.kind {
                StmtKind::Assign { value, .. } => self.check_expr(value, stmt.line)?,
                StmtKind::AugAssign { target, value, .. } => {
                    self.check_expr(target, stmt.line)?;
                    self.check_expr(value, stmt.line)?;
                }
                StmtKind::If { test, body, orelse } => {
                    self.check_expr(test, stmt.line)?;
                    self.check_block(body)?;
                    self.check_block(orelse)?;
                }
                StmtKind::While { test, body } => {
                    self.check_expr(test, stmt.line)?;
                    self.check_block(body)?;
                }
                StmtKind::Return { value: Some(value) } | StmtKind::Expr { value } => {
                    self.check_expr(value, stmt.line)?
                }
                StmtKind::Return { value: None }
                | StmtKind::FunctionDef(_)
                | StmtKind::Pass
                | StmtKind::Unsupported { .. } => {}
            }
        }
        Ok(())
    }

    fn check_expr(&self, expr: &Expr, line: u32) -> CompileResult<()> {
        match expr {
            Expr::Name { id } => {
                if self.locals.contains(id) || self.globals.contains(id) {
                    Ok(())
                } else {
                    Err(CompileError::UnresolvedName {
                        name: id.clone(),
                        routine: Some(self.routine.to_string()),
                        line,
                    })
                }
            }
            Expr::BinOp { left, right, .. } => {
                self.check_expr(left, line)?;
                self.check_expr(right, line)
            }
            Expr::UnaryOp { operand, .. } => self.check_expr(operand, line),
            Expr::Call { args, .. } => args.iter().try_for_each(|a| self.check_expr(a, line)),
            Expr::Literal { .. } | Expr::Unsupported { .. } => Ok(()),
        }
    }
}
