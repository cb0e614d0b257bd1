//! Statement and expression lowering shared by the top-level and routine
//! generators.
//!
//! Every expression leaves exactly one word on the stack; statements leave
//! the stack as they found it. What differs between the two generators is
//! name lookup and what `return` means, both behind [`NameScope`].

use std::collections::HashMap;

use crate::error::{CompileError, CompileResult};
use crate::model::{Instruction, MemoryLocation, Opcode, Operand};
use crate::processor::ast::{BinaryOp, Expr, Literal, Stmt, StmtKind, UnaryOp};
use crate::processor::labels::LabelGen;
use crate::processor::memory::{FrameLayout, StringPool};

/// Name resolution rules of the body being generated.
pub trait NameScope {
    /// Storage for `name`, or `None` when it is unknown here.
    fn resolve(&self, name: &str) -> Option<&MemoryLocation>;

    /// Routine being generated, `None` at top level.
    fn routine(&self) -> Option<&str>;

    /// Return cell and epilogue label; `None` where `return` is not allowed.
    fn return_target(&self) -> Option<(&MemoryLocation, &str)>;
}

/// Call contracts of every routine, by name.
#[derive(Debug, Default)]
pub struct CallTable<'a> {
    routines: HashMap<&'a str, &'a FrameLayout>,
}

impl<'a> CallTable<'a> {
    pub fn new(frames: &'a [FrameLayout]) -> Self {
        Self {
            routines: frames.iter().map(|f| (f.routine.as_str(), f)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&'a FrameLayout> {
        self.routines.get(name).copied()
    }
}

/// Shared mutable state of one compilation that generators borrow.
pub struct Emitters<'a> {
    pub labels: &'a mut LabelGen,
    pub strings: &'a mut StringPool,
}

pub struct CodeGen<'a, S: NameScope> {
    scope: S,
    calls: &'a CallTable<'a>,
    out: Emitters<'a>,
    code: Vec<Instruction>,
    pending: Vec<String>,
    line: u32,
}

impl<'a, S: NameScope> CodeGen<'a, S> {
    pub fn new(scope: S, calls: &'a CallTable<'a>, out: Emitters<'a>) -> Self {
        Self {
            scope,
            calls,
            out,
            code: Vec::new(),
            pending: Vec::new(),
            line: 0,
        }
    }

    /// Closes the body. Labels placed after the last statement land on a
    /// `NOP` so they still mark an instruction.
    pub fn finalize(mut self) -> Vec<Instruction> {
        for label in std::mem::take(&mut self.pending) {
            self.code.push(Instruction::new(Opcode::Nop).labeled(label));
        }
        self.code
    }

    // ── emission helpers ──────────────────────────────────────────────

    fn emit(&mut self, mut instr: Instruction) {
        if let Some(first) = self.pending.pop() {
            for extra in std::mem::take(&mut self.pending) {
                self.code.push(Instruction::new(Opcode::Nop).labeled(extra));
            }
            instr.label = Some(first);
        }
        self.code.push(instr);
    }

    fn emit_op(&mut self, opcode: Opcode, operand: Operand) {
        self.emit(Instruction::with(opcode, operand));
    }

    /// Label the next emitted instruction.
    fn place(&mut self, label: String) {
        self.pending.push(label);
    }

    fn unsupported(&self, construct: impl Into<String>) -> CompileError {
        CompileError::Unsupported {
            construct: construct.into(),
            routine: self.scope.routine().map(str::to_string),
            line: self.line,
        }
    }

    fn lookup(&self, name: &str) -> CompileResult<MemoryLocation> {
        match self.scope.resolve(name) {
            Some(loc) => Ok(loc.clone()),
            None => Err(CompileError::UnresolvedName {
                name: name.to_string(),
                routine: self.scope.routine().map(str::to_string),
                line: self.line,
            }),
        }
    }

    fn store_target(&self, target: &Expr) -> CompileResult<MemoryLocation> {
        match target {
            Expr::Name { id } => self.lookup(id),
            other => Err(self.unsupported(format!("assignment to {}", other.construct()))),
        }
    }

    // ── statements ────────────────────────────────────────────────────

    pub fn block(&mut self, body: &[Stmt]) -> CompileResult<()> {
        for stmt in body {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    pub fn stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        self.line = stmt.line;
        match &stmt.kind {
            StmtKind::Assign { targets, value } => {
                let [target] = targets.as_slice() else {
                    return Err(self.unsupported("multiple assignment targets"));
                };
                let loc = self.store_target(target)?;
                self.expr(value)?;
                self.emit_op(Opcode::Pop, Operand::Mem(loc));
            }
            StmtKind::AugAssign { target, op, value } => {
                let loc = self.store_target(target)?;
                self.emit_op(Opcode::Push, Operand::Mem(loc.clone()));
                self.expr(value)?;
                self.emit(Instruction::new(binary_opcode(*op)));
                self.emit_op(Opcode::Pop, Operand::Mem(loc));
            }
            StmtKind::If { test, body, orelse } => {
                self.expr(test)?;
                if orelse.is_empty() {
                    let end = self.out.labels.fresh("endif");
                    self.emit_op(Opcode::Brf, Operand::Target(end.clone()));
                    self.block(body)?;
                    self.place(end);
                } else {
                    let else_label = self.out.labels.fresh("else");
                    let end = self.out.labels.fresh("endif");
                    self.emit_op(Opcode::Brf, Operand::Target(else_label.clone()));
                    self.block(body)?;
                    self.emit_op(Opcode::Br, Operand::Target(end.clone()));
                    self.place(else_label);
                    self.block(orelse)?;
                    self.place(end);
                }
            }
            StmtKind::While { test, body } => {
                let head = self.out.labels.fresh("while");
                let end = self.out.labels.fresh("endwhile");
                self.place(head.clone());
                self.expr(test)?;
                self.emit_op(Opcode::Brf, Operand::Target(end.clone()));
                self.block(body)?;
                self.emit_op(Opcode::Br, Operand::Target(head));
                self.place(end);
            }
            StmtKind::FunctionDef(def) => {
                // Module-level definitions are generated on their own; the
                // top-level walker never hands them over.
                return Err(self.unsupported(format!("nested routine `{}`", def.name)));
            }
            StmtKind::Return { value } => {
                let Some((slot, exit)) = self.scope.return_target() else {
                    return Err(self.unsupported("return outside routine"));
                };
                let (slot, exit) = (slot.clone(), exit.to_string());
                match value {
                    Some(value) => self.expr(value)?,
                    None => self.emit_op(Opcode::Push, Operand::Imm(0)),
                }
                self.emit_op(Opcode::Pop, Operand::Mem(slot));
                self.emit_op(Opcode::Br, Operand::Target(exit));
            }
            StmtKind::Expr { value } => match value {
                Expr::Call { func, args } => self.call(func, args, false)?,
                other => {
                    self.expr(other)?;
                    self.emit_op(Opcode::Addsp, Operand::Imm(1));
                }
            },
            StmtKind::Pass => {}
            StmtKind::Unsupported { construct } => return Err(self.unsupported(construct.clone())),
        }
        Ok(())
    }

    // ── expressions ───────────────────────────────────────────────────

    fn expr(&mut self, expr: &Expr) -> CompileResult<()> {
        match expr {
            Expr::Literal { value } => {
                let operand = match value {
                    Literal::Int(v) => Operand::Imm(*v),
                    Literal::Bool(b) => Operand::Imm(i64::from(*b)),
                    Literal::Real(v) => Operand::RealImm(*v),
                    Literal::Str(s) => Operand::Addr(self.out.strings.intern(s, self.out.labels)),
                };
                self.emit_op(Opcode::Push, operand);
            }
            Expr::Name { id } => {
                let loc = self.lookup(id)?;
                self.emit_op(Opcode::Push, Operand::Mem(loc));
            }
            Expr::BinOp { op, left, right } => {
                self.expr(left)?;
                self.expr(right)?;
                self.emit(Instruction::new(binary_opcode(*op)));
            }
            Expr::UnaryOp { op, operand } => {
                self.expr(operand)?;
                let opcode = match op {
                    UnaryOp::Neg => Opcode::Neg,
                    UnaryOp::Not => Opcode::Not,
                };
                self.emit(Instruction::new(opcode));
            }
            Expr::Call { func, args } => self.call(func, args, true)?,
            Expr::Unsupported { construct } => return Err(self.unsupported(construct.clone())),
        }
        Ok(())
    }

    /// Arguments in declared order, the call, argument cleanup and, when
    /// the value is used, a fetch of the callee's return cell.
    fn call(&mut self, func: &str, args: &[Expr], used: bool) -> CompileResult<()> {
        let Some(callee) = self.calls.get(func) else {
            return self.builtin(func, args, used);
        };

        if callee.arity() != args.len() {
            return Err(CompileError::ArityMismatch {
                callee: func.to_string(),
                expected: callee.arity(),
                found: args.len(),
                routine: self.scope.routine().map(str::to_string),
                line: self.line,
            });
        }

        for arg in args {
            self.expr(arg)?;
        }
        self.emit_op(Opcode::Call, Operand::Target(callee.routine.clone()));
        if !args.is_empty() {
            self.emit_op(Opcode::Addsp, Operand::Imm(args.len() as i64));
        }
        if used {
            self.emit_op(Opcode::Push, Operand::Mem(callee.return_slot.clone()));
        }
        Ok(())
    }

    fn builtin(&mut self, func: &str, args: &[Expr], used: bool) -> CompileResult<()> {
        match (func, args) {
            ("print", [arg]) if !used => {
                self.expr(arg)?;
                self.emit(Instruction::new(Opcode::Deco));
            }
            ("input", []) => {
                self.emit(Instruction::new(Opcode::Deci));
                if !used {
                    self.emit_op(Opcode::Addsp, Operand::Imm(1));
                }
            }
            ("print", _) | ("input", _) => {
                return Err(self.unsupported(format!("`{func}` with {} argument(s)", args.len())));
            }
            _ => {
                return Err(CompileError::UnknownRoutine {
                    name: func.to_string(),
                    routine: self.scope.routine().map(str::to_string),
                    line: self.line,
                });
            }
        }
        Ok(())
    }
}

pub fn binary_opcode(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Div,
        BinaryOp::Mod => Opcode::Mod,
        BinaryOp::Eq => Opcode::CmpEq,
        BinaryOp::NotEq => Opcode::CmpNe,
        BinaryOp::Lt => Opcode::CmpLt,
        BinaryOp::LtE => Opcode::CmpLe,
        BinaryOp::Gt => Opcode::CmpGt,
        BinaryOp::GtE => Opcode::CmpGe,
        BinaryOp::And => Opcode::And,
        BinaryOp::Or => Opcode::Or,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scope with a fixed set of static names and no return target.
    struct Fixed(HashMap<String, MemoryLocation>);

    impl NameScope for Fixed {
        fn resolve(&self, name: &str) -> Option<&MemoryLocation> {
            self.0.get(name)
        }
        fn routine(&self) -> Option<&str> {
            None
        }
        fn return_target(&self) -> Option<(&MemoryLocation, &str)> {
            None
        }
    }

    fn run(names: &[&str], body: &[Stmt]) -> CompileResult<Vec<String>> {
        let scope = Fixed(
            names
                .iter()
                .map(|n| (n.to_string(), MemoryLocation::Static(n.to_string())))
                .collect(),
        );
        let calls = CallTable::default();
        let mut labels = LabelGen::new();
        let mut strings = StringPool::new();
        let mut cg = CodeGen::new(
            scope,
            &calls,
            Emitters {
                labels: &mut labels,
                strings: &mut strings,
            },
        );
        cg.block(body)?;
        Ok(cg.finalize().iter().map(|i| i.to_string().trim().to_string()).collect())
    }

    fn squash(lines: &[String]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect()
    }

    #[test]
    fn test_expression_is_postfix() {
        let body = vec![Stmt::assign(
            "x",
            Expr::bin(
                BinaryOp::Mul,
                Expr::bin(BinaryOp::Sub, Expr::name("x"), Expr::int(2)),
                Expr::unary(UnaryOp::Neg, Expr::int(3)),
            ),
        )];
        let out = squash(&run(&["x"], &body).unwrap());
        assert_eq!(
            out,
            vec!["PUSH x,d", "PUSH 2,i", "SUB", "PUSH 3,i", "NEG", "MUL", "POP x,d"]
        );
    }

    #[test]
    fn test_operator_mapping() {
        let test_cases = vec![
            (BinaryOp::Add, "ADD"),
            (BinaryOp::Div, "DIV"),
            (BinaryOp::Eq, "CMPEQ"),
            (BinaryOp::NotEq, "CMPNE"),
            (BinaryOp::LtE, "CMPLE"),
            (BinaryOp::GtE, "CMPGE"),
            (BinaryOp::And, "AND"),
            (BinaryOp::Or, "OR"),
        ];
        for (op, mnemonic) in test_cases {
            assert_eq!(binary_opcode(op).mnemonic(), mnemonic);
        }
    }

    #[test]
    fn test_if_without_else_has_one_label() {
        let body = vec![Stmt::if_else(
            Expr::name("x"),
            vec![Stmt::assign("x", Expr::int(0))],
            vec![],
        )];
        let out = squash(&run(&["x"], &body).unwrap());
        assert_eq!(
            out,
            vec!["PUSH x,d", "BRF endif.0", "PUSH 0,i", "POP x,d", "endif.0: NOP"]
        );
    }

    #[test]
    fn test_while_is_pre_tested() {
        let body = vec![
            Stmt::while_loop(
                Expr::bin(BinaryOp::Lt, Expr::name("i"), Expr::int(3)),
                vec![Stmt::new(StmtKind::AugAssign {
                    target: Expr::name("i"),
                    op: BinaryOp::Add,
                    value: Expr::int(1),
                })],
            ),
            Stmt::expr(Expr::call("print", vec![Expr::name("i")])),
        ];
        let out = squash(&run(&["i"], &body).unwrap());
        assert_eq!(
            out,
            vec![
                "while.0: PUSH i,d",
                "PUSH 3,i",
                "CMPLT",
                "BRF endwhile.1",
                "PUSH i,d",
                "PUSH 1,i",
                "ADD",
                "POP i,d",
                "BR while.0",
                "endwhile.1: PUSH i,d",
                "DECO",
            ]
        );
    }

    #[test]
    fn test_nested_ends_share_no_instruction() {
        let inner = Stmt::if_else(Expr::name("x"), vec![Stmt::new(StmtKind::Pass)], vec![]);
        let body = vec![Stmt::if_else(Expr::name("x"), vec![inner], vec![])];
        let out = squash(&run(&["x"], &body).unwrap());
        assert_eq!(out[out.len() - 2..], ["endif.1: NOP".to_string(), "endif.0: NOP".to_string()]);
    }

    #[test]
    fn test_errors() {
        let test_cases = vec![
            (
                Stmt::new(StmtKind::Assign {
                    targets: vec![Expr::name("x"), Expr::name("y")],
                    value: Expr::int(1),
                }),
                "multiple assignment targets",
            ),
            (Stmt::ret(Expr::int(1)), "return outside routine"),
            (
                Stmt::new(StmtKind::Unsupported {
                    construct: "class".into(),
                }),
                "class",
            ),
            (
                Stmt::assign("x", Expr::Unsupported {
                    construct: "list comprehension".into(),
                }),
                "list comprehension",
            ),
        ];

        for (stmt, construct) in test_cases {
            let err = run(&["x", "y"], &[stmt.at_line(9)]).unwrap_err();
            assert_eq!(
                err,
                CompileError::Unsupported {
                    construct: construct.into(),
                    routine: None,
                    line: 9,
                }
            );
        }
    }

    #[test]
    fn test_unknown_routine_and_name() {
        let err = run(&[], &[Stmt::expr(Expr::call("nope", vec![]))]).unwrap_err();
        assert!(matches!(err, CompileError::UnknownRoutine { .. }), "got {err:?}");

        let err = run(&[], &[Stmt::assign("y", Expr::int(1))]).unwrap_err();
        assert!(matches!(err, CompileError::UnresolvedName { .. }), "got {err:?}");
    }

    #[test]
    fn test_string_literal_pushes_address() {
        let out = squash(&run(&["s"], &[Stmt::assign("s", Expr::str("hey"))]).unwrap());
        assert_eq!(out, vec!["PUSH str.0,i", "POP s,d"]);
    }
}
