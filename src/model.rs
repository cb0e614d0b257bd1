//! Data model shared by every pass: variable descriptors and their scope
//! mappings, memory locations, and the instructions the generators emit.

use std::collections::HashMap;
use std::fmt;

use crate::processor::ast::Literal;

// ───────────────────────────────────────────────────────────────────────
//  Variables
// ───────────────────────────────────────────────────────────────────────

/// Coarse storage type, inferred only to size and zero-initialise storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Integer,
    Real,
    Boolean,
    Str,
}

impl VarKind {
    pub fn of_literal(lit: &Literal) -> Self {
        match lit {
            Literal::Int(_) => VarKind::Integer,
            Literal::Real(_) => VarKind::Real,
            Literal::Bool(_) => VarKind::Boolean,
            Literal::Str(_) => VarKind::Str,
        }
    }

    /// Parameter annotation (`int`, `float`, …) to kind.
    pub fn from_annotation(annotation: &str) -> Option<Self> {
        match annotation {
            "int" => Some(VarKind::Integer),
            "float" => Some(VarKind::Real),
            "bool" => Some(VarKind::Boolean),
            "str" => Some(VarKind::Str),
            _ => None,
        }
    }

    /// Data directive reserving one zero-initialised cell of this kind.
    pub fn zero_directive(self) -> (Opcode, &'static str) {
        match self {
            VarKind::Integer | VarKind::Boolean => (Opcode::Word, "0"),
            VarKind::Real => (Opcode::Real, "0.0"),
            VarKind::Str => (Opcode::Addrss, "0"),
        }
    }
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VarKind::Integer => "integer",
            VarKind::Real => "real",
            VarKind::Boolean => "boolean",
            VarKind::Str => "string",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Global,
    Local,
    Parameter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDescriptor {
    pub name: String,
    pub kind: VarKind,
    pub role: Role,
}

/// Ordered name → descriptor table for one scope.
///
/// Iteration follows first insertion, which fixes address and slot
/// assignment. Only the extractors insert; everything downstream gets a
/// shared reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeMapping {
    vars: Vec<VarDescriptor>,
    index: HashMap<String, usize>,
}

impl ScopeMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `desc` unless its name is already present. Returns whether
    /// it was inserted; an existing entry is never changed.
    pub(crate) fn insert(&mut self, desc: VarDescriptor) -> bool {
        if self.index.contains_key(&desc.name) {
            return false;
        }
        self.index.insert(desc.name.clone(), self.vars.len());
        self.vars.push(desc);
        true
    }

    pub fn get(&self, name: &str) -> Option<&VarDescriptor> {
        self.index.get(name).map(|&i| &self.vars[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VarDescriptor> {
        self.vars.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.vars.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

// ───────────────────────────────────────────────────────────────────────
//  Memory
// ───────────────────────────────────────────────────────────────────────

/// Where a name lives once its scope mapping is laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryLocation {
    /// Static segment cell, addressed by its label.
    Static(String),
    /// Slot of the active frame; `symbol` is the `.EQUATE` naming `offset`.
    Frame { symbol: String, offset: u16 },
}

// ───────────────────────────────────────────────────────────────────────
//  Instructions
// ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Push,
    Pop,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    Not,
    And,
    Or,
    CmpEq,
    CmpNe,
    CmpLt,
    CmpLe,
    CmpGt,
    CmpGe,
    Br,
    Brf,
    Call,
    Ret,
    Enter,
    Leave,
    Addsp,
    Deci,
    Deco,
    Nop,
    Stop,
    // directives
    Word,
    Real,
    Addrss,
    Ascii,
    Equate,
    End,
}

impl Opcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Neg => "NEG",
            Opcode::Not => "NOT",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::CmpEq => "CMPEQ",
            Opcode::CmpNe => "CMPNE",
            Opcode::CmpLt => "CMPLT",
            Opcode::CmpLe => "CMPLE",
            Opcode::CmpGt => "CMPGT",
            Opcode::CmpGe => "CMPGE",
            Opcode::Br => "BR",
            Opcode::Brf => "BRF",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::Enter => "ENTER",
            Opcode::Leave => "LEAVE",
            Opcode::Addsp => "ADDSP",
            Opcode::Deci => "DECI",
            Opcode::Deco => "DECO",
            Opcode::Nop => "NOP",
            Opcode::Stop => "STOP",
            Opcode::Word => ".WORD",
            Opcode::Real => ".REAL",
            Opcode::Addrss => ".ADDRSS",
            Opcode::Ascii => ".ASCII",
            Opcode::Equate => ".EQUATE",
            Opcode::End => ".END",
        }
    }

    pub fn is_branch(self) -> bool {
        matches!(self, Opcode::Br | Opcode::Brf)
    }

    pub fn is_compare(self) -> bool {
        matches!(
            self,
            Opcode::CmpEq
                | Opcode::CmpNe
                | Opcode::CmpLt
                | Opcode::CmpLe
                | Opcode::CmpGt
                | Opcode::CmpGe
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `5,i`
    Imm(i64),
    /// `1.5,i`
    RealImm(f64),
    /// `str.0,i` – address of a label.
    Addr(String),
    /// `x,d` or `f.a,f`
    Mem(MemoryLocation),
    /// `0,a` – n-th incoming argument, declared order.
    Arg(u16),
    /// Branch or call target.
    Target(String),
    /// Directive argument, printed as-is.
    Raw(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Imm(v) => write!(f, "{v},i"),
            Operand::RealImm(v) => write!(f, "{v:?},i"),
            Operand::Addr(label) => write!(f, "{label},i"),
            Operand::Mem(MemoryLocation::Static(label)) => write!(f, "{label},d"),
            Operand::Mem(MemoryLocation::Frame { symbol, .. }) => write!(f, "{symbol},f"),
            Operand::Arg(n) => write!(f, "{n},a"),
            Operand::Target(label) => f.write_str(label),
            Operand::Raw(text) => f.write_str(text),
        }
    }
}

/// One line of output: optional leading label, opcode, optional operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub label: Option<String>,
    pub opcode: Opcode,
    pub operand: Option<Operand>,
    pub comment: Option<String>,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            label: None,
            opcode,
            operand: None,
            comment: None,
        }
    }

    pub fn with(opcode: Opcode, operand: Operand) -> Self {
        Self {
            operand: Some(operand),
            ..Self::new(opcode)
        }
    }

    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn commented(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Label this instruction branches to or calls, if any.
    pub fn target(&self) -> Option<&str> {
        match &self.operand {
            Some(Operand::Target(label)) => Some(label),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match &self.label {
            Some(l) => format!("{l}:"),
            None => String::new(),
        };
        let operand = match &self.operand {
            Some(op) => op.to_string(),
            None => String::new(),
        };
        let mut line = format!("{label:<12} {:<8}{operand}", self.opcode.mnemonic());
        if let Some(comment) = &self.comment {
            line = format!("{:<32}; {comment}", line.trim_end());
        }
        f.write_str(line.trim_end())
    }
}

/// A titled, finalized run of instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub title: String,
    pub code: Vec<Instruction>,
}

/// Everything the writer needs, in output order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProgram {
    pub source: String,
    pub data: Block,
    pub strings: Option<Block>,
    pub routines: Vec<Block>,
    pub top_level: Block,
}

impl CompiledProgram {
    /// Every instruction in output order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        std::iter::once(&self.data)
            .chain(self.strings.iter())
            .chain(self.routines.iter())
            .chain(std::iter::once(&self.top_level))
            .flat_map(|b| b.code.iter())
    }
}
