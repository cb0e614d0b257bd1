//! Memory layout: static segment for globals, one frame per routine, and
//! the pool of string constants.
//!
//! Locations are computed once from a finished scope mapping and never
//! change afterwards.

use std::collections::HashMap;

use crate::model::{Instruction, MemoryLocation, Opcode, Operand, Role, ScopeMapping};
use crate::processor::labels::LabelGen;

/// Label of the program entry point.
pub const ENTRY_LABEL: &str = "tl";

// ───────────────────────────────────────────────────────────────────────
//  Static segment
// ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct StaticLayout {
    locations: HashMap<String, MemoryLocation>,
    /// One `.WORD`-style declaration per global, in mapping order.
    pub declarations: Vec<Instruction>,
}

impl StaticLayout {
    pub fn resolve(&self, name: &str) -> Option<&MemoryLocation> {
        self.locations.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.locations.contains_key(name)
    }
}

pub fn allocate_static(globals: &ScopeMapping) -> StaticLayout {
    let mut locations = HashMap::new();
    let mut declarations = Vec::with_capacity(globals.len());

    for var in globals.iter() {
        let (directive, zero) = var.kind.zero_directive();
        declarations.push(
            Instruction::with(directive, Operand::Raw(zero.to_string()))
                .labeled(var.name.clone())
                .commented(format!("global {}", var.kind)),
        );
        locations.insert(var.name.clone(), MemoryLocation::Static(var.name.clone()));
    }

    StaticLayout {
        locations,
        declarations,
    }
}

// ───────────────────────────────────────────────────────────────────────
//  Frames
// ───────────────────────────────────────────────────────────────────────

/// Layout of one routine's frame plus its call contract.
#[derive(Debug, Clone)]
pub struct FrameLayout {
    pub routine: String,
    /// Parameter names, declared order.
    pub params: Vec<String>,
    slots: HashMap<String, MemoryLocation>,
    /// Number of slots the frame reserves.
    pub size: u16,
    /// Cell the routine leaves its result in; read by the caller right
    /// after the call returns.
    pub return_slot: MemoryLocation,
    pub exit_label: String,
    /// Return cell plus one `.EQUATE` per slot.
    pub reservation: Vec<Instruction>,
}

impl FrameLayout {
    pub fn resolve(&self, name: &str) -> Option<&MemoryLocation> {
        self.slots.get(name)
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Slot location of `name`, if it lives in this frame.
    pub fn slot(&self, name: &str) -> Option<u16> {
        match self.slots.get(name) {
            Some(MemoryLocation::Frame { offset, .. }) => Some(*offset),
            _ => None,
        }
    }
}

/// Lays out one routine's frame. Slots restart at 0 for every routine;
/// parameters come first because the local mapping lists them first.
pub fn allocate_frame(routine: &str, locals: &ScopeMapping) -> FrameLayout {
    let mut slots = HashMap::new();
    let mut params = Vec::new();

    let return_label = format!("{routine}@ret");
    let mut reservation = vec![
        Instruction::with(Opcode::Word, Operand::Raw("0".into()))
            .labeled(return_label.clone())
            .commented("return value"),
    ];

    let mut offset: u16 = 0;
    for var in locals.iter() {
        let symbol = format!("{routine}.{}", var.name);
        reservation.push(
            Instruction::with(Opcode::Equate, Operand::Raw(offset.to_string()))
                .labeled(symbol.clone())
                .commented(format!("{:?} {}", var.role, var.kind).to_lowercase()),
        );
        if var.role == Role::Parameter {
            params.push(var.name.clone());
        }
        slots.insert(var.name.clone(), MemoryLocation::Frame { symbol, offset });
        offset += 1;
    }

    FrameLayout {
        routine: routine.to_string(),
        params,
        slots,
        size: offset,
        return_slot: MemoryLocation::Static(return_label),
        exit_label: format!("{routine}@exit"),
        reservation,
    }
}

// ───────────────────────────────────────────────────────────────────────
//  String constants
// ───────────────────────────────────────────────────────────────────────

/// Interned string literals, each behind a generated `str.N` label.
#[derive(Debug, Default)]
pub struct StringPool {
    labels: HashMap<String, String>,
    entries: Vec<(String, String)>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, text: &str, labels: &mut LabelGen) -> String {
        if let Some(label) = self.labels.get(text) {
            return label.clone();
        }
        let label = labels.fresh("str");
        self.labels.insert(text.to_string(), label.clone());
        self.entries.push((label.clone(), text.to_string()));
        label
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `.ASCII` declarations, NUL-terminated, in first-use order.
    pub fn declarations(&self) -> Vec<Instruction> {
        self.entries
            .iter()
            .map(|(label, text)| {
                Instruction::with(Opcode::Ascii, Operand::Raw(format!("\"{}\\x00\"", escape(text))))
                    .labeled(label.clone())
            })
            .collect()
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c if c.is_ascii_graphic() || c == ' ' => out.push(c),
            c => {
                let mut buf = [0u8; 4];
                for b in c.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("\\x{b:02X}"));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{VarDescriptor, VarKind};

    fn scope(vars: &[(&str, VarKind, Role)]) -> ScopeMapping {
        let mut scope = ScopeMapping::new();
        for (name, kind, role) in vars {
            scope.insert(VarDescriptor {
                name: name.to_string(),
                kind: *kind,
                role: *role,
            });
        }
        scope
    }

    #[test]
    fn test_static_declarations_in_order() {
        let globals = scope(&[
            ("x", VarKind::Integer, Role::Global),
            ("pi", VarKind::Real, Role::Global),
            ("name", VarKind::Str, Role::Global),
        ]);

        let layout = allocate_static(&globals);
        let rendered: Vec<String> = layout.declarations.iter().map(|i| i.to_string()).collect();
        assert_eq!(rendered.len(), 3);
        assert!(rendered[0].starts_with("x:") && rendered[0].contains(".WORD   0"));
        assert!(rendered[1].starts_with("pi:") && rendered[1].contains(".REAL   0.0"));
        assert!(rendered[2].starts_with("name:") && rendered[2].contains(".ADDRSS 0"));
        assert_eq!(layout.resolve("pi"), Some(&MemoryLocation::Static("pi".into())));
        assert_eq!(layout.resolve("nope"), None);
    }

    #[test]
    fn test_frame_slots_are_distinct_and_restart() {
        let f = allocate_frame(
            "f",
            &scope(&[
                ("a", VarKind::Integer, Role::Parameter),
                ("b", VarKind::Integer, Role::Parameter),
                ("t", VarKind::Integer, Role::Local),
            ]),
        );
        let g = allocate_frame("g", &scope(&[("t", VarKind::Integer, Role::Local)]));

        assert_eq!(f.size, 3);
        assert_eq!(f.params, vec!["a", "b"]);
        assert_eq!((f.slot("a"), f.slot("b"), f.slot("t")), (Some(0), Some(1), Some(2)));
        assert_eq!(g.slot("t"), Some(0));
        assert_eq!(
            g.resolve("t"),
            Some(&MemoryLocation::Frame {
                symbol: "g.t".into(),
                offset: 0,
            })
        );
        assert_eq!(f.return_slot, MemoryLocation::Static("f@ret".into()));
        assert_eq!(f.exit_label, "f@exit");
        // return cell + three equates
        assert_eq!(f.reservation.len(), 4);
    }

    #[test]
    fn test_string_pool_interns() {
        let mut labels = LabelGen::new();
        let mut pool = StringPool::new();
        let a = pool.intern("hi \"there\"", &mut labels);
        let b = pool.intern("bye", &mut labels);
        let c = pool.intern("hi \"there\"", &mut labels);

        assert_eq!(a, c);
        assert_ne!(a, b);
        let decls: Vec<String> = pool.declarations().iter().map(|i| i.to_string()).collect();
        assert_eq!(decls.len(), 2);
        assert!(decls[0].ends_with(r#".ASCII  "hi \"there\"\x00""#), "{}", decls[0]);
    }
}
