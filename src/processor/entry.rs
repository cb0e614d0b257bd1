//! Entry-point assembly: wraps finalized bodies with their labels,
//! prologues and epilogues.

use crate::model::{Block, Instruction, Opcode, Operand};
use crate::processor::memory::{ENTRY_LABEL, FrameLayout};

/// `tl:` on the first instruction, `STOP` at the end. This is the only
/// place the program halts.
pub fn program_entry(body: Vec<Instruction>) -> Block {
    let mut code = body;
    code.push(Instruction::new(Opcode::Stop));
    put_label(&mut code, ENTRY_LABEL);
    Block {
        title: "top level".to_string(),
        code,
    }
}

/// Return cell and slot equates, then `f: ENTER n`, argument binding,
/// the body, and the `f@exit` epilogue.
pub fn routine_entry(frame: &FrameLayout, body: Vec<Instruction>) -> Block {
    let mut code = frame.reservation.clone();

    let mut prologue = vec![
        Instruction::with(Opcode::Enter, Operand::Imm(i64::from(frame.size)))
            .labeled(frame.routine.clone())
            .commented(format!("{} slot(s)", frame.size)),
    ];
    for (idx, param) in frame.params.iter().enumerate() {
        let Some(slot) = frame.resolve(param) else {
            continue;
        };
        prologue.push(Instruction::with(Opcode::Push, Operand::Arg(idx as u16)));
        prologue.push(
            Instruction::with(Opcode::Pop, Operand::Mem(slot.clone())).commented(format!("bind {param}")),
        );
    }
    code.extend(prologue);
    code.extend(body);

    code.push(Instruction::new(Opcode::Leave).labeled(frame.exit_label.clone()));
    code.push(Instruction::new(Opcode::Ret));

    Block {
        title: format!("routine {}", frame.routine),
        code,
    }
}

/// Puts `label` on the first instruction. If that one is already labeled
/// a `NOP` carries it instead.
fn put_label(code: &mut Vec<Instruction>, label: &str) {
    if let Some(first) = code.first_mut() {
        if first.label.is_none() {
            first.label = Some(label.to_string());
            return;
        }
    }
    code.insert(0, Instruction::new(Opcode::Nop).labeled(label));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Role, ScopeMapping, VarDescriptor, VarKind};
    use crate::processor::memory::allocate_frame;

    fn squash(block: &Block) -> Vec<String> {
        block
            .code
            .iter()
            .map(|i| {
                let text = i.to_string();
                let text = text.split(';').next().unwrap_or_default();
                text.split_whitespace().collect::<Vec<_>>().join(" ")
            })
            .collect()
    }

    #[test]
    fn test_program_entry_wraps_body() {
        let body = vec![Instruction::with(Opcode::Push, Operand::Imm(1))];
        let block = program_entry(body);
        assert_eq!(squash(&block), vec!["tl: PUSH 1,i", "STOP"]);
    }

    #[test]
    fn test_empty_program_still_has_entry() {
        let block = program_entry(vec![]);
        assert_eq!(squash(&block), vec!["tl: STOP"]);
    }

    #[test]
    fn test_labeled_first_instruction_gets_nop() {
        let body = vec![Instruction::new(Opcode::Nop).labeled("while.0")];
        let block = program_entry(body);
        assert_eq!(squash(&block), vec!["tl: NOP", "while.0: NOP", "STOP"]);
    }

    #[test]
    fn test_routine_prologue_and_epilogue() {
        let mut locals = ScopeMapping::new();
        for (name, role) in [("a", Role::Parameter), ("b", Role::Parameter), ("t", Role::Local)] {
            locals.insert(VarDescriptor {
                name: name.into(),
                kind: VarKind::Integer,
                role,
            });
        }
        let frame = allocate_frame("f", &locals);
        let body = vec![Instruction::with(Opcode::Push, Operand::Imm(7))];
        let block = routine_entry(&frame, body);

        assert_eq!(block.title, "routine f");
        assert_eq!(
            squash(&block),
            vec![
                "f@ret: .WORD 0",
                "f.a: .EQUATE 0",
                "f.b: .EQUATE 1",
                "f.t: .EQUATE 2",
                "f: ENTER 3,i",
                "PUSH 0,a",
                "POP f.a,f",
                "PUSH 1,a",
                "POP f.b,f",
                "PUSH 7,i",
                "f@exit: LEAVE",
                "RET",
            ]
        );
    }
}
