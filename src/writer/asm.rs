//! Render a compiled program as assembly text, one instruction per line.

use std::io::{self, Write};

use crate::model::{Block, CompiledProgram, Instruction, Opcode, Operand};
use crate::processor::memory::ENTRY_LABEL;

pub fn emit<W: Write>(program: &CompiledProgram, out: &mut W) -> io::Result<()> {
    writeln!(out, "; Translating {}", program.source)?;
    writeln!(
        out,
        "{}",
        Instruction::with(Opcode::Br, Operand::Target(ENTRY_LABEL.to_string()))
    )?;

    block(&program.data, out)?;
    if let Some(strings) = &program.strings {
        block(strings, out)?;
    }
    for routine in &program.routines {
        block(routine, out)?;
    }
    // Last, so every routine label it calls is already defined above.
    block(&program.top_level, out)?;

    writeln!(out, "{}", Instruction::new(Opcode::End))?;
    Ok(())
}

pub fn render(program: &CompiledProgram) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = emit(program, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

fn block<W: Write>(block: &Block, out: &mut W) -> io::Result<()> {
    writeln!(out, "; ***** {}", block.title)?;
    for instr in &block.code {
        writeln!(out, "{instr}")?;
    }
    Ok(())
}
