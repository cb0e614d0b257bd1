//! Output stage: turns a compiled program into text.
pub mod asm;
