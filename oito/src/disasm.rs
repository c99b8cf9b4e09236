//! The `disasm` module renders instruction words as assembler mnemonics for
//! the debug views.

use crate::memory::{Memory, MEMORY_SIZE};
use crate::opcode::Opcode;

/// One disassembled line of memory.
pub struct Line {
    /// Address the word was read from.
    pub address: usize,

    /// The raw instruction word.
    pub opcode: u16,

    /// The rendered mnemonic.
    pub text: String,
}

/// The mnemonic for a single instruction word. Words that decode to no
/// documented instruction render as their hex value.
#[must_use]
pub fn text_for(word: u16) -> String {
    match Opcode(word).decode() {
        Some(instruction) => instruction.to_string(),
        None => format!("{word:#X}"),
    }
}

/// Disassembles the words around `pc`, up to `radius` instructions before
/// and after it, clamped to the memory space. Words are read at every other
/// byte, matching how the processor fetches.
#[must_use]
pub fn window(memory: &Memory, pc: usize, radius: usize) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut address = pc.saturating_sub(radius * 2);
    while address + 1 < MEMORY_SIZE && address <= pc + radius * 2 {
        let word = (u16::from(memory[address]) << 8) | u16::from(memory[address + 1]);
        lines.push(Line {
            address,
            opcode: word,
            text: text_for(word),
        });
        address += 2;
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_known_words_and_falls_back_to_hex() {
        assert_eq!(text_for(0x00E0), "CLS");
        assert_eq!(text_for(0x1234), "JUMP 0x234");
        assert_eq!(text_for(0x5121), "0x5121");
        assert_eq!(text_for(0x0000), "0x0");
    }

    #[test]
    fn window_centers_on_the_program_counter() {
        let mut memory = Memory::new();
        memory.load(&[0x63, 0x10, 0xA1, 0x23]);

        let lines = window(&memory, 0x202, 1);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].address, 0x200);
        assert_eq!(lines[0].text, "LD v3, 0x10");
        assert_eq!(lines[1].address, 0x202);
        assert_eq!(lines[1].opcode, 0xA123);
        assert_eq!(lines[1].text, "LD I, 0x123");
        assert_eq!(lines[2].address, 0x204);
    }

    #[test]
    fn window_clamps_to_the_memory_space() {
        let memory = Memory::new();

        let bottom = window(&memory, 0, 2);
        assert_eq!(bottom.first().unwrap().address, 0);
        assert_eq!(bottom.len(), 3);

        let top = window(&memory, 0xFFC, 2);
        assert_eq!(top.first().unwrap().address, 0xFF8);
        assert_eq!(top.last().unwrap().address, 0xFFE);
    }
}
