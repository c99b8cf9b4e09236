//! The `memory` module provides the 4096-byte address space of the machine.
//! The built-in font glyphs live at the bottom of memory and programs are
//! loaded at [`PROGRAM_START`].

use std::ops::{Index, IndexMut};

/// The total size of the addressable memory.
pub const MEMORY_SIZE: usize = 4096;

/// Programs are loaded starting at this offset; everything below it belongs
/// to the interpreter (font data).
pub const PROGRAM_START: usize = 0x200;

/// Built-in hexadecimal font. 16 glyphs of 5 bytes each, stored at the
/// bottom of memory.
const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// The [`Memory`] struct represents the memory of the machine. It contains a
/// fixed-size array of [`u8`] values that can be accessed using the [`Index`]
/// and [`IndexMut`] traits.
pub struct Memory {
    bytes: [u8; MEMORY_SIZE],
}

impl Default for Memory {
    fn default() -> Self {
        let mut bytes = [0; MEMORY_SIZE];
        bytes[..FONT.len()].copy_from_slice(&FONT);
        Self { bytes }
    }
}

impl Index<usize> for Memory {
    type Output = u8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.bytes[index]
    }
}

impl IndexMut<usize> for Memory {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.bytes[index]
    }
}

impl Memory {
    /// Creates a new [`Memory`] with the font loaded and everything else
    /// zeroed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies `data` into memory starting at [`PROGRAM_START`]. Bytes whose
    /// destination would fall past the end of memory are dropped; the dropped
    /// count is reported through a warning log rather than an error.
    pub fn load(&mut self, data: &[u8]) {
        let capacity = MEMORY_SIZE - PROGRAM_START;
        let copied = data.len().min(capacity);
        if copied < data.len() {
            log::warn!(
                "ROM is {} bytes larger than the program area, dropping the tail",
                data.len() - copied
            );
        }
        self.bytes[PROGRAM_START..PROGRAM_START + copied].copy_from_slice(&data[..copied]);
    }

    /// Returns the whole address space as raw bytes, for disassembly and
    /// debug views.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; MEMORY_SIZE] {
        &self.bytes
    }
}
