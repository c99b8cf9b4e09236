//! The `opcode` module decodes raw 16-bit instruction words. Field
//! extraction lives on the [`Opcode`] newtype; [`Opcode::decode`] turns a
//! word into an [`Instruction`], the exhaustive enum the processor executes
//! with a single dispatch.

use std::fmt;

/// A raw 16-bit instruction word, fetched big-endian from two consecutive
/// memory bytes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Opcode(pub u16);

impl Opcode {
    /// The low 12 bits, used as an address.
    #[must_use]
    pub fn nnn(self) -> usize {
        usize::from(self.0 & 0x0FFF)
    }

    /// The low byte, used as an immediate value.
    #[must_use]
    pub fn kk(self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    /// The low nibble, used as a sprite height.
    #[must_use]
    pub fn n(self) -> usize {
        usize::from(self.0 & 0x000F)
    }

    /// The second nibble, used as a register index.
    #[must_use]
    pub fn x(self) -> usize {
        usize::from((self.0 & 0x0F00) >> 8)
    }

    /// The third nibble, used as a register index.
    #[must_use]
    pub fn y(self) -> usize {
        usize::from((self.0 & 0x00F0) >> 4)
    }

    /// Decodes this word into an [`Instruction`], or `None` if it matches no
    /// documented pattern. Dispatch goes by the top nibble; the `0x0`, `0x8`,
    /// `0xE` and `0xF` families discriminate further on the low byte or low
    /// nibble.
    #[must_use]
    pub fn decode(self) -> Option<Instruction> {
        let x = self.x();
        let y = self.y();
        let kk = self.kk();
        let n = self.n();
        let nnn = self.nnn();

        let instruction = match (self.0 & 0xF000) >> 12 {
            // 0___
            0x0 => match self.0 {
                // 00E0
                0x00E0 => Instruction::ClearScreen,

                // 00EE
                0x00EE => Instruction::Return,

                _ => return None,
            },

            // 1nnn
            0x1 => Instruction::Jump { nnn },

            // 2nnn
            0x2 => Instruction::Call { nnn },

            // 3xkk
            0x3 => Instruction::SkipIfEqual { x, kk },

            // 4xkk
            0x4 => Instruction::SkipIfNotEqual { x, kk },

            // 5xy0
            0x5 if n == 0 => Instruction::SkipIfRegsEqual { x, y },

            // 6xkk
            0x6 => Instruction::SetRegister { x, kk },

            // 7xkk
            0x7 => Instruction::AddToRegister { x, kk },

            // 8___
            0x8 => match self.0 & 0x000F {
                // 8xy0
                0x0 => Instruction::Copy { x, y },

                // 8xy1
                0x1 => Instruction::Or { x, y },

                // 8xy2
                0x2 => Instruction::And { x, y },

                // 8xy3
                0x3 => Instruction::Xor { x, y },

                // 8xy4
                0x4 => Instruction::Add { x, y },

                // 8xy5
                0x5 => Instruction::Subtract { x, y },

                // 8xy6
                0x6 => Instruction::ShiftRight { x },

                // 8xy7
                0x7 => Instruction::SubtractFrom { x, y },

                // 8xyE
                0xE => Instruction::ShiftLeft { x },

                _ => return None,
            },

            // 9xy0
            0x9 if n == 0 => Instruction::SkipIfRegsNotEqual { x, y },

            // Annn
            0xA => Instruction::SetIndex { nnn },

            // Bnnn
            0xB => Instruction::JumpOffset { nnn },

            // Cxkk
            0xC => Instruction::Random { x, kk },

            // Dxyn
            0xD => Instruction::Draw { x, y, n },

            // E___
            0xE => match self.0 & 0x00FF {
                // Ex9E
                0x9E => Instruction::SkipIfKeyPressed { x },

                // ExA1
                0xA1 => Instruction::SkipIfKeyNotPressed { x },

                _ => return None,
            },

            // F___
            0xF => match self.0 & 0x00FF {
                // Fx07
                0x07 => Instruction::ReadDelayTimer { x },

                // Fx0A
                0x0A => Instruction::WaitForKey { x },

                // Fx15
                0x15 => Instruction::SetDelayTimer { x },

                // Fx18
                0x18 => Instruction::SetSoundTimer { x },

                // Fx1E
                0x1E => Instruction::AddToIndex { x },

                // Fx29
                0x29 => Instruction::FontAddress { x },

                // Fx33
                0x33 => Instruction::StoreBcd { x },

                // Fx55
                0x55 => Instruction::StoreRegisters { x },

                // Fx65
                0x65 => Instruction::LoadRegisters { x },

                _ => return None,
            },

            _ => return None,
        };

        Some(instruction)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06X}", self.0)
    }
}

/// A decoded instruction. Register indices are `x`/`y`, immediates `kk`,
/// addresses `nnn`, sprite heights `n`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instruction {
    /// 00E0
    ClearScreen,
    /// 00EE
    Return,
    /// 1nnn
    Jump { nnn: usize },
    /// 2nnn
    Call { nnn: usize },
    /// 3xkk
    SkipIfEqual { x: usize, kk: u8 },
    /// 4xkk
    SkipIfNotEqual { x: usize, kk: u8 },
    /// 5xy0
    SkipIfRegsEqual { x: usize, y: usize },
    /// 6xkk
    SetRegister { x: usize, kk: u8 },
    /// 7xkk
    AddToRegister { x: usize, kk: u8 },
    /// 8xy0
    Copy { x: usize, y: usize },
    /// 8xy1
    Or { x: usize, y: usize },
    /// 8xy2
    And { x: usize, y: usize },
    /// 8xy3
    Xor { x: usize, y: usize },
    /// 8xy4
    Add { x: usize, y: usize },
    /// 8xy5
    Subtract { x: usize, y: usize },
    /// 8xy6
    ShiftRight { x: usize },
    /// 8xy7
    SubtractFrom { x: usize, y: usize },
    /// 8xyE
    ShiftLeft { x: usize },
    /// 9xy0
    SkipIfRegsNotEqual { x: usize, y: usize },
    /// Annn
    SetIndex { nnn: usize },
    /// Bnnn
    JumpOffset { nnn: usize },
    /// Cxkk
    Random { x: usize, kk: u8 },
    /// Dxyn
    Draw { x: usize, y: usize, n: usize },
    /// Ex9E
    SkipIfKeyPressed { x: usize },
    /// ExA1
    SkipIfKeyNotPressed { x: usize },
    /// Fx07
    ReadDelayTimer { x: usize },
    /// Fx0A
    WaitForKey { x: usize },
    /// Fx15
    SetDelayTimer { x: usize },
    /// Fx18
    SetSoundTimer { x: usize },
    /// Fx1E
    AddToIndex { x: usize },
    /// Fx29
    FontAddress { x: usize },
    /// Fx33
    StoreBcd { x: usize },
    /// Fx55
    StoreRegisters { x: usize },
    /// Fx65
    LoadRegisters { x: usize },
}

impl fmt::Display for Instruction {
    /// Renders the conventional assembler mnemonic, operands in unpadded
    /// uppercase hex.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ClearScreen => f.write_str("CLS"),
            Self::Return => f.write_str("RETURN"),
            Self::Jump { nnn } => write!(f, "JUMP {nnn:#X}"),
            Self::Call { nnn } => write!(f, "CALL {nnn:#X}"),
            Self::SkipIfEqual { x, kk } => write!(f, "SE v{x:X}, {kk:#X}"),
            Self::SkipIfNotEqual { x, kk } => write!(f, "SNE v{x:X}, {kk:#X}"),
            Self::SkipIfRegsEqual { x, y } => write!(f, "SE v{x:X}, v{y:X}"),
            Self::SetRegister { x, kk } => write!(f, "LD v{x:X}, {kk:#X}"),
            Self::AddToRegister { x, kk } => write!(f, "ADD v{x:X}, {kk:#X}"),
            Self::Copy { x, y } => write!(f, "LD v{x:X}, v{y:X}"),
            Self::Or { x, y } => write!(f, "OR v{x:X}, v{y:X}"),
            Self::And { x, y } => write!(f, "AND v{x:X}, v{y:X}"),
            Self::Xor { x, y } => write!(f, "XOR v{x:X}, v{y:X}"),
            Self::Add { x, y } => write!(f, "ADD v{x:X}, v{y:X}"),
            Self::Subtract { x, y } => write!(f, "SUB v{x:X}, v{y:X}"),
            Self::ShiftRight { x } => write!(f, "SHR v{x:X}"),
            Self::SubtractFrom { x, y } => write!(f, "SUBN v{x:X}, v{y:X}"),
            Self::ShiftLeft { x } => write!(f, "SHL v{x:X}"),
            Self::SkipIfRegsNotEqual { x, y } => write!(f, "SNE v{x:X}, v{y:X}"),
            Self::SetIndex { nnn } => write!(f, "LD I, {nnn:#X}"),
            Self::JumpOffset { nnn } => write!(f, "JP v0, {nnn:#X}"),
            Self::Random { x, kk } => write!(f, "RND v{x:X}, {kk:#X}"),
            Self::Draw { x, y, n } => write!(f, "DRW v{x:X}, v{y:X}, {n:#X}"),
            Self::SkipIfKeyPressed { x } => write!(f, "SKP v{x:X}"),
            Self::SkipIfKeyNotPressed { x } => write!(f, "SKNP v{x:X}"),
            Self::ReadDelayTimer { x } => write!(f, "LD v{x:X}, DT"),
            Self::WaitForKey { x } => write!(f, "LD v{x:X}, K"),
            Self::SetDelayTimer { x } => write!(f, "LD DT, v{x:X}"),
            Self::SetSoundTimer { x } => write!(f, "LD ST, v{x:X}"),
            Self::AddToIndex { x } => write!(f, "ADD I, v{x:X}"),
            Self::FontAddress { x } => write!(f, "LD F, v{x:X}"),
            Self::StoreBcd { x } => write!(f, "LD B, v{x:X}"),
            Self::StoreRegisters { x } => write!(f, "LD [I], v{x:X}"),
            Self::LoadRegisters { x } => write!(f, "LD v{x:X}, [I]"),
        }
    }
}
