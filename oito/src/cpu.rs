//! This module contains the implementation of the central processing unit.
//! The processor fetches instruction words from memory, decodes them into
//! [`Instruction`] values and executes them against the [`Bus`].

use crate::fault::{self, Fault};
use crate::memory;
use crate::opcode::{Instruction, Opcode};

use super::Bus;

/// Controls whether a requested cycle actually executes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum RunMode {
    /// Execute a cycle whenever one is requested.
    #[default]
    Running,

    /// Ignore cycle requests until resumed.
    Paused,

    /// Execute exactly one cycle, then become [`RunMode::Paused`].
    StepPending,
}

/// Whether the processor is blocked on the keypad.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum WaitState {
    /// Not blocked.
    #[default]
    None,

    /// Blocked until a key press arrives. The code of the press will be
    /// stored in register `target`.
    AwaitingKey { target: usize },
}

/// Describes how the program counter should be updated after executing an
/// instruction.
enum PcStep {
    /// Go directly to the next instruction (pc + 2).
    Next,

    /// Skip the next instruction (pc + 4).
    Skip,

    /// Jump to the given address.
    Jump(usize),

    /// Stay on the current instruction.
    Hold,
}

/// This struct represents the central processing unit of the machine.
pub struct Cpu {
    /// The sixteen Vx general purpose registers.
    pub v: [u8; 16],

    /// The index register, used to address memory.
    pub i: usize,

    /// The program counter.
    pub pc: usize,

    /// The stack pointer. Indexes the first free slot of `stack`.
    pub sp: usize,

    /// The call stack. Each slot holds the address of a `CALL` instruction
    /// whose subroutine has not returned yet.
    pub stack: [usize; 16],

    /// The most recently fetched instruction word.
    pub opcode: Opcode,

    mode: RunMode,
    wait: WaitState,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Create a new [`Cpu`] with the program counter at the start of the
    /// program area.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            v: [0; 16],
            i: 0,
            pc: memory::PROGRAM_START,
            sp: 0,
            stack: [0; 16],
            opcode: Opcode(0),
            mode: RunMode::Running,
            wait: WaitState::None,
        }
    }

    /// The current run mode.
    #[must_use]
    pub const fn mode(&self) -> RunMode {
        self.mode
    }

    /// The current wait state.
    #[must_use]
    pub const fn wait_state(&self) -> WaitState {
        self.wait
    }

    /// Stop executing requested cycles until [`Cpu::resume`] or
    /// [`Cpu::single_step`] is called. Pausing never loses state; a blocked
    /// key wait stays blocked across pause and resume.
    pub fn pause(&mut self) {
        self.mode = RunMode::Paused;
    }

    /// Resume free-running execution.
    pub fn resume(&mut self) {
        self.mode = RunMode::Running;
    }

    /// Arrange for exactly one cycle to execute, leaving the processor
    /// paused afterwards. Requested while running, this acts as a break on
    /// the next cycle.
    pub fn single_step(&mut self) {
        self.mode = RunMode::StepPending;
    }

    /// Execute one processor cycle. This will fetch, decode, and execute the
    /// next instruction from memory and then tick the timers. If the
    /// processor is paused the request is ignored; if it is waiting on the
    /// keypad the cycle only polls for the press that resolves the wait.
    ///
    /// # Errors
    ///
    /// Returns the [`Fault`] the instruction ran into. The faulting
    /// instruction has not changed any state, the program counter still
    /// addresses it, and the processor is left paused.
    pub fn cycle(&mut self, bus: &mut Bus) -> fault::Result<()> {
        match self.mode {
            RunMode::Paused => return Ok(()),
            RunMode::StepPending => self.mode = RunMode::Paused,
            RunMode::Running => {}
        }

        let result = self.advance(bus);
        if result.is_err() {
            self.mode = RunMode::Paused;
        }
        result
    }

    fn advance(&mut self, bus: &mut Bus) -> fault::Result<()> {
        if let WaitState::AwaitingKey { target } = self.wait {
            // Only presses recorded after the wait began can be latched,
            // since entering the wait cleared the keypad.
            if let Some(key) = bus.keypad.last_pressed() {
                self.v[target] = key;
                self.wait = WaitState::None;
                self.pc += 2;
            }
            return Ok(());
        }

        if self.pc + 1 >= memory::MEMORY_SIZE {
            return Err(Fault::AddressOutOfRange { addr: self.pc });
        }
        // get the next two bytes and combine them into one two-byte word
        self.opcode =
            Opcode((u16::from(bus.memory[self.pc]) << 8) | u16::from(bus.memory[self.pc + 1]));

        let step = match self.opcode.decode() {
            Some(instruction) => self.execute(instruction, bus)?,
            None => {
                log::error!("Unknown opcode: {}", self.opcode);
                PcStep::Next
            }
        };

        match step {
            PcStep::Next => self.pc += 2,
            PcStep::Skip => self.pc += 4,
            PcStep::Jump(addr) => self.pc = addr,
            PcStep::Hold => {}
        }

        bus.timers.tick();

        Ok(())
    }

    /// Apply a single decoded instruction to the processor and the [`Bus`],
    /// and report how the program counter should move afterwards.
    fn execute(&mut self, instruction: Instruction, bus: &mut Bus) -> fault::Result<PcStep> {
        let step = match instruction {
            Instruction::ClearScreen => {
                bus.screen.clear();
                PcStep::Next
            }
            Instruction::Return => {
                if self.sp == 0 {
                    return Err(Fault::StackUnderflow { pc: self.pc });
                }
                self.sp -= 1;
                // resume just past the call site saved by the matching CALL
                PcStep::Jump(self.stack[self.sp] + 2)
            }
            Instruction::Jump { nnn } => PcStep::Jump(nnn),
            Instruction::Call { nnn } => {
                if self.sp == self.stack.len() {
                    return Err(Fault::StackOverflow { pc: self.pc });
                }
                self.stack[self.sp] = self.pc;
                self.sp += 1;
                PcStep::Jump(nnn)
            }
            Instruction::SkipIfEqual { x, kk } => {
                if self.v[x] == kk {
                    PcStep::Skip
                } else {
                    PcStep::Next
                }
            }
            Instruction::SkipIfNotEqual { x, kk } => {
                if self.v[x] == kk {
                    PcStep::Next
                } else {
                    PcStep::Skip
                }
            }
            Instruction::SkipIfRegsEqual { x, y } => {
                if self.v[x] == self.v[y] {
                    PcStep::Skip
                } else {
                    PcStep::Next
                }
            }
            Instruction::SetRegister { x, kk } => {
                self.v[x] = kk;
                PcStep::Next
            }
            Instruction::AddToRegister { x, kk } => {
                self.v[x] = self.v[x].wrapping_add(kk);
                PcStep::Next
            }
            Instruction::Copy { x, y } => {
                self.v[x] = self.v[y];
                PcStep::Next
            }
            Instruction::Or { x, y } => {
                self.v[x] |= self.v[y];
                PcStep::Next
            }
            Instruction::And { x, y } => {
                self.v[x] &= self.v[y];
                PcStep::Next
            }
            Instruction::Xor { x, y } => {
                self.v[x] ^= self.v[y];
                PcStep::Next
            }
            Instruction::Add { x, y } => {
                let (result, overflow) = self.v[x].overflowing_add(self.v[y]);
                // VF is written after Vx so the flag survives when x is F
                self.v[x] = result;
                self.v[0xF] = u8::from(overflow);
                PcStep::Next
            }
            Instruction::Subtract { x, y } => {
                // VF reports the strict comparison: equal operands clear it
                let no_borrow = self.v[x] > self.v[y];
                self.v[x] = self.v[x].wrapping_sub(self.v[y]);
                self.v[0xF] = u8::from(no_borrow);
                PcStep::Next
            }
            Instruction::ShiftRight { x } => {
                let low_bit = self.v[x] & 1;
                self.v[x] >>= 1;
                self.v[0xF] = low_bit;
                PcStep::Next
            }
            Instruction::SubtractFrom { x, y } => {
                let no_borrow = self.v[y] > self.v[x];
                self.v[x] = self.v[y].wrapping_sub(self.v[x]);
                self.v[0xF] = u8::from(no_borrow);
                PcStep::Next
            }
            Instruction::ShiftLeft { x } => {
                let high_bit = (self.v[x] & 0x80) >> 7;
                self.v[x] <<= 1;
                self.v[0xF] = high_bit;
                PcStep::Next
            }
            Instruction::SkipIfRegsNotEqual { x, y } => {
                if self.v[x] == self.v[y] {
                    PcStep::Next
                } else {
                    PcStep::Skip
                }
            }
            Instruction::SetIndex { nnn } => {
                self.i = nnn;
                PcStep::Next
            }
            Instruction::JumpOffset { nnn } => PcStep::Jump(nnn + usize::from(self.v[0])),
            Instruction::Random { x, kk } => {
                let mut buf = [0u8; 1];
                getrandom::getrandom(&mut buf).unwrap();
                self.v[x] = buf[0] & kk;
                PcStep::Next
            }
            Instruction::Draw { x, y, n } => {
                let end = self.i + n;
                if end > memory::MEMORY_SIZE {
                    return Err(Fault::AddressOutOfRange { addr: end - 1 });
                }
                let sprite = &bus.memory.as_bytes()[self.i..end];
                let erased = bus.screen.draw_sprite(self.v[x], self.v[y], sprite);
                self.v[0xF] = u8::from(erased);
                PcStep::Next
            }
            Instruction::SkipIfKeyPressed { x } => {
                if bus.keypad.is_pressed(self.v[x]) {
                    PcStep::Skip
                } else {
                    PcStep::Next
                }
            }
            Instruction::SkipIfKeyNotPressed { x } => {
                if bus.keypad.is_pressed(self.v[x]) {
                    PcStep::Next
                } else {
                    PcStep::Skip
                }
            }
            Instruction::ReadDelayTimer { x } => {
                self.v[x] = bus.timers.delay();
                PcStep::Next
            }
            Instruction::WaitForKey { x } => {
                // Forget held keys so only a fresh press resolves the wait.
                bus.keypad.clear();
                self.wait = WaitState::AwaitingKey { target: x };
                PcStep::Hold
            }
            Instruction::SetDelayTimer { x } => {
                bus.timers.set_delay(self.v[x]);
                PcStep::Next
            }
            Instruction::SetSoundTimer { x } => {
                bus.timers.set_sound(self.v[x]);
                PcStep::Next
            }
            Instruction::AddToIndex { x } => {
                self.i += usize::from(self.v[x]);
                PcStep::Next
            }
            Instruction::FontAddress { x } => {
                self.i = 5 * usize::from(self.v[x]);
                PcStep::Next
            }
            Instruction::StoreBcd { x } => {
                let end = self.i + 3;
                if end > memory::MEMORY_SIZE {
                    return Err(Fault::AddressOutOfRange { addr: end - 1 });
                }
                bus.memory[self.i] = self.v[x] / 100;
                bus.memory[self.i + 1] = (self.v[x] / 10) % 10;
                bus.memory[self.i + 2] = self.v[x] % 10;
                PcStep::Next
            }
            Instruction::StoreRegisters { x } => {
                let end = self.i + x + 1;
                if end > memory::MEMORY_SIZE {
                    return Err(Fault::AddressOutOfRange { addr: end - 1 });
                }
                for offset in 0..=x {
                    bus.memory[self.i + offset] = self.v[offset];
                }
                PcStep::Next
            }
            Instruction::LoadRegisters { x } => {
                let end = self.i + x + 1;
                if end > memory::MEMORY_SIZE {
                    return Err(Fault::AddressOutOfRange { addr: end - 1 });
                }
                for offset in 0..=x {
                    self.v[offset] = bus.memory[self.i + offset];
                }
                PcStep::Next
            }
        };

        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine_with(rom: &[u8]) -> (Cpu, Bus) {
        let mut bus = Bus::default();
        bus.memory.load(rom);
        (Cpu::new(), bus)
    }

    fn run(cpu: &mut Cpu, bus: &mut Bus, cycles: usize) {
        for _ in 0..cycles {
            cpu.cycle(bus).unwrap();
        }
    }

    #[test]
    fn fetch_combines_two_bytes_big_endian() {
        let (mut cpu, mut bus) = machine_with(&[0xA2, 0xF0]);
        cpu.cycle(&mut bus).unwrap();
        assert_eq!(cpu.opcode, Opcode(0xA2F0));
        assert_eq!(cpu.i, 0x2F0);
        assert_eq!(cpu.pc, 0x202);
    }

    #[test]
    fn clear_screen_blanks_pixels_and_flags_redraw() {
        let (mut cpu, mut bus) = machine_with(&[0xD0, 0x05, 0x00, 0xE0]);
        run(&mut cpu, &mut bus, 1);
        assert!(bus.screen.take_redraw());
        run(&mut cpu, &mut bus, 1);
        assert!(bus.screen.pixels().iter().flatten().all(|&pixel| pixel == 0));
        assert!(bus.screen.take_redraw());
    }

    #[test]
    fn immediates_load_and_add_without_touching_vf() {
        let (mut cpu, mut bus) = machine_with(&[0x63, 0x10, 0x73, 0x05]);
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.v[0x3], 0x15);
        assert_eq!(cpu.v[0xF], 0);
    }

    #[test]
    fn add_immediate_wraps_around() {
        let (mut cpu, mut bus) = machine_with(&[0x63, 0xFF, 0x73, 0x02]);
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.v[0x3], 0x01);
        assert_eq!(cpu.v[0xF], 0);
    }

    #[test]
    fn logical_ops_leave_vf_alone() {
        let (mut cpu, mut bus) = machine_with(&[0x81, 0x21, 0x81, 0x22, 0x81, 0x23]);
        cpu.v[0x1] = 0b1100;
        cpu.v[0x2] = 0b1010;
        cpu.v[0xF] = 0x55;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x1], 0b1110);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x1], 0b1010);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x1], 0);
        assert_eq!(cpu.v[0xF], 0x55);
    }

    #[test]
    fn copy_overwrites_destination() {
        let (mut cpu, mut bus) = machine_with(&[0x84, 0x50]);
        cpu.v[0x4] = 9;
        cpu.v[0x5] = 42;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x4], 42);
    }

    #[test]
    fn add_regs_reports_carry_in_vf() {
        let (mut cpu, mut bus) = machine_with(&[0x81, 0x24, 0x83, 0x44]);
        cpu.v[0x1] = 200;
        cpu.v[0x2] = 100;
        cpu.v[0x3] = 10;
        cpu.v[0x4] = 20;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x1], 44);
        assert_eq!(cpu.v[0xF], 1);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x3], 30);
        assert_eq!(cpu.v[0xF], 0);
    }

    #[test]
    fn sub_flag_requires_strictly_greater() {
        let (mut cpu, mut bus) = machine_with(&[0x81, 0x25]);
        cpu.v[0x1] = 30;
        cpu.v[0x2] = 10;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x1], 20);
        assert_eq!(cpu.v[0xF], 1);

        let (mut cpu, mut bus) = machine_with(&[0x81, 0x25]);
        cpu.v[0x1] = 10;
        cpu.v[0x2] = 10;
        cpu.v[0xF] = 1;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x1], 0);
        assert_eq!(cpu.v[0xF], 0);

        let (mut cpu, mut bus) = machine_with(&[0x81, 0x25]);
        cpu.v[0x1] = 5;
        cpu.v[0x2] = 10;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x1], 251);
        assert_eq!(cpu.v[0xF], 0);
    }

    #[test]
    fn subn_subtracts_the_other_way() {
        let (mut cpu, mut bus) = machine_with(&[0x81, 0x27]);
        cpu.v[0x1] = 10;
        cpu.v[0x2] = 30;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x1], 20);
        assert_eq!(cpu.v[0xF], 1);

        let (mut cpu, mut bus) = machine_with(&[0x81, 0x27]);
        cpu.v[0x1] = 7;
        cpu.v[0x2] = 7;
        cpu.v[0xF] = 1;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x1], 0);
        assert_eq!(cpu.v[0xF], 0);
    }

    #[test]
    fn shifts_capture_the_moved_out_bit() {
        let (mut cpu, mut bus) = machine_with(&[0x81, 0x26, 0x82, 0x2E, 0x83, 0x3E]);
        cpu.v[0x1] = 0b101;
        cpu.v[0x2] = 0x81;
        cpu.v[0x3] = 0x41;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x1], 0b10);
        assert_eq!(cpu.v[0xF], 1);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x2], 0x02);
        assert_eq!(cpu.v[0xF], 1);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x3], 0x82);
        assert_eq!(cpu.v[0xF], 0);
    }

    #[test]
    fn flag_register_keeps_the_flag_when_it_is_the_operand() {
        let (mut cpu, mut bus) = machine_with(&[0x8F, 0xF4]);
        cpu.v[0xF] = 200;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0xF], 1);
    }

    #[test]
    fn jumps_land_exactly_on_the_target() {
        let (mut cpu, mut bus) = machine_with(&[0x13, 0x00]);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.pc, 0x300);

        let (mut cpu, mut bus) = machine_with(&[0xB3, 0x00]);
        cpu.v[0x0] = 0x10;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.pc, 0x310);
    }

    #[test]
    fn skips_on_immediate_comparison() {
        let (mut cpu, mut bus) = machine_with(&[0x31, 0x42]);
        cpu.v[0x1] = 0x42;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.pc, 0x204);

        let (mut cpu, mut bus) = machine_with(&[0x31, 0x42, 0x41, 0x42]);
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.pc, 0x206);
    }

    #[test]
    fn skips_on_register_comparison() {
        let (mut cpu, mut bus) = machine_with(&[0x51, 0x20]);
        cpu.v[0x1] = 7;
        cpu.v[0x2] = 7;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.pc, 0x204);

        let (mut cpu, mut bus) = machine_with(&[0x91, 0x20]);
        cpu.v[0x1] = 7;
        cpu.v[0x2] = 8;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.pc, 0x204);
    }

    #[test]
    fn call_saves_the_call_site_and_return_resumes_past_it() {
        let mut rom = vec![0; 0x102];
        rom[0] = 0x23;
        rom[1] = 0x00;
        rom[0x100] = 0x00;
        rom[0x101] = 0xEE;
        let (mut cpu, mut bus) = machine_with(&rom);

        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.pc, 0x300);
        assert_eq!(cpu.sp, 1);
        assert_eq!(cpu.stack[0], 0x200);

        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.pc, 0x202);
        assert_eq!(cpu.sp, 0);
    }

    #[test]
    fn call_with_a_full_stack_faults_and_pauses() {
        let (mut cpu, mut bus) = machine_with(&[0x23, 0x00]);
        cpu.sp = 16;
        let fault = cpu.cycle(&mut bus).unwrap_err();
        assert_eq!(fault, Fault::StackOverflow { pc: 0x200 });
        assert_eq!(cpu.pc, 0x200);
        assert_eq!(cpu.sp, 16);
        assert_eq!(cpu.mode(), RunMode::Paused);
    }

    #[test]
    fn return_with_an_empty_stack_faults_and_pauses() {
        let (mut cpu, mut bus) = machine_with(&[0x00, 0xEE]);
        let fault = cpu.cycle(&mut bus).unwrap_err();
        assert_eq!(fault, Fault::StackUnderflow { pc: 0x200 });
        assert_eq!(cpu.pc, 0x200);
        assert_eq!(cpu.mode(), RunMode::Paused);
    }

    #[test]
    fn index_ops_set_add_and_resolve_font_glyphs() {
        let (mut cpu, mut bus) = machine_with(&[0xA1, 0x23, 0xF1, 0x1E, 0xF2, 0x29]);
        cpu.v[0x1] = 5;
        cpu.v[0x2] = 0xA;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.i, 0x123);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.i, 0x128);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.i, 50);
    }

    #[test]
    fn timers_are_set_read_and_tick_once_per_cycle() {
        let (mut cpu, mut bus) = machine_with(&[0x61, 0x05, 0xF1, 0x15, 0xF2, 0x07]);
        run(&mut cpu, &mut bus, 2);
        // the cycle that set the timer also ticked it
        assert_eq!(bus.timers.delay(), 4);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x2], 4);
        assert_eq!(bus.timers.delay(), 3);
    }

    #[test]
    fn sound_timer_drives_the_tone() {
        let (mut cpu, mut bus) = machine_with(&[0x61, 0x02, 0xF1, 0x18, 0xA1, 0x11]);
        run(&mut cpu, &mut bus, 2);
        assert_eq!(bus.timers.sound(), 1);
        assert!(bus.timers.tone_active());
        run(&mut cpu, &mut bus, 1);
        assert!(!bus.timers.tone_active());
    }

    #[test]
    fn timers_hold_still_while_paused() {
        let (mut cpu, mut bus) = machine_with(&[0x61, 0x05, 0xF1, 0x15, 0xA1, 0x11]);
        run(&mut cpu, &mut bus, 2);
        assert_eq!(bus.timers.delay(), 4);
        cpu.pause();
        run(&mut cpu, &mut bus, 3);
        assert_eq!(bus.timers.delay(), 4);
    }

    #[test]
    fn timers_hold_still_while_awaiting_a_key() {
        let (mut cpu, mut bus) = machine_with(&[0x61, 0x05, 0xF1, 0x15, 0xF3, 0x0A]);
        // the third cycle executes the wait instruction and still ticks
        run(&mut cpu, &mut bus, 3);
        assert_eq!(cpu.wait_state(), WaitState::AwaitingKey { target: 0x3 });
        assert_eq!(bus.timers.delay(), 3);
        run(&mut cpu, &mut bus, 4);
        assert_eq!(bus.timers.delay(), 3);
    }

    #[test]
    fn random_with_a_zero_mask_is_zero() {
        let (mut cpu, mut bus) = machine_with(&[0xC5, 0x00]);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x5], 0);
    }

    #[test]
    fn drawing_twice_erases_and_reports_the_collision() {
        // I stays at 0, where the font glyph for 0 lives
        let (mut cpu, mut bus) = machine_with(&[0xD0, 0x05, 0xD0, 0x05]);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0xF], 0);
        assert_eq!(bus.screen.pixels()[0][0], 1);
        assert!(bus.screen.take_redraw());

        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0xF], 1);
        assert_eq!(bus.screen.pixels()[0][0], 0);
        assert!(bus.screen.take_redraw());
    }

    #[test]
    fn draw_past_the_end_of_memory_faults_before_touching_the_screen() {
        let (mut cpu, mut bus) = machine_with(&[0xAF, 0xFF, 0xD0, 0x02]);
        run(&mut cpu, &mut bus, 1);
        let fault = cpu.cycle(&mut bus).unwrap_err();
        assert_eq!(fault, Fault::AddressOutOfRange { addr: 0x1000 });
        assert_eq!(cpu.pc, 0x202);
        assert!(!bus.screen.take_redraw());
        assert_eq!(cpu.mode(), RunMode::Paused);
    }

    #[test]
    fn bcd_spells_out_the_three_digits() {
        let (mut cpu, mut bus) = machine_with(&[0x61, 0xEA, 0xA4, 0x00, 0xF1, 0x33]);
        run(&mut cpu, &mut bus, 3);
        assert_eq!(bus.memory[0x400], 2);
        assert_eq!(bus.memory[0x401], 3);
        assert_eq!(bus.memory[0x402], 4);
    }

    #[test]
    fn bcd_past_the_end_of_memory_faults_without_writing() {
        let (mut cpu, mut bus) = machine_with(&[0xAF, 0xFE, 0x61, 0xEA, 0xF1, 0x33]);
        run(&mut cpu, &mut bus, 2);
        let fault = cpu.cycle(&mut bus).unwrap_err();
        assert_eq!(fault, Fault::AddressOutOfRange { addr: 0x1000 });
        assert_eq!(bus.memory[0xFFE], 0);
        assert_eq!(bus.memory[0xFFF], 0);
        assert_eq!(cpu.pc, 0x204);
    }

    #[test]
    fn register_file_round_trips_through_memory_without_moving_i() {
        let rom = [
            0x60, 0x01, 0x61, 0x02, 0x62, 0x03, 0x63, 0x04, // fill V0..V3
            0xA4, 0x00, // I = 0x400
            0xF3, 0x55, // store V0..V3
            0x61, 0x00, // clobber V1
            0xF3, 0x65, // load V0..V3 back
        ];
        let (mut cpu, mut bus) = machine_with(&rom);
        run(&mut cpu, &mut bus, 6);
        assert_eq!(bus.memory[0x400], 1);
        assert_eq!(bus.memory[0x403], 4);
        assert_eq!(cpu.i, 0x400);
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.v[0x1], 2);
        assert_eq!(cpu.i, 0x400);
    }

    #[test]
    fn store_registers_past_the_end_of_memory_faults() {
        let (mut cpu, mut bus) = machine_with(&[0xAF, 0xFE, 0xF3, 0x55]);
        run(&mut cpu, &mut bus, 1);
        let fault = cpu.cycle(&mut bus).unwrap_err();
        assert_eq!(fault, Fault::AddressOutOfRange { addr: 0x1001 });
        assert_eq!(bus.memory[0xFFE], 0);
    }

    #[test]
    fn skips_on_key_state() {
        // the skipped slot holds a filler so the not-pressed check is the skip target
        let (mut cpu, mut bus) = machine_with(&[0xE1, 0x9E, 0x00, 0x00, 0xE1, 0xA1]);
        cpu.v[0x1] = 0x7;
        bus.keypad.key_down(0x7);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.pc, 0x204);
        bus.keypad.key_up(0x7);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.pc, 0x208);
    }

    #[test]
    fn out_of_range_key_codes_read_as_not_pressed() {
        let (mut cpu, mut bus) = machine_with(&[0xE1, 0x9E, 0xE1, 0xA1]);
        cpu.v[0x1] = 200;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.pc, 0x202);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.pc, 0x206);
    }

    #[test]
    fn key_wait_blocks_until_a_fresh_press() {
        let (mut cpu, mut bus) = machine_with(&[0xF3, 0x0A, 0xA1, 0x11]);
        // held before the wait begins, so it must not resolve it
        bus.keypad.key_down(0x5);

        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.pc, 0x200);
        assert_eq!(cpu.wait_state(), WaitState::AwaitingKey { target: 0x3 });

        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.pc, 0x200);

        bus.keypad.key_down(0x7);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x3], 0x7);
        assert_eq!(cpu.pc, 0x202);
        assert_eq!(cpu.wait_state(), WaitState::None);

        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.i, 0x111);
        assert_eq!(cpu.pc, 0x204);
    }

    #[test]
    fn key_wait_accepts_a_tap_released_between_cycles() {
        let (mut cpu, mut bus) = machine_with(&[0xF0, 0x0A]);
        run(&mut cpu, &mut bus, 1);
        bus.keypad.key_down(0xB);
        bus.keypad.key_up(0xB);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x0], 0xB);
        assert_eq!(cpu.pc, 0x202);
    }

    #[test]
    fn single_step_while_awaiting_a_key_spends_itself_on_the_poll() {
        let (mut cpu, mut bus) = machine_with(&[0x61, 0x05, 0xF1, 0x15, 0xF3, 0x0A]);
        run(&mut cpu, &mut bus, 3);
        assert_eq!(cpu.pc, 0x204);
        // entering the wait ticked the timers for the last time
        assert_eq!(bus.timers.delay(), 3);

        cpu.pause();
        cpu.single_step();
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.pc, 0x204);
        assert_eq!(bus.timers.delay(), 3);
        assert_eq!(cpu.mode(), RunMode::Paused);
        assert_eq!(cpu.wait_state(), WaitState::AwaitingKey { target: 0x3 });

        bus.keypad.key_down(0xA);
        cpu.single_step();
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x3], 0xA);
        assert_eq!(cpu.pc, 0x206);
        assert_eq!(cpu.wait_state(), WaitState::None);
        assert_eq!(cpu.mode(), RunMode::Paused);
        assert_eq!(bus.timers.delay(), 3);
    }

    #[test]
    fn paused_processor_ignores_cycle_requests() {
        let (mut cpu, mut bus) = machine_with(&[0x61, 0x05]);
        cpu.pause();
        run(&mut cpu, &mut bus, 5);
        assert_eq!(cpu.pc, 0x200);
        assert_eq!(cpu.v[0x1], 0);
    }

    #[test]
    fn single_step_runs_exactly_one_cycle() {
        let (mut cpu, mut bus) = machine_with(&[0x61, 0x05, 0x62, 0x06]);
        cpu.pause();
        cpu.single_step();
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.v[0x1], 5);
        assert_eq!(cpu.mode(), RunMode::Paused);
        run(&mut cpu, &mut bus, 3);
        assert_eq!(cpu.v[0x2], 0);
        assert_eq!(cpu.pc, 0x202);
    }

    #[test]
    fn resume_clears_a_pending_step() {
        let (mut cpu, mut bus) = machine_with(&[0x61, 0x05, 0x62, 0x06]);
        cpu.single_step();
        cpu.resume();
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.v[0x1], 5);
        assert_eq!(cpu.v[0x2], 6);
        assert_eq!(cpu.mode(), RunMode::Running);
    }

    #[test]
    fn unknown_opcodes_are_skipped() {
        let (mut cpu, mut bus) = machine_with(&[0x00, 0x00, 0x51, 0x21, 0x61, 0x05]);
        run(&mut cpu, &mut bus, 3);
        assert_eq!(cpu.pc, 0x206);
        assert_eq!(cpu.v[0x1], 5);
    }

    #[test]
    fn fetch_past_the_end_of_memory_faults() {
        let (mut cpu, mut bus) = machine_with(&[]);
        cpu.pc = 0xFFF;
        let fault = cpu.cycle(&mut bus).unwrap_err();
        assert_eq!(fault, Fault::AddressOutOfRange { addr: 0xFFF });
        assert_eq!(cpu.mode(), RunMode::Paused);
    }
}
