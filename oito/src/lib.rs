//! An interpreter for the CHIP-8 virtual machine: 4 KiB of memory, sixteen
//! byte-sized registers, a 64x32 monochrome display and a sixteen key pad.
//! The [`Machine`] struct wires a [`cpu::Cpu`] to the [`Bus`]; hosts drive
//! it one cycle at a time and repaint whenever the redraw flag is raised.

use crate::cpu::Cpu;

pub mod cpu;
pub mod disasm;
pub mod fault;
pub mod keypad;
pub mod memory;
pub mod opcode;
pub mod screen;
pub mod timers;

/// The [`Bus`] struct holds every component the processor can reach.
#[derive(Default)]
pub struct Bus {
    /// The sixteen key input latch.
    pub keypad: keypad::Keypad,

    /// The 4 KiB memory space, with the font loaded at the bottom.
    pub memory: memory::Memory,

    /// The 64x32 monochrome display buffer.
    pub screen: screen::Screen,

    /// The delay and sound timers.
    pub timers: timers::Timers,
}

/// A complete machine: processor plus bus.
#[derive(Default)]
pub struct Machine {
    /// The processor. Executes the instructions in memory.
    pub cpu: Cpu,

    /// The components the processor executes against.
    pub bus: Bus,
}

impl Machine {
    /// Creates a powered-on machine with an empty program area.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Executes one processor cycle.
    ///
    /// # Errors
    ///
    /// Returns the [`fault::Fault`] the cycle ran into; the machine is left
    /// paused on the faulting instruction.
    pub fn step(&mut self) -> fault::Result<()> {
        self.cpu.cycle(&mut self.bus)
    }

    /// Copies a program into memory at the program start address. Call
    /// [`Machine::reset`] first to rerun a program on a clean machine.
    pub fn load_rom(&mut self, data: &[u8]) {
        self.bus.memory.load(data);
    }

    /// Restores the power-on state: cleared registers and screen, the font
    /// back at the bottom of memory, and the processor running. The redraw
    /// flag is left raised so hosts repaint the blank screen.
    pub fn reset(&mut self) {
        self.bus = Bus::default();
        self.bus.screen.clear();
        self.cpu = Cpu::new();
    }

    /// Resets the machine and loads a program in one go.
    pub fn reset_and_load(&mut self, data: &[u8]) {
        self.reset();
        self.load_rom(data);
    }

    /// Records a key press on the pad.
    pub fn key_down(&mut self, code: u8) {
        self.bus.keypad.key_down(code);
    }

    /// Records a key release on the pad.
    pub fn key_up(&mut self, code: u8) {
        self.bus.keypad.key_up(code);
    }

    /// Stop executing cycles until resumed or stepped.
    pub fn pause(&mut self) {
        self.cpu.pause();
    }

    /// Resume free-running execution.
    pub fn resume(&mut self) {
        self.cpu.resume();
    }

    /// Execute exactly one cycle, then stay paused.
    pub fn single_step(&mut self) {
        self.cpu.single_step();
    }

    /// Reads and clears the redraw flag.
    pub fn take_redraw(&mut self) -> bool {
        self.bus.screen.take_redraw()
    }
}
