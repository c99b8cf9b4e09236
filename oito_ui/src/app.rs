use oito::cpu::RunMode;
use oito::Machine;

use crate::gui::{Gui, Message};

/// How many processor cycles run on each rendered frame unless the user
/// picks another rate.
pub const DEFAULT_CYCLES_PER_FRAME: u32 = 10;

/// We derive Deserialize/Serialize so we can persist app state on shutdown.
/// Only interface settings are persisted; the machine itself always starts
/// from power-on state.
#[derive(serde::Deserialize, serde::Serialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct App {
    #[serde(skip)]
    machine: Machine,
    gui: Gui,
    cycles_per_frame: u32,
    #[serde(skip)]
    rom: Vec<u8>,
    #[serde(skip)]
    rom_loaded: bool,
    #[serde(skip)]
    fault: Option<String>,
    #[serde(skip)]
    keys: [bool; 16],
}

impl Default for App {
    fn default() -> Self {
        Self {
            machine: Machine::new(),
            gui: Gui::default(),
            cycles_per_frame: DEFAULT_CYCLES_PER_FRAME,
            rom: Vec::default(),
            rom_loaded: false,
            fault: None,
            keys: [false; 16],
        }
    }
}

impl eframe::App for App {
    /// Called by the framework to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        if self.rom_loaded {
            for _ in 0..self.cycles_per_frame {
                if self.machine.cpu.mode() != RunMode::Running {
                    break;
                }
                self.step_machine();
            }
        }

        let messages = self
            .gui
            .update(ctx, frame, &self.machine, self.rom_loaded, self.fault.as_deref());
        for message in messages {
            self.handle_message(message);
        }

        // Keep rendering while the program runs; a paused machine only needs
        // a repaint when something marked the screen dirty.
        if self.machine.take_redraw()
            || (self.rom_loaded && self.machine.cpu.mode() == RunMode::Running)
        {
            ctx.request_repaint();
        }
    }
}

impl App {
    /// Creates a new [`App`] instance.
    ///
    /// Called once before the first frame.
    #[must_use]
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Load previous app state (if any).
        // Note that you must enable the `persistence` feature for this to work.
        let mut app = cc
            .storage
            .and_then(|storage| eframe::get_value::<Self>(storage, eframe::APP_KEY))
            .unwrap_or_default();

        if let Some(data) = Self::rom_from_args() {
            app.machine.reset_and_load(&data);
            app.rom = data;
            app.rom_loaded = true;
        }

        app
    }

    /// Runs one machine cycle and records any fault it raises.
    fn step_machine(&mut self) {
        if let Err(fault) = self.machine.step() {
            self.fault = Some(fault.to_string());
        }
    }

    /// Applies a state-changing message sent by the [`Gui`].
    fn handle_message(&mut self, message: Message) {
        match message {
            Message::LoadRom(data) => {
                self.machine.reset_and_load(&data);
                self.rom = data;
                self.rom_loaded = true;
                self.fault = None;
                self.keys = [false; 16];
            }
            Message::ResetRom => {
                if self.rom_loaded {
                    self.machine.reset_and_load(&self.rom);
                }
                self.fault = None;
                self.keys = [false; 16];
            }
            Message::SetCyclesPerFrame(cycles) => self.cycles_per_frame = cycles,
            Message::UpdateKeys(updates) => {
                for (code, pressed) in updates {
                    let index = usize::from(code);
                    if self.keys[index] == pressed {
                        continue;
                    }
                    self.keys[index] = pressed;
                    if pressed {
                        self.machine.key_down(code);
                    } else {
                        self.machine.key_up(code);
                    }
                }
            }
            Message::TogglePause => match self.machine.cpu.mode() {
                RunMode::Paused => self.machine.resume(),
                RunMode::Running | RunMode::StepPending => self.machine.pause(),
            },
            Message::Step => {
                self.machine.single_step();
                self.step_machine();
            }
        }
    }

    /// Get the ROM data from the path provided as the first argument when
    /// run from the command line.
    fn rom_from_args() -> Option<Vec<u8>> {
        let path = std::env::args().nth(1)?;
        match Self::read_rom(&path) {
            Ok(data) => Some(data),
            Err(e) => {
                log::error!("Failed to read ROM from {path}: {e:#}");
                None
            }
        }
    }

    /// Reads a ROM file, rejecting ones that cannot possibly run.
    fn read_rom(path: &str) -> anyhow::Result<Vec<u8>> {
        use anyhow::Context;

        let data = std::fs::read(path).with_context(|| format!("could not read {path}"))?;
        anyhow::ensure!(!data.is_empty(), "{path} is empty");
        Ok(data)
    }
}
