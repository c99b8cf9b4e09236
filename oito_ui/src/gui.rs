use std::{
    future::Future,
    sync::mpsc::{self, Receiver, Sender},
};

use eframe::{
    egui::{self, Context, Key, Ui},
    epaint::RectShape,
};
use egui::{Color32, Pos2, Rect, Rounding, Stroke};

use oito::{cpu::RunMode, screen, Machine};

use serde::{Deserialize, Serialize};

use self::windows::{
    InstructionsWindow, KeypadWindow, RegistersWindow, ScreenWindow, StackWindow, TimersWindow,
};

/// Key mapping from a standard english keyboard to the machine's key codes.
static KEY_MAP: [(Key, u8); 16] = [
    (Key::Num1, 0x1),
    (Key::Num2, 0x2),
    (Key::Num3, 0x3),
    (Key::Num4, 0xC),
    (Key::Q, 0x4),
    (Key::W, 0x5),
    (Key::E, 0x6),
    (Key::R, 0xD),
    (Key::A, 0x7),
    (Key::S, 0x8),
    (Key::D, 0x9),
    (Key::F, 0xE),
    (Key::Z, 0xA),
    (Key::X, 0x0),
    (Key::C, 0xB),
    (Key::V, 0xF),
];

/// A message sent from the GUI to the backend.
pub enum Message {
    /// Load the given ROM image into a freshly reset machine.
    LoadRom(Vec<u8>),

    /// Reset the machine and reload the ROM it was already running.
    ResetRom,

    /// Set the amount of processor cycles the machine should
    /// advance on each frame.
    SetCyclesPerFrame(u32),

    /// Update the key state of the machine. This contains
    /// a `Vec` of tuples, where each tuple contains a `u8` key
    /// code, as well as a `bool` representing if it is pressed down or not.
    UpdateKeys(Vec<(u8, bool)>),

    /// Pause a running machine, or resume a paused one.
    TogglePause,

    /// This indicates that the "step" button was clicked,
    /// meaning the user would like to execute one cycle of the
    /// paused machine.
    Step,
}

/// The current view in the `Gui`.
#[derive(Default, Deserialize, Serialize)]
enum CurrentView {
    /// Show the `ScreenView`.
    #[default]
    Screen,

    /// Show the `DebugView`.
    Debug,
}

/// A user interface constructed with `egui`,
/// with a `glow` renderer used to display the machine's screen.
#[derive(Deserialize, Serialize)]
pub struct Gui {
    config_window: ConfigWindow,
    debug_view: DebugView,
    current_view: CurrentView,
    #[serde(skip, default = "mpsc::channel")]
    message_channel: (Sender<Message>, Receiver<Message>),
}

impl Default for Gui {
    fn default() -> Self {
        Self::new()
    }
}

impl Gui {
    /// Create a new `Gui`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_window: ConfigWindow::default(),
            debug_view: DebugView::default(),
            current_view: CurrentView::default(),
            message_channel: mpsc::channel(),
        }
    }

    /// Renders the next frame, which includes any UI updates as well
    /// as the machine's screen, and returns the messages the frame queued.
    pub fn update(
        &mut self,
        ctx: &Context,
        frame: &mut eframe::Frame,
        machine: &Machine,
        rom_loaded: bool,
        fault: Option<&str>,
    ) -> Vec<Message> {
        match MenuPanel::update(
            ctx,
            frame,
            &self.current_view,
            machine,
            rom_loaded,
            fault,
            &self.message_channel.0,
        ) {
            MenuPanelResponse::ToggleConfigWindow => self.config_window.toggle_visibility(),
            MenuPanelResponse::ToggleRegistersWindow => {
                self.debug_view.registers_window.toggle_visibility();
            }
            MenuPanelResponse::ToggleStackWindow => {
                self.debug_view.stack_window.toggle_visibility();
            }
            MenuPanelResponse::ToggleScreenWindow => {
                self.debug_view.screen_window.toggle_visibility();
            }
            MenuPanelResponse::ToggleTimersWindow => {
                self.debug_view.timers_window.toggle_visibility();
            }
            MenuPanelResponse::ToggleKeypadWindow => {
                self.debug_view.keypad_window.toggle_visibility();
            }
            MenuPanelResponse::ToggleInstructionsWindow => {
                self.debug_view.instructions_window.toggle_visibility();
            }
            MenuPanelResponse::ToggleView => {
                self.current_view = match self.current_view {
                    CurrentView::Screen => CurrentView::Debug,
                    CurrentView::Debug => CurrentView::Screen,
                };
            }
            MenuPanelResponse::None => {}
        }

        let paused = matches!(machine.cpu.mode(), RunMode::Paused);

        // Keys held down on the on-screen keypad are collected while the
        // debug view draws and merged with the host keyboard below.
        let mut virtual_keys = [false; 16];
        match self.current_view {
            CurrentView::Screen => ScreenView::update(
                ctx,
                machine,
                self.config_window.foreground,
                self.config_window.background,
            ),
            CurrentView::Debug => self.debug_view.update(
                ctx,
                machine,
                paused,
                &mut virtual_keys,
                self.config_window.foreground,
                self.config_window.background,
            ),
        }

        self.config_window.update(ctx, &self.message_channel.0);

        Self::update_key_state(ctx, &virtual_keys, &self.message_channel.0);

        self.message_channel.1.try_iter().collect()
    }

    /// Reports the pressed state of every machine key, merging the host
    /// keyboard with the on-screen keypad. A keyboard captured by another
    /// widget reads as released, so typing in a text field never leaks
    /// presses into the running program.
    fn update_key_state(ctx: &Context, virtual_keys: &[bool; 16], messages: &Sender<Message>) {
        // Asking about widget focus inside the input closure would
        // re-enter the input lock.
        let keyboard_enabled = !ctx.wants_keyboard_input();

        let mut update = Vec::new();
        ctx.input(|input| {
            for (key, code) in KEY_MAP {
                let pressed = keyboard_enabled && input.keys_down.contains(&key);
                update.push((code, pressed || virtual_keys[usize::from(code)]));
            }
        });
        let _ = messages.send(Message::UpdateKeys(update));
    }
}

#[derive(Default)]
enum MenuPanelResponse {
    #[default]
    None,

    /// Indicates whether the config window should be toggled.
    ToggleConfigWindow,

    /// Indicates whether the registers window should be toggled.
    ToggleRegistersWindow,

    /// Indicates whether the stack window should be toggled.
    ToggleStackWindow,

    /// Indicates whether the screen window should be toggled.
    ToggleScreenWindow,

    /// Indicates whether the timers window should be toggled.
    ToggleTimersWindow,

    /// Indicates whether the keypad window should be toggled.
    ToggleKeypadWindow,

    /// Indicates whether the instructions window should be toggled.
    ToggleInstructionsWindow,

    /// Indicates to the `Gui` to toggle the current view.
    ToggleView,
}

/// A menu panel intended to be placed near the top of the window,
/// shows Ui widgets for selecting roms, controlling execution, etc.
struct MenuPanel {}

impl MenuPanel {
    /// Update the Ui of this `MenuPanel`. This will return a [`MenuPanelResponse`] indicating
    /// how other Ui components should be updated.
    fn update(
        ctx: &Context,
        frame: &mut eframe::Frame,
        view: &CurrentView,
        machine: &Machine,
        rom_loaded: bool,
        fault: Option<&str>,
        messages: &Sender<Message>,
    ) -> MenuPanelResponse {
        let mut response = MenuPanelResponse::default();

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open ROM").clicked() {
                        let messages = messages.clone();

                        execute(async move {
                            let file = rfd::AsyncFileDialog::new()
                                .add_filter("CHIP-8 ROM", &["ch8", "rom"])
                                .pick_file()
                                .await;
                            if let Some(file) = file {
                                let buff = file.read().await;

                                let _ = messages.send(Message::LoadRom(buff));
                            }
                        });
                    }

                    #[cfg(not(target_arch = "wasm32"))] // no File->Quit on web pages!
                    {
                        ui.separator();

                        if ui.button("Quit").clicked() {
                            frame.close();
                        }
                    }
                });

                ui.menu_button("Window", |ui| {
                    if ui.button("Config").clicked() {
                        response = MenuPanelResponse::ToggleConfigWindow;
                    }

                    if let CurrentView::Debug = view {
                        if ui.button("Registers").clicked() {
                            response = MenuPanelResponse::ToggleRegistersWindow;
                        }

                        if ui.button("Stack").clicked() {
                            response = MenuPanelResponse::ToggleStackWindow;
                        }

                        if ui.button("Screen").clicked() {
                            response = MenuPanelResponse::ToggleScreenWindow;
                        }

                        if ui.button("Timers").clicked() {
                            response = MenuPanelResponse::ToggleTimersWindow;
                        }

                        if ui.button("Keypad").clicked() {
                            response = MenuPanelResponse::ToggleKeypadWindow;
                        }

                        if ui.button("Instructions").clicked() {
                            response = MenuPanelResponse::ToggleInstructionsWindow;
                        }
                    }
                });

                if let Some(fault) = fault {
                    ui.separator();
                    ui.colored_label(Color32::RED, format!("\u{26a0} {fault}"));
                }

                Self::draw_execution_controls(ui, view, machine, rom_loaded, messages, &mut response);
            });
        });

        response
    }

    /// Draw the button that toggles the `Gui` view.
    fn window_current_view_button(
        view: &CurrentView,
        ui: &mut Ui,
        response: &mut MenuPanelResponse,
    ) {
        let label = match view {
            CurrentView::Screen => "\u{1F6E0} Debug",
            CurrentView::Debug => "\u{1F4FA} Screen",
        };
        if ui.button(label).clicked() {
            *response = MenuPanelResponse::ToggleView;
        }
    }

    /// Draw the buttons that control the loaded program's execution.
    fn draw_execution_controls(
        ui: &mut Ui,
        view: &CurrentView,
        machine: &Machine,
        rom_loaded: bool,
        messages: &Sender<Message>,
        response: &mut MenuPanelResponse,
    ) {
        let paused = matches!(machine.cpu.mode(), RunMode::Paused);

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Min), |ui| {
            Self::window_current_view_button(view, ui, response);

            let play_pause_label = if paused {
                "\u{23F5} Play"
            } else {
                "\u{23F8} Pause"
            };
            if ui
                .add_enabled(rom_loaded, egui::Button::new(play_pause_label))
                .clicked()
            {
                let _ = messages.send(Message::TogglePause);
            }

            if ui
                .add_enabled(rom_loaded && paused, egui::Button::new("\u{27A1} Step"))
                .clicked()
            {
                let _ = messages.send(Message::Step);
            }

            if ui
                .add_enabled(rom_loaded, egui::Button::new("\u{21BB} Reset"))
                .clicked()
            {
                let _ = messages.send(Message::ResetRom);
            }

            if machine.bus.timers.tone_active() {
                ui.label("\u{1F50A}");
            }
        });
    }
}

/// A screen panel that displays the machine's screen contents.
/// Note that this component uses an [`egui::CentralPanel`], and should be added
/// after all other panels.
struct ScreenView {}

impl ScreenView {
    /// Update and draw this `ScreenView`. This creates a central panel, therefore it
    /// should be called after all other panels are drawn.
    fn update(ctx: &Context, machine: &Machine, foreground: Color32, background: Color32) {
        egui::CentralPanel::default()
            .frame(egui::Frame::default().inner_margin(egui::vec2(0.0, 0.0)))
            .show(ctx, |ui| {
                Self::draw_screen(ui, machine, foreground, background);
            });
    }

    /// Draw the machine's screen contents onto a `Ui` object.
    ///
    /// This uses the rest of the available size in the `Ui`.
    fn draw_screen(ui: &mut Ui, machine: &Machine, foreground: Color32, background: Color32) {
        ui.with_layout(
            egui::Layout::top_down_justified(egui::Align::Center),
            |ui| {
                egui::Frame::canvas(ui.style()).show(ui, |ui| {
                    let (rect, _) = ui.allocate_exact_size(
                        ui.available_size(),
                        egui::Sense::focusable_noninteractive(),
                    );

                    let pixel_width = rect.size().x / screen::WIDTH as f32;
                    let pixel_height = rect.size().y / screen::HEIGHT as f32;

                    // Create a list of rectangles to draw, one per lit pixel;
                    // unlit pixels are covered by the background fill.
                    let mut rects = Vec::new();
                    for (row, pixels) in machine.bus.screen.pixels().iter().enumerate() {
                        for (col, pixel) in pixels.iter().enumerate() {
                            if *pixel == 0 {
                                continue;
                            }
                            let rect_x = rect.left() + col as f32 * pixel_width;
                            let rect_y = rect.top() + row as f32 * pixel_height;
                            rects.push(Rect::from_min_max(
                                Pos2 {
                                    x: rect_x,
                                    y: rect_y,
                                },
                                Pos2 {
                                    x: rect_x + pixel_width,
                                    y: rect_y + pixel_height,
                                },
                            ));
                        }
                    }

                    // Draw the list of rectangles
                    let painter = ui.painter();
                    painter.rect_filled(rect, Rounding::ZERO, background);
                    painter.extend(rects.iter().map(|rect| {
                        egui::Shape::Rect(RectShape::new(
                            *rect,
                            Rounding::ZERO,
                            foreground,
                            Stroke::new(1.0, foreground),
                        ))
                    }));
                });
            },
        );
    }
}

/// A configuration window which allows the user to customize
/// the display colors and the speed of the machine.
#[derive(Deserialize, Serialize)]
struct ConfigWindow {
    visible: bool,
    foreground: Color32,
    background: Color32,
    cycles_per_frame: u32,
}

impl Default for ConfigWindow {
    fn default() -> Self {
        Self {
            visible: false,
            foreground: Color32::WHITE,
            background: Color32::BLACK,
            cycles_per_frame: crate::app::DEFAULT_CYCLES_PER_FRAME,
        }
    }
}

impl ConfigWindow {
    /// Update and render the `ConfigWindow` to the given `Context`.
    /// This will append any GUI messages to `messages` if the machine should be updated.
    fn update(&mut self, ctx: &Context, messages: &Sender<Message>) {
        egui::Window::new("Config")
            .open(&mut self.visible)
            .show(ctx, |ui| {
                egui::Grid::new("config_grid").show(ui, |ui| {
                    // the colors live entirely on this side of the channel;
                    // the screen is drawn with them on the next frame
                    ui.label("Foreground Color");
                    ui.color_edit_button_srgba(&mut self.foreground);
                    ui.end_row();

                    ui.label("Background Color");
                    ui.color_edit_button_srgba(&mut self.background);
                    ui.end_row();

                    ui.label("Cycles Per Frame");
                    let drag = egui::DragValue::new(&mut self.cycles_per_frame).clamp_range(1..=100);
                    let response = ui.add(drag);
                    if response.changed() {
                        let _ = messages.send(Message::SetCyclesPerFrame(self.cycles_per_frame));
                    }
                    response.on_hover_text(
                        "How many processor cycles run on each rendered frame. \
                        Raise this to speed a program up, lower it to slow it down.",
                    );
                    ui.end_row();
                });
            });
    }

    /// Toggle the visibility of this `ConfigWindow`.
    fn toggle_visibility(&mut self) {
        self.visible = !self.visible;
    }
}

mod windows {
    use egui::{Color32, Context, RichText, Ui};
    use serde::{Deserialize, Serialize};

    use oito::{disasm, Machine};

    use super::ScreenView;

    #[derive(Default, Deserialize, Serialize)]
    pub struct RegistersWindow {
        visible: bool,
    }

    impl RegistersWindow {
        pub fn toggle_visibility(&mut self) {
            self.visible = !self.visible;
        }

        /// Draw a window that shows every register in the given machine.
        pub fn view(&mut self, ctx: &Context, machine: &Machine) {
            egui::Window::new("Registers")
                .open(&mut self.visible)
                .show(ctx, |ui| {
                    egui::Grid::new("registers_grid")
                        .striped(true)
                        .num_columns(2)
                        .show(ui, |ui| {
                            ui.heading("PC");
                            ui.heading(format!("{:#06X}", machine.cpu.pc));
                            ui.end_row();
                            ui.heading("I");
                            ui.heading(format!("{:#06X}", machine.cpu.i));
                            ui.end_row();
                            for (i, register) in machine.cpu.v.iter().enumerate() {
                                ui.heading(format!("V{i:X}"));
                                ui.heading(format!("{register:#04X}"));
                                ui.end_row();
                            }
                        })
                });
        }
    }

    #[derive(Default, Deserialize, Serialize)]
    pub struct StackWindow {
        visible: bool,
    }

    impl StackWindow {
        pub fn toggle_visibility(&mut self) {
            self.visible = !self.visible;
        }

        /// Draw a window that shows information about the stack
        /// (stack pointer, stack slots) of the given machine.
        pub fn view(&mut self, ctx: &Context, machine: &Machine) {
            egui::Window::new("Stack")
                .open(&mut self.visible)
                .show(ctx, |ui| {
                    ui.heading(format!("Pointer: {}", machine.cpu.sp));
                    egui::Grid::new("stack_grid")
                        .striped(true)
                        .num_columns(2)
                        .show(ui, |ui| {
                            for (i, value) in machine.cpu.stack.iter().enumerate() {
                                ui.heading(i.to_string());
                                ui.heading(format!("{value:#06X}"));
                                ui.end_row();
                            }
                        });
                });
        }
    }

    #[derive(Default, Deserialize, Serialize)]
    pub struct ScreenWindow {
        visible: bool,
    }

    impl ScreenWindow {
        pub fn toggle_visibility(&mut self) {
            self.visible = !self.visible;
        }

        /// Draw a window that displays the machine's screen contents.
        pub fn view(
            &mut self,
            ctx: &Context,
            machine: &Machine,
            foreground: Color32,
            background: Color32,
        ) {
            egui::Window::new("Screen")
                .open(&mut self.visible)
                .default_size(egui::vec2(500.0, 250.0))
                .show(ctx, |ui| {
                    ScreenView::draw_screen(ui, machine, foreground, background);
                });
        }
    }

    #[derive(Default, Deserialize, Serialize)]
    pub struct TimersWindow {
        visible: bool,
    }

    impl TimersWindow {
        pub fn toggle_visibility(&mut self) {
            self.visible = !self.visible;
        }

        /// Draw a window that displays the state of both the delay and sound
        /// timer of the given machine.
        pub fn view(&mut self, ctx: &Context, machine: &Machine) {
            egui::Window::new("Timers")
                .open(&mut self.visible)
                .show(ctx, |ui| {
                    egui::Grid::new("timer_grid").show(ui, |ui| {
                        ui.heading("Delay");
                        ui.heading(machine.bus.timers.delay().to_string());
                        ui.end_row();
                        ui.heading("Sound");
                        ui.heading(machine.bus.timers.sound().to_string());
                    });
                });
        }
    }

    #[derive(Default, Deserialize, Serialize)]
    pub struct KeypadWindow {
        visible: bool,
    }

    impl KeypadWindow {
        pub fn toggle_visibility(&mut self) {
            self.visible = !self.visible;
        }

        /// Draw a window that displays the current pressed state of the keys
        /// in the given machine. Holding a key down with the pointer presses
        /// the matching machine key.
        pub fn view(&mut self, ctx: &Context, machine: &Machine, virtual_keys: &mut [bool; 16]) {
            egui::Window::new("Keypad")
                .open(&mut self.visible)
                .show(ctx, |ui| {
                    ui.style_mut().override_text_style = Some(egui::TextStyle::Heading);
                    let mut key = |ui: &mut Ui, code: u8| {
                        let label = egui::SelectableLabel::new(
                            machine.bus.keypad.is_pressed(code),
                            format!("{code:X}"),
                        );

                        if ui.add(label).is_pointer_button_down() {
                            virtual_keys[usize::from(code)] = true;
                        }
                    };

                    egui::Grid::new("keypad_grid").show(ui, |ui| {
                        // layout the keys manually
                        key(ui, 1);
                        key(ui, 2);
                        key(ui, 3);
                        key(ui, 0xC);
                        ui.end_row();

                        key(ui, 4);
                        key(ui, 5);
                        key(ui, 6);
                        key(ui, 0xD);
                        ui.end_row();

                        key(ui, 7);
                        key(ui, 8);
                        key(ui, 9);
                        key(ui, 0xE);
                        ui.end_row();

                        key(ui, 0xA);
                        key(ui, 0);
                        key(ui, 0xB);
                        key(ui, 0xF);
                    });
                });
        }
    }

    #[derive(Default, Deserialize, Serialize)]
    pub struct InstructionsWindow {
        visible: bool,
    }

    impl InstructionsWindow {
        pub fn toggle_visibility(&mut self) {
            self.visible = !self.visible;
        }

        /// Draw a window that shows the instructions around the current
        /// program counter, in their opcode form as well as a more
        /// descriptive readable form.
        pub fn view(&mut self, ctx: &Context, machine: &Machine, paused: bool) {
            egui::Window::new("Instructions")
                .open(&mut self.visible)
                .show(ctx, |ui| {
                    if !paused {
                        ui.heading("Pause the execution to inspect instructions.");
                        return;
                    }

                    ui.heading(format!(
                        "Current Program Counter: {:#06X}",
                        machine.cpu.pc
                    ));
                    ui.separator();

                    egui::ScrollArea::vertical()
                        .auto_shrink([false, false])
                        .show(ui, |ui| {
                            egui::Grid::new("instr_grid")
                                .striped(true)
                                .num_columns(3)
                                .show(ui, |ui| {
                                    ui.heading("Address");
                                    ui.add(egui::Separator::default().vertical());
                                    ui.heading("Opcode");
                                    ui.add(egui::Separator::default().vertical());
                                    ui.heading("Description");
                                    ui.end_row();
                                    for line in disasm::window(&machine.bus.memory, machine.cpu.pc, 8)
                                    {
                                        let color = if line.address == machine.cpu.pc {
                                            Color32::YELLOW
                                        } else {
                                            ui.visuals().text_color()
                                        };
                                        ui.heading(
                                            RichText::new(format!("{:#06X}", line.address))
                                                .color(color),
                                        );
                                        ui.add(egui::Separator::default().vertical());
                                        ui.heading(
                                            RichText::new(format!("{:#06X}", line.opcode))
                                                .color(color),
                                        );
                                        ui.add(egui::Separator::default().vertical());
                                        ui.heading(RichText::new(line.text).color(color));
                                        ui.end_row();
                                    }
                                });
                        });
                });
        }
    }
}

/// A debug screen showing the details of the underlying state of the machine,
/// such as registers, stack memory, instructions, and timers.
#[derive(Default, Deserialize, Serialize)]
struct DebugView {
    registers_window: RegistersWindow,
    stack_window: StackWindow,
    screen_window: ScreenWindow,
    timers_window: TimersWindow,
    keypad_window: KeypadWindow,
    instructions_window: InstructionsWindow,
}

impl DebugView {
    /// Update the `DebugView`. This will draw all windows on the given context,
    /// and should be called last.
    fn update(
        &mut self,
        ctx: &Context,
        machine: &Machine,
        paused: bool,
        virtual_keys: &mut [bool; 16],
        foreground: Color32,
        background: Color32,
    ) {
        self.registers_window.view(ctx, machine);
        self.stack_window.view(ctx, machine);
        self.screen_window.view(ctx, machine, foreground, background);
        self.timers_window.view(ctx, machine);
        self.keypad_window.view(ctx, machine, virtual_keys);
        self.instructions_window.view(ctx, machine, paused);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn execute<F: Future<Output = ()> + Send + 'static>(f: F) {
    std::thread::spawn(move || futures_executor::block_on(f));
}

#[cfg(target_arch = "wasm32")]
fn execute<F: Future<Output = ()> + 'static>(f: F) {
    wasm_bindgen_futures::spawn_local(f);
}
