//! The `timers` module provides the delay and sound countdown timers. Both
//! count down by one per executed cycle; the sound timer doubles as the tone
//! signal, which should sound for as long as it is above zero.

/// The two countdown timers of the machine.
#[derive(Default)]
pub struct Timers {
    delay: u8,
    sound: u8,
}

impl Timers {
    /// Creates new [`Timers`] with both counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts both timers down by one, stopping at zero. Called once per
    /// executed cycle; paused or key-blocked cycles do not tick.
    pub fn tick(&mut self) {
        self.delay = self.delay.saturating_sub(1);
        self.sound = self.sound.saturating_sub(1);
    }

    /// The current delay timer value.
    #[must_use]
    pub fn delay(&self) -> u8 {
        self.delay
    }

    /// The current sound timer value.
    #[must_use]
    pub fn sound(&self) -> u8 {
        self.sound
    }

    pub fn set_delay(&mut self, value: u8) {
        self.delay = value;
    }

    pub fn set_sound(&mut self, value: u8) {
        self.sound = value;
    }

    /// Whether the tone should currently be sounding. The signal drops on
    /// the tick that takes the sound timer from 1 to 0.
    #[must_use]
    pub fn tone_active(&self) -> bool {
        self.sound > 0
    }
}
