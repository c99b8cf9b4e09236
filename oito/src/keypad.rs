//! The `keypad` module provides the 16-key input latch. The host feeds it
//! key-down/key-up events; the processor reads it for the skip-on-key
//! instructions and to resolve the key-wait state.

/// Number of keys on the pad (`0x0..=0xF`).
const KEY_COUNT: usize = 16;

/// Input latch for the machine. Keeps the pressed state of all 16 keys and
/// remembers the most recent press so a key-wait can be resolved even when
/// the key was tapped and released between two cycles.
#[derive(Default)]
pub struct Keypad {
    pressed: [bool; KEY_COUNT],
    last_pressed: Option<u8>,
}

impl Keypad {
    /// Creates a new [`Keypad`] with every key released.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a key press. Codes outside `0x0..=0xF` are ignored.
    pub fn key_down(&mut self, code: u8) {
        if let Some(state) = self.pressed.get_mut(usize::from(code)) {
            *state = true;
            self.last_pressed = Some(code);
        }
    }

    /// Records a key release. Codes outside `0x0..=0xF` are ignored.
    pub fn key_up(&mut self, code: u8) {
        if let Some(state) = self.pressed.get_mut(usize::from(code)) {
            *state = false;
        }
    }

    /// Returns whether the given key is currently held. Codes outside the
    /// pad always read as released, so skip instructions can look up any
    /// register value safely.
    #[must_use]
    pub fn is_pressed(&self, code: u8) -> bool {
        self.pressed
            .get(usize::from(code))
            .copied()
            .unwrap_or(false)
    }

    /// The most recent press recorded since the latch was last cleared.
    #[must_use]
    pub fn last_pressed(&self) -> Option<u8> {
        self.last_pressed
    }

    /// Releases every key and forgets the last press. The processor calls
    /// this when it enters the key-wait state, so only presses arriving
    /// after the wait began can resolve it.
    pub fn clear(&mut self) {
        self.pressed = [false; KEY_COUNT];
        self.last_pressed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_pressed_state() {
        let mut keypad = Keypad::new();
        keypad.key_down(0x7);
        assert!(keypad.is_pressed(0x7));
        assert!(!keypad.is_pressed(0x8));

        keypad.key_up(0x7);
        assert!(!keypad.is_pressed(0x7));
    }

    #[test]
    fn remembers_last_press_across_release() {
        let mut keypad = Keypad::new();
        keypad.key_down(0xA);
        keypad.key_up(0xA);
        assert_eq!(keypad.last_pressed(), Some(0xA));
    }

    #[test]
    fn out_of_range_codes_are_ignored() {
        let mut keypad = Keypad::new();
        keypad.key_down(200);
        assert!(!keypad.is_pressed(200));
        assert_eq!(keypad.last_pressed(), None);
        keypad.key_up(200);
    }

    #[test]
    fn clear_releases_everything() {
        let mut keypad = Keypad::new();
        keypad.key_down(0x1);
        keypad.key_down(0xF);
        keypad.clear();
        assert!(!keypad.is_pressed(0x1));
        assert!(!keypad.is_pressed(0xF));
        assert_eq!(keypad.last_pressed(), None);
    }
}
