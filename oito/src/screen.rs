//! The `screen` module provides the 64x32 monochrome display buffer. Pixels
//! are single bits mutated only through the XOR sprite blit; how they end up
//! colored on an actual screen is the host's business.

use std::mem;

/// The height of the display buffer in pixels.
pub const HEIGHT: usize = 32;
/// The width of the display buffer in pixels.
pub const WIDTH: usize = 64;

/// The display buffer. Holds one byte per pixel (0 or 1), a row per inner
/// array, plus a flag telling the host the buffer changed since it last
/// looked.
pub struct Screen {
    pixels: [[u8; WIDTH]; HEIGHT],
    redraw: bool,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            pixels: [[0; WIDTH]; HEIGHT],
            redraw: false,
        }
    }
}

impl Screen {
    /// Creates a new, blank [`Screen`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// XOR-blits a sprite whose rows are the given bytes (one byte is 8
    /// horizontal pixels, most significant bit first) at origin `(x, y)`.
    /// Both axes wrap around, so sprites drawn over an edge continue on the
    /// opposite side. Returns whether any pixel that was lit got toggled off.
    ///
    /// The redraw flag is raised even for an empty sprite.
    pub fn draw_sprite(&mut self, x: u8, y: u8, sprite: &[u8]) -> bool {
        self.redraw = true;

        let mut erased = 0;
        for (row, &byte) in sprite.iter().enumerate() {
            let py = (usize::from(y) + row) % HEIGHT;
            for bit in 0..8 {
                let px = (usize::from(x) + bit) % WIDTH;
                let pixel = (byte >> (7 - bit)) & 1;
                erased |= pixel & self.pixels[py][px];
                self.pixels[py][px] ^= pixel;
            }
        }
        erased != 0
    }

    /// Turns every pixel off and raises the redraw flag.
    pub fn clear(&mut self) {
        self.pixels = [[0; WIDTH]; HEIGHT];
        self.redraw = true;
    }

    /// Returns the pixel rows, one byte (0 or 1) per pixel.
    #[must_use]
    pub fn pixels(&self) -> &[[u8; WIDTH]; HEIGHT] {
        &self.pixels
    }

    /// Whether the buffer changed since the flag was last taken.
    #[must_use]
    pub fn redraw_needed(&self) -> bool {
        self.redraw
    }

    /// Consumes the redraw flag, returning whether it was raised.
    pub fn take_redraw(&mut self) -> bool {
        mem::take(&mut self.redraw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_zeroes_pixels_and_flags_redraw() {
        let mut screen = Screen::new();
        screen.draw_sprite(0, 0, &[0xFF]);
        screen.take_redraw();

        screen.clear();
        assert!(screen.pixels().iter().flatten().all(|&p| p == 0));
        assert!(screen.redraw_needed());
    }

    #[test]
    fn draw_reports_no_collision_on_blank_screen() {
        let mut screen = Screen::new();
        assert!(!screen.draw_sprite(4, 2, &[0b1010_0101]));
        assert_eq!(screen.pixels()[2][4], 1);
        assert_eq!(screen.pixels()[2][5], 0);
        assert_eq!(screen.pixels()[2][6], 1);
        assert_eq!(screen.pixels()[2][11], 1);
    }

    #[test]
    fn double_draw_erases_and_collides() {
        let mut screen = Screen::new();
        let sprite = [0xF0, 0x90, 0xF0];
        assert!(!screen.draw_sprite(10, 5, &sprite));
        assert!(screen.draw_sprite(10, 5, &sprite));
        assert!(screen.pixels().iter().flatten().all(|&p| p == 0));
    }

    #[test]
    fn sprite_wraps_past_the_right_edge() {
        let mut screen = Screen::new();
        screen.draw_sprite(60, 0, &[0xFF]);
        // columns 60..64 on the right, 0..4 back on the left
        for px in 60..WIDTH {
            assert_eq!(screen.pixels()[0][px], 1);
        }
        for px in 0..4 {
            assert_eq!(screen.pixels()[0][px], 1);
        }
        assert_eq!(screen.pixels()[0][4], 0);
    }

    #[test]
    fn sprite_wraps_past_the_bottom_edge() {
        let mut screen = Screen::new();
        screen.draw_sprite(0, 31, &[0x80, 0x80]);
        assert_eq!(screen.pixels()[31][0], 1);
        assert_eq!(screen.pixels()[0][0], 1);
    }

    #[test]
    fn origin_beyond_the_screen_wraps_too() {
        let mut screen = Screen::new();
        screen.draw_sprite(64, 32, &[0x80]);
        assert_eq!(screen.pixels()[0][0], 1);
    }

    #[test]
    fn empty_sprite_still_raises_redraw() {
        let mut screen = Screen::new();
        assert!(!screen.draw_sprite(0, 0, &[]));
        assert!(screen.take_redraw());
        assert!(!screen.redraw_needed());
    }
}
