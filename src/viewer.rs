/// # viewer
///
/// A stand-in engine that shows a ROM rather than running it. The 64x32
/// framebuffer holds the image as bit rows, eight bytes to a row with the
/// most significant bit leftmost, the way a sprite would be drawn. Stepping
/// scrolls through images too long to fit, one row every `STEPS_PER_ROW`
/// steps, so the speed selector visibly changes the scroll rate.
///
/// The bottom-right corner carries a 4x4 key indicator laid out like the
/// keypad; a lit cell is a key currently held down.
use crate::engine::Engine;
use crate::keypad::KeypadKey;
use crate::render::{Surface, Tone, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::rom::RomImage;

/// steps between one row of scroll and the next
pub const STEPS_PER_ROW: u64 = 10;

const BYTES_PER_ROW: usize = SCREEN_WIDTH / 8;

/// indicator cells are 2x2 with a 1px gutter
const INDICATOR_CELL: usize = 3;
const INDICATOR_SIZE: usize = 4 * INDICATOR_CELL;
const INDICATOR_X: usize = SCREEN_WIDTH - INDICATOR_SIZE;
const INDICATOR_Y: usize = SCREEN_HEIGHT - INDICATOR_SIZE;

#[derive(Debug, Default)]
pub struct RomViewer {
    rom: Option<RomImage>,
    keys: [bool; 16],
    steps: u64,
    frames: u64,
}

impl RomViewer {
    pub fn new() -> Self {
        RomViewer::default()
    }

    pub fn rom(&self) -> Option<&RomImage> {
        self.rom.as_ref()
    }

    pub fn is_pressed(&self, key: KeypadKey) -> bool {
        self.keys[key.index()]
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn rom_rows(&self) -> usize {
        self.rom
            .as_ref()
            .map(|r| (r.len() + BYTES_PER_ROW - 1) / BYTES_PER_ROW)
            .unwrap_or(0)
    }

    /// first image row shown at the top of the screen
    pub fn scroll_row(&self) -> usize {
        let rows = self.rom_rows();
        if rows <= SCREEN_HEIGHT {
            0
        } else {
            (self.steps / STEPS_PER_ROW % rows as u64) as usize
        }
    }

    fn rom_pixel(&self, x: usize, y: usize) -> bool {
        let rom = match &self.rom {
            Some(rom) => rom,
            None => return false,
        };
        let rows = self.rom_rows();
        if rows == 0 || (rows <= SCREEN_HEIGHT && y >= rows) {
            return false;
        }
        let row = (self.scroll_row() + y) % rows;
        rom.get(row * BYTES_PER_ROW + x / 8)
            .map(|byte| (byte >> (7 - x % 8)) & 1 == 1)
            .unwrap_or(false)
    }

    fn indicator_pixel(&self, x: usize, y: usize) -> bool {
        let (lx, ly) = (x - INDICATOR_X, y - INDICATOR_Y);
        if lx % INDICATOR_CELL == INDICATOR_CELL - 1 || ly % INDICATOR_CELL == INDICATOR_CELL - 1 {
            return false;
        }
        self.is_pressed(KeypadKey::LAYOUT[ly / INDICATOR_CELL][lx / INDICATOR_CELL])
    }

    /// state of one framebuffer pixel
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            false
        } else if x >= INDICATOR_X && y >= INDICATOR_Y {
            self.indicator_pixel(x, y)
        } else {
            self.rom_pixel(x, y)
        }
    }
}

impl Engine for RomViewer {
    fn reset(&mut self) {
        *self = RomViewer::default();
    }

    fn tick(&mut self) {
        self.steps += 1;
    }

    fn tick_timers(&mut self) {
        self.frames += 1;
    }

    fn keypress(&mut self, key: KeypadKey, pressed: bool) {
        self.keys[key.index()] = pressed;
    }

    fn virtual_keypress(&mut self, symbol: char, pressed: bool) {
        if let Some(key) = KeypadKey::from_symbol(symbol) {
            self.keypress(key, pressed);
        }
    }

    fn load_game(&mut self, rom: RomImage) {
        self.rom = Some(rom);
    }

    fn draw_screen(&self, surface: &mut dyn Surface, scale: u32) {
        let s = scale as usize;
        for y in 0..SCREEN_HEIGHT {
            for x in 0..SCREEN_WIDTH {
                if self.pixel(x, y) {
                    surface.fill_rect(x * s, y * s, s, s, Tone::Foreground);
                }
            }
        }
    }
}
