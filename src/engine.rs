use crate::keypad::KeypadKey;
use crate::render::Surface;
use crate::rom::RomImage;

/// The emulation engine, as seen by the host. The host owns exactly one of
/// these for the life of the process and resets it in place between ROMs.
///
/// None of these calls are expected to be made concurrently; the host drives
/// them all from one thread.
pub trait Engine {
    /// back to power-on state, with no ROM loaded
    fn reset(&mut self);

    /// execute one unit of emulation work
    fn tick(&mut self);

    /// advance the engine's timers by one frame
    fn tick_timers(&mut self);

    /// update one key, from a physical keyboard
    fn keypress(&mut self, key: KeypadKey, pressed: bool);

    /// update one key by its symbol, from an on-screen keypad
    fn virtual_keypress(&mut self, symbol: char, pressed: bool);

    /// install a ROM for execution; the engine keeps the image
    fn load_game(&mut self, rom: RomImage);

    /// paint the framebuffer onto `surface`, each pixel `scale` surface pixels square
    fn draw_screen(&self, surface: &mut dyn Surface, scale: u32);
}
