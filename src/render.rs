use crate::engine::Engine;

/// width of the emulated display, in CHIP-8 pixels
pub const SCREEN_WIDTH: usize = 64;
/// height of the emulated display, in CHIP-8 pixels
pub const SCREEN_HEIGHT: usize = 32;

/// monochrome: everything is either background or lit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Background,
    Foreground,
}

/// Something the engine can paint on.
pub trait Surface {
    /// (width, height) in surface pixels
    fn size(&self) -> (usize, usize);

    /// set every pixel to `tone`
    fn clear(&mut self, tone: Tone);

    /// fill a rectangle; anything outside the surface is clipped
    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, tone: Tone);
}

/// Clear the whole surface, then have the engine paint its framebuffer at
/// `scale`. No diffing: every frame is a full repaint.
pub fn render_frame(engine: &dyn Engine, surface: &mut dyn Surface, scale: u32) {
    surface.clear(Tone::Background);
    engine.draw_screen(surface, scale);
}

/// An in-memory surface, big enough for the display at a given scale.
#[derive(Debug, Clone)]
pub struct PixelSurface {
    width: usize,
    height: usize,
    pixels: Vec<Tone>,
}

impl PixelSurface {
    pub fn new(width: usize, height: usize) -> Self {
        PixelSurface {
            width,
            height,
            pixels: vec![Tone::Background; width * height],
        }
    }

    /// a surface that fits the 64x32 display at `scale`
    pub fn for_scale(scale: u32) -> Self {
        let scale = scale.max(1) as usize;
        Self::new(SCREEN_WIDTH * scale, SCREEN_HEIGHT * scale)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Tone> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    /// coordinates of every pixel with the given tone, row by row
    pub fn points(&self, tone: Tone) -> impl Iterator<Item = (usize, usize)> + '_ {
        let w = self.width;
        self.pixels
            .iter()
            .enumerate()
            .filter(move |(_, t)| **t == tone)
            .map(move |(i, _)| (i % w, i / w))
    }
}

impl Surface for PixelSurface {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn clear(&mut self, tone: Tone) {
        self.pixels.fill(tone);
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, tone: Tone) {
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        for row in y.min(y_end)..y_end {
            let start = row * self.width;
            self.pixels[start + x.min(x_end)..start + x_end].fill(tone);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingEngine};

    #[test]
    fn test_surface_for_scale() {
        assert_eq!(PixelSurface::for_scale(1).size(), (64, 32));
        assert_eq!(PixelSurface::for_scale(15).size(), (960, 480));
        // zero scale would leave nothing to draw on
        assert_eq!(PixelSurface::for_scale(0).size(), (64, 32));
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut s = PixelSurface::new(4, 4);
        s.fill_rect(2, 2, 10, 10, Tone::Foreground);
        assert_eq!(s.points(Tone::Foreground).count(), 4);
        assert_eq!(s.get(3, 3), Some(Tone::Foreground));
        assert_eq!(s.get(1, 3), Some(Tone::Background));
        s.fill_rect(7, 7, 2, 2, Tone::Foreground);
        assert_eq!(s.points(Tone::Foreground).count(), 4);
        assert_eq!(s.get(4, 0), None);
    }

    #[test]
    fn test_clear() {
        let mut s = PixelSurface::new(8, 2);
        s.clear(Tone::Foreground);
        assert_eq!(s.points(Tone::Background).count(), 0);
        s.clear(Tone::Background);
        assert_eq!(s.points(Tone::Foreground).count(), 0);
    }

    #[test]
    fn test_points_order() {
        let mut s = PixelSurface::new(3, 2);
        s.fill_rect(2, 0, 1, 2, Tone::Foreground);
        assert_eq!(s.points(Tone::Foreground).collect::<Vec<_>>(), vec![(2, 0), (2, 1)]);
    }

    #[test]
    fn test_render_clears_before_paint() {
        let engine = RecordingEngine::new();
        let mut s = PixelSurface::new(4, 4);
        s.fill_rect(0, 0, 4, 4, Tone::Foreground);
        render_frame(&engine, &mut s, 3);
        // the recording engine paints nothing, so only the clear is visible
        assert_eq!(s.points(Tone::Foreground).count(), 0);
        assert_eq!(engine.calls(), vec![Call::DrawScreen(3)]);
    }
}
