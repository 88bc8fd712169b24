use crate::cadence::SpeedMultiplier;
use crate::keypad::KeypadKey;
use crate::render::{PixelSurface, Surface, Tone};
use std::io;
use tui::backend::{Backend, CrosstermBackend};
use tui::layout::{Alignment, Rect};
use tui::style::{Color, Modifier, Style};
use tui::symbols::Marker;
use tui::text::Span;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders, Paragraph};
use tui::{Frame, Terminal};

/// Everything around the picture that the display shows: what's loaded, how
/// fast, and anything the user has to acknowledge.
#[derive(Debug, Clone, Default)]
pub struct StatusView<'a> {
    pub rom: Option<&'a str>,
    pub speed: SpeedMultiplier,
    /// catalog entry `Tab` would select next
    pub next_entry: Option<&'a str>,
    /// catalog fetch in flight
    pub loading: Option<&'a str>,
    pub alert: Option<&'a str>,
    /// open-file prompt being typed
    pub prompt: Option<&'a str>,
    /// on-screen button held with the mouse
    pub held: Option<KeypadKey>,
}

impl StatusView<'_> {
    pub fn status_line(&self) -> String {
        if let Some(path) = self.prompt {
            return format!("open ROM file: {}_  (Enter to load, Esc to cancel)", path);
        }
        let mut line = match (self.loading, self.rom) {
            (Some(name), _) => format!("loading {}...", name),
            (None, Some(name)) => name.to_string(),
            (None, None) => "no ROM".to_string(),
        };
        line.push_str(&format!("  speed {}  [/] slower/faster", self.speed));
        if let Some(next) = self.next_entry {
            line.push_str(&format!("  Tab: {}", next));
        }
        line.push_str("  o: open file  Esc: quit");
        line
    }

    pub fn alert_line(&self) -> Option<String> {
        self.alert.map(|a| format!("{} (Enter to dismiss)", a))
    }
}

/// Display shows the rendered surface to the user. It should abstract the
/// implementation details, so a variety of kinds of screen would work.
pub trait Display {
    fn present(&mut self, surface: &PixelSurface, status: &StatusView) -> Result<(), io::Error>;

    /// where the on-screen keypad is, for hit-testing pointer events
    fn keypad(&self) -> Option<&KeypadPanel>;
}

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Background => Color::Black,
        Tone::Foreground => Color::White,
    }
}

/// canvas bounds for a surface, one terminal cell per surface pixel, with
/// y flipped since the canvas origin is bottom-left
fn bounds(size: (usize, usize)) -> ([f64; 2], [f64; 2]) {
    let (w, h) = size;
    (
        [0.0, w.saturating_sub(1) as f64],
        [-(h.saturating_sub(1) as f64), 0.0],
    )
}

fn tone_points(surface: &PixelSurface, tone: Tone) -> Vec<(f64, f64)> {
    surface
        .points(tone)
        .map(|(x, y)| (x as f64, -(y as f64)))
        .collect()
}

const BUTTON_W: u16 = 5;
const BUTTON_H: u16 = 3;

/// The on-screen keypad: 4x4 labelled buttons laid out like the real pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeypadPanel {
    x: u16,
    y: u16,
}

impl KeypadPanel {
    pub fn at(x: u16, y: u16) -> Self {
        KeypadPanel { x, y }
    }

    pub fn area(&self) -> Rect {
        Rect::new(self.x, self.y, 4 * BUTTON_W, 4 * BUTTON_H)
    }

    pub fn button(&self, key: KeypadKey) -> Rect {
        let (row, col) = KeypadKey::LAYOUT
            .iter()
            .enumerate()
            .find_map(|(r, keys)| keys.iter().position(|k| *k == key).map(|c| (r, c)))
            .unwrap_or((0, 0));
        Rect::new(
            self.x + col as u16 * BUTTON_W,
            self.y + row as u16 * BUTTON_H,
            BUTTON_W,
            BUTTON_H,
        )
    }

    /// which button, if any, covers the terminal cell (`col`, `row`)
    pub fn key_at(&self, col: u16, row: u16) -> Option<KeypadKey> {
        if col < self.x || row < self.y {
            return None;
        }
        let (c, r) = ((col - self.x) / BUTTON_W, (row - self.y) / BUTTON_H);
        KeypadKey::LAYOUT
            .get(r as usize)
            .and_then(|keys| keys.get(c as usize))
            .copied()
    }

    fn draw<B: Backend>(&self, f: &mut Frame<B>, held: Option<KeypadKey>) {
        for key in KeypadKey::ALL {
            let style = if held == Some(key) {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            let button = Paragraph::new(Span::styled(key.label(), style))
                .block(Block::default().borders(Borders::ALL))
                .alignment(Alignment::Center);
            f.render_widget(button, self.button(key));
        }
    }
}

/// monochrome display in a terminal, rendered using TUI and Crossterm
pub struct TermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    keypad: KeypadPanel,
}

impl TermDisplay {
    /// `size` is the surface size; the keypad goes to the right of the canvas
    pub fn new(size: (usize, usize)) -> Result<TermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.hide_cursor()?;
        terminal.clear()?;
        Ok(TermDisplay {
            terminal,
            keypad: KeypadPanel::at(size.0 as u16 + 3, 0),
        })
    }
}

impl Display for TermDisplay {
    fn present(&mut self, surface: &PixelSurface, status: &StatusView) -> Result<(), io::Error> {
        let (w, h) = surface.size();
        let (x_bounds, y_bounds) = bounds((w, h));
        let keypad = self.keypad;
        let status_line = status.status_line();
        let alert_line = status.alert_line();
        let background = tone_points(surface, Tone::Background);
        let foreground = tone_points(surface, Tone::Foreground);
        let title = status.rom.unwrap_or("CHIP-8");

        self.terminal.draw(|f| {
            let screen = f.size();
            let canvas_area = Rect::new(0, 0, 2 + w as u16, 2 + h as u16).intersection(screen);
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title(title)
                        .borders(Borders::ALL)
                        .style(Style::default().bg(tone_color(Tone::Background))),
                )
                .x_bounds(x_bounds)
                .y_bounds(y_bounds)
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &background,
                        color: tone_color(Tone::Background),
                    });
                    ctx.draw(&Points {
                        coords: &foreground,
                        color: tone_color(Tone::Foreground),
                    });
                });
            f.render_widget(canvas, canvas_area);

            if keypad.area().intersection(screen) == keypad.area() {
                keypad.draw(f, status.held);
            }

            let line_y = canvas_area.bottom();
            if line_y < screen.bottom() {
                let line = Rect::new(0, line_y, screen.width, 1);
                f.render_widget(Paragraph::new(status_line.as_str()), line);
            }
            if let Some(alert) = &alert_line {
                if line_y + 1 < screen.bottom() {
                    let line = Rect::new(0, line_y + 1, screen.width, 1);
                    let style = Style::default().fg(Color::Red).add_modifier(Modifier::BOLD);
                    f.render_widget(Paragraph::new(Span::styled(alert.as_str(), style)), line);
                }
            }
        })?;
        Ok(())
    }

    fn keypad(&self) -> Option<&KeypadPanel> {
        Some(&self.keypad)
    }
}

impl Drop for TermDisplay {
    fn drop(&mut self) {
        let _ = self.terminal.clear();
        let _ = self.terminal.show_cursor();
    }
}

/// useful for testing non-display routines
#[derive(Debug, Default)]
pub struct DummyDisplay {
    pub frames: usize,
    pub last_status: String,
    pub keypad: Option<KeypadPanel>,
}

impl Display for DummyDisplay {
    fn present(&mut self, _surface: &PixelSurface, status: &StatusView) -> Result<(), io::Error> {
        self.frames += 1;
        self.last_status = status.status_line();
        Ok(())
    }

    fn keypad(&self) -> Option<&KeypadPanel> {
        self.keypad.as_ref()
    }
}
