//! Terminal front-end: turns terminal events into host calls, runs catalog
//! fetches in the background, and paces frames.
//!
//! Everything touching the engine happens on the thread running `App::run`.
//! Fetch threads only hand bytes back over a channel; the result is applied
//! between frames, never mid-frame. Input is read after every frame, so a
//! host that is always behind still hears the keyboard.
use crate::config::{CatalogSource, Config};
use crate::display::{Display, StatusView};
use crate::engine::Engine;
use crate::error::LoadError;
use crate::host::{Host, LoadOutcome, LoadTicket};
use crate::keypad::KeypadKey;
use crate::pacer::FramePacer;
use crate::rom::{Catalog, DirCatalog, HttpCatalog, RomImage};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, KeyboardEnhancementFlags, MouseButton, MouseEvent, MouseEventKind,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use log::{debug, info, warn};
use std::io;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// how long a key counts as held when the terminal can't report releases
pub const SYNTHETIC_HOLD: Duration = Duration::from_millis(150);

/// longest wait for input when no frame is scheduled
const IDLE_POLL: Duration = Duration::from_millis(50);

/// the last stretch before a frame is slept precisely rather than polled
const SPIN_MARGIN: Duration = Duration::from_millis(2);

/// Raw mode, alternate screen and mouse capture for as long as this lives.
pub struct TerminalSession {
    enhanced: bool,
}

impl TerminalSession {
    pub fn start() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
        let enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                io::stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        } else {
            info!("terminal reports key presses only; releases will be synthesised");
        }
        Ok(TerminalSession { enhanced })
    }

    /// whether the terminal reports key releases
    pub fn reports_releases(&self) -> bool {
        self.enhanced
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        if self.enhanced {
            let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
        }
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Where terminal events come from.
pub trait EventSource {
    /// wait up to `timeout` for an event; a zero timeout only takes one that is ready
    fn next_event(&mut self, timeout: Duration) -> Result<Option<Event>, io::Error>;
}

/// events from the real terminal
pub struct TermEvents;

impl EventSource for TermEvents {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<Event>, io::Error> {
        if event::poll(timeout)? {
            event::read().map(Some)
        } else {
            Ok(None)
        }
    }
}

/// a catalog fetch that has come back
struct FetchDone {
    ticket: LoadTicket,
    name: String,
    result: Result<RomImage, LoadError>,
}

pub fn open_catalog(source: &CatalogSource, games: &[String]) -> Arc<dyn Catalog> {
    match source {
        CatalogSource::Http(url) => Arc::new(HttpCatalog::new(url, games.to_vec())),
        CatalogSource::Dir(dir) => Arc::new(DirCatalog::new(dir)),
    }
}

pub struct App<E: Engine, D: Display> {
    host: Host<E, FramePacer>,
    display: D,
    catalog: Arc<dyn Catalog>,
    entries: Vec<String>,
    next_entry: usize,
    fetch_tx: Sender<FetchDone>,
    fetch_rx: Receiver<FetchDone>,
    loading: Option<String>,
    alert: Option<String>,
    /// path being typed into the open-file prompt
    prompt: Option<String>,
    held_virtual: Option<KeypadKey>,
    /// keys pressed on a terminal without release reporting, and when to release them
    synthetic: Vec<(char, Instant)>,
    reports_releases: bool,
    quit: bool,
}

impl<E: Engine, D: Display> App<E, D> {
    pub fn new(
        config: &Config,
        engine: E,
        display: D,
        catalog: Arc<dyn Catalog>,
        reports_releases: bool,
    ) -> Self {
        let host = Host::new(
            engine,
            FramePacer::new(config.frame_rate),
            config.speed,
            config.scale,
            config.keymap,
        );
        let entries = if config.games.is_empty() {
            catalog.entries()
        } else {
            config.games.clone()
        };
        let (fetch_tx, fetch_rx) = mpsc::channel();
        App {
            host,
            display,
            catalog,
            entries,
            next_entry: 0,
            fetch_tx,
            fetch_rx,
            loading: None,
            alert: None,
            prompt: None,
            held_virtual: None,
            synthetic: Vec::new(),
            reports_releases,
            quit: false,
        }
    }

    pub fn host(&self) -> &Host<E, FramePacer> {
        &self.host
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// startup loads: a file, then a catalog entry, either optional
    pub fn load_initial(&mut self, config: &Config) {
        if let Some(path) = &config.rom {
            let result = self.host.load_file(Some(path));
            self.settle(result);
        }
        if let Some(name) = &config.select {
            self.select_entry(name);
        }
    }

    /// Load the file the user typed at the prompt. A blank entry is the
    /// picker coming back empty. Any fetch still in flight is superseded.
    pub fn open_file(&mut self, text: &str) {
        let text = text.trim();
        let path = if text.is_empty() {
            None
        } else {
            Some(Path::new(text))
        };
        let result = self.host.load_file(path);
        self.loading = None;
        self.settle(result);
    }

    fn edit_prompt(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let text = self.prompt.take().unwrap_or_default();
                self.open_file(&text);
            }
            KeyCode::Esc => self.prompt = None,
            KeyCode::Backspace => {
                if let Some(text) = &mut self.prompt {
                    text.pop();
                }
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => self.quit = true,
            KeyCode::Char(c) => {
                if let Some(text) = &mut self.prompt {
                    text.push(c);
                }
            }
            _ => {}
        }
    }

    fn settle(&mut self, result: Result<LoadOutcome, LoadError>) {
        match result {
            Ok(LoadOutcome::Loaded) => self.alert = None,
            Ok(LoadOutcome::Superseded) => {}
            Err(e) => self.alert = Some(e.to_string()),
        }
    }

    /// pick a catalog entry; the fetch runs on its own thread
    pub fn select_entry(&mut self, name: &str) {
        let ticket = match self.host.select_catalog(name) {
            Some(ticket) => ticket,
            None => return,
        };
        info!("fetching {} from catalog", name);
        self.loading = Some(name.to_string());
        let catalog = Arc::clone(&self.catalog);
        let tx = self.fetch_tx.clone();
        let name = name.to_string();
        thread::spawn(move || {
            let result = catalog.fetch(&name);
            // the receiver only goes away when the app does
            let _ = tx.send(FetchDone {
                ticket,
                name,
                result,
            });
        });
    }

    /// select the next catalog entry in the picker, wrapping around
    pub fn select_next_entry(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let name = self.entries[self.next_entry % self.entries.len()].clone();
        self.next_entry = (self.next_entry + 1) % self.entries.len();
        self.select_entry(&name);
    }

    fn apply_fetch(&mut self, done: FetchDone) {
        let result = self.host.finish_load(done.ticket, &done.name, done.result);
        if !matches!(result, Ok(LoadOutcome::Superseded)) {
            self.loading = None;
        }
        self.settle(result);
    }

    /// apply any fetches that have finished; returns whether there were any
    pub fn drain_fetches(&mut self) -> bool {
        let mut any = false;
        while let Ok(done) = self.fetch_rx.try_recv() {
            self.apply_fetch(done);
            any = true;
        }
        any
    }

    fn press_physical(&mut self, c: char, now: Instant) {
        if !self.host.physical_key(c, true) || self.reports_releases {
            return;
        }
        let until = now + SYNTHETIC_HOLD;
        match self.synthetic.iter_mut().find(|(k, _)| *k == c) {
            Some(entry) => entry.1 = until,
            None => self.synthetic.push((c, until)),
        }
    }

    /// release synthesised key holds that have run out
    pub fn release_expired(&mut self, now: Instant) {
        let (expired, held): (Vec<_>, Vec<_>) =
            self.synthetic.drain(..).partition(|(_, until)| *until <= now);
        self.synthetic = held;
        for (c, _) in expired {
            self.host.physical_key(c, false);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.kind == KeyEventKind::Release {
            if let KeyCode::Char(c) = key.code {
                self.host.physical_key(c, false);
            }
            return;
        }
        // an alert blocks everything else until acknowledged
        if self.alert.is_some() {
            match key.code {
                KeyCode::Enter => self.alert = None,
                KeyCode::Esc => self.quit = true,
                _ => {}
            }
            return;
        }
        if self.prompt.is_some() {
            self.edit_prompt(key);
            return;
        }
        match key.code {
            KeyCode::Esc => self.quit = true,
            // raw mode swallows the interrupt signal
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => self.quit = true,
            KeyCode::Tab if key.kind == KeyEventKind::Press => self.select_next_entry(),
            KeyCode::Char('o') if key.kind == KeyEventKind::Press => {
                self.prompt = Some(String::new())
            }
            KeyCode::Char('[') if key.kind == KeyEventKind::Press => {
                let speed = self.host.speed().slower();
                self.host.set_speed(speed);
            }
            KeyCode::Char(']') if key.kind == KeyEventKind::Press => {
                let speed = self.host.speed().faster();
                self.host.set_speed(speed);
            }
            KeyCode::Char(c) => self.press_physical(c, now),
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.alert.is_some() {
                    return;
                }
                let key = self
                    .display
                    .keypad()
                    .and_then(|panel| panel.key_at(mouse.column, mouse.row));
                if let Some(key) = key {
                    if let Some(prev) = self.held_virtual.take() {
                        self.host.virtual_key(prev.label(), false);
                    }
                    self.host.virtual_key(key.label(), true);
                    self.held_virtual = Some(key);
                }
            }
            // released wherever the pointer ended up
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(key) = self.held_virtual.take() {
                    self.host.virtual_key(key.label(), false);
                }
            }
            _ => {}
        }
    }

    pub fn handle_event(&mut self, event: Event, now: Instant) {
        match event {
            Event::Key(key) => self.handle_key(key, now),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            _ => {}
        }
    }

    pub fn present(&mut self) -> Result<(), io::Error> {
        let next_entry = if self.entries.is_empty() {
            None
        } else {
            Some(self.entries[self.next_entry % self.entries.len()].as_str())
        };
        let status = StatusView {
            rom: self.host.current_rom(),
            speed: self.host.speed(),
            next_entry,
            loading: self.loading.as_deref(),
            alert: self.alert.as_deref(),
            prompt: self.prompt.as_deref(),
            held: self.held_virtual,
        };
        self.display.present(self.host.surface(), &status)
    }

    /// when the loop next needs attention: a frame or a synthetic release
    fn next_wakeup(&self, now: Instant) -> Instant {
        let idle = now + IDLE_POLL;
        self.host
            .scheduler()
            .next_deadline()
            .into_iter()
            .chain(self.synthetic.iter().map(|(_, until)| *until))
            .fold(idle, Instant::min)
    }

    fn dispatch(&mut self, event: Event) {
        debug!("{:?}", event);
        self.handle_event(event, Instant::now());
    }

    /// run against the terminal until the user quits
    pub fn run(&mut self) -> Result<(), io::Error> {
        self.run_with(&mut TermEvents)
    }

    /// run until the user quits, reading input from `events`
    pub fn run_with(&mut self, events: &mut impl EventSource) -> Result<(), io::Error> {
        self.present()?;
        while !self.quit {
            let mut dirty = self.drain_fetches();
            self.release_expired(Instant::now());

            if let Some(handle) = self.host.scheduler_mut().take_due(Instant::now()) {
                if self.host.run_frame(handle) {
                    self.present()?;
                }
            }

            // input that arrived during the frame gets in before the next one
            while !self.quit {
                match events.next_event(Duration::ZERO)? {
                    Some(event) => {
                        self.dispatch(event);
                        dirty = true;
                    }
                    None => break,
                }
            }
            if self.quit {
                break;
            }

            let now = Instant::now();
            let wake = self.next_wakeup(now);
            let wait = wake.saturating_duration_since(now);
            if wait > SPIN_MARGIN {
                if let Some(event) = events.next_event(wait - SPIN_MARGIN)? {
                    self.dispatch(event);
                    dirty = true;
                }
            } else {
                FramePacer::wait_until(wake);
            }

            // while running, the next frame repaints anyway
            if dirty && self.host.scheduler().is_idle() {
                self.present()?;
            }
        }
        if let Some(name) = &self.loading {
            warn!("quit while {} was still loading", name);
        }
        self.host.stop();
        Ok(())
    }
}
