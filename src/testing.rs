//! Fakes shared by the unit tests: an engine and a scheduler that write
//! everything done to them into one journal, so call order can be checked
//! across both.
use crate::cadence::{LoopHandle, Scheduler};
use crate::engine::Engine;
use crate::error::LoadError;
use crate::keypad::KeypadKey;
use crate::render::Surface;
use crate::rom::{Catalog, RomImage};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Reset,
    Tick,
    TickTimers,
    Keypress(KeypadKey, bool),
    VirtualKeypress(char, bool),
    /// length and first byte of the image
    LoadGame(usize, Option<u8>),
    DrawScreen(u32),
    RequestFrame(LoopHandle),
    CancelFrame(LoopHandle),
}

pub type Journal = Rc<RefCell<Vec<Call>>>;

pub struct RecordingEngine {
    journal: Journal,
    /// last image loaded
    pub rom: Option<RomImage>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::with_journal(Journal::default())
    }

    pub fn with_journal(journal: Journal) -> Self {
        RecordingEngine { journal, rom: None }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.journal.borrow().clone()
    }

    fn record(&self, call: Call) {
        self.journal.borrow_mut().push(call);
    }
}

impl Engine for RecordingEngine {
    fn reset(&mut self) {
        self.rom = None;
        self.record(Call::Reset);
    }

    fn tick(&mut self) {
        self.record(Call::Tick);
    }

    fn tick_timers(&mut self) {
        self.record(Call::TickTimers);
    }

    fn keypress(&mut self, key: KeypadKey, pressed: bool) {
        self.record(Call::Keypress(key, pressed));
    }

    fn virtual_keypress(&mut self, symbol: char, pressed: bool) {
        self.record(Call::VirtualKeypress(symbol, pressed));
    }

    fn load_game(&mut self, rom: RomImage) {
        self.record(Call::LoadGame(rom.len(), rom.first().copied()));
        self.rom = Some(rom);
    }

    fn draw_screen(&self, _surface: &mut dyn Surface, scale: u32) {
        self.record(Call::DrawScreen(scale));
    }
}

/// Scheduler that only fires when the test says so.
pub struct FakeScheduler {
    journal: Journal,
    next: u64,
    pub pending: Vec<LoopHandle>,
    pub cancelled: Vec<LoopHandle>,
}

impl FakeScheduler {
    pub fn new() -> Self {
        Self::with_journal(Journal::default())
    }

    pub fn with_journal(journal: Journal) -> Self {
        FakeScheduler {
            journal,
            next: 0,
            pending: Vec::new(),
            cancelled: Vec::new(),
        }
    }

    /// take the oldest pending request, as if the display became ready
    pub fn fire(&mut self) -> Option<LoopHandle> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.remove(0))
        }
    }
}

impl Scheduler for FakeScheduler {
    fn request_frame(&mut self) -> LoopHandle {
        self.next += 1;
        let handle = LoopHandle(self.next);
        self.pending.push(handle);
        self.journal.borrow_mut().push(Call::RequestFrame(handle));
        handle
    }

    fn cancel_frame(&mut self, handle: LoopHandle) {
        self.pending.retain(|h| *h != handle);
        self.cancelled.push(handle);
        self.journal.borrow_mut().push(Call::CancelFrame(handle));
    }
}

/// Catalog answering from a fixed table; names map to bytes or an HTTP status.
pub struct FakeCatalog {
    roms: HashMap<String, Result<Vec<u8>, u16>>,
}

impl FakeCatalog {
    pub fn new(roms: &[(&str, Result<Vec<u8>, u16>)]) -> Self {
        FakeCatalog {
            roms: roms
                .iter()
                .map(|(name, r)| (name.to_string(), r.clone()))
                .collect(),
        }
    }
}

impl Catalog for FakeCatalog {
    fn fetch(&self, name: &str) -> Result<RomImage, LoadError> {
        match self.roms.get(name) {
            Some(Ok(bytes)) => Ok(RomImage::new(bytes.clone())),
            Some(Err(status)) => Err(LoadError::FetchHttp {
                name: name.to_string(),
                status: *status,
            }),
            None => Err(LoadError::FetchTransport {
                name: name.to_string(),
                reason: "connection refused".into(),
            }),
        }
    }

    fn entries(&self) -> Vec<String> {
        let mut names: Vec<String> = self.roms.keys().cloned().collect();
        names.sort();
        names
    }
}
