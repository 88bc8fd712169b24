//! The host driver: owns the engine, and is the only thing that calls it.
//!
//! Every load goes cancel → (obtain bytes) → reset → load → start, so the
//! engine never steps against a half-loaded image. Each load takes a ticket
//! when it begins; only the newest ticket may finish, so a slow fetch that
//! lands after a later selection is thrown away.
use crate::cadence::{CadenceController, LoopHandle, Scheduler, SpeedMultiplier};
use crate::engine::Engine;
use crate::error::LoadError;
use crate::keypad::{self, Keymap};
use crate::render::PixelSurface;
use crate::rom::{self, Catalog, RomImage};
use log::{debug, error, info};
use std::path::Path;

/// Names one load attempt; newer attempts supersede older ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// what became of a load that completed without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// the ROM is in the engine and the loop is running
    Loaded,
    /// a newer load began first; the engine was not touched
    Superseded,
}

pub struct Host<E: Engine, S: Scheduler> {
    engine: E,
    scheduler: S,
    cadence: CadenceController,
    surface: PixelSurface,
    keymap: Keymap,
    generation: u64,
    current: Option<String>,
}

impl<E: Engine, S: Scheduler> Host<E, S> {
    pub fn new(engine: E, scheduler: S, speed: SpeedMultiplier, scale: u32, keymap: Keymap) -> Self {
        Host {
            engine,
            scheduler,
            cadence: CadenceController::new(speed, scale),
            surface: PixelSurface::for_scale(scale),
            keymap,
            generation: 0,
            current: None,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn cadence(&self) -> &CadenceController {
        &self.cadence
    }

    pub fn surface(&self) -> &PixelSurface {
        &self.surface
    }

    pub fn keymap(&self) -> Keymap {
        self.keymap
    }

    /// name of the ROM now in the engine
    pub fn current_rom(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// stop the loop, leaving the display on its last frame
    pub fn stop(&mut self) {
        self.cadence.stop(&mut self.scheduler);
    }

    /// Stop the loop and take a ticket for a new load. Any earlier ticket
    /// can no longer finish.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.stop();
        self.generation += 1;
        LoadTicket(self.generation)
    }

    /// Complete a load begun with `ticket`. On success the engine is reset,
    /// given the image, and the loop restarted.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        name: &str,
        result: Result<RomImage, LoadError>,
    ) -> Result<LoadOutcome, LoadError> {
        if ticket.0 != self.generation {
            debug!("discarding superseded load of {} ({:?})", name, ticket);
            return Ok(LoadOutcome::Superseded);
        }
        let rom = result.map_err(|e| {
            error!("{}", e);
            e
        })?;
        info!("loading {} ({} bytes)", name, rom.len());
        self.engine.reset();
        self.engine.load_game(rom);
        self.current = Some(name.to_string());
        self.cadence.start(&mut self.scheduler);
        Ok(LoadOutcome::Loaded)
    }

    /// load a user-selected file; `None` means the picker came back empty
    pub fn load_file(&mut self, path: Option<&Path>) -> Result<LoadOutcome, LoadError> {
        let ticket = self.begin_load();
        let result = rom::read_file(path);
        let name = path
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.finish_load(ticket, &name, result)
    }

    /// A catalog entry was picked. An empty name is the picker's "nothing
    /// selected" state and does nothing at all; otherwise the loop stops and
    /// the caller fetches the ROM, then hands it to `finish_load`.
    pub fn select_catalog(&mut self, name: &str) -> Option<LoadTicket> {
        if name.trim().is_empty() {
            return None;
        }
        Some(self.begin_load())
    }

    /// select and fetch in one go, blocking on the fetch
    pub fn load_from_catalog(
        &mut self,
        catalog: &dyn Catalog,
        name: &str,
    ) -> Result<Option<LoadOutcome>, LoadError> {
        match self.select_catalog(name) {
            Some(ticket) => {
                let result = catalog.fetch(name);
                self.finish_load(ticket, name, result).map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn physical_key(&mut self, c: char, pressed: bool) -> bool {
        keypad::physical_key(&mut self.engine, self.keymap, c, pressed)
    }

    pub fn virtual_key(&mut self, label: &str, pressed: bool) -> bool {
        keypad::virtual_key(&mut self.engine, label, pressed)
    }

    pub fn speed(&self) -> SpeedMultiplier {
        self.cadence.speed()
    }

    pub fn set_speed(&mut self, speed: SpeedMultiplier) {
        info!("speed {}", speed);
        self.cadence.set_speed(speed);
    }

    /// run the frame the scheduler just fired
    pub fn run_frame(&mut self, handle: LoopHandle) -> bool {
        self.cadence
            .run_frame(handle, &mut self.engine, &mut self.scheduler, &mut self.surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeCatalog, FakeScheduler, Journal, RecordingEngine};
    use std::fs;
    use std::path::PathBuf;

    type TestHost = Host<RecordingEngine, FakeScheduler>;

    fn host() -> (TestHost, Journal) {
        let journal = Journal::default();
        let host = Host::new(
            RecordingEngine::with_journal(journal.clone()),
            FakeScheduler::with_journal(journal.clone()),
            SpeedMultiplier::default(),
            1,
            Keymap::Conventional,
        );
        (host, journal)
    }

    fn catalog() -> FakeCatalog {
        FakeCatalog::new(&[
            ("PONG", Ok(vec![0x6a, 0x02, 0x6b, 0x0c, 0x6c, 0x3f])),
            ("TETRIS", Ok(vec![0xa2, 0xb4, 0x23, 0xe6])),
            ("BROKEN", Err(500)),
        ])
    }

    /// fire whatever the scheduler has pending, once
    fn pump(host: &mut TestHost) -> bool {
        match host.scheduler_mut().fire() {
            Some(h) => host.run_frame(h),
            None => false,
        }
    }

    fn scratch_file(name: &str, bytes: &[u8]) -> Result<PathBuf, std::io::Error> {
        let dir = std::env::temp_dir().join(format!("chip8-host-host-{}", std::process::id()));
        fs::create_dir_all(&dir)?;
        let path = dir.join(name);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    #[test]
    fn test_load_order_is_cancel_reset_load_start() -> Result<(), LoadError> {
        let (mut host, journal) = host();
        host.load_from_catalog(&catalog(), "PONG")?;
        assert!(pump(&mut host));
        journal.borrow_mut().clear();

        host.load_from_catalog(&catalog(), "TETRIS")?;
        assert_eq!(
            *journal.borrow(),
            vec![
                Call::CancelFrame(LoopHandle(2)),
                Call::Reset,
                Call::LoadGame(4, Some(0xa2)),
                Call::RequestFrame(LoopHandle(3)),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_first_load_has_nothing_to_cancel() -> Result<(), LoadError> {
        let (mut host, journal) = host();
        assert_eq!(
            host.load_from_catalog(&catalog(), "PONG")?,
            Some(LoadOutcome::Loaded)
        );
        assert_eq!(
            *journal.borrow(),
            vec![
                Call::Reset,
                Call::LoadGame(6, Some(0x6a)),
                Call::RequestFrame(LoopHandle(1)),
            ]
        );
        assert_eq!(host.current_rom(), Some("PONG"));
        Ok(())
    }

    #[test]
    fn test_http_404_surfaces_and_stops() {
        let (mut host, journal) = host();
        let cat = FakeCatalog::new(&[("PONG", Err(404))]);
        let err = host.load_from_catalog(&cat, "PONG").unwrap_err();
        assert!(matches!(err, LoadError::FetchHttp { status: 404, .. }));
        assert!(err.to_string().contains("PONG"));
        assert!(!journal
            .borrow()
            .iter()
            .any(|c| matches!(c, Call::LoadGame(..) | Call::RequestFrame(_) | Call::Reset)));
        assert!(!host.cadence().is_running());
    }

    #[test]
    fn test_failed_load_freezes_previous_rom() -> Result<(), LoadError> {
        let (mut host, journal) = host();
        host.load_from_catalog(&catalog(), "PONG")?;
        pump(&mut host);
        assert!(host.load_from_catalog(&catalog(), "BROKEN").is_err());
        assert!(!host.cadence().is_running());
        assert!(host.scheduler().pending.is_empty());
        // nothing left to fire, so the display keeps PONG's last frame
        let before = journal.borrow().len();
        assert!(!pump(&mut host));
        assert_eq!(journal.borrow().len(), before);
        assert_eq!(host.current_rom(), Some("PONG"));
        Ok(())
    }

    #[test]
    fn test_transport_failure_names_rom() {
        let (mut host, _) = host();
        let err = host.load_from_catalog(&catalog(), "BRIX").unwrap_err();
        assert!(matches!(err, LoadError::FetchTransport { .. }));
        assert_eq!(err.rom_name(), Some("BRIX"));
    }

    #[test]
    fn test_empty_catalog_selection_is_noop() -> Result<(), LoadError> {
        let (mut host, journal) = host();
        host.load_from_catalog(&catalog(), "PONG")?;
        let before = journal.borrow().clone();
        assert_eq!(host.load_from_catalog(&catalog(), "")?, None);
        assert_eq!(host.select_catalog("  "), None);
        assert_eq!(*journal.borrow(), before);
        assert!(host.cadence().is_running());
        Ok(())
    }

    #[test]
    fn test_local_file_of_n_bytes() -> Result<(), Box<dyn std::error::Error>> {
        let (mut host, journal) = host();
        let path = scratch_file("n-bytes.ch8", &[0x12; 132])?;
        assert_eq!(host.load_file(Some(&path))?, LoadOutcome::Loaded);
        let calls = journal.borrow().clone();
        let resets: Vec<usize> = (0..calls.len()).filter(|i| calls[*i] == Call::Reset).collect();
        let loads: Vec<usize> = (0..calls.len())
            .filter(|i| matches!(calls[*i], Call::LoadGame(..)))
            .collect();
        assert_eq!(resets.len(), 1);
        assert_eq!(loads.len(), 1);
        assert!(resets[0] < loads[0]);
        assert_eq!(calls[loads[0]], Call::LoadGame(132, Some(0x12)));
        assert_eq!(host.current_rom(), Some("n-bytes.ch8"));
        fs::remove_file(path)?;
        Ok(())
    }

    #[test]
    fn test_no_file_selected_stops_loop() -> Result<(), LoadError> {
        let (mut host, journal) = host();
        host.load_from_catalog(&catalog(), "PONG")?;
        journal.borrow_mut().clear();
        assert!(matches!(host.load_file(None), Err(LoadError::NoFileSelected)));
        assert_eq!(*journal.borrow(), vec![Call::CancelFrame(LoopHandle(1))]);
        assert!(!host.cadence().is_running());
        Ok(())
    }

    #[test]
    fn test_unreadable_file_does_not_start() {
        let (mut host, journal) = host();
        let path = PathBuf::from("/nonexistent/chip8-host/pong.ch8");
        assert!(matches!(
            host.load_file(Some(&path)),
            Err(LoadError::FileRead { .. })
        ));
        assert!(journal.borrow().is_empty());
        assert!(!host.cadence().is_running());
    }

    #[test]
    fn test_rapid_selections_late_first_completion() -> Result<(), LoadError> {
        let (mut host, journal) = host();
        let cat = catalog();
        let pong = host.select_catalog("PONG").unwrap();
        let tetris = host.select_catalog("TETRIS").unwrap();
        assert_eq!(
            host.finish_load(tetris, "TETRIS", cat.fetch("TETRIS"))?,
            LoadOutcome::Loaded
        );
        // PONG's fetch lands after TETRIS was already selected
        assert_eq!(
            host.finish_load(pong, "PONG", cat.fetch("PONG"))?,
            LoadOutcome::Superseded
        );
        assert_eq!(host.engine().rom.as_deref(), Some(&[0xa2, 0xb4, 0x23, 0xe6][..]));
        assert_eq!(host.scheduler().pending.len(), 1);
        assert_eq!(
            journal
                .borrow()
                .iter()
                .filter(|c| matches!(c, Call::LoadGame(..)))
                .count(),
            1
        );
        assert_eq!(host.current_rom(), Some("TETRIS"));
        Ok(())
    }

    #[test]
    fn test_stale_failure_is_not_surfaced() -> Result<(), LoadError> {
        let (mut host, _) = host();
        let cat = catalog();
        let broken = host.select_catalog("BROKEN").unwrap();
        let tetris = host.select_catalog("TETRIS").unwrap();
        host.finish_load(tetris, "TETRIS", cat.fetch("TETRIS"))?;
        assert_eq!(
            host.finish_load(broken, "BROKEN", cat.fetch("BROKEN"))?,
            LoadOutcome::Superseded
        );
        assert!(host.cadence().is_running());
        Ok(())
    }

    #[test]
    fn test_rapid_selections_pong_never_runs_after_tetris_reset() -> Result<(), LoadError> {
        let (mut host, journal) = host();
        let cat = catalog();
        host.load_from_catalog(&cat, "PONG")?;
        let pong_handle = host.cadence().live_handle().unwrap();
        host.load_from_catalog(&cat, "TETRIS")?;
        let tetris_handle = host.cadence().live_handle().unwrap();

        // the PONG callback was already queued before it got cancelled
        assert!(!host.run_frame(pong_handle));
        for _ in 0..3 {
            assert!(pump(&mut host));
        }

        let calls = journal.borrow().clone();
        let tetris_reset = calls.iter().rposition(|c| *c == Call::Reset).unwrap();
        let pong_ticks = calls[..tetris_reset].iter().filter(|c| **c == Call::Tick).count();
        assert_eq!(pong_ticks, 0);
        assert_eq!(
            calls[tetris_reset..].iter().filter(|c| **c == Call::Tick).count(),
            30
        );
        assert_ne!(pong_handle, tetris_handle);
        assert_eq!(host.scheduler().pending.len(), 1);
        assert_eq!(host.cadence().live_handle(), Some(host.scheduler().pending[0]));
        Ok(())
    }

    #[test]
    fn test_keys_reach_engine_without_a_rom() {
        let (mut host, journal) = host();
        assert!(host.physical_key('w', true));
        assert!(host.virtual_key("5", false));
        assert!(!host.physical_key('p', true));
        assert_eq!(
            *journal.borrow(),
            vec![
                Call::Keypress(crate::keypad::KeypadKey::K5, true),
                Call::VirtualKeypress('5', false),
            ]
        );
    }

    #[test]
    fn test_speed_change_keeps_loop() -> Result<(), LoadError> {
        let (mut host, journal) = host();
        host.load_from_catalog(&catalog(), "PONG")?;
        let handle = host.cadence().live_handle();
        host.set_speed(SpeedMultiplier::new(0.5).unwrap());
        assert_eq!(host.cadence().live_handle(), handle);
        journal.borrow_mut().clear();
        pump(&mut host);
        assert_eq!(
            journal.borrow().iter().filter(|c| **c == Call::Tick).count(),
            5
        );
        Ok(())
    }
}
