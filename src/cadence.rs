//! The execution/render cycle. Each frame runs the engine a whole number of
//! steps, ticks its timers once, repaints, then asks the scheduler for the
//! next frame. Only one frame request is ever live.
use crate::engine::Engine;
use crate::render::{self, Surface};
use log::{debug, trace};
use std::fmt;

/// steps per frame at 1x speed
pub const BASE_STEPS: u32 = 10;

/// speeds offered by the speed selector
pub const SPEED_PRESETS: [f64; 8] = [0.0, 0.25, 0.5, 1.0, 1.5, 2.0, 4.0, 8.0];

/// fastest speed accepted, the top preset
pub const MAX_SPEED: f64 = 8.0;

/// Identifies one scheduled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoopHandle(pub u64);

/// Runs the next frame when the display is ready for it.
pub trait Scheduler {
    /// ask for one frame callback; the handle names it for cancellation
    fn request_frame(&mut self) -> LoopHandle;

    /// withdraw a request; unknown or already-fired handles are ignored
    fn cancel_frame(&mut self, handle: LoopHandle);
}

/// How fast the engine runs relative to the usual ten steps per frame.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SpeedMultiplier(f64);

impl SpeedMultiplier {
    /// `None` for NaN, negative, or anything above `MAX_SPEED`
    pub fn new(m: f64) -> Option<Self> {
        if (0.0..=MAX_SPEED).contains(&m) {
            Some(SpeedMultiplier(m))
        } else {
            None
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn steps_per_frame(self) -> u32 {
        (f64::from(BASE_STEPS) * self.0).round() as u32
    }

    /// next preset above this speed, or this speed if already at the top
    pub fn faster(self) -> Self {
        SPEED_PRESETS
            .iter()
            .find(|p| **p > self.0)
            .map(|p| SpeedMultiplier(*p))
            .unwrap_or(self)
    }

    /// next preset below this speed, or this speed if already at the bottom
    pub fn slower(self) -> Self {
        SPEED_PRESETS
            .iter()
            .rev()
            .find(|p| **p < self.0)
            .map(|p| SpeedMultiplier(*p))
            .unwrap_or(self)
    }
}

impl Default for SpeedMultiplier {
    fn default() -> Self {
        SpeedMultiplier(1.0)
    }
}

impl fmt::Display for SpeedMultiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

/// Owns the one live frame request and runs frames against it.
#[derive(Debug)]
pub struct CadenceController {
    live: Option<LoopHandle>,
    speed: SpeedMultiplier,
    scale: u32,
    frames: u64,
}

impl CadenceController {
    pub fn new(speed: SpeedMultiplier, scale: u32) -> Self {
        CadenceController {
            live: None,
            speed,
            scale,
            frames: 0,
        }
    }

    /// cancel whatever is running, then schedule a fresh first frame
    pub fn start(&mut self, scheduler: &mut dyn Scheduler) {
        self.stop(scheduler);
        let handle = scheduler.request_frame();
        debug!("loop started with {:?}", handle);
        self.live = Some(handle);
    }

    /// cancel the live frame request, if there is one
    pub fn stop(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(handle) = self.live.take() {
            debug!("loop stopped, cancelling {:?}", handle);
            scheduler.cancel_frame(handle);
        }
    }

    pub fn is_running(&self) -> bool {
        self.live.is_some()
    }

    pub fn live_handle(&self) -> Option<LoopHandle> {
        self.live
    }

    pub fn speed(&self) -> SpeedMultiplier {
        self.speed
    }

    /// takes effect on the next frame
    pub fn set_speed(&mut self, speed: SpeedMultiplier) {
        self.speed = speed;
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// frames run since construction
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one frame for `handle`. A handle that is not the live one belongs
    /// to a cancelled loop and is ignored; returns whether the frame ran.
    pub fn run_frame(
        &mut self,
        handle: LoopHandle,
        engine: &mut dyn Engine,
        scheduler: &mut dyn Scheduler,
        surface: &mut dyn Surface,
    ) -> bool {
        if self.live != Some(handle) {
            debug!("dropping frame for stale {:?}", handle);
            return false;
        }
        let steps = self.speed.steps_per_frame();
        trace!("frame {} ({} steps)", self.frames, steps);
        // one call per step, so each step sees the current key state
        for _ in 0..steps {
            engine.tick();
        }
        engine.tick_timers();
        render::render_frame(engine, surface, self.scale);
        self.frames += 1;
        self.live = Some(scheduler.request_frame());
        true
    }
}
