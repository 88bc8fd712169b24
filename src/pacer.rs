use crate::cadence::{LoopHandle, Scheduler};
use std::time::{Duration, Instant};

/// usual display refresh rate, in Hz
pub const DEFAULT_FRAME_RATE: f64 = 60.0;

/// frame rates the command line accepts
pub const MIN_FRAME_RATE: f64 = 1.0;
pub const MAX_FRAME_RATE: f64 = 240.0;

/// Wall-clock frame scheduler: frame requests fall due one display period
/// after the previous one, the way a display refresh would fire them.
#[derive(Debug)]
pub struct FramePacer {
    period: Duration,
    next_id: u64,
    pending: Vec<(LoopHandle, Instant)>,
    last_due: Option<Instant>,
}

impl FramePacer {
    /// rates that aren't positive and finite fall back to 60 Hz
    pub fn new(rate_hz: f64) -> Self {
        let rate = if rate_hz.is_finite() && rate_hz > 0.0 {
            rate_hz
        } else {
            DEFAULT_FRAME_RATE
        };
        FramePacer {
            period: Duration::from_secs_f64(1.0 / rate),
            next_id: 0,
            pending: Vec::new(),
            last_due: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// when the earliest pending frame falls due
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|(_, due)| *due).min()
    }

    /// pop the earliest frame that is due at `now`
    pub fn take_due(&mut self, now: Instant) -> Option<LoopHandle> {
        let (i, _) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, (_, due))| *due <= now)
            .min_by_key(|(_, (_, due))| *due)?;
        Some(self.pending.remove(i).0)
    }

    /// sleep precisely until `deadline`; returns immediately if it has passed
    pub fn wait_until(deadline: Instant) {
        let now = Instant::now();
        if deadline > now {
            spin_sleep::sleep(deadline - now);
        }
    }

    fn request_frame_at(&mut self, now: Instant) -> LoopHandle {
        // don't try to catch up on frames missed while nothing was scheduled
        // or the host was busy; just run the next one as soon as possible
        let due = match self.last_due {
            Some(last) if last + self.period > now => last + self.period,
            _ => now,
        };
        self.next_id += 1;
        let handle = LoopHandle(self.next_id);
        self.pending.push((handle, due));
        self.last_due = Some(due);
        handle
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        FramePacer::new(DEFAULT_FRAME_RATE)
    }
}

impl Scheduler for FramePacer {
    fn request_frame(&mut self) -> LoopHandle {
        self.request_frame_at(Instant::now())
    }

    fn cancel_frame(&mut self, handle: LoopHandle) {
        self.pending.retain(|(h, _)| *h != handle);
    }
}
