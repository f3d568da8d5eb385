use std::time::{Duration, Instant};

use crate::foundation::error::AfterimageResult;
use crate::frame::scheduler::{FrameReport, FrameScheduler};
use crate::scene::graph::Scene;

/// Presentation timer of the embedding application.
pub trait PresentationHost {
    /// Ask for one more scheduler iteration on the next presentation tick.
    fn request_frame(&mut self);
}

/// Host driven explicitly by the caller, e.g. for offline rendering and tests.
#[derive(Clone, Debug, Default)]
pub struct ManualHost {
    pending: bool,
    requests: u64,
}

impl ManualHost {
    /// Host with no pending request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `true` when an iteration was requested and not yet consumed.
    pub fn pending(&self) -> bool {
        self.pending
    }

    /// Requests received over the host's lifetime (repeats while pending included).
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Consume the pending request.
    pub fn take_request(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    /// Tick `scheduler` while it keeps requesting frames, at most `max_frames` times.
    pub fn drive<S: Scene + 'static>(
        &mut self,
        scheduler: &mut FrameScheduler<S>,
        max_frames: usize,
    ) -> AfterimageResult<Vec<FrameReport>> {
        let mut reports = Vec::new();
        while reports.len() < max_frames && self.take_request() {
            match scheduler.tick(self)? {
                Some(report) => reports.push(report),
                None => break,
            }
        }
        Ok(reports)
    }
}

impl PresentationHost for ManualHost {
    fn request_frame(&mut self) {
        self.pending = true;
        self.requests += 1;
    }
}

/// Monotonic time source for frame deltas.
pub trait FrameClock {
    /// Time since an arbitrary fixed origin; never decreases.
    fn now(&mut self) -> Duration;
}

/// Wall-clock time since construction.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Clock starting now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for MonotonicClock {
    fn now(&mut self) -> Duration {
        self.origin.elapsed()
    }
}

/// Deterministic clock advancing by a fixed step per reading.
#[derive(Clone, Copy, Debug)]
pub struct FixedStepClock {
    step: Duration,
    next: Duration,
}

impl FixedStepClock {
    /// Clock whose first reading is zero and each later reading is `step` further.
    pub fn new(step: Duration) -> Self {
        Self {
            step,
            next: Duration::ZERO,
        }
    }

    /// Clock stepping at `fps` frames per second.
    pub fn from_fps(fps: u32) -> Self {
        Self::new(Duration::from_secs(1) / fps.max(1))
    }
}

impl FrameClock for FixedStepClock {
    fn now(&mut self) -> Duration {
        let t = self.next;
        self.next = self.next.saturating_add(self.step);
        t
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/host.rs"]
mod tests;
