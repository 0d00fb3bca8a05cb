//! Clock and frame-rate utilities.
//!
//! Playback is driven by a wall clock, export by synthetic time. Both sides
//! go through this module:
//! - [`PlaybackClock`] abstracts "now" so the playback driver can be tested
//!   with a hand-advanced clock
//! - [`FrameRate`] turns a duration into an exact frame schedule using
//!   integer arithmetic, so frame counts never drift with float rounding

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of monotonically non-decreasing timestamps in milliseconds.
pub trait PlaybackClock: Send + Sync {
    /// Current timestamp in milliseconds relative to an arbitrary origin.
    fn now_ms(&self) -> f64;
}

/// Clock backed by [`Instant`], anchored at construction.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::start()
    }
}

impl PlaybackClock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        let clock = Self::default();
        clock.set_ms(start_ms);
        clock
    }

    pub fn set_ms(&self, ms: f64) {
        self.now_bits.store(ms.to_bits(), Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta_ms: f64) {
        self.set_ms(self.now_ms() + delta_ms);
    }
}

impl PlaybackClock for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.now_bits.load(Ordering::SeqCst))
    }
}

/// A fixed frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    fps: u32,
}

impl FrameRate {
    /// Create a frame rate; zero is raised to one frame per second.
    pub fn new(fps: u32) -> Self {
        Self { fps: fps.max(1) }
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Frame interval in milliseconds (`1000 / fps`).
    pub fn interval_ms(&self) -> f64 {
        1000.0 / self.fps as f64
    }

    /// `ceil(total_ms / interval)`, exact. Saturates instead of overflowing.
    pub fn frame_count(&self, total_ms: u64) -> u64 {
        total_ms.saturating_mul(self.fps as u64).div_ceil(1000)
    }

    /// Synthetic time of frame `index`: `min(total, round((index + 1) * interval))`.
    pub fn frame_time_ms(&self, index: u64, total_ms: u64) -> u64 {
        let fps = self.fps as u64;
        let rounded = index
            .saturating_add(1)
            .saturating_mul(2000)
            .saturating_add(fps)
            / (2 * fps);
        rounded.min(total_ms)
    }
}
