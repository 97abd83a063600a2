//! Rolling frame-rate estimate over a bounded window

use std::time::Instant;

use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;

/// Samples kept in the rolling window.
pub const FPS_WINDOW: usize = 30;

/// Reported in place of `1 / elapsed` when two ticks land (almost) together.
pub const MAX_RATE: f64 = 10_000.0;

const MIN_INTERVAL_SECS: f64 = 1.0 / MAX_RATE;

/// Mean of the last [`FPS_WINDOW`] instantaneous rates.
pub struct FpsEstimator {
    /// Oldest sample is overwritten once the window is full
    window: HeapRb<f64>,
    last_tick: Instant,
}

impl FpsEstimator {
    /// Seeds the previous-tick time with now.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            window: HeapRb::new(FPS_WINDOW),
            last_tick: start,
        }
    }

    /// Records one completed frame and returns the current mean rate.
    pub fn tick(&mut self) -> f64 {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_tick).as_secs_f64();
        let rate = if elapsed < MIN_INTERVAL_SECS {
            MAX_RATE
        } else {
            1.0 / elapsed
        };

        self.window.push_overwrite(rate);
        self.last_tick = now;
        self.mean()
    }

    /// Mean of the window, 0.0 before the first tick.
    pub fn mean(&self) -> f64 {
        let len = self.window.occupied_len();
        if len == 0 {
            return 0.0;
        }
        self.window.iter().sum::<f64>() / len as f64
    }

    pub fn len(&self) -> usize {
        self.window.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

impl Default for FpsEstimator {
    fn default() -> Self {
        Self::new()
    }
}
