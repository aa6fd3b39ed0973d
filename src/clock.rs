//! Time source used for every timeout budget and polling delay.
//!
//! The driver never sleeps or reads the time on its own; all of it goes
//! through a [`Clock`], so tests can drive the whole protocol on a fake
//! timeline.

use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;

/// A monotonic time source that can also block for a while.
pub trait Clock: DelayNs {
    fn now(&mut self) -> Instant;

    fn delay(&mut self, duration: Duration) {
        let mut us = duration.as_micros();
        while us > 0 {
            let step = core::cmp::min(us, u64::from(u32::MAX));
            self.delay_us(step as u32);
            us -= step;
        }
    }
}

/// [`Clock`] backed by the `embassy-time` driver of the target.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl DelayNs for SystemClock {
    #[inline]
    fn delay_ns(&mut self, ns: u32) {
        embassy_time::block_for(Duration::from_micros(u64::from(ns).div_ceil(1_000)));
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&mut self) -> Instant {
        Instant::now()
    }
}

/// Measures elapsed time from a restart point.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start<C: Clock>(clock: &mut C) -> Self {
        Self {
            started: clock.now(),
        }
    }

    pub fn restart<C: Clock>(&mut self, clock: &mut C) {
        self.started = clock.now();
    }

    pub fn elapsed<C: Clock>(&self, clock: &mut C) -> Duration {
        clock
            .now()
            .checked_duration_since(self.started)
            .unwrap_or(Duration::from_ticks(0))
    }

    pub fn started(&self) -> Instant {
        self.started
    }
}
