//! Retry loops with a total time budget.
//!
//! Each attempt reports an [`Outcome`]; the [`Poller`] turns that into the
//! next [`State`], sleeping for the polling interval between attempts.

use embassy_time::Duration;

use crate::clock::{Clock, Stopwatch};
use crate::error::Error;

/// Result of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    Ready(T),
    /// Not there yet, try again.
    Pending,
    /// Retrying cannot help.
    Fatal(Error),
}

impl<T> From<Result<T, Error>> for Outcome<T> {
    /// A timed out attempt is retried; any other error ends the loop.
    fn from(res: Result<T, Error>) -> Self {
        match res {
            Ok(v) => Self::Ready(v),
            Err(Error::Timeout) => Self::Pending,
            Err(e) => Self::Fatal(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State<T> {
    Polling,
    Succeeded(T),
    Failed(Error),
}

#[derive(Debug, Clone, Copy)]
pub struct Poller {
    sw: Stopwatch,
    budget: Duration,
    interval: Duration,
}

impl Poller {
    pub fn start<C: Clock>(clock: &mut C, budget: Duration, interval: Duration) -> Self {
        Self {
            sw: Stopwatch::start(clock),
            budget,
            interval,
        }
    }

    pub fn step<T, C: Clock>(&mut self, clock: &mut C, outcome: Outcome<T>) -> State<T> {
        match outcome {
            Outcome::Ready(v) => State::Succeeded(v),
            Outcome::Fatal(e) => State::Failed(e),
            Outcome::Pending if self.sw.elapsed(clock) >= self.budget => {
                State::Failed(Error::Timeout)
            }
            Outcome::Pending => {
                clock.delay(self.interval);
                State::Polling
            }
        }
    }
}
