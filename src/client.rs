use embassy_time::Duration;
use embedded_io::{Read, ReadReady, Write};

use crate::{
    at::AtTx,
    clock::Clock,
    config::CellularConfig,
    error::{Error, ErrorCode},
    poll::{Outcome, Poller, State},
};

/// Driver for one Quectel module on one serial link.
///
/// Every public operation runs to completion (or to its time budget) before
/// returning, and leaves its coarse result in [`Device::last_error`].
pub struct Device<L, CLK, CFG> {
    pub(crate) at: AtTx<L, CLK>,
    pub(crate) config: CFG,
    last_error: ErrorCode,
}

impl<L, CLK, CFG> Device<L, CLK, CFG>
where
    L: Read + ReadReady + Write,
    CLK: Clock,
    CFG: CellularConfig,
{
    pub fn new(link: L, clock: CLK, config: CFG) -> Self {
        Self {
            at: AtTx::new(link, clock),
            config,
            last_error: ErrorCode::Ok,
        }
    }

    pub fn last_error(&self) -> ErrorCode {
        self.last_error
    }

    pub fn config_mut(&mut self) -> &mut CFG {
        &mut self.config
    }

    pub fn release(self) -> (L, CLK, CFG) {
        let (link, clock) = self.at.release();
        (link, clock, self.config)
    }

    /// Run one public operation and remember how it went.
    pub(crate) fn record<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let res = op(self);
        self.last_error = ErrorCode::from(&res);
        res
    }

    /// Repeat `attempt` every `interval` until it is ready, fails for good,
    /// or `budget` has passed since the first attempt.
    pub(crate) fn poll_until<T>(
        &mut self,
        budget: Duration,
        interval: Duration,
        mut attempt: impl FnMut(&mut Self) -> Outcome<T>,
    ) -> Result<T, Error> {
        let mut poller = Poller::start(self.at.clock_mut(), budget, interval);
        loop {
            let outcome = attempt(self);
            match poller.step(self.at.clock_mut(), outcome) {
                State::Polling => {}
                State::Succeeded(v) => return Ok(v),
                State::Failed(e) => return Err(e),
            }
        }
    }
}

/// Logs a failed step together with where it failed.
pub(crate) trait Step {
    fn step(self) -> Self;
}

impl<T> Step for Result<T, Error> {
    #[track_caller]
    fn step(self) -> Self {
        if let Err(e) = &self {
            let caller = core::panic::Location::caller();
            error!("{}:{}: {}", caller.file(), caller.line(), e);
        }
        self
    }
}
