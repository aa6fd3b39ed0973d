use embassy_time::Duration;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_io::{Read, ReadReady, Write};

use crate::{
    at::pattern::{Pattern, OK},
    client::{Device, Step},
    clock::Clock,
    command::{AT, ECHO_OFF, GET_PIN_STATUS, POWER_DOWN},
    config::CellularConfig,
    error::Error,
    module_timing::{
        boot_time, pwr_off_time, pwr_on_settle_time, pwr_on_time, reset_settle_time, reset_time,
    },
    poll::Outcome,
};

const AT_TIMEOUT: Duration = Duration::from_millis(500);
const ALIVE_BUDGET: Duration = Duration::from_secs(2);
const PIN_STATUS_TIMEOUT: Duration = Duration::from_secs(5);
const SIM_READY_BUDGET: Duration = Duration::from_secs(10);

const SIM_STATUS: Pattern<'static> = Pattern::Any(&[OK, Pattern::Prefix("+CME ERROR")]);
const POWERED_DOWN: Pattern<'static> = Pattern::Exact("POWERED DOWN");

impl<L, CLK, CFG> Device<L, CLK, CFG>
where
    L: Read + ReadReady + Write,
    CLK: Clock,
    CFG: CellularConfig,
{
    /// Probe the module with `AT` for up to two seconds.
    pub fn is_alive(&mut self) -> Result<(), Error> {
        self.record(|dev| dev.ping(ALIVE_BUDGET))
    }

    /// Bring the module into a known, ready state.
    ///
    /// A module that answers gets a reset pulse, a silent one a power on
    /// pulse. Afterwards echo is switched off and the SIM has to report
    /// ready; a SIM error ends the attempt right away.
    pub fn turn_on_or_reset(&mut self) -> Result<(), Error> {
        self.record(|dev| {
            match dev.ping(ALIVE_BUDGET) {
                Ok(()) => dev.reset_pulse().step()?,
                Err(Error::Timeout) => dev.power_on_pulse().step()?,
                Err(e) => return Err(e),
            }
            // Echo is back on after every boot.
            dev.at.set_echo(true);

            dev.ping(boot_time()).step()?;

            dev.at
                .write_command_and_read_response(ECHO_OFF, &OK, AT_TIMEOUT)
                .step()?;
            dev.at.set_echo(false);

            dev.wait_for_sim().step()?;
            info!("Module ready");
            Ok(())
        })
    }

    pub fn turn_off(&mut self) -> Result<(), Error> {
        self.record(|dev| {
            dev.at
                .write_command_and_read_response(POWER_DOWN, &OK, AT_TIMEOUT)
                .step()?;
            dev.at.read_response(&POWERED_DOWN, pwr_off_time()).step()?;
            Ok(())
        })
    }

    /// `STATUS` low means the module is still busy booting or shutting down.
    pub fn is_busy(&mut self) -> Result<bool, Error> {
        self.record(|dev| {
            let pin = dev.config.status_pin().ok_or(Error::Unsupported)?;
            pin.is_low().map_err(|_| Error::IoPin)
        })
    }

    fn ping(&mut self, budget: Duration) -> Result<(), Error> {
        self.poll_until(budget, Duration::from_ticks(0), |dev| {
            dev.at
                .write_command_and_read_response(AT, &OK, AT_TIMEOUT)
                .map(drop)
                .into()
        })
    }

    fn reset_pulse(&mut self) -> Result<(), Error> {
        let Some(pin) = self.config.reset_pin() else {
            warn!("No reset pin, skipping reset pulse");
            return Ok(());
        };
        debug!("Resetting module");

        pin.set_high().map_err(|_| Error::IoPin)?;
        self.at.delay(reset_time());
        pin.set_low().map_err(|_| Error::IoPin)?;
        self.at.delay(reset_settle_time());
        Ok(())
    }

    fn power_on_pulse(&mut self) -> Result<(), Error> {
        let Some(pin) = self.config.power_pin() else {
            warn!("No power pin, skipping power on pulse");
            return Ok(());
        };
        debug!("Powering on module");

        self.at.delay(pwr_on_settle_time());
        pin.set_high().map_err(|_| Error::IoPin)?;
        self.at.delay(pwr_on_time());
        pin.set_low().map_err(|_| Error::IoPin)?;
        Ok(())
    }

    fn wait_for_sim(&mut self) -> Result<(), Error> {
        self.poll_until(SIM_READY_BUDGET, CFG::POLLING_INTERVAL, |dev| {
            match dev.at.write_command_and_read_response(
                GET_PIN_STATUS,
                &SIM_STATUS,
                PIN_STATUS_TIMEOUT,
            ) {
                Ok(line) if line.starts_with("+CME ERROR") => {
                    error!("SIM not ready: {}", line.as_str());
                    Outcome::Fatal(Error::Sim)
                }
                Ok(_) => Outcome::Ready(()),
                // No answer to CPIN ends the attempt.
                Err(e) => Outcome::Fatal(e),
            }
        })
    }
}
