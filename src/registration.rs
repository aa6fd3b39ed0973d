use embassy_time::Duration;
use embedded_io::{Read, ReadReady, Write};

use crate::{
    at::{
        pattern::{Pattern, OK},
        Args,
    },
    client::{Device, Step},
    clock::Clock,
    command::{GET_CS_REGISTRATION, GET_PS_REGISTRATION},
    config::CellularConfig,
    error::Error,
    poll::Outcome,
};

const AT_TIMEOUT: Duration = Duration::from_millis(500);

/// 3GPP registration status from `+CREG` / `+CGREG`.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    #[default]
    None,
    NotRegistering,
    Home,
    Searching,
    Denied,
    OutOfCoverage,
    Roaming,
}

impl From<u8> for Status {
    fn from(v: u8) -> Self {
        match v {
            0 => Self::NotRegistering,
            1 => Self::Home,
            2 => Self::Searching,
            3 => Self::Denied,
            4 => Self::OutOfCoverage,
            5 => Self::Roaming,
            _ => Self::None,
        }
    }
}

impl Status {
    pub fn registered(self) -> bool {
        matches!(self, Self::Home | Self::Roaming)
    }
}

impl From<Status> for Outcome<Status> {
    /// Registered is done, not even trying is final, anything else may still
    /// turn into a registration.
    fn from(status: Status) -> Self {
        match status {
            Status::NotRegistering => Self::Fatal(Error::NotRegistering),
            s if s.registered() => Self::Ready(s),
            _ => Self::Pending,
        }
    }
}

/// Which network domain to wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Domain {
    /// Circuit switched, `AT+CREG?`.
    Cs,
    /// Packet switched, `AT+CGREG?`.
    Ps,
}

impl Domain {
    fn query(self) -> (&'static str, Pattern<'static>) {
        match self {
            Self::Cs => (GET_CS_REGISTRATION, Pattern::Capture("+CREG: ")),
            Self::Ps => (GET_PS_REGISTRATION, Pattern::Capture("+CGREG: ")),
        }
    }
}

impl<L, CLK, CFG> Device<L, CLK, CFG>
where
    L: Read + ReadReady + Write,
    CLK: Clock,
    CFG: CellularConfig,
{
    /// Wait for circuit switched registration, home or roaming.
    ///
    /// `None` waits [`CellularConfig::REGISTRATION_TIMEOUT`].
    pub fn wait_for_cs_registration(&mut self, timeout: Option<Duration>) -> Result<Status, Error> {
        self.record(|dev| dev.wait_for_registration(Domain::Cs, timeout))
    }

    /// Wait for packet switched registration, home or roaming.
    ///
    /// `None` waits [`CellularConfig::REGISTRATION_TIMEOUT`].
    pub fn wait_for_ps_registration(&mut self, timeout: Option<Duration>) -> Result<Status, Error> {
        self.record(|dev| dev.wait_for_registration(Domain::Ps, timeout))
    }

    pub(crate) fn wait_for_registration(
        &mut self,
        domain: Domain,
        timeout: Option<Duration>,
    ) -> Result<Status, Error> {
        let timeout = timeout.unwrap_or(CFG::REGISTRATION_TIMEOUT);
        debug!("Waiting {} ms for {:?} registration", timeout.as_millis(), domain);

        self.poll_until(timeout, CFG::POLLING_INTERVAL, |dev| {
            match dev.registration_status(domain) {
                Ok(status) => {
                    trace!("Registration status: {:?}", status);
                    status.into()
                }
                Err(e) => Outcome::Fatal(e),
            }
        })
        .step()
    }

    fn registration_status(&mut self, domain: Domain) -> Result<Status, Error> {
        let (command, pattern) = domain.query();
        let response = self
            .at
            .write_command_and_read_response(command, &pattern, AT_TIMEOUT)
            .step()?;
        let args = Args::parse(&response)?;
        if args.len() < 2 {
            return Err(Error::Parse);
        }
        let stat = args.number::<u8>(1)?;

        self.at.read_response(&OK, AT_TIMEOUT).step()?;

        Ok(Status::from(stat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_helpers::{BareBoard, FakeClock, MockLink};

    fn secs(s: u64) -> Option<Duration> {
        Some(Duration::from_secs(s))
    }

    #[test]
    fn status_codes() {
        assert_eq!(Status::from(0), Status::NotRegistering);
        assert_eq!(Status::from(1), Status::Home);
        assert_eq!(Status::from(5), Status::Roaming);
        assert_eq!(Status::from(9), Status::None);
        assert!(Status::Roaming.registered());
        assert!(!Status::Searching.registered());
    }

    #[test]
    fn home_and_roaming_succeed() {
        for (line, expected) in [("+CREG: 0,1", Status::Home), ("+CREG: 0,5", Status::Roaming)] {
            let mut link = MockLink::new();
            link.reply(&[line, "OK"]);
            let mut device = Device::new(&mut link, FakeClock::new(), BareBoard);
            assert_eq!(device.wait_for_cs_registration(secs(10)), Ok(expected));
            drop(device);
            assert_eq!(link.written(), "AT+CREG?\r");
        }
    }

    #[test]
    fn not_registering_is_terminal() {
        let clock = FakeClock::new();
        let mut link = MockLink::new();
        link.reply(&["+CGREG: 0,0", "OK"]);
        let mut device = Device::new(&mut link, clock.clone(), BareBoard);

        assert_eq!(
            device.wait_for_ps_registration(secs(10)),
            Err(Error::NotRegistering)
        );
        assert_eq!(device.last_error(), ErrorCode::Unknown);
        assert_eq!(clock.elapsed_ms(), 0);
    }

    #[test]
    fn searching_is_retried() {
        let clock = FakeClock::new();
        let mut link = MockLink::new();
        link.reply(&["+CGREG: 0,2", "OK"])
            .reply(&["+CGREG: 0,3", "OK"])
            .reply(&["+CGREG: 0,1", "OK"]);
        let mut device = Device::new(&mut link, clock.clone(), BareBoard);

        assert_eq!(device.wait_for_ps_registration(secs(10)), Ok(Status::Home));
        assert_eq!(clock.elapsed_ms(), 200);
        drop(device);
        assert_eq!(link.written(), "AT+CGREG?\r".repeat(3));
    }

    #[test]
    fn gives_up_after_timeout() {
        let clock = FakeClock::new();
        let mut link = MockLink::new();
        for _ in 0..20 {
            link.reply(&["+CREG: 0,2", "OK"]);
        }
        let mut device = Device::new(&mut link, clock.clone(), BareBoard);

        assert_eq!(device.wait_for_cs_registration(secs(1)), Err(Error::Timeout));
        assert_eq!(clock.elapsed_ms(), 1_000);
    }

    #[test]
    fn short_status_line_is_malformed() {
        let mut link = MockLink::new();
        link.reply(&["+CREG: 1", "OK"]);
        let mut device = Device::new(&mut link, FakeClock::new(), BareBoard);
        assert_eq!(device.wait_for_cs_registration(secs(10)), Err(Error::Parse));
    }
}
