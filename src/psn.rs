//! Packet switched data: PDP context 1.

use embassy_time::Duration;
use embedded_io::{Read, ReadReady, Write};

use crate::{
    at::pattern::{OK, OK_OR_ERROR},
    client::{Device, Step},
    clock::Clock,
    command::{command, ACTIVATE_CONTEXT, DEACTIVATE_CONTEXT, GET_LAST_ERROR},
    config::{Apn, CellularConfig},
    error::Error,
    poll::Outcome,
    registration::Domain,
};

const AT_TIMEOUT: Duration = Duration::from_millis(500);
const ACTIVATE_TIMEOUT: Duration = Duration::from_secs(150);
const DEACTIVATE_TIMEOUT: Duration = Duration::from_secs(40);

impl<L, CLK, CFG> Device<L, CLK, CFG>
where
    L: Read + ReadReady + Write,
    CLK: Clock,
    CFG: CellularConfig,
{
    /// Wait for packet switched registration, configure `apn` on context 1
    /// and activate it.
    pub fn activate(
        &mut self,
        apn: &Apn<'_>,
        registration_timeout: Option<Duration>,
    ) -> Result<(), Error> {
        self.record(|dev| {
            let (user, password) = (apn.username.unwrap_or(""), apn.password.unwrap_or(""));
            if [apn.name, user, password].iter().any(|s| s.contains('"')) {
                return Err(Error::InvalidArgument);
            }

            dev.wait_for_registration(Domain::Ps, registration_timeout)?;

            let configure = command!(
                "AT+QICSGP=1,1,\"{}\",\"{}\",\"{}\",1",
                apn.name,
                user,
                password
            )?;
            dev.at
                .write_command_and_read_response(&configure, &OK, AT_TIMEOUT)
                .step()?;

            dev.poll_until(ACTIVATE_TIMEOUT, CFG::POLLING_INTERVAL, |dev| {
                let response = match dev.at.write_command_and_read_response(
                    ACTIVATE_CONTEXT,
                    &OK_OR_ERROR,
                    ACTIVATE_TIMEOUT,
                ) {
                    Ok(response) => response,
                    Err(e) => return Outcome::Fatal(e),
                };
                if response.as_str() == "OK" {
                    return Outcome::Ready(());
                }

                warn!("Context activation failed, retrying");
                match dev
                    .at
                    .write_command_and_read_response(GET_LAST_ERROR, &OK, AT_TIMEOUT)
                {
                    Ok(_) => Outcome::Pending,
                    Err(e) => Outcome::Fatal(e),
                }
            })
            .step()?;

            info!("PDP context active");
            Ok(())
        })
    }

    pub fn deactivate(&mut self) -> Result<(), Error> {
        self.record(|dev| {
            dev.at
                .write_command_and_read_response(DEACTIVATE_CONTEXT, &OK, DEACTIVATE_TIMEOUT)
                .step()?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_helpers::{BareBoard, FakeClock, MockLink};

    #[test]
    fn activates_after_registration() {
        let mut link = MockLink::new();
        link.reply(&["+CGREG: 0,1", "OK"])
            .reply(&["OK"])
            .reply(&["OK"]);
        let mut device = Device::new(&mut link, FakeClock::new(), BareBoard);

        let apn = Apn::new("soracom.io").with_credentials("sora", "sora");
        assert_eq!(device.activate(&apn, None), Ok(()));
        drop(device);
        assert_eq!(
            link.written(),
            "AT+CGREG?\rAT+QICSGP=1,1,\"soracom.io\",\"sora\",\"sora\",1\rAT+QIACT=1\r"
        );
    }

    #[test]
    fn activation_error_is_retried() {
        let clock = FakeClock::new();
        let mut link = MockLink::new();
        link.reply(&["+CGREG: 0,5", "OK"])
            .reply(&["OK"])
            .reply(&["ERROR"])
            .reply(&["+QIGETERROR: 561,open pdp context failed", "OK"])
            .reply(&["OK"]);
        let mut device = Device::new(&mut link, clock.clone(), BareBoard);

        assert_eq!(device.activate(&Apn::new("internet"), None), Ok(()));
        assert_eq!(clock.elapsed_ms(), 100);
        drop(device);
        assert!(link
            .written()
            .ends_with("AT+QIACT=1\rAT+QIGETERROR\rAT+QIACT=1\r"));
    }

    #[test]
    fn activation_gives_up_after_its_budget() {
        let clock = FakeClock::new();
        let mut link = MockLink::new();
        link.reply(&["+CGREG: 0,1", "OK"]).reply(&["OK"]);
        for _ in 0..1_600 {
            link.reply(&["ERROR"])
                .reply(&["+QIGETERROR: 561,open pdp context failed", "OK"]);
        }
        let mut device = Device::new(&mut link, clock.clone(), BareBoard);

        assert_eq!(device.activate(&Apn::new("internet"), None), Err(Error::Timeout));
        assert_eq!(device.last_error(), ErrorCode::Unknown);
        assert_eq!(clock.elapsed_ms(), 150_000);
        drop(device);
        assert_eq!(link.written().matches("AT+QIACT=1\r").count(), 1_501);
        assert!(link.written().ends_with("AT+QIGETERROR\r"));
    }

    #[test]
    fn silent_error_query_ends_activation() {
        let clock = FakeClock::new();
        let mut link = MockLink::new();
        link.reply(&["+CGREG: 0,1", "OK"])
            .reply(&["OK"])
            .reply(&["ERROR"])
            .silence(1)
            .reply(&["OK"]);
        let mut device = Device::new(&mut link, clock.clone(), BareBoard);

        assert_eq!(device.activate(&Apn::new("internet"), None), Err(Error::Timeout));
        assert_eq!(clock.elapsed_ms(), 500);
        drop(device);
        assert!(link.written().ends_with("AT+QIACT=1\rAT+QIGETERROR\r"));
    }

    #[test]
    fn quotes_in_apn_are_rejected() {
        let mut link = MockLink::new();
        let mut device = Device::new(&mut link, FakeClock::new(), BareBoard);
        assert_eq!(
            device.activate(&Apn::new("bad\"apn"), None),
            Err(Error::InvalidArgument)
        );
        drop(device);
        assert_eq!(link.written(), "");
    }

    #[test]
    fn deactivate() {
        let mut link = MockLink::new();
        link.reply(&["OK"]);
        let mut device = Device::new(&mut link, FakeClock::new(), BareBoard);
        assert_eq!(device.deactivate(), Ok(()));
        drop(device);
        assert_eq!(link.written(), "AT+QIDEACT=1\r");
    }
}
