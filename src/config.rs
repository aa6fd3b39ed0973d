use embassy_time::Duration;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

pub struct NoPin;

impl ErrorType for NoPin {
    type Error = core::convert::Infallible;
}

impl InputPin for NoPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Board wiring and tunables for the cellular module.
///
/// The pins are all optional: a board without a reset line simply returns
/// `None` and the driver skips the pulse with a warning.
pub trait CellularConfig {
    /// Drives `RESET_N` through the board's level shifter, active high.
    type ResetPin: OutputPin;
    /// Drives `PWRKEY` through the board's level shifter, active high.
    type PowerPin: OutputPin;
    /// Module `STATUS` output, low while the module is busy.
    type StatusPin: InputPin;

    const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(120);
    const POLLING_INTERVAL: Duration = Duration::from_millis(100);
    const TLS: TlsConfig = TlsConfig::DEFAULT;

    fn reset_pin(&mut self) -> Option<&mut Self::ResetPin>;
    fn power_pin(&mut self) -> Option<&mut Self::PowerPin>;
    fn status_pin(&mut self) -> Option<&mut Self::StatusPin>;
}

/// Parameters pushed into the module's SSL context before an `https:` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsConfig {
    pub context_id: u8,
    /// 0: SSL3.0, 1: TLS1.0, 2: TLS1.1, 3: TLS1.2, 4: all.
    pub ssl_version: u8,
    pub cipher_suite: &'static str,
    /// 0: no authentication, 1: server, 2: server and client.
    pub security_level: u8,
}

impl TlsConfig {
    pub const DEFAULT: Self = Self {
        context_id: 1,
        ssl_version: 4,
        cipher_suite: "0XFFFF",
        security_level: 0,
    };
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Apn<'a> {
    pub name: &'a str,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
}

impl<'a> Apn<'a> {
    #[must_use]
    pub const fn new(name: &'a str) -> Self {
        Self {
            name,
            username: None,
            password: None,
        }
    }

    #[must_use]
    pub const fn with_credentials(self, username: &'a str, password: &'a str) -> Self {
        Self {
            username: Some(username),
            password: Some(password),
            ..self
        }
    }
}
