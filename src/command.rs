//! Outgoing command text for the Quectel UC20/EC21 AT command set.
//!
//! Fixed commands are plain constants; parameterised ones are composed into
//! fixed capacity strings, failing with [`Error::Overflow`] rather than
//! truncating.

use core::fmt::Write as _;

use heapless::String;

use crate::error::Error;

pub const MAX_COMMAND_LEN: usize = 256;

pub type Command = String<MAX_COMMAND_LEN>;

/// Format `args` into a string of capacity `N`.
pub fn compose<const N: usize>(args: core::fmt::Arguments<'_>) -> Result<String<N>, Error> {
    let mut s = String::new();
    s.write_fmt(args).map_err(|_| Error::Overflow)?;
    Ok(s)
}

/// `format!` for commands: `command!("AT+QICLOSE={}", id)?`.
macro_rules! command {
    ($($arg:tt)*) => {
        $crate::command::compose::<{ $crate::command::MAX_COMMAND_LEN }>(format_args!($($arg)*))
    };
}
pub(crate) use command;

pub const AT: &str = "AT";
pub const ECHO_OFF: &str = "ATE0";
pub const GET_PIN_STATUS: &str = "AT+CPIN?";
pub const POWER_DOWN: &str = "AT+QPOWD";

pub const GET_IMEI: &str = "AT+GSN";
pub const GET_IMSI: &str = "AT+CIMI";
pub const GET_SUBSCRIBER_NUMBER: &str = "AT+CNUM";
pub const GET_SIGNAL_QUALITY: &str = "AT+CSQ";
pub const GET_LOCAL_TIME: &str = "AT+QLTS=1";

pub const GET_CS_REGISTRATION: &str = "AT+CREG?";
pub const GET_PS_REGISTRATION: &str = "AT+CGREG?";

pub const ACTIVATE_CONTEXT: &str = "AT+QIACT=1";
pub const DEACTIVATE_CONTEXT: &str = "AT+QIDEACT=1";
pub const GET_LAST_ERROR: &str = "AT+QIGETERROR";
pub const GET_SOCKET_STATE: &str = "AT+QISTATE?";

pub const HTTP_GET: &str = "AT+QHTTPGET";
pub const HTTP_READ: &str = "AT+QHTTPREAD";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_within_capacity() {
        let cmd: Command = command!("AT+QISEND={},{}", 3, 1460).unwrap();
        assert_eq!(cmd.as_str(), "AT+QISEND=3,1460");
    }

    #[test]
    fn fails_instead_of_truncating() {
        assert_eq!(
            compose::<8>(format_args!("AT+CUSD=1,\"{}\"", "*100#")),
            Err(Error::Overflow)
        );

        let long = "a".repeat(MAX_COMMAND_LEN);
        assert_eq!(command!("AT+QIOPEN=1,0,\"TCP\",\"{}\",80", long), Err(Error::Overflow));
    }
}
