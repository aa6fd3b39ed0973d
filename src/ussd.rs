use embassy_time::Duration;
use embedded_io::{Read, ReadReady, Write};

use crate::{
    at::{pattern::Pattern, Line},
    client::{Device, Step},
    clock::{Clock, Stopwatch},
    command::command,
    config::CellularConfig,
    error::Error,
};

/// Longest USSD string the network accepts, in GSM 7 bit characters.
pub const MAX_USSD_LEN: usize = 182;

const USSD_TIMEOUT: Duration = Duration::from_secs(120);

/// The quoted reply of a `<m>,"<reply>",<dcs>` result.
fn parse_reply(result: &str) -> Option<&str> {
    let rest = result
        .strip_prefix(|c: char| c.is_ascii_digit())?
        .strip_prefix(",\"")?;
    let (reply, dcs) = rest.rsplit_once("\",")?;
    (!dcs.is_empty() && dcs.bytes().all(|b| b.is_ascii_digit())).then_some(reply)
}

impl<L, CLK, CFG> Device<L, CLK, CFG>
where
    L: Read + ReadReady + Write,
    CLK: Clock,
    CFG: CellularConfig,
{
    /// Send `text` as a USSD request and wait for the network's reply.
    pub fn send_ussd(&mut self, text: &str) -> Result<Line, Error> {
        self.record(|dev| {
            if text.chars().count() > MAX_USSD_LEN {
                warn!("USSD message longer than {} characters", MAX_USSD_LEN);
                return Err(Error::InvalidArgument);
            }
            if text.contains('"') {
                return Err(Error::InvalidArgument);
            }

            let request = command!("AT+CUSD=1,\"{}\"", text)?;
            dev.at.write_command(&request).step()?;

            let sw = Stopwatch::start(dev.at.clock_mut());
            loop {
                let remaining = USSD_TIMEOUT
                    .checked_sub(sw.elapsed(dev.at.clock_mut()))
                    .ok_or(Error::Timeout)?;
                let result = dev
                    .at
                    .read_response(&Pattern::Capture("+CUSD: "), remaining)
                    .step()?;

                match parse_reply(&result) {
                    Some(reply) => return Line::try_from(reply).map_err(|_| Error::Overflow),
                    None => trace!("Skipping USSD result '{}'", result.as_str()),
                }
            }
        })
    }
}
