//! Identity, signal and network time queries.

use embassy_time::Duration;
use embedded_io::{Read, ReadReady, Write};
use serde::{Deserialize, Serialize};

use crate::{
    at::{
        pattern::{Pattern, OK},
        Args, Line,
    },
    client::{Device, Step},
    clock::Clock,
    command::{GET_IMEI, GET_IMSI, GET_LOCAL_TIME, GET_SIGNAL_QUALITY, GET_SUBSCRIBER_NUMBER},
    config::CellularConfig,
    error::Error,
};

const AT_TIMEOUT: Duration = Duration::from_millis(500);

const IDENTITY: Pattern<'static> = Pattern::Any(&[OK, Pattern::Digits]);
const SUBSCRIBER_NUMBER: Pattern<'static> = Pattern::Any(&[OK, Pattern::Prefix(CNUM)]);
const CNUM: &str = "+CNUM: ";

/// Reported for an RSSI of 99 ("not known or not detectable") or anything
/// outside the documented range.
pub const UNKNOWN_SIGNAL_DBM: i16 = -999;

/// Map a `+CSQ` RSSI index onto dBm.
pub fn rssi_to_dbm(rssi: u8) -> i16 {
    match rssi {
        0 => -113,
        1 => -111,
        // [2, 30] -> [-109, -53]
        2..=30 => -113 + 2 * i16::from(rssi),
        31 => -51,
        _ => UNKNOWN_SIGNAL_DBM,
    }
}

/// Network time as reported by `AT+QLTS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LocalTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Offset from UTC in quarter hours.
    pub timezone: i8,
    pub daylight_saving: bool,
}

impl LocalTime {
    /// Parse `"YY/MM/DD,HH:MM:SS±ZZ,D"`, quotes included.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let b = s.as_bytes();
        if b.len() != 24 {
            return Err(Error::Parse);
        }
        let separators = [
            (0, b'"'),
            (3, b'/'),
            (6, b'/'),
            (9, b','),
            (12, b':'),
            (15, b':'),
            (21, b','),
            (23, b'"'),
        ];
        if separators.iter().any(|&(i, c)| b[i] != c) {
            return Err(Error::Parse);
        }

        let yy = two_digits(&b[1..3])?;
        let year = u16::from(yy) + if yy >= 80 { 1900 } else { 2000 };
        let month = two_digits(&b[4..6])?;
        let day = two_digits(&b[7..9])?;
        let hour = two_digits(&b[10..12])?;
        let minute = two_digits(&b[13..15])?;
        let second = two_digits(&b[16..18])?;

        let zone = two_digits(&b[19..21])? as i8;
        let timezone = match b[18] {
            b'+' => zone,
            b'-' => -zone,
            _ => return Err(Error::Parse),
        };
        let daylight_saving = match b[22] {
            b'0' => false,
            b'1' => true,
            _ => return Err(Error::Parse),
        };

        if !(1..=12).contains(&month)
            || !(1..=31).contains(&day)
            || hour > 23
            || minute > 59
            || second > 60
        {
            return Err(Error::Parse);
        }

        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            timezone,
            daylight_saving,
        })
    }
}

fn two_digits(b: &[u8]) -> Result<u8, Error> {
    match b {
        [h @ b'0'..=b'9', l @ b'0'..=b'9'] => Ok((h - b'0') * 10 + (l - b'0')),
        _ => Err(Error::Parse),
    }
}

impl<L, CLK, CFG> Device<L, CLK, CFG>
where
    L: Read + ReadReady + Write,
    CLK: Clock,
    CFG: CellularConfig,
{
    pub fn imei(&mut self) -> Result<Line, Error> {
        self.record(|dev| dev.read_identity(GET_IMEI))
    }

    pub fn imsi(&mut self) -> Result<Line, Error> {
        self.record(|dev| dev.read_identity(GET_IMSI))
    }

    /// The subscriber number from the first `+CNUM` entry.
    pub fn phone_number(&mut self) -> Result<Line, Error> {
        self.record(|dev| {
            dev.at.write_command(GET_SUBSCRIBER_NUMBER).step()?;

            let mut number = None;
            loop {
                let line = dev.at.read_response(&SUBSCRIBER_NUMBER, AT_TIMEOUT).step()?;
                let Some(entry) = line.strip_prefix(CNUM) else {
                    break;
                };
                if number.is_some() {
                    continue;
                }
                let args = Args::parse(entry)?;
                if args.len() < 2 {
                    error!("Malformed +CNUM entry");
                    return Err(Error::Parse);
                }
                number = args.get(1).map(Line::try_from).transpose().map_err(|_| Error::Parse)?;
            }

            number.ok_or(Error::Parse)
        })
    }

    /// Received signal strength in dBm, [`UNKNOWN_SIGNAL_DBM`] if the module
    /// has no estimate.
    pub fn signal_strength(&mut self) -> Result<i16, Error> {
        self.record(|dev| {
            let csq = dev
                .at
                .write_command_and_read_response(
                    GET_SIGNAL_QUALITY,
                    &Pattern::Capture("+CSQ: "),
                    AT_TIMEOUT,
                )
                .step()?;
            let args = Args::parse(&csq)?;
            if args.len() != 2 {
                return Err(Error::Parse);
            }
            let rssi = args.number::<u8>(0)?;

            dev.at.read_response(&OK, AT_TIMEOUT).step()?;

            Ok(rssi_to_dbm(rssi))
        })
    }

    pub fn local_time(&mut self) -> Result<LocalTime, Error> {
        self.record(|dev| {
            let qlts = dev
                .at
                .write_command_and_read_response(
                    GET_LOCAL_TIME,
                    &Pattern::Capture("+QLTS: "),
                    AT_TIMEOUT,
                )
                .step()?;
            dev.at.read_response(&OK, AT_TIMEOUT).step()?;

            LocalTime::parse(&qlts).step()
        })
    }

    /// Digits line of `AT+GSN` / `AT+CIMI`, terminated by `OK`.
    fn read_identity(&mut self, command: &str) -> Result<Line, Error> {
        self.at.write_command(command).step()?;

        let mut value = None;
        loop {
            let line = self.at.read_response(&IDENTITY, AT_TIMEOUT).step()?;
            if line.as_str() == "OK" {
                break;
            }
            value = Some(line);
        }

        value.ok_or(Error::Parse)
    }
}
