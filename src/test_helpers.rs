use core::convert::Infallible;
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::String;
use std::vec::Vec;

use embassy_time::Instant;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType as PinErrorType, InputPin, OutputPin};
use embedded_io::{ErrorType, Read, ReadReady, Write};

use crate::clock::Clock;
use crate::config::{CellularConfig, NoPin};

/// Serial link double: everything pushed with [`MockLink::respond`] is handed
/// out right away, everything queued with [`MockLink::reply`] is handed out
/// once the next command terminator is written. Everything the driver writes
/// is captured.
#[derive(Debug, Default)]
pub struct MockLink {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    replies: VecDeque<Vec<u8>>,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&mut self, bytes: &[u8]) -> &mut Self {
        self.rx.extend(bytes.iter().copied());
        self
    }

    /// Queue `line` framed the way the modem frames responses.
    pub fn line(&mut self, line: &str) -> &mut Self {
        self.respond(b"\r\n");
        self.respond(line.as_bytes());
        self.respond(b"\r\n")
    }

    /// Release `bytes` after the next command. Empty means no answer at all.
    pub fn reply_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.replies.push_back(bytes.to_vec());
        self
    }

    /// Release the framed `lines` after the next command.
    pub fn reply(&mut self, lines: &[&str]) -> &mut Self {
        let mut bytes = Vec::new();
        for line in lines {
            bytes.extend_from_slice(b"\r\n");
            bytes.extend_from_slice(line.as_bytes());
            bytes.extend_from_slice(b"\r\n");
        }
        self.reply_raw(&bytes)
    }

    /// No answer to the next `n` commands.
    pub fn silence(&mut self, n: usize) -> &mut Self {
        for _ in 0..n {
            self.reply_raw(b"");
        }
        self
    }

    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.tx).into_owned()
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl ErrorType for MockLink {
    type Error = Infallible;
}

impl Read for MockLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut n = 0;
        while n < buf.len() {
            match self.rx.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl ReadReady for MockLink {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.rx.is_empty())
    }
}

impl Write for MockLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.tx.extend_from_slice(buf);
        if buf == b"\r" {
            if let Some(reply) = self.replies.pop_front() {
                self.rx.extend(reply);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Link at end of stream: always ready, every read returns nothing.
#[derive(Debug, Default)]
pub struct EofLink;

impl ErrorType for EofLink {
    type Error = Infallible;
}

impl Read for EofLink {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(0)
    }
}

impl ReadReady for EofLink {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

impl Write for EofLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Clock that only moves when somebody sleeps on it.
#[derive(Debug, Clone, Default)]
pub struct FakeClock {
    nanos: Rc<Cell<u64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.nanos.get() / 1_000_000
    }
}

impl DelayNs for FakeClock {
    fn delay_ns(&mut self, ns: u32) {
        self.nanos.set(self.nanos.get() + u64::from(ns));
    }
}

impl Clock for FakeClock {
    fn now(&mut self) -> Instant {
        Instant::from_micros(self.nanos.get() / 1_000)
    }
}

/// Output pin that records every level it was driven to.
#[derive(Debug, Clone, Default)]
pub struct RecordingPin {
    pub levels: Rc<std::cell::RefCell<Vec<bool>>>,
}

impl PinErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}

/// Input pin with a fixed level.
#[derive(Debug, Clone, Copy)]
pub struct LevelPin(pub bool);

impl PinErrorType for LevelPin {
    type Error = Infallible;
}

impl InputPin for LevelPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0)
    }
}

/// Board without any control pins wired up.
#[derive(Debug, Default)]
pub struct BareBoard;

impl CellularConfig for BareBoard {
    type ResetPin = NoPin;
    type PowerPin = NoPin;
    type StatusPin = NoPin;

    fn reset_pin(&mut self) -> Option<&mut Self::ResetPin> {
        None
    }

    fn power_pin(&mut self) -> Option<&mut Self::PowerPin> {
        None
    }

    fn status_pin(&mut self) -> Option<&mut Self::StatusPin> {
        None
    }
}

/// Board with recording reset/power pins and a fixed status level.
#[derive(Debug, Default)]
pub struct WiredBoard {
    pub reset: RecordingPin,
    pub power: RecordingPin,
    pub status: Option<LevelPin>,
}

impl CellularConfig for WiredBoard {
    type ResetPin = RecordingPin;
    type PowerPin = RecordingPin;
    type StatusPin = LevelPin;

    fn reset_pin(&mut self) -> Option<&mut Self::ResetPin> {
        Some(&mut self.reset)
    }

    fn power_pin(&mut self) -> Option<&mut Self::PowerPin> {
        Some(&mut self.power)
    }

    fn status_pin(&mut self) -> Option<&mut Self::StatusPin> {
        self.status.as_mut()
    }
}
