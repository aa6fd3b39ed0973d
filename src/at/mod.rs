//! Line oriented AT transport.
//!
//! [`AtTx`] turns the raw serial link into a protocol of command lines and
//! pattern matched response lines, each read bounded by a timeout, with raw
//! binary spans in between where the module asks for them.

pub mod args;
pub mod pattern;

use embassy_time::{Duration, Instant};
use embedded_io::{Read, ReadReady, Write};
use heapless::{String, Vec};

use crate::{
    clock::{Clock, Stopwatch},
    command::Command,
    error::Error,
};

pub use args::Args;
pub use pattern::Pattern;

pub const MAX_LINE_LEN: usize = 256;

/// One response line, or the capture taken from it.
pub type Line = String<MAX_LINE_LEN>;

/// Terminates an `AT+QHTTPREAD` body of unknown length.
const HTTP_BODY_SENTINEL: &[u8] = b"\r\nOK\r\n";

/// The data prompt is the only output not followed by a line terminator.
const DATA_PROMPT: &[u8] = b"> ";

const POLL_STEP_US: u32 = 1_000;

pub struct AtTx<L, CLK> {
    link: L,
    clock: CLK,
    echo: bool,
    pending_echo: Option<Command>,
    line: Vec<u8, MAX_LINE_LEN>,
    line_overflow: bool,
}

impl<L, CLK> AtTx<L, CLK>
where
    L: Read + ReadReady + Write,
    CLK: Clock,
{
    /// The module echoes commands after power up, so echo suppression starts
    /// enabled.
    pub fn new(link: L, clock: CLK) -> Self {
        Self {
            link,
            clock,
            echo: true,
            pending_echo: None,
            line: Vec::new(),
            line_overflow: false,
        }
    }

    pub fn release(self) -> (L, CLK) {
        (self.link, self.clock)
    }

    pub fn set_echo(&mut self, on: bool) {
        self.echo = on;
        if !on {
            self.pending_echo = None;
        }
    }

    pub fn echo(&self) -> bool {
        self.echo
    }

    pub fn write_command(&mut self, command: &str) -> Result<(), Error> {
        if command.contains(['\r', '\n']) {
            return Err(Error::InvalidArgument);
        }

        trace!("> {}", command);
        self.write_binary(command.as_bytes())?;
        self.write_binary(b"\r")?;

        if self.echo {
            // Too long to remember means too long to come back as a line.
            self.pending_echo = String::try_from(command).ok();
        }
        Ok(())
    }

    /// Read lines until one matches `pattern`, returning its capture.
    ///
    /// Lines that do not match are dropped. With echo enabled, the first line
    /// equal to the last written command is dropped without being matched.
    pub fn read_response(&mut self, pattern: &Pattern<'_>, timeout: Duration) -> Result<Line, Error> {
        let sw = Stopwatch::start(&mut self.clock);
        loop {
            let line = match self.read_line(&sw, timeout) {
                Ok(line) => line,
                Err(e) => {
                    debug!("No matching response within {} ms", timeout.as_millis());
                    return Err(e);
                }
            };

            if self
                .pending_echo
                .as_ref()
                .is_some_and(|echo| echo.as_str() == line.as_str())
            {
                self.pending_echo = None;
                continue;
            }

            if let Some(capture) = pattern.matches(&line) {
                trace!("< {}", line.as_str());
                return Line::try_from(capture).map_err(|_| Error::Overflow);
            }

            trace!("Discarding '{}'", line.as_str());
            if sw.elapsed(&mut self.clock) >= timeout {
                return Err(Error::Timeout);
            }
        }
    }

    pub fn write_command_and_read_response(
        &mut self,
        command: &str,
        pattern: &Pattern<'_>,
        timeout: Duration,
    ) -> Result<Line, Error> {
        self.write_command(command)?;
        self.read_response(pattern, timeout)
    }

    pub fn write_binary(&mut self, data: &[u8]) -> Result<(), Error> {
        self.link.write_all(data).map_err(Error::from_io)?;
        self.link.flush().map_err(Error::from_io)
    }

    /// Fill `buf` completely with raw bytes.
    pub fn read_binary(&mut self, buf: &mut [u8], timeout: Duration) -> Result<(), Error> {
        let sw = Stopwatch::start(&mut self.clock);
        let mut n = 0;
        while n < buf.len() {
            if !self.wait_for_available(&sw, timeout)? {
                debug!("Received {} of {} bytes", n, buf.len());
                return Err(Error::Timeout);
            }
            match self.link.read(&mut buf[n..]).map_err(Error::from_io)? {
                0 => self.idle(&sw, timeout)?,
                read => n += read,
            }
        }
        Ok(())
    }

    /// Read an `AT+QHTTPREAD` body of unknown length into `buf`.
    ///
    /// The body ends where `\r\nOK\r\n` is seen; that sentinel is consumed
    /// but not stored. The last byte of `buf` stays reserved, so the body may
    /// be at most `buf.len() - 1` bytes long.
    pub fn read_http_body(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, Error> {
        let limit = buf.len().saturating_sub(1);
        let sw = Stopwatch::start(&mut self.clock);

        // Bytes that may still turn out to be the sentinel.
        let mut tail = [0u8; HTTP_BODY_SENTINEL.len()];
        let mut tail_len = 0;
        let mut len = 0;

        loop {
            if !self.wait_for_available(&sw, timeout)? {
                return Err(Error::Timeout);
            }
            let Some(byte) = self.read_byte()? else {
                self.idle(&sw, timeout)?;
                continue;
            };

            tail[tail_len] = byte;
            tail_len += 1;

            while !HTTP_BODY_SENTINEL.starts_with(&tail[..tail_len]) {
                if len >= limit {
                    warn!("HTTP body does not fit in {} bytes", buf.len());
                    return Err(Error::BufferTooSmall);
                }
                buf[len] = tail[0];
                len += 1;
                tail.copy_within(1..tail_len, 0);
                tail_len -= 1;
            }

            if tail_len == HTTP_BODY_SENTINEL.len() {
                return Ok(len);
            }
        }
    }

    /// Sleep-then-recheck until at least one byte can be read, or `timeout`
    /// has passed since `sw` was started. Nothing is consumed.
    pub fn wait_for_available(&mut self, sw: &Stopwatch, timeout: Duration) -> Result<bool, Error> {
        loop {
            if self.link.read_ready().map_err(Error::from_io)? {
                return Ok(true);
            }
            if sw.elapsed(&mut self.clock) >= timeout {
                return Ok(false);
            }
            self.clock.delay_us(POLL_STEP_US);
        }
    }

    pub fn stopwatch(&mut self) -> Stopwatch {
        Stopwatch::start(&mut self.clock)
    }

    pub fn now(&mut self) -> Instant {
        self.clock.now()
    }

    pub fn delay(&mut self, duration: Duration) {
        Clock::delay(&mut self.clock, duration);
    }

    pub(crate) fn clock_mut(&mut self) -> &mut CLK {
        &mut self.clock
    }

    /// A link may report itself ready and still hand out nothing, at end of
    /// stream for one. Such a read counts against the timeout like silence.
    fn idle(&mut self, sw: &Stopwatch, timeout: Duration) -> Result<(), Error> {
        if sw.elapsed(&mut self.clock) >= timeout {
            return Err(Error::Timeout);
        }
        self.clock.delay_us(POLL_STEP_US);
        Ok(())
    }

    fn read_byte(&mut self) -> Result<Option<u8>, Error> {
        let mut byte = [0u8; 1];
        match self.link.read(&mut byte).map_err(Error::from_io)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Next non-blank line; a partial line survives a timeout.
    fn read_line(&mut self, sw: &Stopwatch, timeout: Duration) -> Result<Line, Error> {
        loop {
            if !self.wait_for_available(sw, timeout)? {
                return Err(Error::Timeout);
            }
            let Some(byte) = self.read_byte()? else {
                self.idle(sw, timeout)?;
                continue;
            };

            match byte {
                b'\n' => {
                    if let Some(line) = self.take_line() {
                        return Ok(line);
                    }
                }
                b'\r' => {}
                b => {
                    if self.line.push(b).is_err() {
                        self.line_overflow = true;
                    }
                    if self.line.as_slice() == DATA_PROMPT {
                        if let Some(line) = self.take_line() {
                            return Ok(line);
                        }
                    }
                }
            }
        }
    }

    fn take_line(&mut self) -> Option<Line> {
        let bytes = core::mem::take(&mut self.line);
        if core::mem::take(&mut self.line_overflow) {
            warn!("Discarding line longer than {} bytes", MAX_LINE_LEN);
            return None;
        }
        if bytes.is_empty() {
            return None;
        }
        match String::from_utf8(bytes) {
            Ok(line) => Some(line),
            Err(_) => {
                warn!("Discarding line that is not valid UTF-8");
                None
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}
