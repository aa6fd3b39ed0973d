//! TCP/UDP sockets on top of the module's internal IP stack.
//!
//! The module keeps the socket table; a connect ID is only picked right
//! before opening, from what `AT+QISTATE?` reports as in use.

use embassy_time::Duration;
use embedded_io::{Read, ReadReady, Write};

use crate::{
    at::{
        pattern::{Pattern, OK, PROMPT},
        Args,
    },
    client::{Device, Step},
    clock::Clock,
    command::{command, GET_SOCKET_STATE},
    config::CellularConfig,
    error::Error,
    poll::Outcome,
};

/// Number of connect IDs the module supports.
pub const MAX_CONNECT_IDS: u8 = 12;

/// Largest payload a single `AT+QISEND` accepts.
pub const MAX_SEND_LEN: usize = 1460;

const AT_TIMEOUT: Duration = Duration::from_millis(500);
const STATE_TIMEOUT: Duration = Duration::from_secs(10);
const OPEN_TIMEOUT: Duration = Duration::from_secs(150);
const SEND_TIMEOUT: Duration = Duration::from_secs(5);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

const QISTATE: &str = "+QISTATE: ";
const SOCKET_STATE: Pattern<'static> = Pattern::Any(&[OK, Pattern::Prefix(QISTATE)]);
const SEND_RESULT: Pattern<'static> = Pattern::Any(&[
    Pattern::Exact("SEND OK"),
    Pattern::Exact("SEND FAIL"),
    Pattern::Exact("ERROR"),
]);

/// Connect ID in `0..MAX_CONNECT_IDS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectId(u8);

impl ConnectId {
    pub const fn new(id: u8) -> Option<Self> {
        if id < MAX_CONNECT_IDS {
            Some(Self(id))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ConnectId {
    type Error = Error;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id).ok_or(Error::InvalidArgument)
    }
}

impl core::fmt::Display for ConnectId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connect IDs reported in use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConnectIdSet(u16);

impl ConnectIdSet {
    pub fn insert(&mut self, id: ConnectId) {
        self.0 |= 1 << id.0;
    }

    pub fn contains(&self, id: ConnectId) -> bool {
        self.0 & (1 << id.0) != 0
    }

    pub fn lowest_free(&self) -> Option<ConnectId> {
        (0..MAX_CONNECT_IDS)
            .filter_map(ConnectId::new)
            .find(|&id| !self.contains(id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocketType {
    Tcp,
    Udp,
}

impl SocketType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
        }
    }
}

impl<L, CLK, CFG> Device<L, CLK, CFG>
where
    L: Read + ReadReady + Write,
    CLK: Clock,
    CFG: CellularConfig,
{
    /// Connect to `host:port` on the lowest free connect ID.
    pub fn socket_open(
        &mut self,
        host: &str,
        port: u16,
        socket_type: SocketType,
    ) -> Result<ConnectId, Error> {
        self.record(|dev| {
            if host.is_empty() || host.contains('"') {
                return Err(Error::InvalidArgument);
            }

            let id = dev.used_connect_ids()?.lowest_free().ok_or_else(|| {
                warn!("All {} connect IDs in use", MAX_CONNECT_IDS);
                Error::NoFreeConnectId
            })?;

            let open = command!(
                "AT+QIOPEN=1,{},\"{}\",\"{}\",{}",
                id,
                socket_type.as_str(),
                host,
                port
            )?;
            dev.at
                .write_command_and_read_response(&open, &OK, OPEN_TIMEOUT)
                .step()?;

            let opened = command!("+QIOPEN: {},", id)?;
            let result = dev
                .at
                .read_response(&Pattern::Capture(&opened), OPEN_TIMEOUT)
                .step()?;
            if result.trim() != "0" {
                error!("Opening socket {} failed: {}", id.get(), result.as_str());
                return Err(Error::Rejected);
            }

            debug!("Socket {} connected", id.get());
            Ok(id)
        })
    }

    pub fn socket_send(&mut self, id: ConnectId, data: &[u8]) -> Result<(), Error> {
        self.record(|dev| {
            if data.len() > MAX_SEND_LEN {
                return Err(Error::InvalidArgument);
            }
            if data.is_empty() {
                return Ok(());
            }

            let send = command!("AT+QISEND={},{}", id, data.len())?;
            dev.at
                .write_command_and_read_response(&send, &PROMPT, AT_TIMEOUT)
                .step()?;
            dev.at.write_binary(data)?;

            let result = dev.at.read_response(&SEND_RESULT, SEND_TIMEOUT).step()?;
            if result.as_str() != "SEND OK" {
                error!("Sending on socket {} failed: {}", id.get(), result.as_str());
                return Err(Error::Rejected);
            }
            Ok(())
        })
    }

    /// Read whatever the module has buffered for `id`, possibly nothing.
    pub fn socket_receive(&mut self, id: ConnectId, buf: &mut [u8]) -> Result<usize, Error> {
        self.record(|dev| dev.read_socket(id, buf))
    }

    /// Like [`Device::socket_receive`], but keeps asking until data shows up.
    /// Returns `Ok(0)` once `timeout` has passed without any.
    pub fn socket_receive_timeout(
        &mut self,
        id: ConnectId,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, Error> {
        self.record(|dev| {
            let polled = dev.poll_until(timeout, CFG::POLLING_INTERVAL, |dev| {
                match dev.read_socket(id, buf) {
                    Ok(0) => Outcome::Pending,
                    res => Outcome::Ready(res),
                }
            });
            match polled {
                Ok(res) => res,
                Err(Error::Timeout) => Ok(0),
                Err(e) => Err(e),
            }
        })
    }

    pub fn socket_close(&mut self, id: ConnectId) -> Result<(), Error> {
        self.record(|dev| {
            let close = command!("AT+QICLOSE={}", id)?;
            dev.at
                .write_command_and_read_response(&close, &OK, CLOSE_TIMEOUT)
                .step()?;
            Ok(())
        })
    }

    fn used_connect_ids(&mut self) -> Result<ConnectIdSet, Error> {
        let mut used = ConnectIdSet::default();

        self.at.write_command(GET_SOCKET_STATE)?;
        loop {
            let line = self.at.read_response(&SOCKET_STATE, STATE_TIMEOUT).step()?;
            let Some(state) = line.strip_prefix(QISTATE) else {
                break;
            };
            let args = Args::parse(state)?;
            if args.is_empty() {
                continue;
            }
            let id = ConnectId::new(args.number(0)?).ok_or(Error::Parse)?;
            used.insert(id);
        }

        Ok(used)
    }

    fn read_socket(&mut self, id: ConnectId, buf: &mut [u8]) -> Result<usize, Error> {
        let read = command!("AT+QIRD={}", id)?;
        let header = self
            .at
            .write_command_and_read_response(&read, &Pattern::Capture("+QIRD: "), AT_TIMEOUT)
            .step()?;
        let len = Args::parse(&header)?.number::<usize>(0)?;

        if len > 0 {
            if len > buf.len() {
                error!("{} bytes pending on socket {}, buffer holds {}", len, id.get(), buf.len());
                return Err(Error::BufferTooSmall);
            }
            self.at.read_binary(&mut buf[..len], AT_TIMEOUT).step()?;
        }

        self.at.read_response(&OK, AT_TIMEOUT).step()?;
        Ok(len)
    }
}
