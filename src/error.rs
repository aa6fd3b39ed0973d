#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    // Transport errors
    /// No matching line, or not enough bytes, arrived within the time budget.
    Timeout,
    /// The modem explicitly answered with an error or a negative result.
    Rejected,

    // Caller errors, detected before any I/O
    InvalidArgument,
    BufferTooSmall,
    /// A bounded command or header string ran out of capacity.
    Overflow,

    // Modem state errors
    NoFreeConnectId,
    Parse,
    Sim,
    NotRegistering,

    // Board errors
    Unsupported,
    IoPin,
    Io(embedded_io::ErrorKind),
}

impl Error {
    pub(crate) fn from_io<E: embedded_io::Error>(e: E) -> Self {
        Self::Io(e.kind())
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Timeout => f.write_str("timed out waiting for the modem"),
            Self::Rejected => f.write_str("modem rejected the command"),
            Self::InvalidArgument => f.write_str("invalid argument"),
            Self::BufferTooSmall => f.write_str("buffer too small for response"),
            Self::Overflow => f.write_str("command string capacity exceeded"),
            Self::NoFreeConnectId => f.write_str("no free connect id"),
            Self::Parse => f.write_str("malformed response"),
            Self::Sim => f.write_str("SIM error"),
            Self::NotRegistering => f.write_str("modem is not attempting registration"),
            Self::Unsupported => f.write_str("unsupported"),
            Self::IoPin => f.write_str("GPIO error"),
            Self::Io(kind) => write!(f, "serial link error: {:?}", kind),
        }
    }
}

/// Coarse outcome of the most recent [`Device`](crate::Device) operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    #[default]
    Ok,
    Unknown,
}

impl<T> From<&Result<T, Error>> for ErrorCode {
    fn from(res: &Result<T, Error>) -> Self {
        match res {
            Ok(_) => Self::Ok,
            Err(_) => Self::Unknown,
        }
    }
}
