#![cfg_attr(not(test), no_std)]

//! Blocking driver for Quectel UC20/EC21 cellular modules over a serial AT
//! link.
//!
//! [`Device`] owns the link and a [`Clock`](clock::Clock) and offers the
//! module's functions as plain blocking calls: power control, identity and
//! signal queries, network registration, the PDP context, TCP/UDP sockets,
//! the built-in HTTP client and USSD. Every call is bounded by its own time
//! budget and leaves a coarse result in [`Device::last_error`].
//!
//! The line protocol underneath lives in [`at`] and can be used on its own.

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod at;
mod client;
pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod general;
pub mod http;
mod module_timing;
pub mod poll;
mod power;
mod psn;
pub mod registration;
pub mod socket;
mod ussd;

#[cfg(test)]
mod test_helpers;

pub use client::Device;
pub use clock::{Clock, SystemClock};
pub use config::{Apn, CellularConfig, NoPin, TlsConfig};
pub use error::{Error, ErrorCode};
pub use general::{LocalTime, UNKNOWN_SIGNAL_DBM};
pub use http::HttpResponse;
pub use registration::Status as RegistrationStatus;
pub use socket::{ConnectId, SocketType};
pub use ussd::MAX_USSD_LEN;
