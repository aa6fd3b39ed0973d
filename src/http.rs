//! HTTP(S) client built into the module (`AT+QHTTP*`).

use embassy_time::Duration;
use embedded_io::{Read, ReadReady, Write};
use heapless::String;

use crate::{
    at::{
        pattern::{Pattern, CONNECT, OK},
        Args,
    },
    client::{Device, Step},
    clock::Clock,
    command::{command, compose, HTTP_GET, HTTP_READ},
    config::CellularConfig,
    error::Error,
};

pub const MAX_HEADER_LEN: usize = 512;

const USER_AGENT: &str = "QUECTEL_MODULE";
const CONTENT_TYPE: &str = "application/json";

const AT_TIMEOUT: Duration = Duration::from_millis(500);
const READ_TIMEOUT: Duration = Duration::from_secs(1);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(60);

/// A URL taken apart just enough to write a request line and `Host` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Url<'a> {
    pub secure: bool,
    pub host: &'a str,
    /// Everything from the first `/` after the host, possibly empty.
    pub path: &'a str,
}

impl<'a> Url<'a> {
    pub fn parse(url: &'a str) -> Result<Self, Error> {
        let (secure, rest) = if let Some(rest) = url.strip_prefix("http://") {
            (false, rest)
        } else if let Some(rest) = url.strip_prefix("https://") {
            (true, rest)
        } else {
            return Err(Error::InvalidArgument);
        };

        let (host, path) = rest.find('/').map_or((rest, ""), |i| rest.split_at(i));
        Ok(Self { secure, host, path })
    }
}

fn is_secure(url: &str) -> bool {
    url.starts_with("https:")
}

/// Request header for `AT+QHTTPPOST` with `requestheader` enabled.
pub fn post_header(url: &Url<'_>, content_length: usize) -> Result<String<MAX_HEADER_LEN>, Error> {
    let path = if url.path.is_empty() { "/" } else { url.path };
    compose(format_args!(
        "POST {} HTTP/1.1\r\n\
         Host: {}\r\n\
         Accept: */*\r\n\
         User-Agent: {}\r\n\
         Connection: Keep-Alive\r\n\
         Content-Type: {}\r\n\
         Content-Length: {}\r\n\
         \r\n",
        path, url.host, USER_AGENT, CONTENT_TYPE, content_length
    ))
}

/// Outcome of [`Device::http_get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HttpResponse {
    /// HTTP status code, if the module reported one.
    pub status: Option<u16>,
    /// Number of body bytes written to the caller's buffer.
    pub len: usize,
}

impl<L, CLK, CFG> Device<L, CLK, CFG>
where
    L: Read + ReadReady + Write,
    CLK: Clock,
    CFG: CellularConfig,
{
    /// GET `url` into `buf`.
    ///
    /// With a known content length, one byte of `buf` beyond the body stays
    /// unused, so `buf` must be longer than the body.
    pub fn http_get(&mut self, url: &str, buf: &mut [u8]) -> Result<HttpResponse, Error> {
        self.record(|dev| {
            if url.is_empty() {
                return Err(Error::InvalidArgument);
            }

            if is_secure(url) {
                dev.configure_tls()?;
            }
            dev.at
                .write_command_and_read_response("AT+QHTTPCFG=\"requestheader\",0", &OK, AT_TIMEOUT)
                .step()?;
            dev.set_url(url)?;

            dev.at
                .write_command_and_read_response(HTTP_GET, &OK, AT_TIMEOUT)
                .step()?;
            let result = dev
                .at
                .read_response(&Pattern::Capture("+QHTTPGET: "), RESPONSE_TIMEOUT)
                .step()?;
            let args = Args::parse(&result)?;
            if args.get(0) != Some("0") {
                error!("HTTP GET failed: {}", result.as_str());
                return Err(Error::Rejected);
            }
            let status = optional_number::<u16>(&args, 1)?;
            let content_length = optional_number::<usize>(&args, 2)?;

            dev.at
                .write_command_and_read_response(HTTP_READ, &CONNECT, READ_TIMEOUT)
                .step()?;
            let len = match content_length {
                Some(len) => {
                    if len >= buf.len() {
                        error!("HTTP body of {} bytes does not fit", len);
                        return Err(Error::BufferTooSmall);
                    }
                    dev.at
                        .read_binary(&mut buf[..len], RESPONSE_TIMEOUT)
                        .step()?;
                    dev.at.read_response(&OK, READ_TIMEOUT).step()?;
                    len
                }
                None => dev.at.read_http_body(buf, RESPONSE_TIMEOUT).step()?,
            };
            dev.at
                .read_response(&Pattern::Exact("+QHTTPREAD: 0"), READ_TIMEOUT)
                .step()?;

            debug!("HTTP GET {} bytes", len);
            Ok(HttpResponse { status, len })
        })
    }

    /// POST `body` as JSON to `url`, returning the HTTP status if reported.
    pub fn http_post(&mut self, url: &str, body: &str) -> Result<Option<u16>, Error> {
        self.record(|dev| {
            let target = Url::parse(url)?;
            let header = post_header(&target, body.len())?;

            if target.secure {
                dev.configure_tls()?;
            }
            dev.at
                .write_command_and_read_response("AT+QHTTPCFG=\"requestheader\",1", &OK, AT_TIMEOUT)
                .step()?;
            dev.set_url(url)?;

            let post = command!("AT+QHTTPPOST={}", header.len() + body.len())?;
            dev.at
                .write_command_and_read_response(&post, &CONNECT, RESPONSE_TIMEOUT)
                .step()?;
            dev.at.write_binary(header.as_bytes())?;
            dev.at.write_binary(body.as_bytes())?;
            dev.at.read_response(&OK, READ_TIMEOUT).step()?;

            let result = dev
                .at
                .read_response(&Pattern::Capture("+QHTTPPOST: "), RESPONSE_TIMEOUT)
                .step()?;
            let args = Args::parse(&result)?;
            if args.get(0) != Some("0") {
                error!("HTTP POST failed: {}", result.as_str());
                return Err(Error::Rejected);
            }
            optional_number(&args, 1)
        })
    }

    fn configure_tls(&mut self) -> Result<(), Error> {
        let tls = CFG::TLS;
        let commands = [
            command!("AT+QHTTPCFG=\"sslctxid\",{}", tls.context_id)?,
            command!("AT+QSSLCFG=\"sslversion\",{},{}", tls.context_id, tls.ssl_version)?,
            command!(
                "AT+QSSLCFG=\"ciphersuite\",{},\"{}\"",
                tls.context_id,
                tls.cipher_suite
            )?,
            command!("AT+QSSLCFG=\"seclevel\",{},{}", tls.context_id, tls.security_level)?,
        ];
        for cmd in &commands {
            self.at
                .write_command_and_read_response(cmd, &OK, AT_TIMEOUT)
                .step()?;
        }
        Ok(())
    }

    fn set_url(&mut self, url: &str) -> Result<(), Error> {
        let set = command!("AT+QHTTPURL={}", url.len())?;
        self.at
            .write_command_and_read_response(&set, &CONNECT, AT_TIMEOUT)
            .step()?;
        self.at.write_binary(url.as_bytes())?;
        self.at.read_response(&OK, AT_TIMEOUT).step()?;
        Ok(())
    }
}

/// Field `index` as a number, `None` if the module left it out.
fn optional_number<T: core::str::FromStr>(args: &Args<'_>, index: usize) -> Result<Option<T>, Error> {
    match args.get(index) {
        Some(_) => args.number(index).map(Some),
        None => Ok(None),
    }
}
