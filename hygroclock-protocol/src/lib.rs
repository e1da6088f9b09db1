//! Hygroclock wire formats
//!
//! Everything the climate clock puts on (or takes off) the network, kept
//! free of any socket or executor so it can be tested on the host:
//!
//! - [`sse`]: Server-Sent Events framing for the `/events` push channel
//! - [`http`]: request-head parsing and response heads for the tiny HTTP server
//! - [`sntp`]: SNTP client packet encoding and response decoding
//! - [`relay`]: chat-relay (CallMeBot) request targets with URL escaping
//!
//! # Push channel framing
//!
//! ```text
//! retry: 10000\r\n        (greeting only)
//! id: 42\r\n
//! event: new_readings\r\n
//! data: {"humidity":"55.2","temperature":"21.7"}\r\n
//! \r\n
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod http;
pub mod relay;
pub mod sntp;
pub mod sse;

pub use http::{parse_request, parse_status_line, HttpError, Method, Request, Status};
pub use relay::{Relay, RELAY_HOST};
pub use sntp::{SntpError, NTP_PACKET_SIZE, NTP_PORT};
pub use sse::{FrameError, SseEvent, MAX_EVENT_SIZE};

/// Append raw bytes to a bounded buffer
pub(crate) fn put<const N: usize>(
    out: &mut heapless::Vec<u8, N>,
    bytes: &[u8],
) -> Result<(), FrameError> {
    out.extend_from_slice(bytes)
        .map_err(|_| FrameError::BufferTooSmall)
}

/// Append a decimal number to a bounded buffer
pub(crate) fn put_u32<const N: usize>(
    out: &mut heapless::Vec<u8, N>,
    value: u32,
) -> Result<(), FrameError> {
    let mut digits = [0u8; 10];
    let mut n = value;
    let mut i = digits.len();
    loop {
        i -= 1;
        digits[i] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    put(out, &digits[i..])
}
