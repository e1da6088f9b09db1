//! Minimal HTTP/1.1 handling
//!
//! The device serves three routes and makes one outbound POST, so this
//! module only understands what those need: the request line, the
//! `Last-Event-ID` header, response heads and the status line of a reply.

use heapless::Vec;

use crate::sse::{parse_last_event_id, FrameError};
use crate::{put, put_u32};

/// Largest request head the server accepts
pub const MAX_REQUEST_HEAD: usize = 1024;

/// Response head for the push channel
pub const EVENT_STREAM_HEAD: &str = "HTTP/1.1 200 OK\r\n\
Content-Type: text/event-stream\r\n\
Cache-Control: no-cache\r\n\
Connection: keep-alive\r\n\
Access-Control-Allow-Origin: *\r\n\
\r\n";

/// Errors that can occur while parsing HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HttpError {
    /// The head has not been fully received yet
    Incomplete,
    /// The head is not valid HTTP/1.x
    Malformed,
}

/// Request method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Method {
    Get,
    Post,
    Other,
}

/// A parsed request head
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Request<'a> {
    pub method: Method,
    /// Path without the query string
    pub path: &'a str,
    /// Resume identifier presented by a reconnecting event-stream client
    pub last_event_id: Option<u32>,
}

/// Response status codes the server emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    Ok,
    NotFound,
    MethodNotAllowed,
    ServiceUnavailable,
}

impl Status {
    /// Numeric status code
    pub const fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotFound => 404,
            Status::MethodNotAllowed => 405,
            Status::ServiceUnavailable => 503,
        }
    }

    /// Reason phrase
    pub const fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NotFound => "Not Found",
            Status::MethodNotAllowed => "Method Not Allowed",
            Status::ServiceUnavailable => "Service Unavailable",
        }
    }
}

/// Parse a request head
///
/// `buf` must contain the whole head up to and including the blank line;
/// otherwise [`HttpError::Incomplete`] is returned and the caller should
/// read more bytes.
pub fn parse_request(buf: &[u8]) -> Result<Request<'_>, HttpError> {
    let head_len = find_head_end(buf).ok_or(HttpError::Incomplete)?;
    let head = core::str::from_utf8(&buf[..head_len]).map_err(|_| HttpError::Malformed)?;

    let mut lines = head.split("\r\n");
    let request_line = lines.next().ok_or(HttpError::Malformed)?;

    let mut parts = request_line.split(' ');
    let method = match parts.next() {
        Some("GET") => Method::Get,
        Some("POST") => Method::Post,
        Some(m) if !m.is_empty() => Method::Other,
        _ => return Err(HttpError::Malformed),
    };
    let target = parts.next().ok_or(HttpError::Malformed)?;
    let version = parts.next().ok_or(HttpError::Malformed)?;
    if !target.starts_with('/') || !version.starts_with("HTTP/1.") {
        return Err(HttpError::Malformed);
    }
    let path = target.split('?').next().unwrap_or(target);

    let mut last_event_id = None;
    for line in lines {
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':').ok_or(HttpError::Malformed)?;
        if name.trim().eq_ignore_ascii_case("last-event-id") {
            last_event_id = parse_last_event_id(value);
        }
    }

    Ok(Request {
        method,
        path,
        last_event_id,
    })
}

/// Find the end of the head (index just past `\r\n\r\n`)
fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

/// Write a response head with an optional content length
pub fn write_response_head<const N: usize>(
    out: &mut Vec<u8, N>,
    status: Status,
    content_type: &str,
    content_length: Option<usize>,
) -> Result<(), FrameError> {
    put(out, b"HTTP/1.1 ")?;
    put_u32(out, status.code() as u32)?;
    put(out, b" ")?;
    put(out, status.reason().as_bytes())?;
    put(out, b"\r\nContent-Type: ")?;
    put(out, content_type.as_bytes())?;
    if let Some(len) = content_length {
        put(out, b"\r\nContent-Length: ")?;
        put_u32(out, len as u32)?;
    }
    put(out, b"\r\nConnection: close\r\n\r\n")
}

/// Parse the status code from the first line of a response
pub fn parse_status_line(buf: &[u8]) -> Result<u16, HttpError> {
    let line_end = buf
        .windows(2)
        .position(|w| w == b"\r\n")
        .ok_or(HttpError::Incomplete)?;
    let line = core::str::from_utf8(&buf[..line_end]).map_err(|_| HttpError::Malformed)?;

    let mut parts = line.split(' ');
    let version = parts.next().ok_or(HttpError::Malformed)?;
    if !version.starts_with("HTTP/") {
        return Err(HttpError::Malformed);
    }
    parts
        .next()
        .and_then(|code| code.parse().ok())
        .ok_or(HttpError::Malformed)
}
