//! Server-Sent Events framing
//!
//! One [`SseEvent`] becomes one `text/event-stream` block: optional `retry:`,
//! `id:` and `event:` fields followed by one `data:` line per payload line
//! and a terminating blank line.

use heapless::Vec;

use crate::{put, put_u32};

/// Largest encoded event block the push channel carries
pub const MAX_EVENT_SIZE: usize = 192;

/// Line terminator used on the wire
const EOL: &[u8] = b"\r\n";

/// Errors that can occur while encoding a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Output buffer cannot hold the encoded frame
    BufferTooSmall,
    /// A single-line field contains a line break
    InvalidField,
}

/// A single event on the push channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SseEvent<'a> {
    /// Resume identifier (`id:` field)
    pub id: Option<u32>,
    /// Event name; `None` means the default `message` event
    pub event: Option<&'a str>,
    /// Payload; may span several lines
    pub data: &'a str,
    /// Suggested reconnect delay in milliseconds (`retry:` field)
    pub retry_ms: Option<u32>,
}

impl<'a> SseEvent<'a> {
    /// A named event with a resume identifier
    pub const fn named(id: u32, event: &'a str, data: &'a str) -> Self {
        Self {
            id: Some(id),
            event: Some(event),
            data,
            retry_ms: None,
        }
    }

    /// The greeting sent when a client subscribes
    pub const fn greeting(id: u32, data: &'a str, retry_ms: u32) -> Self {
        Self {
            id: Some(id),
            event: None,
            data,
            retry_ms: Some(retry_ms),
        }
    }

    /// Encode this event, appending to `out`
    pub fn encode<const N: usize>(&self, out: &mut Vec<u8, N>) -> Result<(), FrameError> {
        if let Some(retry) = self.retry_ms {
            put(out, b"retry: ")?;
            put_u32(out, retry)?;
            put(out, EOL)?;
        }

        if let Some(id) = self.id {
            put(out, b"id: ")?;
            put_u32(out, id)?;
            put(out, EOL)?;
        }

        if let Some(name) = self.event {
            if name.is_empty() || name.contains(['\r', '\n']) {
                return Err(FrameError::InvalidField);
            }
            put(out, b"event: ")?;
            put(out, name.as_bytes())?;
            put(out, EOL)?;
        }

        // Every payload line gets its own data field
        for line in self.data.split('\n') {
            put(out, b"data: ")?;
            put(out, line.trim_end_matches('\r').as_bytes())?;
            put(out, EOL)?;
        }

        put(out, EOL)
    }

    /// Encode this event into a fresh buffer
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_EVENT_SIZE>, FrameError> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        Ok(out)
    }
}

/// Parse the value of a `Last-Event-ID` header
///
/// Resume identifiers are decimal event ids; anything else is treated as
/// "no resume point".
pub fn parse_last_event_id(value: &str) -> Option<u32> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(bytes: &[u8]) -> &str {
        core::str::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_named_event() {
        let ev = SseEvent::named(7, "ping", "10000");
        let out = ev.encode_to_vec().unwrap();
        assert_eq!(text(&out), "id: 7\r\nevent: ping\r\ndata: 10000\r\n\r\n");
    }

    #[test]
    fn test_greeting_carries_retry() {
        let ev = SseEvent::greeting(0, "hello!", 10_000);
        let out = ev.encode_to_vec().unwrap();
        assert_eq!(text(&out), "retry: 10000\r\nid: 0\r\ndata: hello!\r\n\r\n");
    }

    #[test]
    fn test_multiline_data() {
        let ev = SseEvent {
            id: None,
            event: None,
            data: "a\r\nb",
            retry_ms: None,
        };
        let out = ev.encode_to_vec().unwrap();
        assert_eq!(text(&out), "data: a\r\ndata: b\r\n\r\n");
    }

    #[test]
    fn test_event_name_with_newline_rejected() {
        let ev = SseEvent::named(1, "bad\nname", "x");
        assert_eq!(ev.encode_to_vec(), Err(FrameError::InvalidField));
    }

    #[test]
    fn test_buffer_too_small() {
        let ev = SseEvent::named(1, "new_readings", "{\"humidity\":\"55.2\"}");
        let mut out: Vec<u8, 16> = Vec::new();
        assert_eq!(ev.encode(&mut out), Err(FrameError::BufferTooSmall));
    }

    #[test]
    fn test_last_event_id() {
        assert_eq!(parse_last_event_id("42"), Some(42));
        assert_eq!(parse_last_event_id(" 42 "), Some(42));
        assert_eq!(parse_last_event_id(""), None);
        assert_eq!(parse_last_event_id("abc"), None);
    }
}
