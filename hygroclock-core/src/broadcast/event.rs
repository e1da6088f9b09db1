//! Push events

use heapless::String;

/// Resume identifier; strictly increasing per boot
pub type EventId = u32;

/// Longest event payload
pub const MAX_PAYLOAD_LEN: usize = 64;

/// Data of the greeting sent on subscribe
pub const GREETING: &str = "hello!";

/// Kinds of events pushed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    /// Liveness; payload is the tick timestamp
    Ping,
    /// Fresh reading; payload is the encoded reading
    NewReadings,
}

impl EventKind {
    /// Event name on the wire
    pub const fn name(self) -> &'static str {
        match self {
            EventKind::Ping => "ping",
            EventKind::NewReadings => "new_readings",
        }
    }
}

/// A retained event
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PushEvent {
    pub id: EventId,
    pub kind: EventKind,
    pub payload: String<MAX_PAYLOAD_LEN>,
}
