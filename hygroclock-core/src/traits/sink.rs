//! Push sink trait
//!
//! The broadcaster hands finished event-stream frames to a sink, which
//! owns the actual client connections.

/// Identifies one push-channel connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionId(pub u8);

/// Errors that can occur while handing a frame to a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SinkError {
    /// Connection is gone
    Closed,
    /// Connection's outbound queue is full
    Full,
}

/// Trait for delivering encoded frames to connections
///
/// `deliver` must not block: a connection that cannot take the frame
/// right away reports an error and the frame is dropped for it.
pub trait PushSink {
    /// Queue `frame` for `connection`
    fn deliver(&mut self, connection: ConnectionId, frame: &[u8]) -> Result<(), SinkError>;
}
