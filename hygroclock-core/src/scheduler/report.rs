//! Outcome reports
//!
//! The scheduler never logs; it returns what happened and the firmware
//! decides what is worth a log line.

use crate::broadcast::{BroadcastError, PushReport};
use crate::clock::ClockSnapshot;
use crate::error::CoordinatorError;
use crate::notifier::NotifyRequest;
use crate::readings::Reading;
use crate::state::ConnectivityState;

/// Result of one poll-and-broadcast cycle
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollOutcome {
    /// What the sensor returned
    pub reading: Reading,
    /// The `ping` push
    pub ping: Result<PushReport, BroadcastError>,
    /// The `new_readings` push, or why it was skipped
    pub readings: Result<PushReport, CoordinatorError>,
}

/// Result of the refresh step
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RenderOutcome {
    /// Not connected yet
    Skipped,
    /// The online banner is still being held
    BannerHeld,
    /// A frame was shown for this snapshot
    Rendered(ClockSnapshot),
    /// The display refused the frame
    Failed(CoordinatorError),
}

/// Result of one loop iteration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// Uptime the iteration ran at (ms)
    pub now_ms: u64,
    /// Present when a poll was due
    pub poll: Option<PollOutcome>,
    pub render: RenderOutcome,
}

/// Result of feeding a link event
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkOutcome {
    pub previous: ConnectivityState,
    pub state: ConnectivityState,
    /// Notification to send, on the transition into `Connected`
    pub notification: Option<NotifyRequest>,
    /// Whether the online banner made it to the display
    pub banner: Result<(), CoordinatorError>,
}
