//! Coordinator error taxonomy

use hygroclock_display::DisplayError;

use crate::broadcast::BroadcastError;
use crate::traits::SensorError;

/// Errors surfaced by the coordinator
///
/// Only a display failure during boot is fatal; everything else is
/// reported and the loop carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoordinatorError {
    /// The sensor produced no usable reading this cycle
    SensorUnavailable(SensorError),
    /// The display did not accept a frame
    DisplayBusFailure(DisplayError),
    /// The network could not be reached
    NetworkUnreachable,
    /// The chat relay answered with a non-2xx status
    NotifierRejected { code: u16 },
    /// An event could not be framed for the push channel
    Broadcast(BroadcastError),
}

impl CoordinatorError {
    /// Whether this error halts the device when it happens during boot
    pub fn is_fatal_at_boot(&self) -> bool {
        matches!(self, CoordinatorError::DisplayBusFailure(_))
    }
}

impl From<SensorError> for CoordinatorError {
    fn from(e: SensorError) -> Self {
        CoordinatorError::SensorUnavailable(e)
    }
}

impl From<DisplayError> for CoordinatorError {
    fn from(e: DisplayError) -> Self {
        CoordinatorError::DisplayBusFailure(e)
    }
}

impl From<BroadcastError> for CoordinatorError {
    fn from(e: BroadcastError) -> Self {
        CoordinatorError::Broadcast(e)
    }
}
