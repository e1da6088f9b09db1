//! Push-channel slots and the coordinator's sink
//!
//! Each `/events` connection claims one of `MAX_SUBSCRIBERS` slots. The
//! slot index doubles as the broadcaster's `ConnectionId` and selects the
//! outbox the HTTP task drains onto its socket.

use portable_atomic::{AtomicBool, Ordering};

use hygroclock_core::broadcast::MAX_SUBSCRIBERS;
use hygroclock_core::traits::{ConnectionId, PushSink, SinkError};

use crate::channels::{Frame, OUTBOXES};

static CLAIMED: [AtomicBool; MAX_SUBSCRIBERS] = [const { AtomicBool::new(false) }; MAX_SUBSCRIBERS];

/// Claim a free slot
pub fn claim_slot() -> Option<ConnectionId> {
    CLAIMED
        .iter()
        .position(|slot| {
            slot.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        })
        .map(|index| ConnectionId(index as u8))
}

/// Give a slot back
///
/// Called by the coordinator after it has unsubscribed the slot's client,
/// so a new claimant never receives frames meant for the previous one.
pub fn release_slot(connection: ConnectionId) {
    if let Some(slot) = CLAIMED.get(usize::from(connection.0)) {
        slot.store(false, Ordering::Release);
    }
}

/// Hands frames to the per-slot outboxes without waiting
#[derive(Debug, Default)]
pub struct OutboxSink;

impl PushSink for OutboxSink {
    fn deliver(&mut self, connection: ConnectionId, frame: &[u8]) -> Result<(), SinkError> {
        let index = usize::from(connection.0);
        let claimed = CLAIMED
            .get(index)
            .is_some_and(|slot| slot.load(Ordering::Acquire));
        if !claimed {
            return Err(SinkError::Closed);
        }

        let frame = Frame::from_slice(frame).map_err(|_| SinkError::Full)?;
        OUTBOXES[index].try_send(frame).map_err(|_| SinkError::Full)
    }
}
