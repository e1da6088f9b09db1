//! Cooperative scheduler
//!
//! One context object owns the sensor, display, clock, broadcaster and
//! connectivity state. The firmware calls [`Scheduler::run_iteration`]
//! in a loop with the current uptime; everything periodic is gated on
//! elapsed time, nothing waits.

pub mod coordinator;
pub mod report;

use crate::broadcast::REPLAY_DEPTH;

pub use coordinator::Scheduler;
pub use report::{LinkOutcome, PollOutcome, RenderOutcome, TickReport};

/// Events one poll cycle pushes: `ping`, then `new_readings`
pub const EVENTS_PER_POLL: usize = 2;

/// Frames one iteration can hand a single subscriber: its greeting, a full
/// replay and one poll cycle
///
/// The firmware drains subscriptions and runs the iteration without
/// yielding, so a push-channel outbox needs at least this many slots.
pub const SUBSCRIBER_BURST: usize = 1 + REPLAY_DEPTH + EVENTS_PER_POLL;
