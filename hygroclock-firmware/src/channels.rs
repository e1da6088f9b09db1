//! Inter-task communication channels
//!
//! The coordinator owns all device state. Network tasks reach it only
//! through the mailboxes below, which it drains without blocking at the
//! top of every iteration.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use heapless::Vec;

use hygroclock_core::broadcast::{EventId, MAX_SUBSCRIBERS};
use hygroclock_core::notifier::NotifyRequest;
use hygroclock_core::readings::EncodedReading;
use hygroclock_core::scheduler::SUBSCRIBER_BURST;
use hygroclock_core::traits::ConnectionId;
use hygroclock_core::CoordinatorError;
use hygroclock_protocol::MAX_EVENT_SIZE;

/// Channel capacity for subscription notices
const SUBSCRIPTION_CHANNEL_SIZE: usize = 8;

/// Frames queued per push-channel connection
pub const OUTBOX_DEPTH: usize = SUBSCRIBER_BURST;

/// One encoded event-stream frame
pub type Frame = Vec<u8, MAX_EVENT_SIZE>;

/// Push-channel connection changes reported by the HTTP tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Subscription {
    /// A client opened `/events`, optionally presenting `Last-Event-ID`
    Open {
        connection: ConnectionId,
        resume_from: Option<EventId>,
    },
    /// The client's connection went away
    Closed(ConnectionId),
}

/// Network time fetched by the time-sync task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockSeed {
    pub unix_secs: u64,
    /// Uptime when the response arrived (ms)
    pub at_ms: u64,
}

/// Subscribe/unsubscribe notices, in the order they happened
pub static SUBSCRIPTIONS: Channel<CriticalSectionRawMutex, Subscription, SUBSCRIPTION_CHANNEL_SIZE> =
    Channel::new();

/// Outbound frames per push-channel slot, filled by the coordinator's sink
pub static OUTBOXES: [Channel<CriticalSectionRawMutex, Frame, OUTBOX_DEPTH>; MAX_SUBSCRIBERS] =
    [const { Channel::new() }; MAX_SUBSCRIBERS];

/// Latest network time; only the newest seed matters
pub static CLOCK_SEED: Signal<CriticalSectionRawMutex, ClockSeed> = Signal::new();

/// A `/readings` request is waiting for the coordinator
pub static READINGS_REQUEST: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// The coordinator's answer to [`READINGS_REQUEST`]
pub static READINGS_RESPONSE: Signal<CriticalSectionRawMutex, Result<EncodedReading, CoordinatorError>> =
    Signal::new();

/// Serializes `/readings` requests so each answer reaches its asker
pub static READINGS_LOCK: Mutex<CriticalSectionRawMutex, ()> = Mutex::new(());

/// Online notification for the notifier task
pub static NOTIFY: Signal<CriticalSectionRawMutex, NotifyRequest> = Signal::new();
