//! Broadcaster and subscriber registry
//!
//! Subscribers are only appended and removed between pushes; nothing
//! mutates the registry while a push is iterating it.

use heapless::{Deque, String, Vec};
use hygroclock_protocol::{FrameError, SseEvent};

use super::event::{EventId, EventKind, PushEvent, GREETING, MAX_PAYLOAD_LEN};
use crate::traits::{ConnectionId, PushSink};

/// Maximum concurrent push-channel clients
pub const MAX_SUBSCRIBERS: usize = 4;

/// Events retained for replay
pub const REPLAY_DEPTH: usize = 16;

/// Errors that can occur while broadcasting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BroadcastError {
    /// No room for another subscriber
    RegistryFull,
    /// Payload longer than an event can carry
    PayloadTooLarge,
    /// Event could not be framed
    Frame(FrameError),
}

impl From<FrameError> for BroadcastError {
    fn from(e: FrameError) -> Self {
        BroadcastError::Frame(e)
    }
}

/// A subscribed client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Subscriber {
    pub connection: ConnectionId,
    /// Newest event handed to this client's connection
    pub last_delivered: Option<EventId>,
}

/// Outcome of one push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PushReport {
    pub id: EventId,
    pub kind: EventKind,
    /// Subscribers the frame was handed to
    pub delivered: u8,
    /// Subscribers whose connection refused the frame
    pub failed: u8,
}

/// Outcome of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SubscribeReport {
    pub connection: ConnectionId,
    /// Resume identifier the client presented
    pub resumed_from: Option<EventId>,
    /// Retained events replayed
    pub replayed: u8,
    /// Events after the resume point were already evicted
    pub gap: bool,
    /// Frames the connection refused
    pub failed: u8,
}

/// Push-channel broadcaster
#[derive(Debug)]
pub struct Broadcaster {
    next_id: EventId,
    log: Deque<PushEvent, REPLAY_DEPTH>,
    subscribers: Vec<Subscriber, MAX_SUBSCRIBERS>,
    /// Reconnect delay announced in the greeting (ms)
    retry_ms: u32,
}

impl Broadcaster {
    pub fn new(retry_ms: u32) -> Self {
        Self {
            next_id: 1,
            log: Deque::new(),
            subscribers: Vec::new(),
            retry_ms,
        }
    }

    /// Id of the newest event, or 0 before the first push
    pub fn latest_id(&self) -> EventId {
        self.log.back().map(|e| e.id).unwrap_or(0)
    }

    pub fn subscribers(&self) -> &[Subscriber] {
        &self.subscribers
    }

    /// Retained events, oldest first
    pub fn retained(&self) -> impl Iterator<Item = &PushEvent> {
        self.log.iter()
    }

    /// Push an event to every subscriber
    ///
    /// Best effort: a connection that refuses the frame is counted and
    /// skipped; it catches up through replay when it reconnects.
    pub fn push<P: PushSink>(
        &mut self,
        sink: &mut P,
        kind: EventKind,
        payload: &str,
    ) -> Result<PushReport, BroadcastError> {
        let payload: String<MAX_PAYLOAD_LEN> =
            String::try_from(payload).map_err(|_| BroadcastError::PayloadTooLarge)?;
        let id = self.next_id;
        let frame = SseEvent::named(id, kind.name(), &payload).encode_to_vec()?;

        self.next_id = self.next_id.wrapping_add(1);
        if self.log.is_full() {
            self.log.pop_front();
        }
        // Room was made above
        let _ = self.log.push_back(PushEvent { id, kind, payload });

        let mut report = PushReport {
            id,
            kind,
            delivered: 0,
            failed: 0,
        };
        for sub in self.subscribers.iter_mut() {
            match sink.deliver(sub.connection, &frame) {
                Ok(()) => {
                    sub.last_delivered = Some(id);
                    report.delivered += 1;
                }
                Err(_) => report.failed += 1,
            }
        }
        Ok(report)
    }

    /// Register a client and send its greeting and any replay
    ///
    /// `resume_from` is the client's `Last-Event-ID`. Events with a greater
    /// id are replayed oldest first. A resume id newer than anything
    /// retained (the device restarted since) replays the whole log.
    pub fn on_subscribe<P: PushSink>(
        &mut self,
        sink: &mut P,
        connection: ConnectionId,
        resume_from: Option<EventId>,
    ) -> Result<SubscribeReport, BroadcastError> {
        // A reused slot whose disconnect was never reported
        self.on_unsubscribe(connection);
        if self.subscribers.is_full() {
            return Err(BroadcastError::RegistryFull);
        }

        let latest = self.latest_id();
        let mut report = SubscribeReport {
            connection,
            resumed_from: resume_from,
            replayed: 0,
            gap: false,
            failed: 0,
        };

        let greeting = SseEvent::greeting(resume_from.unwrap_or(latest), GREETING, self.retry_ms)
            .encode_to_vec()?;
        let mut last_delivered = None;
        if sink.deliver(connection, &greeting).is_err() {
            report.failed += 1;
        }

        if let Some(resume) = resume_from {
            let after = if resume > latest { 0 } else { resume };
            let oldest = self.log.front().map(|e| e.id);
            report.gap = match oldest {
                Some(oldest) => resume > latest || oldest > after + 1,
                None => resume > latest,
            };

            for event in self.log.iter().filter(|e| e.id > after) {
                let frame =
                    SseEvent::named(event.id, event.kind.name(), &event.payload).encode_to_vec()?;
                match sink.deliver(connection, &frame) {
                    Ok(()) => {
                        last_delivered = Some(event.id);
                        report.replayed += 1;
                    }
                    Err(_) => report.failed += 1,
                }
            }
        }

        // Checked for room above
        let _ = self.subscribers.push(Subscriber {
            connection,
            last_delivered,
        });
        Ok(report)
    }

    /// Forget a client; returns whether it was subscribed
    pub fn on_unsubscribe(&mut self, connection: ConnectionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.connection != connection);
        self.subscribers.len() != before
    }
}
