//! Push-channel broadcasting
//!
//! Events are numbered from 1 and retained in a short replay log so a
//! client that reconnects with `Last-Event-ID: X` gets every retained
//! event with id greater than X before anything live.

pub mod broadcaster;
pub mod event;

pub use broadcaster::{
    BroadcastError, Broadcaster, PushReport, Subscriber, SubscribeReport, MAX_SUBSCRIBERS,
    REPLAY_DEPTH,
};
pub use event::{EventId, EventKind, PushEvent, GREETING, MAX_PAYLOAD_LEN};
