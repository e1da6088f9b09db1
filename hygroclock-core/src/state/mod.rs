//! Connectivity state machine
//!
//! The device goes `Disconnected -> Connecting -> Connected` exactly once
//! per boot. Entering `Connected` unblocks the clock face and triggers the
//! online notification.

pub mod events;
pub mod machine;

pub use events::{DeviceAddress, LinkEvent};
pub use machine::ConnectivityState;
