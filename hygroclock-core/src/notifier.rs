//! One-shot online notification
//!
//! When the device first reaches `Connected` it announces itself through
//! the chat relay. The notifier only decides *whether* and *what* to send;
//! the firmware performs the request off the main loop and hands the
//! status code back to [`classify_response`].

use core::fmt::Write;

use heapless::String;
use hygroclock_protocol::relay;

use crate::error::CoordinatorError;
use crate::state::{ConnectivityState, DeviceAddress};

/// Longest notification message
pub const MAX_MESSAGE_LEN: usize = 64;

/// A notification to send
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NotifyRequest {
    pub message: String<MAX_MESSAGE_LEN>,
}

/// Connectivity notifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectivityNotifier {
    previous: ConnectivityState,
    fired: u8,
}

impl ConnectivityNotifier {
    pub const fn new() -> Self {
        Self {
            previous: ConnectivityState::Disconnected,
            fired: 0,
        }
    }

    /// Observe the current state
    ///
    /// Returns a request exactly on a `!Connected -> Connected` edge.
    pub fn notify_once(
        &mut self,
        state: ConnectivityState,
        device_name: &str,
        address: DeviceAddress,
    ) -> Option<NotifyRequest> {
        let edge = state.is_connected() && !self.previous.is_connected();
        self.previous = state;
        if !edge {
            return None;
        }

        self.fired = self.fired.saturating_add(1);
        let mut message = String::new();
        if write!(message, "{} /{} is online", device_name, address).is_err() {
            // Over-long device name; the address alone still tells the story
            message.clear();
            let _ = write!(message, "/{} is online", address);
        }
        Some(NotifyRequest { message })
    }

    /// Number of notifications issued
    pub fn fired(&self) -> u8 {
        self.fired
    }
}

/// Map a relay status code onto the error taxonomy
pub fn classify_response(code: u16) -> Result<(), CoordinatorError> {
    if relay::is_success(code) {
        Ok(())
    } else {
        Err(CoordinatorError::NotifierRejected { code })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ADDR: DeviceAddress = DeviceAddress([192, 168, 1, 40]);

    #[test]
    fn test_fires_on_connect() {
        let mut n = ConnectivityNotifier::new();
        assert!(n
            .notify_once(ConnectivityState::Connecting, "clock", ADDR)
            .is_none());
        let req = n
            .notify_once(ConnectivityState::Connected, "clock", ADDR)
            .unwrap();
        assert_eq!(req.message.as_str(), "clock /192.168.1.40 is online");
        assert!(n
            .notify_once(ConnectivityState::Connected, "clock", ADDR)
            .is_none());
        assert_eq!(n.fired(), 1);
    }

    #[test]
    fn test_long_name_falls_back() {
        let mut n = ConnectivityNotifier::new();
        let name = "a-device-name-that-is-much-too-long-for-one-short-chat-message";
        let req = n
            .notify_once(ConnectivityState::Connected, name, ADDR)
            .unwrap();
        assert_eq!(req.message.as_str(), "/192.168.1.40 is online");
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify_response(200), Ok(()));
        assert_eq!(
            classify_response(403),
            Err(CoordinatorError::NotifierRejected { code: 403 })
        );
    }

    fn state() -> impl Strategy<Value = ConnectivityState> {
        prop_oneof![
            Just(ConnectivityState::Disconnected),
            Just(ConnectivityState::Connecting),
            Just(ConnectivityState::Connected),
        ]
    }

    proptest! {
        #[test]
        fn fires_once_per_edge(states in proptest::collection::vec(state(), 0..30)) {
            // Feed the states through the real machine, which never leaves Connected
            let mut n = ConnectivityNotifier::new();
            let mut fired = 0;
            let mut reached = false;
            let mut current = ConnectivityState::Disconnected;
            for target in states {
                current = match (current, target) {
                    (ConnectivityState::Connected, _) => current,
                    (_, t) => t,
                };
                reached |= current.is_connected();
                if n.notify_once(current, "clock", ADDR).is_some() {
                    fired += 1;
                }
            }
            prop_assert_eq!(fired, if reached { 1 } else { 0 });
        }
    }
}
