//! Connectivity state definition

use super::events::LinkEvent;

/// Connectivity states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectivityState {
    /// Not associated with any network
    #[default]
    Disconnected,
    /// Associated, waiting for an address
    Connecting,
    /// Address acquired; serving clients
    Connected,
}

impl ConnectivityState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectivityState::Connected)
    }

    /// Process an event and return the next state
    ///
    /// There is no path back to `Disconnected`.
    pub fn transition(self, event: LinkEvent) -> Self {
        use ConnectivityState::*;
        use LinkEvent::*;

        match (self, event) {
            (Disconnected, AssociationSucceeded) => Connecting,
            (Connecting, AddressAcquired(_)) => Connected,

            // Default: stay in current state
            _ => self,
        }
    }
}
