//! Link events fed into the connectivity state machine

use core::fmt;

/// IPv4 address assigned to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceAddress(pub [u8; 4]);

impl From<core::net::Ipv4Addr> for DeviceAddress {
    fn from(addr: core::net::Ipv4Addr) -> Self {
        Self(addr.octets())
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}

/// Events reported by the network stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// Joined the wireless network
    AssociationSucceeded,
    /// DHCP handed out an address
    AddressAcquired(DeviceAddress),
}
