//! Bluetooth device address used to connect to a resolved sensor.
//!
//! Kept independent of the BlueZ bindings so discovery and collection can be
//! exercised without a radio.

use std::fmt;

/// A 6-byte Bluetooth device address, most significant byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DeviceAddress(pub [u8; 6]);

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

#[cfg(feature = "bluer")]
impl From<bluer::Address> for DeviceAddress {
    fn from(addr: bluer::Address) -> Self {
        Self(addr.0)
    }
}

#[cfg(feature = "bluer")]
impl From<DeviceAddress> for bluer::Address {
    fn from(addr: DeviceAddress) -> Self {
        bluer::Address(addr.0)
    }
}
