//! Configured sensor identities and their discovery outcome.

use crate::address::DeviceAddress;
use std::fmt;

/// Prefix of the `name` label attached to every exported sample.
pub const LABEL_PREFIX: &str = "airthings_wave_plus";

/// A configured Wave Plus sensor, identified by the serial number printed on
/// the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    serial_number: u32,
    display_name: String,
}

impl DeviceIdentity {
    /// Create an identity; without a display name the serial number is used.
    pub fn new(serial_number: u32, display_name: Option<String>) -> Self {
        let display_name = display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| serial_number.to_string());
        Self {
            serial_number,
            display_name,
        }
    }

    pub fn serial_number(&self) -> u32 {
        self.serial_number
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Value of the `name` label for this device's samples.
    pub fn label(&self) -> String {
        format!("{LABEL_PREFIX}-{}", self.display_name)
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (sn={})", self.label(), self.serial_number)
    }
}

/// Parse a device from the command line.
///
/// Accepts `SERIAL` or `SERIAL=NAME`.
///
/// # Example
/// ```
/// use wave_plus_exporter::device::parse_device;
///
/// let device = parse_device("2930012345=Bedroom").unwrap();
/// assert_eq!(device.serial_number(), 2930012345);
/// assert_eq!(device.label(), "airthings_wave_plus-Bedroom");
/// ```
pub fn parse_device(src: &str) -> Result<DeviceIdentity, String> {
    let (serial, name) = match src.split_once('=') {
        Some((serial, name)) => (serial, Some(name.to_string())),
        None => (src, None),
    };
    let serial_number = serial
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid serial number: '{}'", serial.trim()))?;
    Ok(DeviceIdentity::new(serial_number, name))
}

/// Outcome of discovery for one configured device.
///
/// Built once at startup; a device without an address stays unresolved for
/// the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDevice {
    pub identity: DeviceIdentity,
    pub address: Option<DeviceAddress>,
}

impl ResolvedDevice {
    pub fn new(identity: DeviceIdentity, address: Option<DeviceAddress>) -> Self {
        Self { identity, address }
    }

    pub fn is_resolved(&self) -> bool {
        self.address.is_some()
    }
}
