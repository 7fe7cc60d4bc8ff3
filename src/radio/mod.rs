//! Bluetooth LE transport used to find and read Wave Plus sensors.
//!
//! Discovery and collection talk to the radio only through the [`Radio`]
//! trait, so both can be tested deterministically without hardware. The
//! BlueZ implementation lives in [`bluer`] and is compiled in with the
//! `bluer` feature.

#[cfg(feature = "bluer")]
pub mod bluer;

use crate::address::DeviceAddress;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Service advertised by every Wave Plus.
pub const WAVE_PLUS_SERVICE_UUID: Uuid = Uuid::from_u128(0xb42e1c08_ade7_11e4_89d3_123b93f75cba);

/// Characteristic holding the current sensor reading.
pub const SENSOR_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xb42e2a68_ade7_11e4_89d3_123b93f75cba);

/// Manufacturer data key under which a Wave Plus advertises its serial number.
///
/// This is a hardware contract: devices are not found with any other key.
pub const SERIAL_NUMBER_MANUFACTURER_ID: u16 = 820;

/// Error type for radio operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RadioError {
    /// Session, adapter or discovery failure
    #[error("Bluetooth error: {0}")]
    Bluetooth(String),
    /// Connecting to a device failed
    #[error("connection to {address} failed: {reason}")]
    Connection {
        address: DeviceAddress,
        reason: String,
    },
    /// Connected, but the GATT exchange failed
    #[error("transport error: {0}")]
    Transport(String),
    /// Connected device does not expose the requested characteristic
    #[error("characteristic {0} not found")]
    CharacteristicNotFound(Uuid),
}

/// What a device broadcast while the scan window was open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Advertisement {
    pub address: DeviceAddress,
    pub service_uuids: HashSet<Uuid>,
    pub manufacturer_data: HashMap<u16, Vec<u8>>,
}

/// Boxed future returned by radio operations.
pub type RadioFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RadioError>> + Send + 'a>>;

/// Radio abstraction to enable deterministic unit tests without Bluetooth hardware.
pub trait Radio: Send + Sync {
    /// Scan for `duration` and return every advertisement seen.
    fn discover(&self, duration: Duration) -> RadioFuture<'_, Vec<Advertisement>>;

    /// Open a connection to `address`.
    fn connect(&self, address: DeviceAddress) -> RadioFuture<'_, Box<dyn Connection>>;

    /// Tear down any connection state for `address`, including one whose
    /// connect was abandoned half way. Disconnecting an idle device succeeds.
    fn disconnect(&self, address: DeviceAddress) -> RadioFuture<'_, ()>;
}

/// An open connection to a device.
pub trait Connection: Send {
    fn read_characteristic(&mut self, uuid: Uuid) -> RadioFuture<'_, Vec<u8>>;
}
