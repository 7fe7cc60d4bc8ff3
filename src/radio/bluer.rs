//! BlueZ D-Bus backend.
//!
//! This backend uses the `bluer` crate to communicate with the BlueZ daemon
//! via D-Bus. It requires the `bluetoothd` daemon to be running.

use super::{Advertisement, Connection, Radio, RadioError, RadioFuture};
use crate::address::DeviceAddress;
use bluer::{Adapter, AdapterEvent, Address, Device, Session};
use futures::{StreamExt, pin_mut};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

impl From<bluer::Error> for RadioError {
    fn from(err: bluer::Error) -> Self {
        RadioError::Bluetooth(err.to_string())
    }
}

/// Radio backed by the default BlueZ adapter.
pub struct BluerRadio {
    // Dropping the session ends the D-Bus connection the adapter relies on.
    _session: Session,
    adapter: Adapter,
}

impl BluerRadio {
    /// Open a BlueZ session and power on the default adapter.
    pub async fn new() -> Result<Self, RadioError> {
        let session = Session::new().await?;
        let adapter = session.default_adapter().await?;
        adapter.set_powered(true).await?;
        tracing::debug!(adapter = adapter.name(), "using Bluetooth adapter");

        Ok(Self {
            _session: session,
            adapter,
        })
    }

    async fn scan(&self, duration: Duration) -> Result<Vec<Advertisement>, RadioError> {
        let events = self.adapter.discover_devices().await?;
        pin_mut!(events);

        let deadline = Instant::now() + duration;
        let mut seen: Vec<Address> = Vec::new();
        while let Ok(Some(event)) = tokio::time::timeout_at(deadline, events.next()).await {
            if let AdapterEvent::DeviceAdded(address) = event
                && !seen.contains(&address)
            {
                seen.push(address);
            }
        }

        let mut advertisements = Vec::with_capacity(seen.len());
        for address in seen {
            match self.advertisement(address).await {
                Ok(advertisement) => advertisements.push(advertisement),
                // Devices may vanish between the event and the property read.
                Err(err) => tracing::debug!(%address, error = %err, "skipping device"),
            }
        }
        Ok(advertisements)
    }

    async fn advertisement(&self, address: Address) -> Result<Advertisement, bluer::Error> {
        let device = self.adapter.device(address)?;
        Ok(Advertisement {
            address: address.into(),
            service_uuids: device.uuids().await?.unwrap_or_default(),
            manufacturer_data: device.manufacturer_data().await?.unwrap_or_default(),
        })
    }

    async fn open(&self, address: DeviceAddress) -> Result<Box<dyn Connection>, RadioError> {
        let connection_error = |err: bluer::Error| RadioError::Connection {
            address,
            reason: err.to_string(),
        };

        let device = self
            .adapter
            .device(address.into())
            .map_err(connection_error)?;
        if !device.is_connected().await.map_err(connection_error)? {
            device.connect().await.map_err(connection_error)?;
        }
        Ok(Box::new(BluerConnection { device }))
    }

    async fn close(&self, address: DeviceAddress) -> Result<(), RadioError> {
        let device = self.adapter.device(address.into())?;
        if device.is_connected().await? {
            device.disconnect().await?;
        }
        Ok(())
    }
}

impl Radio for BluerRadio {
    fn discover(&self, duration: Duration) -> RadioFuture<'_, Vec<Advertisement>> {
        Box::pin(self.scan(duration))
    }

    fn connect(&self, address: DeviceAddress) -> RadioFuture<'_, Box<dyn Connection>> {
        Box::pin(self.open(address))
    }

    fn disconnect(&self, address: DeviceAddress) -> RadioFuture<'_, ()> {
        Box::pin(self.close(address))
    }
}

struct BluerConnection {
    device: Device,
}

impl BluerConnection {
    async fn read(&self, uuid: Uuid) -> Result<Vec<u8>, RadioError> {
        let transport_error = |err: bluer::Error| RadioError::Transport(err.to_string());

        for service in self.device.services().await.map_err(transport_error)? {
            for characteristic in service.characteristics().await.map_err(transport_error)? {
                if characteristic.uuid().await.map_err(transport_error)? == uuid {
                    return characteristic.read().await.map_err(transport_error);
                }
            }
        }
        Err(RadioError::CharacteristicNotFound(uuid))
    }
}

impl Connection for BluerConnection {
    fn read_characteristic(&mut self, uuid: Uuid) -> RadioFuture<'_, Vec<u8>> {
        Box::pin(self.read(uuid))
    }
}
