use crate::address::DeviceAddress;
use crate::decoder::{PAYLOAD_LEN, RawReading};
use crate::radio::{
    Advertisement, Connection, Radio, RadioError, RadioFuture, SERIAL_NUMBER_MANUFACTURER_ID,
    WAVE_PLUS_SERVICE_UUID,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// A stable address for unit tests.
pub const TEST_ADDRESS: DeviceAddress = DeviceAddress([0x80, 0x6F, 0xB0, 0x0A, 0x01, 0xFE]);

/// A valid version 1 payload: humidity 100, radon 500/600, temperature 2500,
/// pressure 50000, CO2 800, VOC 250, with non-zero reserved fields.
pub fn sample_payload() -> [u8; PAYLOAD_LEN] {
    [
        0x01, 0x64, 0x0A, 0x0B, // version, humidity, reserved
        0xF4, 0x01, 0x58, 0x02, // radon short term, radon long term
        0xC4, 0x09, 0x50, 0xC3, // temperature, pressure
        0x20, 0x03, 0xFA, 0x00, // co2, voc
        0x02, 0x01, 0xFF, 0xFF, // reserved
    ]
}

pub fn sample_reading() -> RawReading {
    crate::decoder::decode(&sample_payload()).unwrap()
}

/// An advertisement carrying the Wave Plus service and the given serial number.
pub fn wave_plus_advertisement(address: DeviceAddress, serial_number: u32) -> Advertisement {
    let mut data = serial_number.to_le_bytes().to_vec();
    data.extend_from_slice(&[0x09, 0x00]);
    Advertisement {
        address,
        service_uuids: [WAVE_PLUS_SERVICE_UUID].into_iter().collect(),
        manufacturer_data: [(SERIAL_NUMBER_MANUFACTURER_ID, data)].into_iter().collect(),
    }
}

/// Scripted outcome of one connect+read attempt against [`FakeRadio`].
#[derive(Debug, Clone)]
pub enum Attempt {
    /// Connect and read succeed with these bytes
    Read(Vec<u8>),
    /// Connect fails
    ConnectFails,
    /// Connect succeeds, the read fails
    ReadFails,
    /// Connect never completes
    Hang,
}

/// In-memory radio that replays scripted attempts and records what it was asked to do.
#[derive(Debug, Default)]
pub struct FakeRadio {
    advertisements: Vec<Advertisement>,
    scripts: Mutex<HashMap<DeviceAddress, VecDeque<Attempt>>>,
    connects: Mutex<Vec<(DeviceAddress, Instant)>>,
    disconnects: Mutex<Vec<DeviceAddress>>,
    discovers: AtomicUsize,
    fail_discovery: bool,
    hang_disconnect: bool,
}

impl FakeRadio {
    pub fn new(advertisements: Vec<Advertisement>) -> Self {
        Self {
            advertisements,
            ..Default::default()
        }
    }

    pub fn failing_discovery() -> Self {
        Self {
            fail_discovery: true,
            ..Default::default()
        }
    }

    /// Make every disconnect request hang forever.
    pub fn hanging_disconnect(mut self) -> Self {
        self.hang_disconnect = true;
        self
    }

    /// Queue attempts for `address`; once drained every attempt fails to connect.
    pub fn script(self, address: DeviceAddress, attempts: Vec<Attempt>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(address, attempts.into());
        self
    }

    pub fn connect_times(&self, address: DeviceAddress) -> Vec<Instant> {
        self.connects
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| *a == address)
            .map(|(_, t)| *t)
            .collect()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.lock().unwrap().len()
    }

    pub fn disconnects(&self) -> Vec<DeviceAddress> {
        self.disconnects.lock().unwrap().clone()
    }

    pub fn discover_count(&self) -> usize {
        self.discovers.load(Ordering::SeqCst)
    }

    fn next_attempt(&self, address: DeviceAddress) -> Attempt {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(&address)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Attempt::ConnectFails)
    }
}

impl Radio for FakeRadio {
    fn discover(&self, _duration: Duration) -> RadioFuture<'_, Vec<Advertisement>> {
        self.discovers.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail_discovery {
            Err(RadioError::Bluetooth("adapter not powered".to_string()))
        } else {
            Ok(self.advertisements.clone())
        };
        Box::pin(async move { result })
    }

    fn connect(&self, address: DeviceAddress) -> RadioFuture<'_, Box<dyn Connection>> {
        self.connects
            .lock()
            .unwrap()
            .push((address, Instant::now()));
        let attempt = self.next_attempt(address);
        Box::pin(async move {
            match attempt {
                Attempt::ConnectFails => Err(RadioError::Connection {
                    address,
                    reason: "connection refused".to_string(),
                }),
                Attempt::Hang => std::future::pending().await,
                Attempt::Read(bytes) => Ok(FakeConnection::boxed(Some(bytes))),
                Attempt::ReadFails => Ok(FakeConnection::boxed(None)),
            }
        })
    }

    fn disconnect(&self, address: DeviceAddress) -> RadioFuture<'_, ()> {
        self.disconnects.lock().unwrap().push(address);
        let hang = self.hang_disconnect;
        Box::pin(async move {
            if hang {
                std::future::pending::<()>().await;
            }
            Ok(())
        })
    }
}

struct FakeConnection(Option<Vec<u8>>);

impl FakeConnection {
    fn boxed(bytes: Option<Vec<u8>>) -> Box<dyn Connection> {
        Box::new(Self(bytes))
    }
}

impl Connection for FakeConnection {
    fn read_characteristic(&mut self, uuid: Uuid) -> RadioFuture<'_, Vec<u8>> {
        let result = self
            .0
            .clone()
            .ok_or_else(|| RadioError::Transport(format!("read of {uuid} failed")));
        Box::pin(async move { result })
    }
}
