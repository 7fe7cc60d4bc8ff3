//! Resolution of configured serial numbers to radio addresses.
//!
//! A Wave Plus advertises [`WAVE_PLUS_SERVICE_UUID`] and carries its serial
//! number in the manufacturer data stored under
//! [`SERIAL_NUMBER_MANUFACTURER_ID`]. One scan is performed per process; its
//! result is cached and every later lookup is served from the cache.

use crate::address::DeviceAddress;
use crate::device::{DeviceIdentity, ResolvedDevice};
use crate::radio::{
    Advertisement, Radio, RadioError, SERIAL_NUMBER_MANUFACTURER_ID, WAVE_PLUS_SERVICE_UUID,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default length of the discovery scan window.
pub const DEFAULT_SCAN_DURATION: Duration = Duration::from_secs(5);

/// Parse the little-endian serial number at the start of the manufacturer data.
///
/// Returns `None` when fewer than 4 bytes are present.
pub fn parse_serial_number(data: &[u8]) -> Option<u32> {
    let bytes: [u8; 4] = data.get(..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

/// Extract the serial number of a Wave Plus advertisement.
///
/// Anything that is not a Wave Plus yields `None`; most nearby radios are
/// unrelated devices.
pub fn match_advertisement(advertisement: &Advertisement) -> Option<u32> {
    if !advertisement
        .service_uuids
        .contains(&WAVE_PLUS_SERVICE_UUID)
    {
        return None;
    }
    advertisement
        .manufacturer_data
        .get(&SERIAL_NUMBER_MANUFACTURER_ID)
        .and_then(|data| parse_serial_number(data))
}

/// Scans once and maps serial numbers to the addresses they were seen at.
pub struct Discoverer {
    radio: Arc<dyn Radio>,
    scan_duration: Duration,
    serials: Option<HashMap<u32, DeviceAddress>>,
}

impl Discoverer {
    pub fn new(radio: Arc<dyn Radio>, scan_duration: Duration) -> Self {
        Self {
            radio,
            scan_duration,
            serials: None,
        }
    }

    /// Scan for Wave Plus devices, or return the result of the earlier scan.
    ///
    /// A failed scan is not cached; the next call scans again.
    pub async fn scan(&mut self) -> Result<&HashMap<u32, DeviceAddress>, RadioError> {
        let serials = match self.serials.take() {
            Some(serials) => serials,
            None => self.run_scan().await?,
        };
        Ok(&*self.serials.insert(serials))
    }

    async fn run_scan(&self) -> Result<HashMap<u32, DeviceAddress>, RadioError> {
        tracing::info!(
            duration = ?self.scan_duration,
            "scanning for Airthings Wave Plus devices"
        );
        let advertisements = self.radio.discover(self.scan_duration).await?;

        let mut serials = HashMap::new();
        for advertisement in &advertisements {
            match match_advertisement(advertisement) {
                Some(serial_number) => {
                    tracing::info!(
                        address = %advertisement.address,
                        serial_number,
                        "found Wave Plus"
                    );
                    serials.insert(serial_number, advertisement.address);
                }
                None => tracing::debug!(address = %advertisement.address, "ignoring device"),
            }
        }

        tracing::info!(
            found = serials.len(),
            seen = advertisements.len(),
            "scan finished"
        );
        Ok(serials)
    }

    /// Look up the address of `identity` in the cached scan.
    ///
    /// Returns `None` when the device was not seen or no scan has completed.
    pub fn resolve(&self, identity: &DeviceIdentity) -> Option<DeviceAddress> {
        self.serials
            .as_ref()
            .and_then(|serials| serials.get(&identity.serial_number()))
            .copied()
    }

    /// Resolve every configured device, scanning first if needed.
    ///
    /// Devices are returned in configuration order. Each device that was not
    /// found is logged here, once; it stays unresolved for the process lifetime.
    pub async fn resolve_all(
        &mut self,
        identities: Vec<DeviceIdentity>,
    ) -> Result<Vec<ResolvedDevice>, RadioError> {
        self.scan().await?;

        Ok(identities
            .into_iter()
            .map(|identity| {
                let address = self.resolve(&identity);
                match address {
                    Some(address) => tracing::info!(device = %identity, %address, "resolved"),
                    None => tracing::error!(
                        device = %identity,
                        "device was not detected, metrics will not be collected"
                    ),
                }
                ResolvedDevice::new(identity, address)
            })
            .collect())
    }
}
