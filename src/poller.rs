//! The poll loop: resolve every device once, then read them one after the
//! other on a fixed cycle until cancelled.
//!
//! Devices are polled sequentially because the radio handles one connection
//! attempt at a time. A failure only affects the device it happened on; its
//! previous value stays in the store.

use crate::collector::{CollectError, Collector};
use crate::decoder::{DecodeError, decode};
use crate::device::{DeviceIdentity, ResolvedDevice};
use crate::discovery::Discoverer;
use crate::measurement::{DeriveError, SensorSnapshot, derive};
use crate::radio::RadioError;
use crate::store::MetricStore;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Default pause between two poll cycles.
pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_secs(240);

/// Error for one device in one cycle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PollError {
    #[error(transparent)]
    Collect(#[from] CollectError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Derive(#[from] DeriveError),
}

/// Outcome counts of one pass over all devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub updated: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub struct Poller {
    devices: Vec<ResolvedDevice>,
    collector: Collector,
    store: MetricStore,
    cycle_interval: Duration,
}

impl Poller {
    pub fn new(
        devices: Vec<ResolvedDevice>,
        collector: Collector,
        store: MetricStore,
        cycle_interval: Duration,
    ) -> Self {
        Self {
            devices,
            collector,
            store,
            cycle_interval,
        }
    }

    /// Resolve `identities` exactly once and build a poller for them.
    pub async fn start(
        discoverer: &mut Discoverer,
        identities: Vec<DeviceIdentity>,
        collector: Collector,
        store: MetricStore,
        cycle_interval: Duration,
    ) -> Result<Self, RadioError> {
        let devices = discoverer.resolve_all(identities).await?;
        Ok(Self::new(devices, collector, store, cycle_interval))
    }

    pub fn devices(&self) -> &[ResolvedDevice] {
        &self.devices
    }

    /// Collect, decode and derive one reading from `device`.
    pub async fn poll_device(&self, device: &ResolvedDevice) -> Result<SensorSnapshot, PollError> {
        let bytes = self.collector.collect(device).await?;
        let raw = decode(&bytes)?;
        tracing::debug!(device = %device.identity, ?raw, "decoded reading");
        Ok(derive(&raw)?)
    }

    /// Poll every resolved device once, in configuration order.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        for device in &self.devices {
            if !device.is_resolved() {
                tracing::debug!(device = %device.identity, "skipping undetected device");
                report.skipped += 1;
                continue;
            }

            match self.poll_device(device).await {
                Ok(snapshot) => {
                    tracing::info!(device = %device.identity, ?snapshot, "collected metrics");
                    self.store.update(&device.identity.label(), snapshot);
                    report.updated += 1;
                }
                Err(err) => {
                    tracing::error!(device = %device.identity, error = %err, "failed to update metrics");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Run cycles until `shutdown` is cancelled, sleeping `cycle_interval`
    /// after each one. Returns the number of completed cycles.
    pub async fn run(&self, shutdown: CancellationToken) -> u64 {
        let mut cycles = 0;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("poll cycle interrupted by shutdown");
                    break;
                }
                report = self.run_cycle() => {
                    cycles += 1;
                    tracing::debug!(cycle = cycles, ?report, "poll cycle finished");
                }
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.cycle_interval) => {}
            }
        }
        cycles
    }
}
