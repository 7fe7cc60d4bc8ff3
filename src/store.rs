//! Latest measurements per device, shared between the poller and the HTTP
//! exposition.
//!
//! The poller is the only writer. Readers take a consistent copy of every
//! device's snapshot under a read lock, so a scrape never sees half of an
//! update.

use crate::measurement::SensorSnapshot;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// The exported metric slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Humidity,
    RadonShortTerm,
    RadonLongTerm,
    Temperature,
    Pressure,
    Co2,
    Voc,
}

impl Metric {
    /// Every slot, in exposition order.
    pub const ALL: [Metric; 7] = [
        Metric::Humidity,
        Metric::RadonShortTerm,
        Metric::RadonLongTerm,
        Metric::Temperature,
        Metric::Pressure,
        Metric::Co2,
        Metric::Voc,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Humidity => "humidity_percent",
            Metric::RadonShortTerm => "radon_short_term_avg_becquerels",
            Metric::RadonLongTerm => "radon_long_term_avg_becquerels",
            Metric::Temperature => "temperature_celsius",
            // Existing dashboards query this name; the value is in hPa.
            Metric::Pressure => "pressure_pascal",
            Metric::Co2 => "carbondioxide_ppm",
            Metric::Voc => "voc_ppb",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Metric::Humidity => "Humidity (%rH)",
            Metric::RadonShortTerm => "Radon short term Bq/m3",
            Metric::RadonLongTerm => "Radon long term Bq/m3",
            Metric::Temperature => "Temperature (degC)",
            Metric::Pressure => "Pressure (hPa)",
            Metric::Co2 => "CO2 (ppm)",
            Metric::Voc => "VOC (ppb)",
        }
    }

    /// This slot's value in `snapshot`.
    pub fn value(self, snapshot: &SensorSnapshot) -> f64 {
        match self {
            Metric::Humidity => snapshot.humidity_percent,
            Metric::RadonShortTerm => f64::from(snapshot.radon_short_term_bq),
            Metric::RadonLongTerm => f64::from(snapshot.radon_long_term_bq),
            Metric::Temperature => snapshot.temperature_celsius,
            Metric::Pressure => snapshot.pressure_hectopascal,
            Metric::Co2 => snapshot.co2_ppm,
            Metric::Voc => snapshot.voc_ppb,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The latest snapshot of one device, keyed by its label.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceReading {
    pub label: String,
    pub snapshot: SensorSnapshot,
}

/// Shared handle to the latest snapshot per device label.
///
/// Cloning is cheap; every clone sees the same data.
#[derive(Debug, Clone, Default)]
pub struct MetricStore {
    readings: Arc<RwLock<BTreeMap<String, SensorSnapshot>>>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot stored for `label`.
    pub fn update(&self, label: &str, snapshot: SensorSnapshot) {
        self.readings.write().insert(label.to_string(), snapshot);
    }

    pub fn get(&self, label: &str) -> Option<SensorSnapshot> {
        self.readings.read().get(label).copied()
    }

    /// Latest value of `metric` for `label`.
    pub fn value(&self, metric: Metric, label: &str) -> Option<f64> {
        self.get(label).map(|snapshot| metric.value(&snapshot))
    }

    /// Copy of every device's latest snapshot, ordered by label.
    pub fn readings(&self) -> Vec<DeviceReading> {
        self.readings
            .read()
            .iter()
            .map(|(label, snapshot)| DeviceReading {
                label: label.clone(),
                snapshot: *snapshot,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.readings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.read().is_empty()
    }
}
