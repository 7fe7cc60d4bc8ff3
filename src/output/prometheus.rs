//! Prometheus text exposition of the latest readings.
//!
//! One `GaugeVec` per [`Metric`], labelled with the device label, lives in a
//! private registry for the lifetime of the formatter. A scrape refills the
//! gauges from the store and encodes the registry.

use crate::output::{FormatError, OutputFormatter};
use crate::store::{DeviceReading, Metric};
use parking_lot::Mutex;
use prometheus::{GaugeVec, Opts, Registry, TEXT_FORMAT, TextEncoder};

/// Label carrying the device label on every sample.
pub const DEVICE_LABEL: &str = "name";

/// Prometheus text formatter.
///
/// Metric names are optionally prefixed with a namespace
/// (`<namespace>_<metric>`).
pub struct PrometheusFormatter {
    registry: Registry,
    // Held across reset, set and gather so concurrent scrapes never mix.
    gauges: Mutex<Vec<(Metric, GaugeVec)>>,
}

impl PrometheusFormatter {
    /// Register a gauge for every metric.
    ///
    /// # Errors
    /// Fails when the namespace does not form valid metric names.
    pub fn new(namespace: Option<String>) -> Result<Self, FormatError> {
        let namespace = namespace.filter(|ns| !ns.is_empty());
        let registry = Registry::new();
        let mut gauges = Vec::with_capacity(Metric::ALL.len());

        for metric in Metric::ALL {
            let mut opts = Opts::new(metric.name(), metric.help());
            if let Some(namespace) = &namespace {
                opts = opts.namespace(namespace.as_str());
            }
            let gauge = GaugeVec::new(opts, &[DEVICE_LABEL])?;
            registry.register(Box::new(gauge.clone()))?;
            gauges.push((metric, gauge));
        }

        Ok(Self {
            registry,
            gauges: Mutex::new(gauges),
        })
    }
}

impl OutputFormatter for PrometheusFormatter {
    fn format(&self, readings: &[DeviceReading]) -> Result<String, FormatError> {
        if readings.is_empty() {
            return Ok(String::new());
        }

        let gauges = self.gauges.lock();
        for (metric, gauge) in gauges.iter() {
            gauge.reset();
            for reading in readings {
                gauge
                    .with_label_values(&[reading.label.as_str()])
                    .set(metric.value(&reading.snapshot));
            }
        }
        Ok(TextEncoder::new().encode_to_string(&self.registry.gather())?)
    }

    fn content_type(&self) -> &'static str {
        TEXT_FORMAT
    }
}
