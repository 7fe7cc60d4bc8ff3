//! `wave-plus-exporter` library.
//!
//! The binary (`src/main.rs`) is responsible for logging setup, signal
//! handling and process exit codes. The polling pipeline lives in
//! [`crate::app`] where it can be tested deterministically with an injected
//! radio.

pub mod address;
pub mod app;
pub mod collector;
pub mod config;
pub mod decoder;
pub mod device;
pub mod discovery;
pub mod http;
pub mod measurement;
pub mod output;
pub mod poller;
pub mod radio;
pub mod retry;
pub mod store;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use address::DeviceAddress;
pub use collector::{CollectError, Collector};
pub use config::{PollConfig, parse_duration};
pub use decoder::{DecodeError, RawReading, decode};
pub use device::{DeviceIdentity, ResolvedDevice, parse_device};
pub use discovery::Discoverer;
pub use measurement::{DeriveError, SensorSnapshot, derive};
pub use output::{FormatError, OutputFormatter};
pub use output::prometheus::PrometheusFormatter;
pub use poller::{PollError, Poller};
pub use radio::{Radio, RadioError};
pub use retry::RetryPolicy;
pub use store::{Metric, MetricStore};
