//! Output formatters for collected sensor readings.
//!
//! The HTTP exposition renders the store through an [`OutputFormatter`];
//! the Prometheus text format is the one implementation.

pub mod prometheus;

use crate::store::DeviceReading;
use thiserror::Error;

/// Error building or rendering the exposition.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("metrics exposition failed: {0}")]
    Prometheus(#[from] ::prometheus::Error),
}

/// Trait for formatting the latest readings of all devices into a response body.
pub trait OutputFormatter: Send + Sync {
    /// Format every device's latest reading.
    ///
    /// # Arguments
    /// * `readings` - Latest snapshot per device, in a stable order
    fn format(&self, readings: &[DeviceReading]) -> Result<String, FormatError>;

    /// Value of the `Content-Type` header for the formatted body.
    fn content_type(&self) -> &'static str;
}
