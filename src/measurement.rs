//! Conversion of raw Wave Plus readings into physical measurements.

use crate::decoder::RawReading;
use thiserror::Error;

/// The only protocol version this exporter understands.
pub const SUPPORTED_VERSION: u8 = 1;

/// Largest radon value the sensor reports as a valid measurement.
pub const RADON_MAX_BQ: i32 = 16383;

/// Sentinel for radon values that are invalid or not yet available.
pub const RADON_UNAVAILABLE: i32 = -1;

/// Error returned for readings that must be discarded as a whole.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeriveError {
    #[error("invalid reading: version={0} is not equal 1")]
    InvalidVersion(u8),
}

/// Measurements from one Wave Plus reading.
///
/// Radon averages use [`RADON_UNAVAILABLE`] instead of an `Option` so every
/// metric keeps a plain numeric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    /// Relative humidity in percent
    pub humidity_percent: f64,
    /// Radon short term average in Bq/m3
    pub radon_short_term_bq: i32,
    /// Radon long term average in Bq/m3
    pub radon_long_term_bq: i32,
    /// Temperature in Celsius
    pub temperature_celsius: f64,
    /// Atmospheric pressure in hectopascals
    pub pressure_hectopascal: f64,
    /// Carbon dioxide concentration in ppm
    pub co2_ppm: f64,
    /// Volatile organic compounds in ppb
    pub voc_ppb: f64,
}

/// Map a radon value outside the sensor's valid range to [`RADON_UNAVAILABLE`].
pub fn clamp_radon(value: i32) -> i32 {
    if (0..=RADON_MAX_BQ).contains(&value) {
        value
    } else {
        RADON_UNAVAILABLE
    }
}

/// Derive measurements from a decoded reading.
///
/// # Errors
/// Returns [`DeriveError::InvalidVersion`] when the version tag is not
/// [`SUPPORTED_VERSION`]; no partial snapshot is produced.
pub fn derive(raw: &RawReading) -> Result<SensorSnapshot, DeriveError> {
    if raw.version != SUPPORTED_VERSION {
        return Err(DeriveError::InvalidVersion(raw.version));
    }

    Ok(SensorSnapshot {
        humidity_percent: f64::from(raw.humidity) / 2.0,
        radon_short_term_bq: clamp_radon(i32::from(raw.radon_short_term)),
        radon_long_term_bq: clamp_radon(i32::from(raw.radon_long_term)),
        temperature_celsius: f64::from(raw.temperature) / 100.0,
        pressure_hectopascal: f64::from(raw.pressure) / 50.0,
        co2_ppm: f64::from(raw.co2),
        voc_ppb: f64::from(raw.voc),
    })
}
