//! Wave Plus sensor characteristic payload decoding.
//!
//! The characteristic value is 20 bytes: four `u8` fields followed by eight
//! little-endian `u16` fields. Only the length is validated here; the version
//! tag is checked when the reading is turned into measurements.

use thiserror::Error;

/// Size of the sensor characteristic value in bytes.
pub const PAYLOAD_LEN: usize = 20;

/// Error returned for payloads that do not have the fixed layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid payload length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Undecoded fields of one sensor reading, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawReading {
    /// Protocol version tag (field 0)
    pub version: u8,
    /// Relative humidity in half percent (field 1)
    pub humidity: u8,
    /// Fields 2 and 3, not exported
    pub reserved_bytes: [u8; 2],
    /// Radon short term average in Bq/m3 (field 4)
    pub radon_short_term: u16,
    /// Radon long term average in Bq/m3 (field 5)
    pub radon_long_term: u16,
    /// Temperature in hundredths of a degree Celsius (field 6)
    pub temperature: u16,
    /// Pressure in fiftieths of a hectopascal (field 7)
    pub pressure: u16,
    /// CO2 in ppm (field 8)
    pub co2: u16,
    /// VOC in ppb (field 9)
    pub voc: u16,
    /// Fields 10 and 11, not exported
    pub reserved_words: [u16; 2],
}

fn word(payload: &[u8; PAYLOAD_LEN], index: usize) -> u16 {
    let offset = 4 + index * 2;
    u16::from_le_bytes([payload[offset], payload[offset + 1]])
}

/// Decode a sensor characteristic value.
///
/// # Errors
/// Returns [`DecodeError::InvalidLength`] unless `bytes` is exactly
/// [`PAYLOAD_LEN`] bytes long.
pub fn decode(bytes: &[u8]) -> Result<RawReading, DecodeError> {
    let payload: &[u8; PAYLOAD_LEN] =
        bytes.try_into().map_err(|_| DecodeError::InvalidLength {
            expected: PAYLOAD_LEN,
            actual: bytes.len(),
        })?;

    Ok(RawReading {
        version: payload[0],
        humidity: payload[1],
        reserved_bytes: [payload[2], payload[3]],
        radon_short_term: word(payload, 0),
        radon_long_term: word(payload, 1),
        temperature: word(payload, 2),
        pressure: word(payload, 3),
        co2: word(payload, 4),
        voc: word(payload, 5),
        reserved_words: [word(payload, 6), word(payload, 7)],
    })
}
