/// Decoding of battery characteristic notifications
use crate::error::DecodeError;
use crate::models::{BatteryReading, DecodedSample, Sample};

/// Length of a motion telemetry payload
pub const MOTION_PAYLOAD_LEN: usize = 8;

/// Wire format the peripheral firmware was built with
///
/// The two firmware variants share a characteristic UUID but carry no
/// version marker, so the mode is chosen by deployment and never guessed
/// from the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DecodeMode {
    /// 8 bytes: ADC (u16), then X, Y, Z acceleration (i16), all little-endian
    #[default]
    Motion,
    /// The whole payload is one little-endian unsigned battery counter
    BatteryOnly,
}

impl DecodeMode {
    pub fn decode(self, data: &[u8]) -> Result<Sample, DecodeError> {
        match self {
            DecodeMode::Motion => decode_motion(data).map(Sample::Motion),
            DecodeMode::BatteryOnly => decode_battery(data).map(Sample::Battery),
        }
    }

    /// Whether samples decoded in this mode are aggregated and exported
    pub fn publishes(self) -> bool {
        matches!(self, DecodeMode::Motion)
    }
}

/// Decode a motion payload
///
/// Layout:
/// - Bytes 0-1: battery ADC count (unsigned 16-bit)
/// - Bytes 2-3: acceleration X (signed 16-bit)
/// - Bytes 4-5: acceleration Y (signed 16-bit)
/// - Bytes 6-7: acceleration Z (signed 16-bit)
pub fn decode_motion(data: &[u8]) -> Result<DecodedSample, DecodeError> {
    if data.len() != MOTION_PAYLOAD_LEN {
        return Err(DecodeError::Length {
            expected: MOTION_PAYLOAD_LEN,
            actual: data.len(),
        });
    }

    Ok(DecodedSample {
        adc: u16::from_le_bytes([data[0], data[1]]),
        x: i16::from_le_bytes([data[2], data[3]]),
        y: i16::from_le_bytes([data[4], data[5]]),
        z: i16::from_le_bytes([data[6], data[7]]),
    })
}

/// Decode a battery-only payload of 1 to 8 bytes
pub fn decode_battery(data: &[u8]) -> Result<BatteryReading, DecodeError> {
    if data.is_empty() {
        return Err(DecodeError::Empty);
    }
    if data.len() > 8 {
        return Err(DecodeError::TooLong(data.len()));
    }

    let mut bytes = [0u8; 8];
    bytes[..data.len()].copy_from_slice(data);
    Ok(BatteryReading {
        adc: u64::from_le_bytes(bytes),
    })
}
