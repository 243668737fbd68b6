use std::fmt;
use std::str::FromStr;

use bluer::Address;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ConfigError;

/// Address of the peripheral this logger is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity(Address);

impl DeviceIdentity {
    pub fn address(&self) -> Address {
        self.0
    }
}

impl FromStr for DeviceIdentity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<Address>()
            .map(DeviceIdentity)
            .map_err(|_| ConfigError::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One motion-telemetry notification: battery ADC plus accelerometer axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedSample {
    pub adc: u16,
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

/// One battery-only notification, the whole payload read as a counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryReading {
    pub adc: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    Motion(DecodedSample),
    Battery(BatteryReading),
}

impl Sample {
    pub fn adc(&self) -> f64 {
        match self {
            Sample::Motion(s) => s.adc as f64,
            Sample::Battery(b) => b.adc as f64,
        }
    }
}

/// Average over one aggregation window
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRecord {
    pub avg_adc: f64,
    pub battery_voltage: f64,
    pub battery_percent: f64,
    pub sample_count: usize,
    pub last_x: i16,
    pub last_y: i16,
    pub last_z: i16,
    pub timestamp: OffsetDateTime,
}

/// A GATT service as reported by the connection manager after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub uuid: Uuid,
    pub characteristics: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_parses_and_displays_uppercase() {
        let id: DeviceIdentity = " c8:2b:96:a1:0f:3e ".parse().unwrap();
        assert_eq!(id.to_string(), "C8:2B:96:A1:0F:3E");
    }

    #[test]
    fn identity_rejects_garbage() {
        assert!("not-a-mac".parse::<DeviceIdentity>().is_err());
        assert!("C8:2B:96:A1:0F".parse::<DeviceIdentity>().is_err());
    }
}
