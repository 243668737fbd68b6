use clap::Parser;

use crate::bluetooth::DecodeMode;
use crate::error::ConfigError;
use crate::models::DeviceIdentity;

/// Receive battery and motion telemetry from a BLE sensor
#[derive(Debug, Parser)]
#[command(name = "ble-battery-logger")]
pub struct Cli {
    /// Bluetooth MAC address of the sensor
    #[arg(long, env = "SENSOR_MAC")]
    pub mac: String,

    /// InfluxDB hostname; records are only logged when absent
    #[arg(long = "influx-host", env = "INFLUX_HOST")]
    pub influx_host: Option<String>,

    /// Local Bluetooth adapter
    #[arg(long, env = "BLE_ADAPTER", default_value = "hci0")]
    pub adapter: String,

    /// Payload format the sensor firmware sends
    #[arg(long, env = "DECODE_MODE", value_enum, default_value_t = DecodeMode::Motion)]
    pub mode: DecodeMode,
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub device: DeviceIdentity,
    pub influx_host: Option<String>,
    pub adapter: String,
    pub mode: DecodeMode,
}

impl LoggerConfig {
    /// Load from process arguments, falling back to the environment and `.env`
    pub fn new() -> Result<Self, ConfigError> {
        // Load environment variables
        dotenv::dotenv().ok();
        Self::from_cli(Cli::parse())
    }

    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let device = cli.mac.parse()?;
        let influx_host = cli
            .influx_host
            .map(|host| host.trim().to_string())
            .filter(|host| !host.is_empty());

        Ok(LoggerConfig {
            device,
            influx_host,
            adapter: cli.adapter,
            mode: cli.mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_FALLBACKS: [&str; 4] = ["SENSOR_MAC", "INFLUX_HOST", "BLE_ADAPTER", "DECODE_MODE"];

    fn cli(mac: &str, influx_host: Option<&str>) -> Cli {
        Cli {
            mac: mac.to_string(),
            influx_host: influx_host.map(str::to_string),
            adapter: "hci0".to_string(),
            mode: DecodeMode::Motion,
        }
    }

    /// Parse arguments with no environment fallbacks in effect
    fn parse_args(args: &[&str]) -> Result<Cli, clap::Error> {
        // tests only ever remove these, so concurrent tests agree on the result
        for key in ENV_FALLBACKS {
            std::env::remove_var(key);
        }
        Cli::try_parse_from(std::iter::once("ble-battery-logger").chain(args.iter().copied()))
    }

    #[test]
    fn mac_only_disables_sink() {
        let config = LoggerConfig::from_cli(cli("c8:2b:96:a1:0f:3e", None)).unwrap();
        assert_eq!(config.device.to_string(), "C8:2B:96:A1:0F:3E");
        assert_eq!(config.influx_host, None);
        assert_eq!(config.adapter, "hci0");
        assert_eq!(config.mode, DecodeMode::Motion);
    }

    #[test]
    fn blank_influx_host_disables_sink() {
        let config = LoggerConfig::from_cli(cli("C8:2B:96:A1:0F:3E", Some(" "))).unwrap();
        assert_eq!(config.influx_host, None);
    }

    #[test]
    fn influx_host_is_trimmed() {
        let config =
            LoggerConfig::from_cli(cli("C8:2B:96:A1:0F:3E", Some(" influx.local "))).unwrap();
        assert_eq!(config.influx_host.as_deref(), Some("influx.local"));
    }

    #[test]
    fn invalid_mac_is_rejected() {
        assert!(matches!(
            LoggerConfig::from_cli(cli("C8:2B:96", None)),
            Err(ConfigError::InvalidAddress(_))
        ));
    }

    #[test]
    fn defaults_apply_without_environment() {
        let cli = parse_args(&["--mac", "C8:2B:96:A1:0F:3E"]).unwrap();
        assert_eq!(cli.influx_host, None);
        assert_eq!(cli.adapter, "hci0");
        assert_eq!(cli.mode, DecodeMode::Motion);
    }

    #[test]
    fn all_options() {
        let cli = parse_args(&[
            "--mac",
            "C8:2B:96:A1:0F:3E",
            "--influx-host",
            "influx.local",
            "--adapter",
            "hci1",
            "--mode",
            "battery-only",
        ])
        .unwrap();
        let config = LoggerConfig::from_cli(cli).unwrap();
        assert_eq!(config.influx_host.as_deref(), Some("influx.local"));
        assert_eq!(config.adapter, "hci1");
        assert_eq!(config.mode, DecodeMode::BatteryOnly);
    }

    #[test]
    fn mac_is_required() {
        assert!(parse_args(&["--influx-host", "x"]).is_err());
    }
}
