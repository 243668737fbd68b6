use log::{error, info, warn};

use ble_battery_logger::bluetooth::{BluezManager, ConnectionController, TokioClock};
use ble_battery_logger::config::LoggerConfig;
use ble_battery_logger::sink::{InfluxSink, SinkPublisher};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match LoggerConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Starting battery logger for {} on {} ({:?} payloads)",
        config.device, config.adapter, config.mode
    );

    let publisher = match config.influx_host.as_deref() {
        Some(host) if config.mode.publishes() => SinkPublisher::spawn(InfluxSink::new(host)?).0,
        Some(host) => {
            warn!(
                "Ignoring InfluxDB host {}: {:?} payloads are not exported",
                host, config.mode
            );
            SinkPublisher::disabled()
        }
        None => SinkPublisher::disabled(),
    };

    if publisher.is_enabled() {
        info!(
            "Writing aggregated records to InfluxDB at {}",
            config.influx_host.as_deref().unwrap_or_default()
        );
    } else {
        info!("No InfluxDB export, records are only logged");
    }

    let manager = BluezManager::new(&config.adapter).await?;
    let mut controller =
        ConnectionController::new(config.device, manager, TokioClock, config.mode, publisher);

    // Reconnect until interrupted
    tokio::select! {
        _ = controller.run() => {}
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Program terminated by user. Exiting gracefully."),
                Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
            }
        }
    }

    Ok(())
}
