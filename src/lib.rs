//! Battery and motion telemetry logger for a single BLE sensor
//!
//! A [`bluetooth::ConnectionController`] keeps one peripheral connected,
//! decodes its notifications, averages battery readings into windows of
//! [`aggregator::BATCH_THRESHOLD`] samples and hands every full window to
//! an InfluxDB sink.
pub mod aggregator;
pub mod bluetooth;
pub mod config;
pub mod error;
pub mod models;
pub mod sink;
pub mod units;
pub mod utils;
