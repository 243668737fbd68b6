pub mod influx;
pub mod point;
pub mod publisher;

pub use influx::InfluxSink;
pub use publisher::SinkPublisher;
