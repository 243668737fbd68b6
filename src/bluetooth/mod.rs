pub mod bluez;
pub mod controller;
pub mod decoder;
pub mod link;

pub use bluez::BluezManager;
pub use controller::ConnectionController;
pub use decoder::DecodeMode;
pub use link::TokioClock;
