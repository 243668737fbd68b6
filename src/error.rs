use uuid::Uuid;

/// Errors produced when a notification payload cannot be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("expected {expected} byte payload, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("empty battery payload")]
    Empty,
    #[error("battery payload of {0} bytes does not fit a 64-bit counter")]
    TooLong(usize),
}

/// The peripheral does not expose the endpoints the logger needs
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("service {0} not found among resolved services")]
    ServiceNotFound(Uuid),
    #[error("characteristic {characteristic} not found in service {service}")]
    CharacteristicNotFound { service: Uuid, characteristic: Uuid },
}

/// Reasons a connection session ended abnormally
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("invalid sink URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("database rejected write with status {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("previous write still in flight, record dropped")]
    Busy,
    #[error("sink writer has stopped")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid Bluetooth address '{0}'")]
    InvalidAddress(String),
}
