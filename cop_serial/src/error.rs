use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerialError {
    #[error("failed to open {port}: {reason}")]
    Open { port: String, reason: String },
    #[error("unknown port: {0}")]
    UnknownPort(String),
    #[error("serial device disconnected")]
    Disconnected,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SerialError>;
