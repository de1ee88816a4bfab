use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConsoleError {
    #[error("failed to open {port}: {reason}")]
    TransportOpen { port: String, reason: String },
    #[error("transport i/o error: {0}")]
    TransportIo(String),
    #[error("invalid calibration weight {0:?}: expected a finite number")]
    InvalidCommandInput(String),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("not connected")]
    NotConnected,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
