//! Maps `Box<dyn Error>` from transport boundaries to typed `ConsoleError`.
//!
//! The traits in `cop_traits` use `Box<dyn Error + Send + Sync>`; this module
//! converts those to our typed error enum, with an optional feature-gated path
//! for `cop_serial::error::SerialError` downcasting.

use crate::error::ConsoleError;

/// Map a failure to open `port` to a typed `ConsoleError`.
pub fn map_open_error(port: &str, e: &(dyn std::error::Error + 'static)) -> ConsoleError {
    #[cfg(feature = "serial-errors")]
    {
        if let Some(se) = e.downcast_ref::<cop_serial::error::SerialError>() {
            return match se {
                cop_serial::error::SerialError::Open { port, reason } => {
                    ConsoleError::TransportOpen {
                        port: port.clone(),
                        reason: reason.clone(),
                    }
                }
                other => ConsoleError::TransportOpen {
                    port: port.to_string(),
                    reason: other.to_string(),
                },
            };
        }
    }

    ConsoleError::TransportOpen {
        port: port.to_string(),
        reason: e.to_string(),
    }
}

/// Map a mid-stream read/write failure to a typed `ConsoleError`.
pub fn map_io_error(e: &(dyn std::error::Error + 'static)) -> ConsoleError {
    #[cfg(feature = "serial-errors")]
    {
        if let Some(se) = e.downcast_ref::<cop_serial::error::SerialError>() {
            return match se {
                cop_serial::error::SerialError::Disconnected => {
                    ConsoleError::TransportIo("device disconnected".to_string())
                }
                cop_serial::error::SerialError::Io(io) => ConsoleError::TransportIo(io.to_string()),
                other => ConsoleError::TransportIo(other.to_string()),
            };
        }
    }

    ConsoleError::TransportIo(e.to_string())
}
