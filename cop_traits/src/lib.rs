//! Transport seams shared by the console core and the concrete serial backends.
//!
//! Errors cross these boundaries boxed so backends are free to use their own
//! error types; `cop_core` maps them back to a typed error.

use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Read half of a line-delimited transport.
pub trait LineSource {
    /// Block for at most `timeout` waiting for one complete line.
    ///
    /// Returns `Ok(None)` when the timeout elapses without a full line. The
    /// returned bytes exclude the trailing `\n` and are not decoded.
    fn read_line(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, BoxError>;
}

/// Write half of a line-delimited transport.
pub trait LineSink {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError>;
}

/// Opens transports by port identifier and enumerates the ports it can reach.
pub trait Connector {
    type Source: LineSource + Send + 'static;
    type Sink: LineSink + Send + 'static;

    fn open(&self, port: &str) -> Result<(Self::Source, Self::Sink), BoxError>;

    fn available_ports(&self) -> Result<Vec<String>, BoxError>;
}

impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn read_line(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, BoxError> {
        (**self).read_line(timeout)
    }
}

impl<W: LineSink + ?Sized> LineSink for Box<W> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        (**self).write_all(bytes)
    }
}
