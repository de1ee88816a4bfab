//! Test and helper mocks for cop_core

use cop_traits::{BoxError, Connector, LineSink, LineSource};
use std::time::Duration;

/// A source that never produces a line; every read times out.
pub struct MuteSource;

impl LineSource for MuteSource {
    fn read_line(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, BoxError> {
        std::thread::sleep(timeout.min(Duration::from_millis(5)));
        Ok(None)
    }
}

/// A sink whose every write fails as if the cable were pulled.
pub struct RejectingSink;

impl LineSink for RejectingSink {
    fn write_all(&mut self, _bytes: &[u8]) -> Result<(), BoxError> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "write rejected",
        )))
    }
}

/// Opens any port into a silent, read-only link.
pub struct ReadOnlyConnector;

impl Connector for ReadOnlyConnector {
    type Source = MuteSource;
    type Sink = RejectingSink;

    fn open(&self, _port: &str) -> Result<(Self::Source, Self::Sink), BoxError> {
        Ok((MuteSource, RejectingSink))
    }

    fn available_ports(&self) -> Result<Vec<String>, BoxError> {
        Err("enumeration unsupported".into())
    }
}
