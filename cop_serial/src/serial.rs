use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use cop_traits::{BoxError, Connector, LineSink, LineSource};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::trace;

use crate::error::{Result, SerialError};
use crate::util::LineBuffer;

/// Opens real serial ports through the `serialport` crate.
#[derive(Debug, Clone, Copy)]
pub struct SerialConnector {
    baud_rate: u32,
}

impl SerialConnector {
    pub fn new(baud_rate: u32) -> Self {
        Self { baud_rate }
    }

    fn open_port(&self, port: &str) -> Result<(SerialReader, SerialWriter)> {
        let reader = serialport::new(port, self.baud_rate)
            .data_bits(DataBits::Eight)
            .flow_control(FlowControl::None)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| SerialError::Open {
                port: port.to_string(),
                reason: e.to_string(),
            })?;
        let writer = reader.try_clone().map_err(|e| SerialError::Open {
            port: port.to_string(),
            reason: e.to_string(),
        })?;
        Ok((
            SerialReader {
                port: reader,
                buf: LineBuffer::new(),
            },
            SerialWriter { port: writer },
        ))
    }
}

impl Connector for SerialConnector {
    type Source = SerialReader;
    type Sink = SerialWriter;

    fn open(&self, port: &str) -> std::result::Result<(SerialReader, SerialWriter), BoxError> {
        Ok(self.open_port(port)?)
    }

    fn available_ports(&self) -> std::result::Result<Vec<String>, BoxError> {
        let ports = serialport::available_ports().map_err(|e| SerialError::Open {
            port: "*".to_string(),
            reason: e.to_string(),
        })?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }
}

/// Unplugging a USB adapter surfaces as one of these kinds, depending on OS.
fn classify(e: io::Error) -> SerialError {
    match e.kind() {
        io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected | io::ErrorKind::UnexpectedEof => {
            SerialError::Disconnected
        }
        _ => SerialError::Io(e),
    }
}

pub struct SerialReader {
    port: Box<dyn SerialPort>,
    buf: LineBuffer,
}

impl SerialReader {
    fn read_line_inner(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; 256];
        loop {
            if let Some(line) = self.buf.next_line() {
                return Ok(Some(line));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            self.port
                .set_timeout(deadline - now)
                .map_err(|e| SerialError::Io(io::Error::other(e)))?;
            match self.port.read(&mut chunk) {
                Ok(0) => {}
                Ok(n) => {
                    trace!(bytes = n, "serial chunk");
                    self.buf.extend(&chunk[..n]);
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(classify(e)),
            }
        }
    }
}

impl LineSource for SerialReader {
    fn read_line(&mut self, timeout: Duration) -> std::result::Result<Option<Vec<u8>>, BoxError> {
        Ok(self.read_line_inner(timeout)?)
    }
}

pub struct SerialWriter {
    port: Box<dyn SerialPort>,
}

impl LineSink for SerialWriter {
    fn write_all(&mut self, bytes: &[u8]) -> std::result::Result<(), BoxError> {
        self.port.write_all(bytes).map_err(classify)?;
        self.port.flush().map_err(classify)?;
        Ok(())
    }
}
