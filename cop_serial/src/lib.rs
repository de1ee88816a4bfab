//! Concrete line transports for the force-plate console.
//!
//! `SimulatedConnector` is always available and backs tests, `--sim` runs and
//! the self-check. The real serial backend lives behind the `hardware` feature.
pub mod error;
#[cfg(feature = "hardware")]
pub mod serial;
pub mod util;

#[cfg(feature = "hardware")]
pub use serial::{SerialConnector, SerialReader, SerialWriter};

use cop_traits::{BoxError, Connector, LineSink, LineSource};
use error::SerialError;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Port name exposed by the simulated connector.
pub const SIM_PORT: &str = "sim0";

/// Prompt the synthetic firmware prints after receiving the calibrate trigger.
pub const SIM_CALIBRATION_PROMPT: &str = "Place known weight on the plate. Enter the weight in lbs:";

/// Interval between synthetic samples while a stream is active.
const SAMPLE_PERIOD: Duration = Duration::from_millis(50);

#[derive(Debug)]
enum Incoming {
    Line(Vec<u8>),
    Fault(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Off,
    Weights,
    Cop,
}

#[derive(Debug)]
struct DeviceState {
    pending: VecDeque<Incoming>,
    written: Vec<Vec<u8>>,
    synthetic: bool,
    stream: Stream,
    tick: u64,
    awaiting_weight: bool,
    reply_buf: Vec<u8>,
    prompt: String,
    open_count: usize,
}

impl DeviceState {
    fn new(synthetic: bool) -> Self {
        Self {
            pending: VecDeque::new(),
            written: Vec::new(),
            synthetic,
            stream: Stream::Off,
            tick: 0,
            awaiting_weight: false,
            reply_buf: Vec::new(),
            prompt: SIM_CALIBRATION_PROMPT.to_string(),
            open_count: 0,
        }
    }

    fn push_line(&mut self, line: impl Into<Vec<u8>>) {
        self.pending.push_back(Incoming::Line(line.into()));
    }

    /// React to bytes written by the host the way the plate firmware does.
    fn handle_write(&mut self, bytes: &[u8]) {
        if self.awaiting_weight {
            self.reply_buf.extend_from_slice(bytes);
            if let Some(pos) = self.reply_buf.iter().position(|&b| b == b'\n') {
                let text: Vec<u8> = self.reply_buf.drain(..=pos).collect();
                self.awaiting_weight = false;
                let text = String::from_utf8_lossy(&text).trim().to_string();
                match text.parse::<f64>() {
                    Ok(w) => self.push_line(format!("Calibration complete for {w} lbs.")),
                    Err(_) => self.push_line("Invalid weight, calibration aborted."),
                }
            }
            return;
        }
        for &b in bytes {
            match b {
                b'r' => self.stream = Stream::Weights,
                b'c' => self.stream = Stream::Cop,
                b's' => self.stream = Stream::Off,
                b'z' => self.push_line("Taring all scales... done."),
                b'k' => {
                    self.stream = Stream::Off;
                    self.awaiting_weight = true;
                    let prompt = self.prompt.clone();
                    self.push_line(prompt);
                }
                _ => {}
            }
        }
    }

    fn next_sample(&mut self) -> Option<Vec<u8>> {
        let t = self.tick as f64 * 0.05;
        self.tick = self.tick.wrapping_add(1);
        // Slow circular sway around the plate centre.
        let w = [
            10.0 + 4.0 * t.sin(),
            10.0 + 4.0 * t.cos(),
            10.0 - 4.0 * t.sin(),
            10.0 - 4.0 * t.cos(),
        ];
        match self.stream {
            Stream::Off => None,
            Stream::Weights => Some(
                format!("{:.2},{:.2},{:.2},{:.2}", w[0], w[1], w[2], w[3]).into_bytes(),
            ),
            Stream::Cop => {
                let total: f64 = w.iter().sum();
                let x = ((w[1] + w[2]) - (w[0] + w[3])) / total;
                let y = ((w[2] + w[3]) - (w[0] + w[1])) / total;
                Some(format!("({x:.3}, {y:.3})").into_bytes())
            }
        }
    }
}

type Shared = Arc<(Mutex<DeviceState>, Condvar)>;

fn lock(shared: &Shared) -> MutexGuard<'_, DeviceState> {
    shared.0.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process stand-in for the force plate.
///
/// A *scripted* connector only replays lines pushed with [`push_line`](Self::push_line).
/// A *synthetic* connector additionally behaves like the firmware: it streams
/// weights or CoP after `r`/`c`, stops on `s`, acknowledges `z`, and runs the
/// calibration prompt/reply exchange after `k`.
#[derive(Clone)]
pub struct SimulatedConnector {
    shared: Shared,
    ports: Vec<String>,
    open_error: Option<String>,
}

impl SimulatedConnector {
    pub fn scripted<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Vec<u8>>,
    {
        let mut state = DeviceState::new(false);
        for line in lines {
            state.push_line(line);
        }
        Self::from_state(state)
    }

    pub fn synthetic() -> Self {
        Self::from_state(DeviceState::new(true))
    }

    fn from_state(state: DeviceState) -> Self {
        Self {
            shared: Arc::new((Mutex::new(state), Condvar::new())),
            ports: vec![SIM_PORT.to_string()],
            open_error: None,
        }
    }

    /// Make every `open` fail with the given reason.
    pub fn failing_open(mut self, reason: impl Into<String>) -> Self {
        self.open_error = Some(reason.into());
        self
    }

    pub fn with_ports<I: IntoIterator<Item = S>, S: Into<String>>(mut self, ports: I) -> Self {
        self.ports = ports.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_prompt(self, prompt: impl Into<String>) -> Self {
        lock(&self.shared).prompt = prompt.into();
        self
    }

    pub fn push_line(&self, line: impl Into<Vec<u8>>) {
        lock(&self.shared).push_line(line);
        self.shared.1.notify_all();
    }

    /// Queue a transport failure; the reader returns it as an I/O error.
    pub fn push_fault(&self, reason: impl Into<String>) {
        lock(&self.shared)
            .pending
            .push_back(Incoming::Fault(reason.into()));
        self.shared.1.notify_all();
    }

    /// Every buffer the host has written, in order.
    pub fn written(&self) -> Vec<Vec<u8>> {
        lock(&self.shared).written.clone()
    }

    pub fn open_count(&self) -> usize {
        lock(&self.shared).open_count
    }
}

impl Connector for SimulatedConnector {
    type Source = SimulatedSource;
    type Sink = SimulatedSink;

    fn open(&self, port: &str) -> Result<(SimulatedSource, SimulatedSink), BoxError> {
        if let Some(reason) = &self.open_error {
            return Err(SerialError::Open {
                port: port.to_string(),
                reason: reason.clone(),
            }
            .into());
        }
        if !self.ports.iter().any(|p| p == port) {
            return Err(SerialError::UnknownPort(port.to_string()).into());
        }
        lock(&self.shared).open_count += 1;
        tracing::debug!(port, "simulated port opened");
        Ok((
            SimulatedSource {
                shared: self.shared.clone(),
            },
            SimulatedSink {
                shared: self.shared.clone(),
            },
        ))
    }

    fn available_ports(&self) -> Result<Vec<String>, BoxError> {
        Ok(self.ports.clone())
    }
}

pub struct SimulatedSource {
    shared: Shared,
}

impl LineSource for SimulatedSource {
    fn read_line(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, BoxError> {
        let deadline = Instant::now() + timeout;
        let mut state = lock(&self.shared);
        loop {
            match state.pending.pop_front() {
                Some(Incoming::Line(line)) => return Ok(Some(line)),
                Some(Incoming::Fault(reason)) => {
                    return Err(SerialError::Io(std::io::Error::other(reason)).into());
                }
                None => {}
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let remaining = deadline - now;
            if state.synthetic && state.stream != Stream::Off {
                drop(state);
                std::thread::sleep(SAMPLE_PERIOD.min(remaining));
                state = lock(&self.shared);
                if state.pending.is_empty()
                    && let Some(sample) = state.next_sample()
                {
                    return Ok(Some(sample));
                }
                continue;
            }
            let (guard, _) = self
                .shared
                .1
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }
}

pub struct SimulatedSink {
    shared: Shared,
}

impl LineSink for SimulatedSink {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        let mut state = lock(&self.shared);
        state.written.push(bytes.to_vec());
        if state.synthetic {
            state.handle_write(bytes);
        }
        drop(state);
        self.shared.1.notify_all();
        Ok(())
    }
}
