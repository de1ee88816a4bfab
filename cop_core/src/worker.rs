//! Background ingestion thread.
//!
//! Spawns a thread that opens the transport, owns its read half, classifies
//! every line into a [`Frame`] and pushes frames and operator log lines onto
//! two unbounded channels. The write half sits behind a mutex together with
//! the calibration session, so arming plus trigger write and prompt detection
//! plus reply write each happen as one step.
//!
//! Each `IngestionWorker` spawns exactly one thread, which is stopped and
//! joined when the worker is dropped. A stop request is observed within one
//! read timeout.
use crate::calibration::CalibrationSession;
use crate::error::ConsoleError;
use crate::frame::{self, Frame};
use crate::transport_error::{map_io_error, map_open_error};
use crate::types::{LogEntry, WorkerState};
use cop_traits::{Connector, LineSink, LineSource};
use crossbeam_channel as xch;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Per-connection settings handed to the thread.
#[derive(Debug, Clone)]
pub struct WorkerCfg {
    pub read_timeout: Duration,
    pub calibration_prompt: String,
}

impl Default for WorkerCfg {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(1000),
            calibration_prompt: "Enter the weight in lbs:".to_string(),
        }
    }
}

/// Producer ends of the update channels.
#[derive(Debug, Clone)]
pub struct UpdateSenders {
    pub frames: xch::Sender<Frame>,
    pub logs: xch::Sender<LogEntry>,
}

impl UpdateSenders {
    pub(crate) fn log(&self, message: impl Into<String>) {
        let entry = LogEntry::now(message);
        tracing::info!(target: "cop_console", "{}", entry.message);
        // Consumer gone means the facade is being torn down.
        let _ = self.logs.send(entry);
    }
}

struct Link<W> {
    sink: Option<W>,
    calibration: CalibrationSession,
}

type SharedLink<W> = Arc<Mutex<Link<W>>>;

fn lock_link<W>(link: &SharedLink<W>) -> MutexGuard<'_, Link<W>> {
    link.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct IngestionWorker<W: LineSink + Send + 'static> {
    port: String,
    state: Arc<AtomicU8>,
    shutdown: Arc<AtomicBool>,
    link: SharedLink<W>,
    out: UpdateSenders,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl<W: LineSink + Send + 'static> IngestionWorker<W> {
    pub fn spawn<C>(connector: Arc<C>, port: &str, cfg: WorkerCfg, out: UpdateSenders) -> Self
    where
        C: Connector<Sink = W> + Send + Sync + 'static,
    {
        let state = Arc::new(AtomicU8::new(WorkerState::Starting as u8));
        let shutdown = Arc::new(AtomicBool::new(false));
        let link = Arc::new(Mutex::new(Link {
            sink: None,
            calibration: CalibrationSession::new(cfg.calibration_prompt.clone()),
        }));

        let ctx = ThreadCtx {
            port: port.to_string(),
            read_timeout: cfg.read_timeout,
            state: state.clone(),
            shutdown: shutdown.clone(),
            link: link.clone(),
            out: out.clone(),
        };
        let join_handle = std::thread::Builder::new()
            .name(format!("ingest-{port}"))
            .spawn(move || ctx.run(connector.as_ref()))
            .ok();

        if join_handle.is_none() {
            out.log("Error: could not start the serial reader thread.");
            state.store(WorkerState::Faulted as u8, Ordering::Release);
        }

        Self {
            port: port.to_string(),
            state,
            shutdown,
            link,
            out,
            join_handle,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Write raw bytes to the device. A no-op with a log line unless running.
    pub fn send(&self, bytes: &[u8]) -> Result<(), ConsoleError> {
        let mut link = self.running_link()?;
        self.write_locked(&mut link, bytes)
    }

    /// Arm the calibration handshake and send the trigger byte.
    pub fn arm_calibration(&self, weight: f64) -> Result<(), ConsoleError> {
        let mut link = self.running_link()?;
        let trigger = link.calibration.arm(weight);
        let res = self.write_locked(&mut link, trigger);
        if res.is_err() {
            link.calibration.disarm();
        }
        res
    }

    pub fn calibration_armed(&self) -> bool {
        lock_link(&self.link).calibration.is_armed()
    }

    fn running_link(&self) -> Result<MutexGuard<'_, Link<W>>, ConsoleError> {
        if self.state() != WorkerState::Running {
            self.out.log("Not connected.");
            return Err(ConsoleError::NotConnected);
        }
        Ok(lock_link(&self.link))
    }

    fn write_locked(&self, link: &mut Link<W>, bytes: &[u8]) -> Result<(), ConsoleError> {
        let Some(sink) = link.sink.as_mut() else {
            self.out.log("Not connected.");
            return Err(ConsoleError::NotConnected);
        };
        match sink.write_all(bytes) {
            Ok(()) => {
                self.out
                    .log(format!("Sent: {}", String::from_utf8_lossy(bytes).trim()));
                Ok(())
            }
            Err(e) => {
                let err = map_io_error(&*e);
                tracing::error!(error = %err, port = %self.port, "write failed");
                self.out.log(format!("Error: write to {} failed: {err}", self.port));
                self.stop();
                Err(err)
            }
        }
    }

    /// Ask the thread to stop. Returns immediately; the transport is closed
    /// within one read timeout.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        let _ = self.state.compare_exchange(
            WorkerState::Running as u8,
            WorkerState::Stopping as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Stop and wait for the thread to exit.
    pub fn join(&mut self) {
        self.stop();
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!(port = %self.port, "ingestion thread joined"),
                Err(e) => tracing::warn!(?e, "ingestion thread panicked during shutdown"),
            }
        }
    }
}

impl<W: LineSink + Send + 'static> Drop for IngestionWorker<W> {
    fn drop(&mut self) {
        self.join();
    }
}

struct ThreadCtx<W> {
    port: String,
    read_timeout: Duration,
    state: Arc<AtomicU8>,
    shutdown: Arc<AtomicBool>,
    link: SharedLink<W>,
    out: UpdateSenders,
}

enum Exit {
    Requested,
    ConsumerGone,
    Transport(ConsoleError),
}

impl<W: LineSink + Send + 'static> ThreadCtx<W> {
    fn set_state(&self, s: WorkerState) {
        self.state.store(s as u8, Ordering::Release);
    }

    fn run<C>(self, connector: &C)
    where
        C: Connector<Sink = W>,
    {
        let (mut source, sink) = match connector.open(&self.port) {
            Ok(pair) => pair,
            Err(e) => {
                let err = map_open_error(&self.port, &*e);
                tracing::warn!(error = %err, "open failed");
                self.out
                    .log(format!("Error: Failed to connect to {}. {err}", self.port));
                self.set_state(WorkerState::Faulted);
                return;
            }
        };

        lock_link(&self.link).sink = Some(sink);
        if self.shutdown.load(Ordering::Acquire) {
            self.set_state(WorkerState::Stopping);
        } else {
            self.out
                .log(format!("Successfully connected to {}.", self.port));
            self.set_state(WorkerState::Running);
            tracing::debug!(port = %self.port, "ingestion running");
        }

        let exit = self.read_loop(&mut source);

        self.set_state(WorkerState::Stopping);
        match exit {
            Exit::Requested => tracing::debug!(port = %self.port, "stop requested"),
            Exit::ConsumerGone => tracing::debug!("update consumer disconnected, exiting thread"),
            Exit::Transport(err) => {
                tracing::error!(error = %err, port = %self.port, "transport failed");
                self.out.log(format!("Error: Serial device disconnected. {err}"));
            }
        }
        {
            let mut link = lock_link(&self.link);
            link.sink = None;
            link.calibration.disarm();
        }
        drop(source);
        self.out.log("Serial connection closed.");
        self.set_state(WorkerState::Stopped);
        tracing::trace!("ingestion thread exiting cleanly");
    }

    fn read_loop<S: LineSource>(&self, source: &mut S) -> Exit {
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                return Exit::Requested;
            }
            let bytes = match source.read_line(self.read_timeout) {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(e) => return Exit::Transport(map_io_error(&*e)),
            };
            let (text, decoded) = match String::from_utf8(bytes) {
                Ok(s) => (s, true),
                Err(e) => (String::from_utf8_lossy(e.as_bytes()).into_owned(), false),
            };
            let line = text.trim();
            if line.is_empty() {
                continue;
            }
            tracing::trace!(line, decoded, "rx");

            if let Err(err) = self.answer_prompt(line) {
                return Exit::Transport(err);
            }

            // Damaged lines stay unclassified, even behind a valid prefix.
            let frame = if decoded {
                frame::parse(line)
            } else {
                self.out
                    .log(format!("Received (undecodable bytes replaced): {line}"));
                Frame::Unrecognized {
                    raw: line.to_string(),
                }
            };
            if self.out.frames.send(frame).is_err() {
                return Exit::ConsumerGone;
            }
        }
    }

    fn answer_prompt(&self, line: &str) -> Result<(), ConsoleError> {
        let mut link = lock_link(&self.link);
        let Some((reply, weight)) = link.calibration.on_line(line) else {
            return Ok(());
        };
        let Some(sink) = link.sink.as_mut() else {
            return Err(ConsoleError::NotConnected);
        };
        sink.write_all(reply.as_bytes())
            .map_err(|e| map_io_error(&*e))?;
        self.out.log(format!("Sent calibration weight: {weight}"));
        Ok(())
    }
}
