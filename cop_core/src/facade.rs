//! Operator-facing control surface.
//!
//! `ControlFacade` owns the connector and at most one ingestion worker. Every
//! operation is non-blocking except [`ControlFacade::shutdown`], which joins the
//! worker. Results and diagnostics flow back through [`Updates`], drained by the
//! presentation layer on its own cadence.
use crate::command::{Command, parse_calibration_weight};
use crate::error::ConsoleError;
use crate::frame::Frame;
use crate::types::{ConnectionState, LogEntry, WorkerState};
use crate::worker::{IngestionWorker, UpdateSenders, WorkerCfg};
use cop_traits::Connector;
use crossbeam_channel as xch;
use std::sync::Arc;

/// Everything produced since the previous drain, in arrival order per kind.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Updates {
    pub logs: Vec<LogEntry>,
    pub frames: Vec<Frame>,
}

impl Updates {
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty() && self.frames.is_empty()
    }
}

/// Both ends of the frame and log channels.
#[derive(Debug, Clone)]
pub struct UpdateChannels {
    senders: UpdateSenders,
    frames_rx: xch::Receiver<Frame>,
    logs_rx: xch::Receiver<LogEntry>,
}

impl UpdateChannels {
    pub fn unbounded() -> Self {
        let (frames_tx, frames_rx) = xch::unbounded();
        let (logs_tx, logs_rx) = xch::unbounded();
        Self {
            senders: UpdateSenders {
                frames: frames_tx,
                logs: logs_tx,
            },
            frames_rx,
            logs_rx,
        }
    }
}

impl Default for UpdateChannels {
    fn default() -> Self {
        Self::unbounded()
    }
}

pub struct ControlFacade<C: Connector + Send + Sync + 'static> {
    connector: Arc<C>,
    cfg: WorkerCfg,
    channels: UpdateChannels,
    worker: Option<IngestionWorker<C::Sink>>,
}

impl<C: Connector + Send + Sync + 'static> ControlFacade<C> {
    pub fn new(connector: C, cfg: WorkerCfg) -> Self {
        Self::with_channels(connector, cfg, UpdateChannels::unbounded())
    }

    pub fn with_channels(connector: C, cfg: WorkerCfg, channels: UpdateChannels) -> Self {
        Self {
            connector: Arc::new(connector),
            cfg,
            channels,
            worker: None,
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    fn log(&self, message: impl Into<String>) {
        self.channels.senders.log(message);
    }

    /// Join a worker whose thread has already released the transport.
    fn reap(&mut self) {
        if self
            .worker
            .as_ref()
            .is_some_and(|w| w.state().is_terminal())
            && let Some(mut w) = self.worker.take()
        {
            w.join();
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.worker
            .as_ref()
            .map_or(ConnectionState::Disconnected, |w| w.state().into())
    }

    /// Lifecycle of the current worker, if one exists.
    pub fn worker_state(&self) -> Option<WorkerState> {
        self.worker.as_ref().map(IngestionWorker::state)
    }

    /// Port of the current or last worker.
    pub fn port(&self) -> Option<&str> {
        self.worker.as_ref().map(IngestionWorker::port)
    }

    /// Start a worker for `port`. Failures surface as log entries and a
    /// `Faulted` state, never as a return value.
    pub fn connect(&mut self, port: &str) {
        let port = port.trim();
        if port.is_empty() {
            self.log("Please select a port first.");
            return;
        }
        self.reap();
        if let Some(w) = &self.worker {
            match w.state() {
                WorkerState::Starting | WorkerState::Running => {
                    self.log(format!("Already connected to {}.", w.port()));
                }
                _ => {
                    self.log(format!(
                        "Connection to {} is still closing; try again shortly.",
                        w.port()
                    ));
                }
            }
            return;
        }
        tracing::debug!(port, "connecting");
        self.worker = Some(IngestionWorker::spawn(
            self.connector.clone(),
            port,
            self.cfg.clone(),
            self.channels.senders.clone(),
        ));
    }

    /// Request the worker to stop. Returns without waiting.
    pub fn disconnect(&mut self) {
        match &self.worker {
            Some(w) if !w.state().is_terminal() => w.stop(),
            _ => tracing::trace!("disconnect with no live worker"),
        }
    }

    fn live_worker(&self) -> Result<&IngestionWorker<C::Sink>, ConsoleError> {
        match &self.worker {
            Some(w) if w.state() == WorkerState::Running => Ok(w),
            _ => {
                self.log("Not connected.");
                Err(ConsoleError::NotConnected)
            }
        }
    }

    /// Send one named command byte.
    pub fn send_command(&self, name: &str) -> Result<(), ConsoleError> {
        let cmd = name.parse::<Command>().inspect_err(|_| {
            self.log(format!("Unknown command: {}", name.trim()));
        })?;
        self.send(cmd)
    }

    pub fn send(&self, cmd: Command) -> Result<(), ConsoleError> {
        self.live_worker()?.send(cmd.as_bytes())
    }

    /// Validate `weight_text`, arm the handshake and send the trigger.
    pub fn start_calibration(&self, weight_text: &str) -> Result<(), ConsoleError> {
        let worker = self.live_worker()?;
        let weight = parse_calibration_weight(weight_text).inspect_err(|_| {
            self.log("Error: Invalid calibration weight. Please enter a number.");
        })?;
        worker.arm_calibration(weight)
    }

    pub fn calibration_pending(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(IngestionWorker::calibration_armed)
    }

    /// Non-blocking drain of both channels.
    pub fn drain_updates(&self) -> Updates {
        Updates {
            logs: self.channels.logs_rx.try_iter().collect(),
            frames: self.channels.frames_rx.try_iter().collect(),
        }
    }

    /// Enumerate ports. Enumeration failure is logged and yields an empty list.
    pub fn list_available_ports(&self) -> Vec<String> {
        match self.connector.available_ports() {
            Ok(ports) => ports,
            Err(e) => {
                tracing::warn!(error = %e, "port enumeration failed");
                self.log(format!("Error: could not list serial ports. {e}"));
                Vec::new()
            }
        }
    }

    /// Stop the worker and wait for its thread to exit.
    pub fn shutdown(&mut self) {
        if let Some(mut w) = self.worker.take() {
            w.join();
        }
    }
}
