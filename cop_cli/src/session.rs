//! Subcommand bodies: connect, stream, send and calibrate over a `ControlFacade`.

use crate::cli::StreamKind;
use chrono::Local;
use cop_core::{
    Command, ConnectionState, ConsoleError, ControlFacade, DataLog, Frame, LiveView, LogEntry,
    Updates, ViewCfg,
};
use cop_traits::Connector;
use eyre::Result;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Extra time to collect the firmware's acknowledgement after a reply.
const ACK_GRACE: Duration = Duration::from_millis(500);

/// Prints drained updates as text or JSON lines.
pub struct Printer {
    json: bool,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn log(&self, entry: &LogEntry) {
        if self.json {
            println!(
                "{}",
                json!({
                    "type": "log",
                    "ts": entry.timestamp.to_rfc3339(),
                    "message": entry.message,
                })
            );
        } else {
            println!("{entry}");
        }
    }

    pub fn frame(&self, frame: &Frame) {
        match (self.json, frame) {
            (true, Frame::Weights(w)) => {
                let (x, y) = w.center_of_pressure();
                println!(
                    "{}",
                    json!({"type": "weights", "a": w.a, "b": w.b, "c": w.c, "d": w.d, "x": x, "y": y})
                );
            }
            (true, Frame::Cop { x, y }) => println!("{}", json!({"type": "cop", "x": x, "y": y})),
            (true, Frame::Unrecognized { raw }) => {
                println!("{}", json!({"type": "received", "line": raw}));
            }
            (false, Frame::Weights(w)) => {
                let (x, y) = w.center_of_pressure();
                println!(
                    "A={:.2} B={:.2} C={:.2} D={:.2} | CoP x={x:.3} y={y:.3}",
                    w.a, w.b, w.c, w.d
                );
            }
            (false, Frame::Cop { x, y }) => println!("CoP x={x:.3} y={y:.3}"),
            (false, Frame::Unrecognized { raw }) => println!("Received: {raw}"),
        }
    }

    pub fn updates(&self, u: &Updates) {
        for entry in &u.logs {
            self.log(entry);
        }
        for frame in &u.frames {
            self.frame(frame);
        }
    }
}

/// Drain everything currently queued, print it, and return it.
fn pump<C: Connector + Send + Sync + 'static>(
    facade: &ControlFacade<C>,
    printer: &Printer,
) -> Updates {
    let u = facade.drain_updates();
    printer.updates(&u);
    u
}

/// Connect and wait for the worker to report `Connected` or `Faulted`.
pub fn connect_blocking<C: Connector + Send + Sync + 'static>(
    facade: &mut ControlFacade<C>,
    port: &str,
    poll: Duration,
    printer: &Printer,
) -> Result<()> {
    facade.connect(port);
    let deadline = Instant::now() + CONNECT_TIMEOUT;
    let mut failure = None;
    loop {
        let u = pump(facade, printer);
        if failure.is_none() {
            failure = u
                .logs
                .iter()
                .find(|e| e.message.starts_with("Error:"))
                .map(|e| e.message.clone());
        }
        match facade.state() {
            ConnectionState::Connected => return Ok(()),
            ConnectionState::Faulted => {
                // The failure line may land just after the state flips.
                let u = pump(facade, printer);
                let reason = failure
                    .or_else(|| u.logs.first().map(|e| e.message.clone()))
                    .unwrap_or_else(|| "open failed".to_string());
                return Err(ConsoleError::TransportOpen {
                    port: port.to_string(),
                    reason,
                }
                .into());
            }
            ConnectionState::Disconnected if facade.port().is_none() => {
                return Err(ConsoleError::Config("no port selected".to_string()).into());
            }
            _ => {}
        }
        if Instant::now() >= deadline {
            facade.shutdown();
            return Err(ConsoleError::TransportOpen {
                port: port.to_string(),
                reason: format!("no connection after {}s", CONNECT_TIMEOUT.as_secs()),
            }
            .into());
        }
        std::thread::sleep(poll);
    }
}

/// Stop the worker and flush the remaining log lines.
fn close<C: Connector + Send + Sync + 'static>(facade: &mut ControlFacade<C>, printer: &Printer) {
    facade.shutdown();
    pump(facade, printer);
}

pub fn run_ports<C: Connector + Send + Sync + 'static>(
    facade: &ControlFacade<C>,
    printer: &Printer,
) -> Result<()> {
    let ports = facade.list_available_ports();
    pump(facade, printer);
    if printer.json {
        println!("{}", json!({ "type": "ports", "ports": ports }));
    } else if ports.is_empty() {
        println!("No serial ports found.");
    } else {
        for p in &ports {
            println!("{p}");
        }
    }
    Ok(())
}

pub struct MonitorParams<'a> {
    pub port: &'a str,
    pub stream: StreamKind,
    pub duration: Option<Duration>,
    pub poll: Duration,
    pub view: ViewCfg,
    /// Directory and baud rate for the data log, when recording.
    pub data_log: Option<(&'a Path, u32)>,
    pub shutdown: Arc<AtomicBool>,
}

pub fn run_monitor<C: Connector + Send + Sync + 'static>(
    facade: &mut ControlFacade<C>,
    params: MonitorParams<'_>,
    printer: &Printer,
) -> Result<()> {
    let mut view = LiveView::new(params.view);
    if let Some((dir, baud)) = params.data_log {
        let (log, path) = DataLog::create_in(dir, params.port, baud, Local::now())
            .map_err(|e| ConsoleError::Io(format!("{}: {e}", dir.display())))?;
        view.attach_data_log(log);
        if !printer.json {
            println!("Recording weight frames to {}", path.display());
        }
    }

    connect_blocking(facade, params.port, params.poll, printer)?;
    let start_cmd = match params.stream {
        StreamKind::Weights => Command::StreamWeights,
        StreamKind::Cop => Command::StreamCop,
    };
    facade.send(start_cmd)?;
    tracing::info!(port = params.port, stream = ?params.stream, "monitor start");

    let started = Instant::now();
    let mut frames = 0usize;
    let mut lost = None;
    loop {
        let u = pump(facade, printer);
        frames += u.frames.len();
        view.apply(u);
        if params.shutdown.load(Ordering::Relaxed) {
            tracing::info!("interrupted");
            break;
        }
        if params.duration.is_some_and(|d| started.elapsed() >= d) {
            break;
        }
        if facade.state() != ConnectionState::Connected {
            lost = Some(ConsoleError::TransportIo("device disconnected".to_string()));
            break;
        }
        std::thread::sleep(params.poll);
    }

    if lost.is_none() {
        // Leave the plate idle; the port may already be gone.
        let _ = facade.send(Command::Stop);
    }
    close(facade, printer);
    tracing::info!(frames, "monitor done");
    if params.data_log.is_some() && !view.is_recording() {
        tracing::warn!("data log stopped early after a write error");
    }

    if printer.json {
        println!(
            "{}",
            json!({
                "type": "summary",
                "frames": frames,
                "trail_points": view.history().len(),
                "last_cop": view.latest_cop().map(|(x, y)| [x, y]),
            })
        );
    } else {
        let cop = view
            .latest_cop()
            .map_or_else(|| "none".to_string(), |(x, y)| format!("x={x:.3} y={y:.3}"));
        println!("Frames: {frames}, trail points: {}, last CoP: {cop}", view.history().len());
    }
    match lost {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

pub fn run_send<C: Connector + Send + Sync + 'static>(
    facade: &mut ControlFacade<C>,
    port: &str,
    name: &str,
    poll: Duration,
    printer: &Printer,
) -> Result<()> {
    let cmd: Command = name.parse()?;
    connect_blocking(facade, port, poll, printer)?;
    let res = facade.send(cmd);
    // Give the device a moment to answer before closing.
    std::thread::sleep(poll);
    close(facade, printer);
    Ok(res?)
}

pub fn run_calibrate<C: Connector + Send + Sync + 'static>(
    facade: &mut ControlFacade<C>,
    port: &str,
    weight_text: &str,
    timeout: Duration,
    poll: Duration,
    printer: &Printer,
) -> Result<()> {
    cop_core::parse_calibration_weight(weight_text)?;
    connect_blocking(facade, port, poll, printer)?;
    if let Err(e) = facade.start_calibration(weight_text) {
        close(facade, printer);
        return Err(e.into());
    }

    let deadline = Instant::now() + timeout;
    let mut replied_at = None;
    loop {
        let u = pump(facade, printer);
        if replied_at.is_none()
            && u
                .logs
                .iter()
                .any(|e| e.message.starts_with("Sent calibration weight:"))
        {
            replied_at = Some(Instant::now());
        }
        if replied_at.is_some_and(|t| t.elapsed() >= ACK_GRACE) {
            break;
        }
        if facade.state() != ConnectionState::Connected {
            close(facade, printer);
            return Err(ConsoleError::TransportIo("device disconnected".to_string()).into());
        }
        if replied_at.is_none() && Instant::now() >= deadline {
            close(facade, printer);
            eyre::bail!(
                "calibration prompt not received within {}s",
                timeout.as_secs()
            );
        }
        std::thread::sleep(poll);
    }
    close(facade, printer);
    Ok(())
}

/// Round trip through a connector: open, stream, expect one frame, stop.
pub fn run_self_check<C: Connector + Send + Sync + 'static>(
    facade: &mut ControlFacade<C>,
    port: &str,
    poll: Duration,
) -> Result<()> {
    facade.connect(port);
    let deadline = Instant::now() + CONNECT_TIMEOUT;
    while facade.state() != ConnectionState::Connected {
        if facade.state() == ConnectionState::Faulted || Instant::now() >= deadline {
            facade.shutdown();
            eyre::bail!("self-check: could not open {port}");
        }
        std::thread::sleep(poll);
    }
    facade.send(Command::StreamWeights)?;

    let deadline = Instant::now() + Duration::from_secs(2);
    let mut got = false;
    while !got && Instant::now() < deadline {
        std::thread::sleep(poll);
        got = facade
            .drain_updates()
            .frames
            .iter()
            .any(|f| matches!(f, Frame::Weights(_)));
    }
    let _ = facade.send(Command::Stop);
    facade.shutdown();
    if !got {
        eyre::bail!("self-check: no weight frame from {port}");
    }
    Ok(())
}
