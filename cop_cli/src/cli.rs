//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "copconsole", version, about = "Force-plate center-of-pressure console")]
pub struct Cli {
    /// Path to config TOML; a missing file means built-in defaults
    #[arg(long, value_name = "FILE", default_value = "etc/copconsole.toml")]
    pub config: PathBuf,

    /// Print frames, log lines and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Talk to the built-in simulated plate instead of a serial port
    #[arg(long, action = ArgAction::SetTrue)]
    pub sim: bool,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Which record shape the plate should stream.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum StreamKind {
    /// Four raw sensor weights per line
    Weights,
    /// Firmware-computed center of pressure
    Cop,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List serial ports the backend can open
    Ports,
    /// Connect, start a stream and print frames until Ctrl-C or --duration-s
    Monitor {
        /// Port to open (falls back to serial.port in the config)
        #[arg(long)]
        port: Option<String>,
        #[arg(long, value_enum, default_value_t = StreamKind::Weights)]
        stream: StreamKind,
        /// Stop after this many seconds
        #[arg(long, value_name = "SECS")]
        duration_s: Option<u64>,
        /// Record weight frames to a timestamped file in data_log.dir
        #[arg(long, action = ArgAction::SetTrue)]
        log_data: bool,
    },
    /// Send one named command (stream_weights|stream_cop|stop|tare|calibrate_trigger)
    Send {
        #[arg(long)]
        port: Option<String>,
        #[arg(value_name = "NAME")]
        command: String,
    },
    /// Run the calibration handshake with a known weight on the plate
    Calibrate {
        #[arg(long)]
        port: Option<String>,
        /// Known weight, as typed by the operator
        #[arg(long, value_name = "WEIGHT", allow_hyphen_values = true)]
        weight: String,
        /// Give up if the prompt has not arrived after this many seconds
        #[arg(long, value_name = "SECS", default_value_t = 10)]
        timeout_s: u64,
    },
    /// Quick health check against the simulated plate
    SelfCheck,
}
