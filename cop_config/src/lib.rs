#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the force-plate console.
//!
//! Every section is optional; a missing file or an empty document yields the
//! defaults used on the bench (9600 baud, 1 s read timeout, 100-point trail).
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SerialCfg {
    /// Port opened when the CLI is not given `--port`.
    pub port: Option<String>,
    pub baud_rate: u32,
    /// Upper bound on a single blocking read; also bounds how long a stop
    /// request can go unnoticed by the ingestion thread.
    pub read_timeout_ms: u64,
}

impl Default for SerialCfg {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 9600,
            read_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CalibrationCfg {
    /// Substring of the firmware line that asks for the known weight.
    pub prompt: String,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            prompt: "Enter the weight in lbs:".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryCfg {
    /// Trail length in points; 0 keeps every point.
    pub capacity: usize,
}

impl Default for HistoryCfg {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrailSource {
    /// Plot the CoP pairs the firmware computes.
    #[default]
    Cop,
    /// Plot CoP derived on the host from raw weight frames.
    Weights,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TrailCfg {
    pub source: TrailSource,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UiCfg {
    /// Cadence of `drain_updates` polling.
    pub poll_ms: u64,
    /// Log lines kept for display.
    pub max_log_lines: usize,
}

impl Default for UiCfg {
    fn default() -> Self {
        Self {
            poll_ms: 100,
            max_log_lines: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataLogCfg {
    pub enabled: bool,
    /// Directory receiving `<YYYY-MM-DD_HH-MM-SS>.txt` files.
    pub dir: String,
}

impl Default for DataLogCfg {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: ".".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub serial: SerialCfg,
    pub calibration: CalibrationCfg,
    pub history: HistoryCfg,
    pub trail: TrailCfg,
    pub ui: UiCfg,
    pub data_log: DataLogCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and validate a config file; a missing file yields the defaults.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Serial
        if self.serial.baud_rate == 0 {
            eyre::bail!("serial.baud_rate must be > 0");
        }
        if self.serial.read_timeout_ms == 0 {
            eyre::bail!("serial.read_timeout_ms must be >= 1");
        }
        if self.serial.read_timeout_ms > 10_000 {
            eyre::bail!("serial.read_timeout_ms is unreasonably large (>10s)");
        }
        if let Some(port) = &self.serial.port
            && port.trim().is_empty()
        {
            eyre::bail!("serial.port must not be empty when set");
        }

        // Calibration
        if self.calibration.prompt.trim().is_empty() {
            eyre::bail!("calibration.prompt must not be empty");
        }

        // UI
        if self.ui.poll_ms == 0 {
            eyre::bail!("ui.poll_ms must be >= 1");
        }
        if self.ui.max_log_lines == 0 {
            eyre::bail!("ui.max_log_lines must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot}");
        }

        Ok(())
    }
}
