//! Plain-text recording of weight frames.
//!
//! File layout:
//!
//! ```text
//! # Data log started at: 2024-05-01 10:11:12
//! # Serial Port: /dev/ttyUSB0, Baud Rate: 9600
//! # Format: Timestamp | [WA, WB, WC, WD] -> X: CoM_X, Y: CoM_Y
//! # -----
//! 2024-05-01 10:11:12.345 | [1.0, 2.0, 3.0, 4.0] -> X: 0.000, Y: 0.400
//! ```
use crate::frame::WeightReading;
use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub fn default_file_name(started: DateTime<Local>) -> String {
    format!("{}.txt", started.format("%Y-%m-%d_%H-%M-%S"))
}

pub struct DataLog {
    out: Box<dyn Write + Send>,
}

impl DataLog {
    /// Write the header to `out`.
    pub fn new(
        mut out: Box<dyn Write + Send>,
        port: &str,
        baud_rate: u32,
        started: DateTime<Local>,
    ) -> io::Result<Self> {
        writeln!(
            out,
            "# Data log started at: {}",
            started.format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(out, "# Serial Port: {port}, Baud Rate: {baud_rate}")?;
        writeln!(out, "# Format: Timestamp | [WA, WB, WC, WD] -> X: CoM_X, Y: CoM_Y")?;
        writeln!(out, "# -----")?;
        out.flush()?;
        Ok(Self { out })
    }

    /// Create `<dir>/<started>.txt`, creating `dir` if needed.
    pub fn create_in(
        dir: &Path,
        port: &str,
        baud_rate: u32,
        started: DateTime<Local>,
    ) -> io::Result<(Self, PathBuf)> {
        fs::create_dir_all(dir)?;
        let path = dir.join(default_file_name(started));
        let file = File::create(&path)?;
        let log = Self::new(Box::new(BufWriter::new(file)), port, baud_rate, started)?;
        tracing::info!(path = %path.display(), "data log opened");
        Ok((log, path))
    }

    /// Append one record and flush it.
    pub fn record(&mut self, at: DateTime<Local>, reading: &WeightReading) -> io::Result<()> {
        writeln!(self.out, "{}", format_record(at, reading))?;
        self.out.flush()
    }
}

fn format_record(at: DateTime<Local>, reading: &WeightReading) -> String {
    let [a, b, c, d] = reading.as_array();
    let (x, y) = reading.center_of_pressure();
    format!(
        "{} | [{}, {}, {}, {}] -> X: {x:.3}, Y: {y:.3}",
        at.format("%Y-%m-%d %H:%M:%S%.3f"),
        weight_text(a),
        weight_text(b),
        weight_text(c),
        weight_text(d),
    )
}

/// Shortest round-trip form with a signed, two-digit exponent (`1e-05`,
/// `1.5e+16`), matching existing log readers.
fn weight_text(v: f64) -> String {
    let short = format!("{v:?}");
    let Some((mantissa, exp)) = short.split_once('e') else {
        return short;
    };
    let (sign, digits) = match exp.strip_prefix('-') {
        Some(d) => ('-', d),
        None => ('+', exp),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}
