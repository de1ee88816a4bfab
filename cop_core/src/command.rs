//! Outbound command vocabulary.

use crate::error::ConsoleError;
use std::fmt;
use std::str::FromStr;

/// Single-byte commands understood by the plate firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    StreamWeights,
    StreamCop,
    Stop,
    Tare,
    CalibrateTrigger,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::StreamWeights,
        Command::StreamCop,
        Command::Stop,
        Command::Tare,
        Command::CalibrateTrigger,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Command::StreamWeights => "stream_weights",
            Command::StreamCop => "stream_cop",
            Command::Stop => "stop",
            Command::Tare => "tare",
            Command::CalibrateTrigger => "calibrate_trigger",
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Command::StreamWeights => b'r',
            Command::StreamCop => b'c',
            Command::Stop => b's',
            Command::Tare => b'z',
            Command::CalibrateTrigger => b'k',
        }
    }

    /// Wire form; no terminator.
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Command::StreamWeights => b"r",
            Command::StreamCop => b"c",
            Command::Stop => b"s",
            Command::Tare => b"z",
            Command::CalibrateTrigger => b"k",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.name() == s.trim())
            .ok_or_else(|| ConsoleError::UnknownCommand(s.to_string()))
    }
}

/// Validate operator-entered calibration weight text.
pub fn parse_calibration_weight(text: &str) -> Result<f64, ConsoleError> {
    match text.trim().parse::<f64>() {
        Ok(w) if w.is_finite() => Ok(w),
        _ => Err(ConsoleError::InvalidCommandInput(text.to_string())),
    }
}

/// Reply sent when the firmware asks for the known weight.
pub fn calibration_reply(weight: f64) -> String {
    format!("{weight}\n")
}
