//! Calibration handshake with the plate firmware.
//!
//! The operator places a known weight and arms the session. Arming writes the
//! trigger byte; the firmware then prints a prompt asking for the weight, and
//! the first line containing that prompt is answered with `"<weight>\n"`.

use crate::command::{Command, calibration_reply};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationState {
    Idle,
    Armed { weight: f64 },
}

/// Prompt watcher. Pure state; the caller performs the writes it returns.
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    prompt: String,
    state: CalibrationState,
}

impl CalibrationSession {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            state: CalibrationState::Idle,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, CalibrationState::Armed { .. })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Arm with `weight` and return the bytes to send now.
    ///
    /// Re-arming while already armed replaces the pending weight.
    pub fn arm(&mut self, weight: f64) -> &'static [u8] {
        if let CalibrationState::Armed { weight: previous } = self.state {
            tracing::debug!(previous, weight, "calibration re-armed, replacing weight");
        }
        self.state = CalibrationState::Armed { weight };
        Command::CalibrateTrigger.as_bytes()
    }

    /// Feed one incoming line. Returns the reply to write and the weight it
    /// carries when the line completes an armed handshake.
    pub fn on_line(&mut self, line: &str) -> Option<(String, f64)> {
        match self.state {
            CalibrationState::Armed { weight } if line.contains(&self.prompt) => {
                self.state = CalibrationState::Idle;
                Some((calibration_reply(weight), weight))
            }
            _ => None,
        }
    }

    /// Drop a pending request without replying.
    pub fn disarm(&mut self) {
        self.state = CalibrationState::Idle;
    }
}
