//! `From` implementations bridging `cop_config` types to `cop_core` types.

use crate::view::ViewCfg;
use crate::worker::WorkerCfg;
use std::time::Duration;

impl From<&cop_config::Config> for WorkerCfg {
    fn from(c: &cop_config::Config) -> Self {
        Self {
            read_timeout: Duration::from_millis(c.serial.read_timeout_ms),
            calibration_prompt: c.calibration.prompt.clone(),
        }
    }
}

impl From<&cop_config::Config> for ViewCfg {
    fn from(c: &cop_config::Config) -> Self {
        Self {
            history_capacity: c.history.capacity,
            trail: c.trail.source,
            max_log_lines: c.ui.max_log_lines,
        }
    }
}
