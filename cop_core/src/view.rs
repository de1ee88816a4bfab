//! Presentation-side state folded from drained [`Updates`].
use crate::data_log::DataLog;
use crate::facade::Updates;
use crate::frame::{Frame, WeightReading};
use crate::history::{HistoryWindow, Point};
use chrono::Local;
use cop_config::TrailSource;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct ViewCfg {
    /// `0` keeps every point.
    pub history_capacity: usize,
    pub trail: TrailSource,
    pub max_log_lines: usize,
}

impl Default for ViewCfg {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            trail: TrailSource::Cop,
            max_log_lines: 500,
        }
    }
}

pub struct LiveView {
    cfg: ViewCfg,
    history: HistoryWindow,
    weights: Option<WeightReading>,
    cop: Option<Point>,
    log: VecDeque<String>,
    data_log: Option<DataLog>,
}

impl LiveView {
    pub fn new(cfg: ViewCfg) -> Self {
        Self {
            history: HistoryWindow::with_capacity(cfg.history_capacity),
            log: VecDeque::new(),
            weights: None,
            cop: None,
            data_log: None,
            cfg,
        }
    }

    /// Record every subsequent weight frame.
    pub fn attach_data_log(&mut self, log: DataLog) {
        self.data_log = Some(log);
    }

    pub fn apply(&mut self, updates: Updates) {
        for entry in updates.logs {
            self.push_log(entry.to_string());
        }
        for frame in updates.frames {
            self.apply_frame(frame);
        }
    }

    fn apply_frame(&mut self, frame: Frame) {
        match frame {
            Frame::Weights(reading) => {
                self.weights = Some(reading);
                if self.cfg.trail == TrailSource::Weights {
                    let p = reading.center_of_pressure();
                    self.cop = Some(p);
                    self.history.push(p);
                }
                self.record(&reading);
            }
            Frame::Cop { x, y } => {
                if self.cfg.trail == TrailSource::Cop {
                    self.cop = Some((x, y));
                    self.history.push((x, y));
                }
            }
            Frame::Unrecognized { raw } => self.push_log(format!("Received: {raw}")),
        }
    }

    fn record(&mut self, reading: &WeightReading) {
        let Some(log) = self.data_log.as_mut() else {
            return;
        };
        if let Err(e) = log.record(Local::now(), reading) {
            tracing::error!(error = %e, "data log write failed, recording stopped");
            self.data_log = None;
            self.push_log(format!("Error: data log write failed: {e}"));
        }
    }

    fn push_log(&mut self, line: String) {
        while self.log.len() >= self.cfg.max_log_lines.max(1) {
            self.log.pop_front();
        }
        self.log.push_back(line);
    }

    pub fn latest_weights(&self) -> Option<WeightReading> {
        self.weights
    }

    pub fn latest_cop(&self) -> Option<Point> {
        self.cop
    }

    pub fn history(&self) -> &HistoryWindow {
        &self.history
    }

    pub fn log_lines(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(String::as_str)
    }

    pub fn is_recording(&self) -> bool {
        self.data_log.is_some()
    }
}
