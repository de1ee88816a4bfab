#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Force-plate console core (transport-agnostic).
//!
//! All device I/O goes through the `cop_traits::Connector` seam, so the same
//! engine drives a real serial port, the simulated plate, or a test double.
//!
//! ## Architecture
//!
//! - **Frames**: line classification into weights, CoP or unrecognized (`frame`)
//! - **Commands**: single-byte vocabulary and weight validation (`command`)
//! - **Calibration**: armed prompt/reply handshake (`calibration`)
//! - **Worker**: background read loop feeding two channels (`worker`)
//! - **Facade**: connect, disconnect, send, calibrate, drain (`facade`)
//! - **View**: latest values, bounded CoP trail, capped log (`view`, `history`)
//! - **Data log**: optional text recording of weight frames (`data_log`)
//!
//! ## Threading
//!
//! One reader thread per connection. The presentation thread never blocks on
//! the device: it polls [`ControlFacade::drain_updates`] and folds the result
//! into a [`LiveView`].

pub mod calibration;
pub mod command;
pub mod conversions;
pub mod data_log;
pub mod error;
pub mod facade;
pub mod frame;
pub mod history;
pub mod mocks;
pub mod transport_error;
pub mod types;
pub mod view;
pub mod worker;

pub use calibration::{CalibrationSession, CalibrationState};
pub use command::{Command, calibration_reply, parse_calibration_weight};
pub use data_log::DataLog;
pub use error::{ConsoleError, Report, Result};
pub use facade::{ControlFacade, UpdateChannels, Updates};
pub use frame::{Frame, WeightReading, parse};
pub use history::{HistoryWindow, Point};
pub use types::{ConnectionState, LogEntry, WorkerState};
pub use view::{LiveView, ViewCfg};
pub use worker::{IngestionWorker, UpdateSenders, WorkerCfg};
