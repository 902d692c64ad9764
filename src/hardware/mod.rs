// src/hardware/mod.rs

//! Instrument trait contracts.
//!
//! Tasks drive hardware exclusively through these traits. Real drivers live
//! behind them in downstream crates; this crate ships simulated
//! implementations in [`sim`] used by the binary and the tests.
//!
//! Trait methods return `anyhow::Result` for transport-level failures;
//! precondition problems (stage not connected, spectrometer still busy) are
//! surfaced through the query methods and handled by the task layer.

pub mod sim;

use std::fmt::Debug;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::config::ExposureParams;
use crate::state::SharedState;

/// Spectrometer: acquisitions plus the spectrograph grating axis.
pub trait Spectrometer: Send + Debug {
    fn start_acquisition(&mut self, exposure: &ExposureParams, calibration: bool) -> Result<()>;
    fn stop_acquisition(&mut self) -> Result<()>;
    fn is_acquiring(&self) -> Result<bool>;
    fn accumulation_count(&self) -> Result<u32>;
    fn frame_count(&self) -> Result<u32>;
    fn move_grating(&mut self, target: i32) -> Result<()>;
    fn is_grating_moving(&self) -> Result<bool>;
}

/// Motorized sample stage.
pub trait Stage: Send + Debug {
    fn connect(&mut self) -> Result<()>;
    fn is_connected(&self) -> bool;
    fn power(&mut self, on: bool) -> Result<()>;
    fn move_to(&mut self, target: i32) -> Result<()>;
    fn is_moving(&self) -> Result<bool>;
    fn stop(&mut self) -> Result<()>;
    fn position(&self) -> Result<i32>;
}

/// Temperature bath controlling the sample environment.
pub trait TemperatureBath: Send + Debug {
    fn set_target(&mut self, celsius: f64) -> Result<()>;
    fn read_setpoint(&self) -> Result<f64>;
    fn read_temperature(&self) -> Result<f64>;
}

/// Bank of relays (calibration lamp etc.).
pub trait RelayBank: Send + Debug {
    fn switch_on(&mut self, relay: u8) -> Result<()>;
    fn switch_off(&mut self, relay: u8) -> Result<()>;
}

/// One finished measurement, as appended to the measurement log.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub file_name: String,
    pub exposure: ExposureParams,
    pub bath: Option<f64>,
    pub finished_at: Duration,
}

/// Sink for measurement bookkeeping.
pub trait MeasurementLog: Send + Debug {
    fn record_exposure(&mut self, index: i32, exposure: &ExposureParams) -> Result<()>;
    fn append_measurement(&mut self, record: &MeasurementRecord) -> Result<()>;
}

/// Sink for operator-facing critical messages.
pub trait AlertSink: Send + Debug {
    fn critical(&mut self, title: &str, message: &str);
}

/// Monotonic time source, abstracted so wait deadlines are testable.
pub trait Clock: Send + Debug {
    /// Time elapsed since the clock's epoch.
    fn now(&self) -> Duration;
}

/// Wall clock backed by `Instant`.
#[derive(Debug)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Alert sink that logs via `tracing`; the default for the headless binary.
#[derive(Debug, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn critical(&mut self, title: &str, message: &str) {
        tracing::error!(title = %title, "{message}");
    }
}

/// Everything a task needs to act on the world.
///
/// Owned by the engine; tasks receive `&mut Rig` during start/poll/stop.
#[derive(Debug)]
pub struct Rig {
    pub spectrometer: Box<dyn Spectrometer>,
    pub stage: Box<dyn Stage>,
    pub bath: Box<dyn TemperatureBath>,
    pub relays: Box<dyn RelayBank>,
    pub log: Box<dyn MeasurementLog>,
    pub alerts: Box<dyn AlertSink>,
    pub clock: Box<dyn Clock>,
    pub state: SharedState,
}
