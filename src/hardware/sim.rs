// src/hardware/sim.rs

//! Simulated instruments.
//!
//! Every command issued to the simulated rig is appended to a shared
//! [`Journal`], which tests (and the demo binary at debug level) inspect to
//! assert command ordering. Devices answer "still busy" for a configurable
//! number of status polls, so wait tasks get exercised realistically.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, bail};

use crate::config::ExposureParams;
use crate::hardware::{
    AlertSink, Clock, MeasurementLog, MeasurementRecord, RelayBank, Rig, Spectrometer, Stage,
    TemperatureBath,
};
use crate::state::SharedState;

/// One command observed by the simulated rig.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCommand {
    AcquisitionStarted { calibration: bool },
    AcquisitionStopped,
    GratingMove { target: i32 },
    StageConnect,
    StagePower { on: bool },
    StageMove { target: i32 },
    StageStop,
    BathTarget { celsius: f64 },
    RelayOn { relay: u8 },
    RelayOff { relay: u8 },
}

/// Shared, cloneable command journal.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<SimCommand>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, cmd: SimCommand) {
        self.entries.lock().unwrap().push(cmd);
    }

    pub fn entries(&self) -> Vec<SimCommand> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&SimCommand) -> bool) -> usize {
        self.entries.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// Busy-poll behaviour of the simulated devices.
#[derive(Debug, Clone, Copy)]
pub struct SimOptions {
    /// Status polls an acquisition stays "running" for.
    pub acquisition_polls: u32,
    /// Status polls the stage motor stays "moving" for after a move command.
    pub motor_polls: u32,
    /// Status polls the grating stays "moving" for after a move command.
    pub grating_polls: u32,
    /// Whether the stage reports as connected.
    pub stage_connected: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            acquisition_polls: 1,
            motor_polls: 2,
            grating_polls: 1,
            stage_connected: true,
        }
    }
}

#[derive(Debug, Default)]
struct SpectrometerInner {
    acquiring_polls_left: u32,
    grating_polls_left: u32,
    accumulation: u32,
    frame: u32,
    /// Set by tests to simulate an acquisition still owned by someone else.
    externally_busy: bool,
}

#[derive(Debug, Clone)]
pub struct SimSpectrometer {
    journal: Journal,
    options: SimOptions,
    inner: Arc<Mutex<SpectrometerInner>>,
}

impl SimSpectrometer {
    pub fn new(journal: Journal, options: SimOptions) -> Self {
        Self {
            journal,
            options,
            inner: Arc::new(Mutex::new(SpectrometerInner::default())),
        }
    }

    /// Make the next `start_acquisition` attempts see a busy device until
    /// `release_busy` is called.
    pub fn hold_busy(&self) {
        self.inner.lock().unwrap().externally_busy = true;
    }

    pub fn release_busy(&self) {
        self.inner.lock().unwrap().externally_busy = false;
    }
}

impl Spectrometer for SimSpectrometer {
    fn start_acquisition(&mut self, exposure: &ExposureParams, calibration: bool) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.acquiring_polls_left = self.options.acquisition_polls;
        inner.accumulation = exposure.accumulations;
        inner.frame = exposure.frames;
        self.journal.push(SimCommand::AcquisitionStarted { calibration });
        Ok(())
    }

    fn stop_acquisition(&mut self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.acquiring_polls_left = 0;
        self.journal.push(SimCommand::AcquisitionStopped);
        Ok(())
    }

    fn is_acquiring(&self) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        if inner.externally_busy {
            return Ok(true);
        }
        if inner.acquiring_polls_left > 0 {
            inner.acquiring_polls_left -= 1;
            return Ok(true);
        }
        Ok(false)
    }

    fn accumulation_count(&self) -> Result<u32> {
        Ok(self.inner.lock().unwrap().accumulation)
    }

    fn frame_count(&self) -> Result<u32> {
        Ok(self.inner.lock().unwrap().frame)
    }

    fn move_grating(&mut self, target: i32) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.grating_polls_left = self.options.grating_polls;
        self.journal.push(SimCommand::GratingMove { target });
        Ok(())
    }

    fn is_grating_moving(&self) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        if inner.grating_polls_left > 0 {
            inner.grating_polls_left -= 1;
            return Ok(true);
        }
        Ok(false)
    }
}

#[derive(Debug, Default)]
struct StageInner {
    connected: bool,
    powered: bool,
    moving_polls_left: u32,
    position: i32,
    target: i32,
}

#[derive(Debug, Clone)]
pub struct SimStage {
    journal: Journal,
    options: SimOptions,
    inner: Arc<Mutex<StageInner>>,
}

impl SimStage {
    pub fn new(journal: Journal, options: SimOptions) -> Self {
        Self {
            journal,
            options,
            inner: Arc::new(Mutex::new(StageInner {
                connected: options.stage_connected,
                ..StageInner::default()
            })),
        }
    }

    /// Drop the connection so the next move has to re-connect.
    pub fn disconnect(&self) {
        self.inner.lock().unwrap().connected = false;
    }
}

impl Stage for SimStage {
    fn connect(&mut self) -> Result<()> {
        if !self.options.stage_connected {
            bail!("stage controller did not respond; stage is not connected");
        }
        self.inner.lock().unwrap().connected = true;
        self.journal.push(SimCommand::StageConnect);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.lock().unwrap().connected
    }

    fn power(&mut self, on: bool) -> Result<()> {
        self.inner.lock().unwrap().powered = on;
        self.journal.push(SimCommand::StagePower { on });
        Ok(())
    }

    fn move_to(&mut self, target: i32) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.powered {
            bail!("stage motor is not powered");
        }
        inner.target = target;
        inner.moving_polls_left = self.options.motor_polls;
        self.journal.push(SimCommand::StageMove { target });
        Ok(())
    }

    fn is_moving(&self) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        if inner.moving_polls_left > 0 {
            inner.moving_polls_left -= 1;
            if inner.moving_polls_left == 0 {
                inner.position = inner.target;
            }
            return Ok(true);
        }
        inner.position = inner.target;
        Ok(false)
    }

    fn stop(&mut self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.moving_polls_left = 0;
        self.journal.push(SimCommand::StageStop);
        Ok(())
    }

    fn position(&self) -> Result<i32> {
        Ok(self.inner.lock().unwrap().position)
    }
}

#[derive(Debug, Clone)]
pub struct SimBath {
    journal: Journal,
    target: Arc<Mutex<f64>>,
}

impl SimBath {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            target: Arc::new(Mutex::new(20.0)),
        }
    }
}

impl TemperatureBath for SimBath {
    fn set_target(&mut self, celsius: f64) -> Result<()> {
        *self.target.lock().unwrap() = celsius;
        self.journal.push(SimCommand::BathTarget { celsius });
        Ok(())
    }

    fn read_setpoint(&self) -> Result<f64> {
        Ok(*self.target.lock().unwrap())
    }

    fn read_temperature(&self) -> Result<f64> {
        Ok(*self.target.lock().unwrap())
    }
}

#[derive(Debug, Clone)]
pub struct SimRelays {
    journal: Journal,
}

impl SimRelays {
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

impl RelayBank for SimRelays {
    fn switch_on(&mut self, relay: u8) -> Result<()> {
        self.journal.push(SimCommand::RelayOn { relay });
        Ok(())
    }

    fn switch_off(&mut self, relay: u8) -> Result<()> {
        self.journal.push(SimCommand::RelayOff { relay });
        Ok(())
    }
}

/// In-memory measurement log, one formatted line per entry.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl MeasurementLog for MemoryLog {
    fn record_exposure(&mut self, index: i32, exposure: &ExposureParams) -> Result<()> {
        self.lines.lock().unwrap().push(format!(
            "exposure index={} expo={}s acc={} frm={}",
            index, exposure.exposure_s, exposure.accumulations, exposure.frames
        ));
        Ok(())
    }

    fn append_measurement(&mut self, record: &MeasurementRecord) -> Result<()> {
        self.lines.lock().unwrap().push(format!(
            "measurement file={} bath={} t={:.3}s",
            record.file_name,
            record
                .bath
                .map_or_else(|| "-".to_string(), |t| format!("{t:.2}")),
            record.finished_at.as_secs_f64()
        ));
        Ok(())
    }
}

/// Alert sink that records messages for later inspection.
#[derive(Debug, Clone, Default)]
pub struct AlertLog {
    entries: Arc<Mutex<Vec<(String, String)>>>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries.lock().unwrap().clone()
    }
}

impl AlertSink for AlertLog {
    fn critical(&mut self, title: &str, message: &str) {
        tracing::error!(title = %title, "{message}");
        self.entries
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

/// Manually-advanced clock for deterministic wait tests.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: Arc<Mutex<Duration>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for SimClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap()
    }
}

/// Cloneable handles into a simulated rig.
#[derive(Debug, Clone)]
pub struct SimHandles {
    pub journal: Journal,
    pub clock: SimClock,
    pub alerts: AlertLog,
    pub log: MemoryLog,
    pub spectrometer: SimSpectrometer,
    pub stage: SimStage,
}

/// Build a fully simulated [`Rig`] driven by a [`SimClock`].
pub fn sim_rig(options: SimOptions) -> (Rig, SimHandles) {
    let journal = Journal::new();
    let clock = SimClock::new();
    let alerts = AlertLog::new();
    let log = MemoryLog::new();
    let spectrometer = SimSpectrometer::new(journal.clone(), options);
    let stage = SimStage::new(journal.clone(), options);

    let rig = Rig {
        spectrometer: Box::new(spectrometer.clone()),
        stage: Box::new(stage.clone()),
        bath: Box::new(SimBath::new(journal.clone())),
        relays: Box::new(SimRelays::new(journal.clone())),
        log: Box::new(log.clone()),
        alerts: Box::new(alerts.clone()),
        clock: Box::new(clock.clone()),
        state: SharedState::new(),
    };

    let handles = SimHandles {
        journal,
        clock,
        alerts,
        log,
        spectrometer,
        stage,
    };

    (rig, handles)
}

/// Build a simulated rig on the wall clock, as used by the binary.
pub fn sim_rig_wall_clock(options: SimOptions) -> (Rig, SimHandles) {
    let (mut rig, handles) = sim_rig(options);
    rig.clock = Box::new(crate::hardware::SystemClock::new());
    (rig, handles)
}
