#![allow(dead_code)]

use specflow::config::{ExperimentConfig, RawExperimentFile};

/// Builder for `ExperimentConfig` to simplify test setup.
///
/// Wraps a `RawExperimentFile` so tests go through the same validation path
/// as TOML-loaded configs.
pub struct ExperimentBuilder {
    raw: RawExperimentFile,
}

impl ExperimentBuilder {
    pub fn new() -> Self {
        let mut raw = RawExperimentFile::default();
        raw.exposure.grating = vec![0];
        Self { raw }
    }

    pub fn grating(mut self, positions: &[i32]) -> Self {
        self.raw.exposure.grating = positions.to_vec();
        self
    }

    pub fn exposure_s(mut self, values: &[f64]) -> Self {
        self.raw.exposure.exposure_s = values.to_vec();
        self
    }

    pub fn accumulations(mut self, values: &[u32]) -> Self {
        self.raw.exposure.accumulations = values.to_vec();
        self
    }

    pub fn frames(mut self, values: &[u32]) -> Self {
        self.raw.exposure.frames = values.to_vec();
        self
    }

    pub fn file_name_base(mut self, base: &str) -> Self {
        self.raw.exposure.file_name_base = base.to_string();
        self
    }

    pub fn numbering(mut self, first: u32, step: u32, digits: u8) -> Self {
        self.raw.exposure.first_number = first;
        self.raw.exposure.number_step = step;
        self.raw.exposure.digits = digits;
        self
    }

    pub fn auto_calibration(mut self, flags: &[bool]) -> Self {
        self.raw.calibration.auto = flags.to_vec();
        self
    }

    pub fn cal_exposure_s(mut self, values: &[f64]) -> Self {
        self.raw.calibration.exposure_s = values.to_vec();
        self
    }

    pub fn lamp(mut self, relay: u8, settle_ms: u64) -> Self {
        self.raw.calibration.lamp_switch = true;
        self.raw.calibration.lamp_relay = relay;
        self.raw.calibration.lamp_settle_ms = settle_ms;
        self
    }

    pub fn batch(mut self, num_spectra: u32, delay_s: f64) -> Self {
        self.raw.batch.enabled = true;
        self.raw.batch.num_spectra = num_spectra;
        self.raw.batch.delay_s = delay_s;
        self
    }

    pub fn sweep(mut self, start: f64, step: f64, end: f64) -> Self {
        self.raw.sweep.enabled = true;
        self.raw.sweep.start = start;
        self.raw.sweep.step = step;
        self.raw.sweep.end = end;
        self
    }

    pub fn sweep_delays(mut self, initial_s: f64, per_step_s: f64) -> Self {
        self.raw.sweep.initial_delay_s = initial_s;
        self.raw.sweep.delay_s = per_step_s;
        self
    }

    pub fn loop_back(mut self, loop_delay_s: f64) -> Self {
        self.raw.sweep.loop_back = true;
        self.raw.sweep.loop_delay_s = loop_delay_s;
        self
    }

    pub fn after_sweep(mut self, celsius: f64) -> Self {
        self.raw.sweep.after_sweep = Some(celsius);
        self
    }

    pub fn extended_range(mut self, val: bool) -> Self {
        self.raw.range.enabled = val;
        self
    }

    pub fn auto_file_names(mut self, val: bool) -> Self {
        self.raw.range.auto_file_names = val;
        self
    }

    pub fn stage_positions(mut self, measurement: i32, calibration: i32) -> Self {
        self.raw.stage.measurement_pos = measurement;
        self.raw.stage.calibration_pos = calibration;
        self
    }

    pub fn motor_poll_ms(mut self, ms: u64) -> Self {
        self.raw.stage.motor_poll_delay_ms = ms;
        self
    }

    pub fn grating_settle_ms(mut self, ms: u64) -> Self {
        self.raw.stage.grating_settle_ms = ms;
        self
    }

    pub fn build_raw(self) -> RawExperimentFile {
        self.raw
    }

    pub fn build(self) -> ExperimentConfig {
        ExperimentConfig::try_from(self.raw).expect("Failed to build valid config from builder")
    }
}

impl Default for ExperimentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
