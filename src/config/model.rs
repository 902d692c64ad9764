// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

/// Top-level experiment file as read from TOML.
///
/// ```toml
/// [exposure]
/// file_name_base = "sample"
/// grating = [300, 600, 900]
/// exposure_s = [1.0]
/// accumulations = [5]
/// frames = [1]
///
/// [calibration]
/// auto = [true]
/// lamp_switch = true
/// lamp_relay = 2
///
/// [sweep]
/// enabled = true
/// start = 20.0
/// step = 5.0
/// end = 40.0
/// ```
///
/// All sections are optional and have reasonable defaults; only the grating
/// position list is mandatory. This raw form is normalised into
/// [`ExperimentConfig`] by `validate.rs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExperimentFile {
    #[serde(default)]
    pub exposure: ExposureSection,

    #[serde(default)]
    pub calibration: CalibrationSection,

    #[serde(default)]
    pub batch: BatchSection,

    #[serde(default)]
    pub sweep: SweepSection,

    #[serde(default)]
    pub range: RangeSection,

    #[serde(default)]
    pub stage: StageSection,
}

/// `[exposure]` section: per-position acquisition parameters.
///
/// The `grating` list defines the measurement positions; the other lists are
/// aligned to it (a single entry broadcasts, longer lists are truncated with
/// a warning).
#[derive(Debug, Clone, Deserialize)]
pub struct ExposureSection {
    #[serde(default = "default_file_name_base")]
    pub file_name_base: String,

    #[serde(default = "default_directory")]
    pub directory: String,

    /// First file number used for the generated spectrum names.
    #[serde(default = "default_one_u32")]
    pub first_number: u32,

    /// Increment between consecutive file numbers.
    #[serde(default = "default_one_u32")]
    pub number_step: u32,

    /// Zero-padded width of the file number.
    #[serde(default = "default_digits")]
    pub digits: u8,

    /// Grating positions, one per measurement position.
    #[serde(default)]
    pub grating: Vec<i32>,

    #[serde(default = "default_exposures")]
    pub exposure_s: Vec<f64>,

    #[serde(default = "default_counts")]
    pub accumulations: Vec<u32>,

    #[serde(default = "default_counts")]
    pub frames: Vec<u32>,
}

fn default_file_name_base() -> String {
    "spectrum".to_string()
}

fn default_directory() -> String {
    ".".to_string()
}

fn default_one_u32() -> u32 {
    1
}

fn default_digits() -> u8 {
    3
}

fn default_exposures() -> Vec<f64> {
    vec![1.0]
}

fn default_counts() -> Vec<u32> {
    vec![1]
}

impl Default for ExposureSection {
    fn default() -> Self {
        Self {
            file_name_base: default_file_name_base(),
            directory: default_directory(),
            first_number: default_one_u32(),
            number_step: default_one_u32(),
            digits: default_digits(),
            grating: Vec::new(),
            exposure_s: default_exposures(),
            accumulations: default_counts(),
            frames: default_counts(),
        }
    }
}

/// `[calibration]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CalibrationSection {
    /// Interleave a calibration acquisition with the measurement, one flag
    /// per position (aligned to `[exposure].grating`; a single entry
    /// broadcasts).
    #[serde(default = "default_auto_cal")]
    pub auto: Vec<bool>,

    #[serde(default = "default_exposures")]
    pub exposure_s: Vec<f64>,

    #[serde(default = "default_counts")]
    pub accumulations: Vec<u32>,

    #[serde(default = "default_counts")]
    pub frames: Vec<u32>,

    /// Switch the calibration lamp on/off around calibration acquisitions.
    #[serde(default)]
    pub lamp_switch: bool,

    /// Relay id driving the calibration lamp.
    #[serde(default = "default_one_u8")]
    pub lamp_relay: u8,

    /// Warm-up delay after switching the lamp on, in milliseconds.
    #[serde(default = "default_lamp_settle_ms")]
    pub lamp_settle_ms: u64,
}

fn default_one_u8() -> u8 {
    1
}

fn default_auto_cal() -> Vec<bool> {
    vec![false]
}

fn default_lamp_settle_ms() -> u64 {
    1000
}

impl Default for CalibrationSection {
    fn default() -> Self {
        Self {
            auto: default_auto_cal(),
            exposure_s: default_exposures(),
            accumulations: default_counts(),
            frames: default_counts(),
            lamp_switch: false,
            lamp_relay: default_one_u8(),
            lamp_settle_ms: default_lamp_settle_ms(),
        }
    }
}

/// `[batch]` section: repeat the whole composition N times.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSection {
    #[serde(default)]
    pub enabled: bool,

    /// Number of spectra to take per batch.
    #[serde(default = "default_one_u32")]
    pub num_spectra: u32,

    /// Delay between batch repetitions, in seconds.
    #[serde(default)]
    pub delay_s: f64,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            enabled: false,
            num_spectra: default_one_u32(),
            delay_s: 0.0,
        }
    }
}

/// `[sweep]` section: temperature sweep over the bath setpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_room_temperature")]
    pub start: f64,

    #[serde(default = "default_one_f64")]
    pub step: f64,

    #[serde(default = "default_room_temperature")]
    pub end: f64,

    /// Delay before the very first measurement of the sweep, in seconds.
    #[serde(default)]
    pub initial_delay_s: f64,

    /// Delay after each setpoint change, in seconds.
    #[serde(default)]
    pub delay_s: f64,

    /// Sweep back down through the same setpoints after reaching the end.
    #[serde(default, rename = "loop")]
    pub loop_back: bool,

    /// Delay at the reversal point of a looped sweep, in seconds.
    #[serde(default)]
    pub loop_delay_s: f64,

    /// Setpoint to apply once the sweep has finished.
    #[serde(default)]
    pub after_sweep: Option<f64>,
}

fn default_room_temperature() -> f64 {
    20.0
}

fn default_one_f64() -> f64 {
    1.0
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            enabled: false,
            start: default_room_temperature(),
            step: default_one_f64(),
            end: default_room_temperature(),
            initial_delay_s: 0.0,
            delay_s: 0.0,
            loop_back: false,
            loop_delay_s: 0.0,
            after_sweep: None,
        }
    }
}

/// `[range]` section: extended spectral range over several grating positions.
#[derive(Debug, Clone, Deserialize)]
pub struct RangeSection {
    #[serde(default)]
    pub enabled: bool,

    /// Derive per-position file names from the base name automatically.
    #[serde(default = "default_true")]
    pub auto_file_names: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RangeSection {
    fn default() -> Self {
        Self {
            enabled: false,
            auto_file_names: default_true(),
        }
    }
}

/// `[stage]` section: motorized stage positions and polling delays.
#[derive(Debug, Clone, Deserialize)]
pub struct StageSection {
    #[serde(default)]
    pub measurement_pos: i32,

    #[serde(default)]
    pub calibration_pos: i32,

    /// Initial delay before polling the motor after a move command, in
    /// milliseconds.
    #[serde(default = "default_motor_poll_ms")]
    pub motor_poll_delay_ms: u64,

    /// Settle time before polling the grating after a move command, in
    /// milliseconds.
    #[serde(default = "default_grating_settle_ms")]
    pub grating_settle_ms: u64,
}

fn default_motor_poll_ms() -> u64 {
    200
}

fn default_grating_settle_ms() -> u64 {
    5000
}

impl Default for StageSection {
    fn default() -> Self {
        Self {
            measurement_pos: 0,
            calibration_pos: 0,
            motor_poll_delay_ms: default_motor_poll_ms(),
            grating_settle_ms: default_grating_settle_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validated model
// ---------------------------------------------------------------------------

/// A single acquisition's spectrometer parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureParams {
    pub exposure_s: f64,
    pub accumulations: u32,
    pub frames: u32,
}

/// One measurement position: a grating target plus the exposure parameters
/// used there, for both the measurement and an optional calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionParams {
    pub grating: i32,
    pub exposure: ExposureParams,
    pub calibration: ExposureParams,
    /// Interleave a calibration acquisition at this position.
    pub auto_cal: bool,
}

/// File-name numbering scheme for generated spectra.
#[derive(Debug, Clone, PartialEq)]
pub struct FileNaming {
    pub base: String,
    pub directory: String,
    pub first_number: u32,
    pub number_step: u32,
    pub digits: u8,
}

impl FileNaming {
    /// Render the file name for a given exposure index.
    ///
    /// Indices below zero clamp to the first number rather than wrapping.
    pub fn file_name(&self, index: i32) -> String {
        let number = i64::from(self.first_number)
            + i64::from(index.max(0)) * i64::from(self.number_step);
        format!(
            "{}{:0width$}",
            self.base,
            number,
            width = usize::from(self.digits)
        )
    }
}

/// Calibration lamp switching parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LampSwitch {
    pub relay: u8,
    pub settle: Duration,
}

/// Calibration settings shared by all positions; the per-position enable
/// flag lives in [`PositionParams::auto_cal`].
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationParams {
    pub lamp: Option<LampSwitch>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchParams {
    /// Spectra per batch; 1 means batching is effectively off.
    pub num_spectra: u32,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepParams {
    pub start: f64,
    pub step: f64,
    pub end: f64,
    pub initial_delay: Duration,
    pub delay: Duration,
    pub loop_back: bool,
    pub loop_delay: Duration,
    pub after_sweep: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageParams {
    pub measurement_pos: i32,
    pub calibration_pos: i32,
    pub motor_poll_delay: Duration,
    pub grating_settle: Duration,
}

/// Validated, normalised experiment configuration.
///
/// Constructed from [`RawExperimentFile`] via `TryFrom` (see `validate.rs`).
/// All parameter lists are aligned to `positions`, broadcasting and
/// truncation have already been applied, and all durations are concrete.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub naming: FileNaming,
    pub positions: Vec<PositionParams>,
    pub calibration: CalibrationParams,
    pub batch: BatchParams,
    /// `None` when the sweep is disabled.
    pub sweep: Option<SweepParams>,
    pub extended_range: bool,
    pub auto_file_names: bool,
    pub stage: StageParams,
}

impl ExperimentConfig {
    /// Construct directly from already-validated parts.
    ///
    /// Prefer `ExperimentConfig::try_from(raw)`; this exists for the
    /// validation code and for test builders.
    #[allow(clippy::too_many_arguments)]
    pub fn new_unchecked(
        naming: FileNaming,
        positions: Vec<PositionParams>,
        calibration: CalibrationParams,
        batch: BatchParams,
        sweep: Option<SweepParams>,
        extended_range: bool,
        auto_file_names: bool,
        stage: StageParams,
    ) -> Self {
        Self {
            naming,
            positions,
            calibration,
            batch,
            sweep,
            extended_range,
            auto_file_names,
            stage,
        }
    }

    /// Extended range is only meaningful with more than one position.
    pub fn is_ranged(&self) -> bool {
        self.extended_range && self.positions.len() > 1
    }

    /// Batch repetition is only meaningful for more than one spectrum.
    pub fn is_batched(&self) -> bool {
        self.batch.num_spectra > 1
    }
}
