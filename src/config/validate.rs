// src/config/validate.rs

use std::time::Duration;

use tracing::warn;

use crate::config::model::{
    BatchParams, CalibrationParams, ExperimentConfig, ExposureParams, FileNaming, LampSwitch,
    PositionParams, RawExperimentFile, StageParams, SweepParams,
};
use crate::errors::{Result, SpecflowError};

impl TryFrom<RawExperimentFile> for ExperimentConfig {
    type Error = crate::errors::SpecflowError;

    fn try_from(raw: RawExperimentFile) -> std::result::Result<Self, Self::Error> {
        validate_sweep(&raw)?;
        validate_batch(&raw)?;

        let positions = build_positions(&raw)?;

        let naming = FileNaming {
            base: raw.exposure.file_name_base.clone(),
            directory: raw.exposure.directory.clone(),
            first_number: raw.exposure.first_number,
            number_step: raw.exposure.number_step,
            digits: raw.exposure.digits,
        };

        let calibration = CalibrationParams {
            lamp: raw.calibration.lamp_switch.then_some(LampSwitch {
                relay: raw.calibration.lamp_relay,
                settle: Duration::from_millis(raw.calibration.lamp_settle_ms),
            }),
        };

        let batch = BatchParams {
            num_spectra: if raw.batch.enabled {
                raw.batch.num_spectra
            } else {
                1
            },
            delay: duration_from_secs(raw.batch.delay_s),
        };

        let sweep = raw.sweep.enabled.then(|| SweepParams {
            start: raw.sweep.start,
            step: raw.sweep.step,
            end: raw.sweep.end,
            initial_delay: duration_from_secs(raw.sweep.initial_delay_s),
            delay: duration_from_secs(raw.sweep.delay_s),
            loop_back: raw.sweep.loop_back,
            loop_delay: duration_from_secs(raw.sweep.loop_delay_s),
            after_sweep: raw.sweep.after_sweep,
        });

        let stage = StageParams {
            measurement_pos: raw.stage.measurement_pos,
            calibration_pos: raw.stage.calibration_pos,
            motor_poll_delay: Duration::from_millis(raw.stage.motor_poll_delay_ms),
            grating_settle: Duration::from_millis(raw.stage.grating_settle_ms),
        };

        Ok(ExperimentConfig::new_unchecked(
            naming,
            positions,
            calibration,
            batch,
            sweep,
            raw.range.enabled,
            raw.range.auto_file_names,
            stage,
        ))
    }
}

fn validate_sweep(raw: &RawExperimentFile) -> Result<()> {
    let sweep = &raw.sweep;
    if sweep.enabled && sweep.step == 0.0 && sweep.start != sweep.end {
        return Err(SpecflowError::ConfigError(format!(
            "[sweep].step must be non-zero when start ({}) != end ({})",
            sweep.start, sweep.end
        )));
    }
    Ok(())
}

fn validate_batch(raw: &RawExperimentFile) -> Result<()> {
    if raw.batch.enabled && raw.batch.num_spectra == 0 {
        return Err(SpecflowError::ConfigError(
            "[batch].num_spectra must be >= 1 when batching is enabled (got 0)".to_string(),
        ));
    }
    Ok(())
}

/// Align the exposure and calibration parameter lists to the grating
/// position list.
///
/// - a single entry broadcasts over all positions,
/// - lists longer than the effective length are truncated with a warning,
/// - mismatched multi-entry lists shrink the effective length to the
///   shortest list, also with a warning.
fn build_positions(raw: &RawExperimentFile) -> Result<Vec<PositionParams>> {
    let grating = &raw.exposure.grating;
    if grating.is_empty() {
        return Err(SpecflowError::ConfigError(
            "[exposure].grating must list at least one grating position".to_string(),
        ));
    }

    ensure_non_empty("[exposure].exposure_s", raw.exposure.exposure_s.len())?;
    ensure_non_empty("[exposure].accumulations", raw.exposure.accumulations.len())?;
    ensure_non_empty("[exposure].frames", raw.exposure.frames.len())?;
    ensure_non_empty("[calibration].exposure_s", raw.calibration.exposure_s.len())?;
    ensure_non_empty(
        "[calibration].accumulations",
        raw.calibration.accumulations.len(),
    )?;
    ensure_non_empty("[calibration].frames", raw.calibration.frames.len())?;
    ensure_non_empty("[calibration].auto", raw.calibration.auto.len())?;

    let lists = [
        raw.exposure.exposure_s.len(),
        raw.exposure.accumulations.len(),
        raw.exposure.frames.len(),
        raw.calibration.exposure_s.len(),
        raw.calibration.accumulations.len(),
        raw.calibration.frames.len(),
        raw.calibration.auto.len(),
    ];

    let effective = lists
        .iter()
        .filter(|&&len| len > 1)
        .fold(grating.len(), |acc, &len| acc.min(len));

    if effective < grating.len() {
        warn!(
            positions = grating.len(),
            effective, "parameter lists shorter than grating list; truncating positions"
        );
    }

    let mut positions = Vec::with_capacity(effective);
    for i in 0..effective {
        positions.push(PositionParams {
            grating: grating[i],
            exposure: ExposureParams {
                exposure_s: pick("[exposure].exposure_s", &raw.exposure.exposure_s, i, effective),
                accumulations: pick(
                    "[exposure].accumulations",
                    &raw.exposure.accumulations,
                    i,
                    effective,
                ),
                frames: pick("[exposure].frames", &raw.exposure.frames, i, effective),
            },
            calibration: ExposureParams {
                exposure_s: pick(
                    "[calibration].exposure_s",
                    &raw.calibration.exposure_s,
                    i,
                    effective,
                ),
                accumulations: pick(
                    "[calibration].accumulations",
                    &raw.calibration.accumulations,
                    i,
                    effective,
                ),
                frames: pick("[calibration].frames", &raw.calibration.frames, i, effective),
            },
            auto_cal: pick("[calibration].auto", &raw.calibration.auto, i, effective),
        });
    }

    Ok(positions)
}

fn ensure_non_empty(name: &str, len: usize) -> Result<()> {
    if len == 0 {
        return Err(SpecflowError::ConfigError(format!(
            "{name} must not be empty"
        )));
    }
    Ok(())
}

/// Pick the entry for position `i`, broadcasting single-entry lists and
/// warning (once per list, at the first affected index) about extra entries.
fn pick<T: Copy>(name: &str, values: &[T], i: usize, effective: usize) -> T {
    if i == 0 && values.len() > effective && effective > 1 {
        warn!(
            list = name,
            entries = values.len(),
            used = effective,
            "ignoring extra parameter entries"
        );
    }
    if values.len() == 1 { values[0] } else { values[i] }
}

fn duration_from_secs(secs: f64) -> Duration {
    if secs <= 0.0 || !secs.is_finite() {
        Duration::ZERO
    } else {
        Duration::from_secs_f64(secs)
    }
}
