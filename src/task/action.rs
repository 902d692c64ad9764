// src/task/action.rs

//! Immediate-effect leaf tasks.

use std::time::Duration;

use tracing::{debug, error, warn};

use crate::hardware::{MeasurementRecord, Rig};
use crate::plan::Step;
use crate::task::{Status, Task};

/// Retry delay when the spectrometer is still busy with a previous
/// acquisition.
pub const BUSY_RETRY: Duration = Duration::from_millis(300);

/// Executes a single [`Step`].
///
/// Most steps finish inside `start`. The acquisition step can linger in
/// `Running` when the spectrometer is transiently busy: it re-arms itself
/// and retries after [`BUSY_RETRY`] instead of failing.
#[derive(Debug)]
pub struct ActionTask {
    label: String,
    step: Step,
    status: Status,
    retry_at: Option<Duration>,
}

impl ActionTask {
    pub fn new(step: Step) -> Self {
        let label = label_for(&step);
        Self {
            label,
            step,
            status: Status::Idle,
            retry_at: None,
        }
    }

    fn fail(&mut self, rig: &mut Rig, title: &str, err: &anyhow::Error) -> Status {
        error!(task = %self.label, error = %err, "step failed");
        rig.alerts.critical(title, &err.to_string());
        self.status = Status::Failed;
        self.status
    }

    fn fail_precondition(&mut self, rig: &mut Rig, title: &str, message: &str) -> Status {
        error!(task = %self.label, "{message}");
        rig.alerts.critical(title, message);
        self.status = Status::Failed;
        self.status
    }

    fn try_acquire(&mut self, rig: &mut Rig) -> Status {
        let Step::Acquire {
            calibration,
            ref exposure,
        } = self.step
        else {
            // try_acquire is only reached from the Acquire arm.
            self.status = Status::Failed;
            return self.status;
        };
        let exposure = exposure.clone();

        match rig.spectrometer.is_acquiring() {
            Ok(true) => {
                let now = rig.clock.now();
                debug!(task = %self.label, "spectrometer busy; retrying shortly");
                self.retry_at = Some(now + BUSY_RETRY);
                self.status = Status::Running;
                self.status
            }
            Ok(false) => {
                if let Err(err) = rig.spectrometer.start_acquisition(&exposure, calibration) {
                    return self.fail(rig, "Acquisition failed", &err);
                }
                let now = rig.clock.now();
                rig.state.with(|s| {
                    s.measurement_started = Some(now);
                    s.measurement_finished = None;
                    s.accumulation = 0;
                    s.frame = 0;
                    s.last_exposure = Some(exposure.clone());
                });
                self.retry_at = None;
                self.status = Status::Finished;
                self.status
            }
            Err(err) => self.fail(rig, "Acquisition failed", &err),
        }
    }

    fn perform(&mut self, rig: &mut Rig) -> Status {
        let result = match &self.step {
            Step::Acquire { .. } => return self.try_acquire(rig),

            Step::LogExposure { exposure } => {
                let index = rig.state.exposure_index();
                let exposure = exposure.clone();
                rig.state.with(|s| s.last_exposure = Some(exposure.clone()));
                rig.log.record_exposure(index, &exposure)
            }

            Step::AppendRecord { naming, exposure } => {
                let index = rig.state.exposure_index();
                let record = MeasurementRecord {
                    file_name: naming.file_name(index),
                    exposure: exposure.clone(),
                    bath: rig.state.with(|s| s.last_bath_reading),
                    finished_at: rig.clock.now(),
                };
                rig.log.append_measurement(&record)
            }

            Step::ReadBath => match rig.bath.read_temperature() {
                Ok(celsius) => {
                    rig.state.with(|s| s.last_bath_reading = Some(celsius));
                    Ok(())
                }
                Err(err) => Err(err),
            },

            Step::SetBath { celsius } => match rig.bath.set_target(*celsius) {
                Ok(()) => match rig.bath.read_setpoint() {
                    Ok(readback) => {
                        if (readback - *celsius).abs() > 0.05 {
                            warn!(
                                task = %self.label,
                                requested = *celsius,
                                readback,
                                "bath setpoint read-back differs from request"
                            );
                        }
                        rig.state.with(|s| s.last_bath_setpoint = Some(readback));
                        Ok(())
                    }
                    Err(err) => Err(err),
                },
                Err(err) => Err(err),
            },

            Step::LampOn { relay } => rig.relays.switch_on(*relay),
            Step::LampOff { relay } => rig.relays.switch_off(*relay),

            Step::StagePower { on } => rig.stage.power(*on),

            Step::StageMove { target } => {
                if !rig.stage.is_connected() {
                    if let Err(err) = rig.stage.connect() {
                        return self.fail(rig, "Stage error", &err);
                    }
                }
                match rig.stage.is_moving() {
                    Ok(true) => {
                        return self.fail_precondition(
                            rig,
                            "Stage error",
                            "stage is already moving; refusing to start another move",
                        );
                    }
                    Ok(false) => {}
                    Err(err) => return self.fail(rig, "Stage error", &err),
                }
                rig.stage.move_to(*target)
            }

            Step::GratingMove { target } => {
                let target = *target;
                match rig.spectrometer.move_grating(target) {
                    Ok(()) => {
                        rig.state.with(|s| s.grating_position = Some(target));
                        Ok(())
                    }
                    Err(err) => Err(err),
                }
            }

            Step::ShiftIndex { delta } => {
                let index = rig.state.shift_exposure_index(*delta);
                debug!(task = %self.label, index, "exposure index shifted");
                Ok(())
            }
        };

        match result {
            Ok(()) => {
                self.status = Status::Finished;
                self.status
            }
            Err(err) => self.fail(rig, "Hardware error", &err),
        }
    }
}

impl Task for ActionTask {
    fn label(&self) -> &str {
        &self.label
    }

    fn status(&self) -> Status {
        self.status
    }

    fn start(&mut self, rig: &mut Rig) -> Status {
        self.status = Status::Running;
        self.perform(rig)
    }

    fn poll(&mut self, rig: &mut Rig) -> Status {
        if self.status != Status::Running {
            return self.status;
        }
        // Only the busy-retry path parks an action in Running.
        match self.retry_at {
            Some(at) if rig.clock.now() < at => self.status,
            _ => self.try_acquire(rig),
        }
    }

    fn stop(&mut self, _rig: &mut Rig) {
        // A parked acquisition never reached the hardware; nothing to undo.
        self.retry_at = None;
        self.status = Status::Idle;
    }

    fn reset(&mut self) {
        self.retry_at = None;
        self.status = Status::Idle;
    }
}

fn label_for(step: &Step) -> String {
    match step {
        Step::Acquire { calibration: true, .. } => "acquire calibration".to_string(),
        Step::Acquire { calibration: false, .. } => "acquire measurement".to_string(),
        Step::LogExposure { .. } => "log exposure".to_string(),
        Step::AppendRecord { .. } => "append record".to_string(),
        Step::ReadBath => "read bath".to_string(),
        Step::SetBath { celsius } => format!("set bath {celsius}"),
        Step::LampOn { .. } => "lamp on".to_string(),
        Step::LampOff { .. } => "lamp off".to_string(),
        Step::StagePower { on: true } => "stage power on".to_string(),
        Step::StagePower { on: false } => "stage power off".to_string(),
        Step::StageMove { target } => format!("stage move {target}"),
        Step::GratingMove { target } => format!("grating move {target}"),
        Step::ShiftIndex { delta } => format!("shift index {delta}"),
    }
}
