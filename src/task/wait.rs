// src/task/wait.rs

//! Polled wait leaves.

use std::time::Duration;

use tracing::{debug, warn};

use crate::hardware::Rig;
use crate::plan::WaitSpec;
use crate::state::WaitFor;
use crate::task::{Status, Task};

/// Waits for a hardware condition, polled once per engine tick.
///
/// Starting a wait adds its [`WaitFor`] flag to the shared state and records
/// the wait window; finishing or stopping removes it. Motor and grating
/// waits defer their first condition poll by an initial delay so a move
/// command has time to take effect.
#[derive(Debug)]
pub struct WaitTask {
    label: String,
    spec: WaitSpec,
    status: Status,
    started: Option<Duration>,
}

impl WaitTask {
    pub fn new(spec: WaitSpec) -> Self {
        let label = label_for(&spec);
        Self {
            label,
            spec,
            status: Status::Idle,
            started: None,
        }
    }

    fn flag(&self) -> WaitFor {
        match self.spec {
            WaitSpec::Delay { .. } => WaitFor::Delay,
            WaitSpec::LampSettle { .. } => WaitFor::Lamp,
            WaitSpec::Acquisition => WaitFor::Acquisition,
            WaitSpec::Motor { .. } => WaitFor::Motor,
            WaitSpec::Grating { .. } => WaitFor::Grating,
        }
    }

    fn expected_end(&self, now: Duration) -> Option<Duration> {
        match self.spec {
            WaitSpec::Delay { duration } | WaitSpec::LampSettle { duration } => {
                Some(now + duration)
            }
            WaitSpec::Motor { initial_delay } | WaitSpec::Grating { initial_delay } => {
                Some(now + initial_delay)
            }
            WaitSpec::Acquisition => None,
        }
    }

    fn finish(&mut self, rig: &mut Rig) -> Status {
        let now = rig.clock.now();
        let flag = self.flag();
        rig.state.with(|s| {
            s.waiting.remove(flag);
            s.waiting_finished = Some(now);
        });
        debug!(task = %self.label, "wait satisfied");
        self.status = Status::Finished;
        self.status
    }

    /// Check the wait condition. `Err` means the hardware query failed.
    fn satisfied(&self, rig: &mut Rig, now: Duration) -> anyhow::Result<bool> {
        let started = self.started.unwrap_or(now);
        match self.spec {
            WaitSpec::Delay { duration } | WaitSpec::LampSettle { duration } => {
                Ok(now >= started + duration)
            }
            WaitSpec::Motor { initial_delay } => {
                if now < started + initial_delay {
                    return Ok(false);
                }
                let moving = rig.stage.is_moving()?;
                if !moving {
                    let position = rig.stage.position()?;
                    rig.state.with(|s| s.stage_position = Some(position));
                }
                Ok(!moving)
            }
            WaitSpec::Grating { initial_delay } => {
                if now < started + initial_delay {
                    return Ok(false);
                }
                Ok(!rig.spectrometer.is_grating_moving()?)
            }
            WaitSpec::Acquisition => {
                // Mirror live counters while the acquisition runs.
                let accumulation = rig.spectrometer.accumulation_count()?;
                let frame = rig.spectrometer.frame_count()?;
                let acquiring = rig.spectrometer.is_acquiring()?;
                rig.state.with(|s| {
                    s.accumulation = accumulation;
                    s.frame = frame;
                    if !acquiring {
                        s.measurement_finished = Some(now);
                    }
                });
                Ok(!acquiring)
            }
        }
    }
}

impl Task for WaitTask {
    fn label(&self) -> &str {
        &self.label
    }

    fn status(&self) -> Status {
        self.status
    }

    fn start(&mut self, rig: &mut Rig) -> Status {
        let now = rig.clock.now();
        self.started = Some(now);
        let flag = self.flag();
        let expected = self.expected_end(now);
        rig.state.with(|s| {
            s.waiting.add(flag);
            s.waiting_started = Some(now);
            s.waiting_expected_end = expected;
            s.waiting_finished = None;
        });
        self.status = Status::Running;

        // A zero-length delay finishes on the same tick.
        self.poll(rig)
    }

    fn poll(&mut self, rig: &mut Rig) -> Status {
        if self.status != Status::Running {
            return self.status;
        }
        let now = rig.clock.now();
        match self.satisfied(rig, now) {
            Ok(true) => self.finish(rig),
            Ok(false) => self.status,
            Err(err) => {
                warn!(task = %self.label, error = %err, "wait condition query failed");
                rig.alerts.critical("Hardware error", &err.to_string());
                let flag = self.flag();
                rig.state.remove_wait(flag);
                self.status = Status::Failed;
                self.status
            }
        }
    }

    fn stop(&mut self, rig: &mut Rig) {
        if self.status == Status::Running {
            rig.state.remove_wait(self.flag());

            // Actively stop whatever we were waiting on.
            let stop_result = match self.spec {
                WaitSpec::Motor { .. } => rig.stage.stop(),
                WaitSpec::Acquisition => rig.spectrometer.stop_acquisition(),
                WaitSpec::Delay { .. } | WaitSpec::LampSettle { .. } | WaitSpec::Grating { .. } => {
                    Ok(())
                }
            };
            if let Err(err) = stop_result {
                warn!(task = %self.label, error = %err, "hardware stop failed");
            }
        }
        self.started = None;
        self.status = Status::Idle;
    }

    fn reset(&mut self) {
        self.started = None;
        self.status = Status::Idle;
    }
}

fn label_for(spec: &WaitSpec) -> String {
    match spec {
        WaitSpec::Delay { duration } => format!("wait {:.3}s", duration.as_secs_f64()),
        WaitSpec::LampSettle { .. } => "wait lamp".to_string(),
        WaitSpec::Acquisition => "wait acquisition".to_string(),
        WaitSpec::Motor { .. } => "wait motor".to_string(),
        WaitSpec::Grating { .. } => "wait grating".to_string(),
    }
}
