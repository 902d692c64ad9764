// src/plan/builders.rs

//! Composable plan builders.
//!
//! Each builder is a pure function from configuration to a plan fragment;
//! `plan::compile` nests them. Keeping the fragments small makes the
//! compiled shapes directly assertable in tests.

use crate::config::{ExperimentConfig, FileNaming, SweepParams};
use crate::plan::{Plan, Step, WaitSpec, index};

/// The sweep parameters, if a sweep wrapper should be emitted.
///
/// A disabled sweep or a single-setpoint ladder contributes no wrapper.
pub fn active_sweep(cfg: &ExperimentConfig) -> Option<&SweepParams> {
    let sweep = cfg.sweep.as_ref()?;
    let ladder = super::sweep::ladder(sweep.start, sweep.step, sweep.end, sweep.loop_back);
    (ladder.len() > 1).then_some(sweep)
}

/// Power on, move, wait for the motor, power off.
pub fn stage_leg(cfg: &ExperimentConfig, target: i32) -> Vec<Plan> {
    vec![
        Plan::Act(Step::StagePower { on: true }),
        Plan::Act(Step::StageMove { target }),
        Plan::Wait(WaitSpec::Motor {
            initial_delay: cfg.stage.motor_poll_delay,
        }),
        Plan::Act(Step::StagePower { on: false }),
    ]
}

/// Move the grating and wait for it to settle.
pub fn grating_leg(cfg: &ExperimentConfig, target: i32) -> Vec<Plan> {
    vec![
        Plan::Act(Step::GratingMove { target }),
        Plan::Wait(WaitSpec::Grating {
            initial_delay: cfg.stage.grating_settle,
        }),
    ]
}

/// Per-position file naming: with auto file names in extended range, each
/// position gets its own base derived from the grating target.
fn naming_for(cfg: &ExperimentConfig, position: usize) -> FileNaming {
    let mut naming = cfg.naming.clone();
    if cfg.is_ranged() && cfg.auto_file_names {
        naming.base = format!("{}_g{}", naming.base, cfg.positions[position].grating);
    }
    naming
}

/// Calibration interleaving for one position: stage to the calibration
/// position, expose the reference (lamp-switched when configured), then
/// return the stage. In extended range the grating moves to the measurement
/// target in parallel with the stage return; otherwise the grating is left
/// alone.
fn calibration_block(cfg: &ExperimentConfig, position: usize) -> Plan {
    let pos = &cfg.positions[position];
    let mut steps = stage_leg(cfg, cfg.stage.calibration_pos);

    if let Some(lamp) = cfg.calibration.lamp {
        steps.push(Plan::Act(Step::LampOn { relay: lamp.relay }));
        steps.push(Plan::Wait(WaitSpec::LampSettle {
            duration: lamp.settle,
        }));
    }

    steps.push(Plan::Act(Step::Acquire {
        calibration: true,
        exposure: pos.calibration.clone(),
    }));
    steps.push(Plan::Wait(WaitSpec::Acquisition));

    if let Some(lamp) = cfg.calibration.lamp {
        steps.push(Plan::Act(Step::LampOff { relay: lamp.relay }));
    }

    if cfg.is_ranged() {
        steps.push(Plan::fork(
            "return",
            vec![
                Plan::seq("stage return", 0, stage_leg(cfg, cfg.stage.measurement_pos)),
                Plan::seq("grating move", 0, grating_leg(cfg, pos.grating)),
            ],
        ));
    } else {
        steps.extend(stage_leg(cfg, cfg.stage.measurement_pos));
    }

    Plan::seq("calibration", 0, steps)
}

/// One measurement at one position: optional calibration, the acquisition,
/// bookkeeping, and the wait for the acquisition to finish.
pub fn exposure_unit(
    cfg: &ExperimentConfig,
    position: usize,
    calibrate: bool,
    sweeping: bool,
) -> Plan {
    let pos = &cfg.positions[position];
    let mut steps = Vec::new();

    if calibrate {
        steps.push(calibration_block(cfg, position));
    } else {
        steps.extend(grating_leg(cfg, pos.grating));
    }

    steps.push(Plan::Act(Step::Acquire {
        calibration: false,
        exposure: pos.exposure.clone(),
    }));
    if sweeping {
        steps.push(Plan::Act(Step::ReadBath));
    }
    steps.push(Plan::Act(Step::LogExposure {
        exposure: pos.exposure.clone(),
    }));
    steps.push(Plan::Act(Step::AppendRecord {
        naming: naming_for(cfg, position),
        exposure: pos.exposure.clone(),
    }));
    steps.push(Plan::Wait(WaitSpec::Acquisition));

    Plan::seq(format!("position {position}"), 0, steps)
}

/// One extended-range pass: every position in order, striding the exposure
/// index between positions and rewinding it at the end so a pass is
/// index-neutral. Each position calibrates according to its own flag.
pub fn range_pass(cfg: &ExperimentConfig, sweeping: bool, stride: i32) -> Plan {
    let count = cfg.positions.len();
    let mut steps = Vec::new();

    for position in 0..count {
        steps.push(exposure_unit(
            cfg,
            position,
            cfg.positions[position].auto_cal,
            sweeping,
        ));
        if position + 1 < count {
            steps.push(Plan::Act(Step::ShiftIndex { delta: stride }));
        }
    }
    steps.push(Plan::Act(Step::ShiftIndex {
        delta: index::pass_rewind(count, stride),
    }));

    Plan::seq("range pass", 0, steps)
}

/// Repeat the whole composition `num_spectra` times, advancing the
/// exposure index by one slot per repeat.
///
/// When a sweep is active, the delay before the next repeat runs in a fork
/// with re-setting the sweep's first setpoint, so the bath travels back
/// while the experiment waits.
pub fn batch_wrapper(cfg: &ExperimentConfig, body: Plan, next_setpoint: Option<f64>) -> Plan {
    let mut steps = vec![body, Plan::Act(Step::ShiftIndex { delta: 1 })];
    if !cfg.batch.delay.is_zero() {
        let delay = Plan::Wait(WaitSpec::Delay {
            duration: cfg.batch.delay,
        });
        steps.push(match next_setpoint {
            Some(celsius) => Plan::fork(
                "batch break",
                vec![
                    Plan::seq("delay", 0, vec![delay]),
                    Plan::seq(
                        "next setpoint",
                        0,
                        vec![Plan::Act(Step::SetBath { celsius })],
                    ),
                ],
            ),
            None => delay,
        });
    }
    Plan::seq("batch", cfg.batch.num_spectra - 1, steps)
}

/// Wrap the body in a temperature ladder, advancing the exposure index by
/// one slot per setpoint.
pub fn sweep_wrapper(sweep: &SweepParams, body: Plan) -> Plan {
    let forward = super::sweep::step_count(sweep.start, sweep.step, sweep.end);
    let ladder = super::sweep::ladder(sweep.start, sweep.step, sweep.end, sweep.loop_back);

    let mut steps = Vec::new();
    if !sweep.initial_delay.is_zero() {
        steps.push(Plan::Wait(WaitSpec::Delay {
            duration: sweep.initial_delay,
        }));
    }

    for (k, celsius) in ladder.iter().enumerate() {
        steps.push(Plan::Act(Step::SetBath { celsius: *celsius }));

        // The reversal point of a looped ladder gets its own delay.
        let at_reversal = sweep.loop_back && k + 1 == forward as usize;
        let delay = if at_reversal { sweep.loop_delay } else { sweep.delay };
        if !delay.is_zero() {
            steps.push(Plan::Wait(WaitSpec::Delay { duration: delay }));
        }

        steps.push(body.clone());
        steps.push(Plan::Act(Step::ShiftIndex { delta: 1 }));
    }

    if let Some(celsius) = sweep.after_sweep {
        steps.push(Plan::Act(Step::SetBath { celsius }));
    }

    Plan::seq("sweep", 0, steps)
}
