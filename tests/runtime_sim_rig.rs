mod common;
use crate::common::init_tracing;

use std::time::Duration;

use tokio::sync::mpsc;

use specflow::engine::{Engine, RunOutcome, Runtime, RuntimeEvent};
use specflow::hardware::sim::{SimCommand, SimOptions, sim_rig, sim_rig_wall_clock};
use specflow::plan::{self, Plan, Step};
use specflow::task::Status;
use specflow_test_utils::builders::ExperimentBuilder;
use specflow_test_utils::with_timeout;

fn first_index(entries: &[SimCommand], pred: impl Fn(&SimCommand) -> bool) -> Option<usize> {
    entries.iter().position(pred)
}

#[tokio::test]
async fn calibrated_range_experiment_runs_to_completion() {
    init_tracing();

    // Timings shrunk so the run completes in a few engine ticks.
    let cfg = ExperimentBuilder::new()
        .grating(&[300, 600])
        .auto_calibration(&[true, false])
        .lamp(2, 1)
        .extended_range(true)
        .stage_positions(0, 10_000)
        .motor_poll_ms(1)
        .grating_settle_ms(1)
        .build();
    let plan = plan::compile(&cfg);

    let (rig, handles) = sim_rig_wall_clock(SimOptions::default());
    let engine = Engine::new(plan, rig);

    let (_tx, rx) = mpsc::channel::<RuntimeEvent>(4);
    let runtime = Runtime::new(engine, rx, Duration::from_millis(1));

    let outcome = with_timeout(runtime.run()).await.expect("runtime errored");
    assert_eq!(outcome, RunOutcome::Completed);

    let entries = handles.journal.entries();

    // Calibration happens at the calibration position, lamp-switched, and
    // strictly before the first measurement acquisition.
    let stage_to_cal = first_index(&entries, |c| {
        matches!(c, SimCommand::StageMove { target: 10_000 })
    })
    .expect("stage moved to calibration position");
    let lamp_on =
        first_index(&entries, |c| matches!(c, SimCommand::RelayOn { relay: 2 }))
            .expect("lamp switched on");
    let cal_acquire = first_index(&entries, |c| {
        matches!(c, SimCommand::AcquisitionStarted { calibration: true })
    })
    .expect("calibration acquisition");
    let lamp_off =
        first_index(&entries, |c| matches!(c, SimCommand::RelayOff { relay: 2 }))
            .expect("lamp switched off");
    let first_measurement = first_index(&entries, |c| {
        matches!(c, SimCommand::AcquisitionStarted { calibration: false })
    })
    .expect("measurement acquisition");

    assert!(stage_to_cal < lamp_on);
    assert!(lamp_on < cal_acquire);
    assert!(cal_acquire < lamp_off);
    assert!(lamp_off < first_measurement);

    // One measurement per position, one calibration in total.
    assert_eq!(
        handles
            .journal
            .count(|c| matches!(c, SimCommand::AcquisitionStarted { calibration: false })),
        2
    );
    assert_eq!(
        handles
            .journal
            .count(|c| matches!(c, SimCommand::AcquisitionStarted { calibration: true })),
        1
    );

    // Both grating targets were visited, plus the return to the first one.
    assert_eq!(
        handles
            .journal
            .count(|c| matches!(c, SimCommand::GratingMove { target: 300 })),
        2
    );
    assert_eq!(
        handles
            .journal
            .count(|c| matches!(c, SimCommand::GratingMove { target: 600 })),
        1
    );

    // The measurement log saw an exposure entry and a record per position.
    let lines = handles.log.lines();
    assert_eq!(
        lines.iter().filter(|l| l.starts_with("measurement")).count(),
        2,
        "log lines: {lines:?}"
    );

    // No alerts on the happy path.
    assert!(handles.alerts.entries().is_empty());
}

#[tokio::test]
async fn batched_sweep_takes_spectra_at_every_setpoint() {
    init_tracing();

    let cfg = ExperimentBuilder::new()
        .grating(&[500])
        .batch(2, 0.0)
        .sweep(20.0, 10.0, 30.0)
        .grating_settle_ms(1)
        .build();
    let plan = plan::compile(&cfg);

    let (rig, handles) = sim_rig_wall_clock(SimOptions::default());
    let state = rig.state.clone();
    let engine = Engine::new(plan, rig);

    let (_tx, rx) = mpsc::channel::<RuntimeEvent>(4);
    let runtime = Runtime::new(engine, rx, Duration::from_millis(1));

    let outcome = with_timeout(runtime.run()).await.expect("runtime errored");
    assert_eq!(outcome, RunOutcome::Completed);

    // 2 spectra x 2 setpoints.
    assert_eq!(
        handles
            .journal
            .count(|c| matches!(c, SimCommand::AcquisitionStarted { calibration: false })),
        4
    );

    // Each batch run walks the full temperature ladder again.
    let setpoints: Vec<f64> = handles
        .journal
        .entries()
        .into_iter()
        .filter_map(|c| match c {
            SimCommand::BathTarget { celsius } => Some(celsius),
            _ => None,
        })
        .collect();
    assert_eq!(setpoints, vec![20.0, 30.0, 20.0, 30.0]);

    // One slot per sweep point plus one per batch run.
    assert_eq!(state.exposure_index(), 6);

    // Bath readings made it into the measurement records.
    let lines = handles.log.lines();
    assert!(
        lines.iter().any(|l| l.contains("bath=20.00")),
        "log lines: {lines:?}"
    );
    assert!(
        lines.iter().any(|l| l.contains("bath=30.00")),
        "log lines: {lines:?}"
    );
}

#[test]
fn set_bath_reads_back_the_setpoint() {
    init_tracing();

    let plan = Plan::seq("set", 0, vec![Plan::Act(Step::SetBath { celsius: 25.5 })]);
    let (rig, handles) = sim_rig(SimOptions::default());
    let state = rig.state.clone();
    let mut engine = Engine::new(plan, rig);

    assert_eq!(engine.start(), Status::Finished);
    assert_eq!(state.with(|s| s.last_bath_setpoint), Some(25.5));
    assert_eq!(
        handles
            .journal
            .count(|c| matches!(c, SimCommand::BathTarget { .. })),
        1
    );
}

#[test]
fn a_dropped_stage_connection_is_reestablished_before_moving() {
    init_tracing();

    let plan = Plan::seq(
        "move",
        0,
        vec![
            Plan::Act(Step::StagePower { on: true }),
            Plan::Act(Step::StageMove { target: 250 }),
        ],
    );
    let (rig, handles) = sim_rig(SimOptions::default());
    handles.stage.disconnect();
    let mut engine = Engine::new(plan, rig);

    assert_eq!(engine.start(), Status::Finished);

    let entries = handles.journal.entries();
    let connect = entries
        .iter()
        .position(|c| matches!(c, SimCommand::StageConnect))
        .expect("stage reconnected");
    let moved = entries
        .iter()
        .position(|c| matches!(c, SimCommand::StageMove { target: 250 }))
        .expect("stage moved");
    assert!(connect < moved);
}
