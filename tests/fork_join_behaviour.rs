mod common;
use crate::common::init_tracing;

use std::time::Duration;

use specflow::config::ExposureParams;
use specflow::engine::Engine;
use specflow::hardware::sim::{SimCommand, SimOptions, sim_rig};
use specflow::plan::{Plan, Step, WaitSpec};
use specflow::task::Status;

fn exposure() -> ExposureParams {
    ExposureParams {
        exposure_s: 1.0,
        accumulations: 1,
        frames: 1,
    }
}

#[test]
fn joins_only_when_all_branches_finished() {
    init_tracing();

    let plan = Plan::fork(
        "fork",
        vec![
            Plan::seq(
                "delay branch",
                0,
                vec![Plan::Wait(WaitSpec::Delay {
                    duration: Duration::from_millis(100),
                })],
            ),
            Plan::seq("lamp branch", 0, vec![Plan::Act(Step::LampOn { relay: 1 })]),
        ],
    );

    let (rig, handles) = sim_rig(SimOptions::default());
    let mut engine = Engine::new(plan, rig);

    // Lamp branch finishes inside start; the delay keeps the join open.
    assert_eq!(engine.start(), Status::Running);
    assert_eq!(
        handles
            .journal
            .count(|c| matches!(c, SimCommand::RelayOn { .. })),
        1
    );

    // Time has not advanced: still joined on the delay.
    assert_eq!(engine.tick(), Status::Running);

    handles.clock.advance(Duration::from_millis(150));
    assert_eq!(engine.tick(), Status::Finished);
}

#[test]
fn branch_failure_stops_surviving_branches_before_reporting() {
    init_tracing();

    // The acquisition branch outlives everything; the stage branch fails
    // because the stage controller cannot be reached.
    let plan = Plan::fork(
        "fork",
        vec![
            Plan::seq(
                "acquisition branch",
                0,
                vec![
                    Plan::Act(Step::Acquire {
                        calibration: false,
                        exposure: exposure(),
                    }),
                    Plan::Wait(WaitSpec::Acquisition),
                ],
            ),
            Plan::seq(
                "stage branch",
                0,
                vec![Plan::Act(Step::StageMove { target: 500 })],
            ),
        ],
    );

    let options = SimOptions {
        acquisition_polls: 1000,
        stage_connected: false,
        ..SimOptions::default()
    };
    let (rig, handles) = sim_rig(options);
    let mut engine = Engine::new(plan, rig);

    assert_eq!(engine.start(), Status::Failed);

    let entries = handles.journal.entries();
    assert!(
        entries.contains(&SimCommand::AcquisitionStopped),
        "surviving acquisition was not stopped: {entries:?}"
    );

    // Exactly one critical alert for the connect failure.
    let alerts = handles.alerts.entries();
    assert_eq!(alerts.len(), 1, "alerts: {alerts:?}");
    assert!(alerts[0].1.contains("not connected"));
}

#[test]
fn empty_fork_finishes_immediately() {
    init_tracing();

    let (rig, _handles) = sim_rig(SimOptions::default());
    let mut engine = Engine::new(Plan::fork("empty", vec![]), rig);
    assert_eq!(engine.start(), Status::Finished);
}
