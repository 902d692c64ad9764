mod common;
use crate::common::init_tracing;

use specflow::config::FileNaming;
use specflow::plan::{self, Plan, Step, sweep};
use specflow_test_utils::builders::ExperimentBuilder;

#[test]
fn sweep_step_counts_match_the_formula() {
    assert_eq!(sweep::step_count(0.0, 2.0, 6.0), 4);
    assert_eq!(sweep::step_count(5.0, 2.0, 5.0), 1);
    assert_eq!(sweep::step_count(5.0, -2.0, 1.0), 3);
    // Step pointing away from the end clamps to the start point only.
    assert_eq!(sweep::step_count(0.0, -1.0, 10.0), 1);
}

#[test]
fn looped_ladder_reuses_endpoints_without_double_measuring() {
    assert_eq!(sweep::ladder(0.0, 1.0, 2.0, true), vec![0.0, 1.0, 2.0, 1.0, 0.0]);
    assert_eq!(sweep::ladder(0.0, 1.0, 2.0, false), vec![0.0, 1.0, 2.0]);
    // A single setpoint has nothing to loop over.
    assert_eq!(sweep::ladder(5.0, 1.0, 5.0, true), vec![5.0]);
}

#[test]
fn positions_calibrate_according_to_their_own_flags() {
    init_tracing();

    let cfg = ExperimentBuilder::new()
        .grating(&[300, 600, 900])
        .auto_calibration(&[true, false, true])
        .lamp(2, 10)
        .extended_range(true)
        .build();
    let plan = plan::compile(&cfg);

    assert_eq!(plan.count_steps(|s| matches!(s, Step::LampOn { .. })), 2);
    assert_eq!(plan.count_steps(|s| matches!(s, Step::LampOff { .. })), 2);
    assert_eq!(
        plan.count_steps(|s| matches!(s, Step::Acquire { calibration: true, .. })),
        2
    );
    assert_eq!(
        plan.count_steps(|s| matches!(s, Step::Acquire { calibration: false, .. })),
        3
    );
}

#[test]
fn single_calibration_flag_broadcasts_over_positions() {
    let cfg = ExperimentBuilder::new()
        .grating(&[300, 600, 900])
        .auto_calibration(&[true])
        .extended_range(true)
        .build();
    let plan = plan::compile(&cfg);

    assert_eq!(
        plan.count_steps(|s| matches!(s, Step::Acquire { calibration: true, .. })),
        3
    );
}

#[test]
fn calibration_leaves_the_grating_alone_outside_extended_range() {
    let cfg = ExperimentBuilder::new()
        .grating(&[300])
        .auto_calibration(&[true])
        .lamp(2, 10)
        .build();
    let plan = plan::compile(&cfg);

    assert_eq!(
        plan.count_steps(|s| matches!(s, Step::Acquire { calibration: true, .. })),
        1
    );
    assert_eq!(plan.count_steps(|s| matches!(s, Step::GratingMove { .. })), 0);
}

#[test]
fn single_step_sweep_contributes_no_wrapper() {
    let cfg = ExperimentBuilder::new()
        .grating(&[300])
        .sweep(20.0, 5.0, 20.0)
        .build();
    let plan = plan::compile(&cfg);

    assert_eq!(plan.count_steps(|s| matches!(s, Step::SetBath { .. })), 0);
    assert_eq!(plan.count_steps(|s| matches!(s, Step::ReadBath)), 0);
}

#[test]
fn sweep_sets_every_setpoint_and_the_after_sweep_target() {
    let cfg = ExperimentBuilder::new()
        .grating(&[300])
        .sweep(20.0, 10.0, 40.0)
        .after_sweep(25.0)
        .build();
    let plan = plan::compile(&cfg);

    // 3 setpoints plus the post-sweep target.
    assert_eq!(plan.count_steps(|s| matches!(s, Step::SetBath { .. })), 4);
    // Each measurement reads the bath alongside the acquisition.
    assert_eq!(plan.count_steps(|s| matches!(s, Step::ReadBath)), 3);
}

#[test]
fn batch_repeats_the_whole_sweep() {
    let cfg = ExperimentBuilder::new()
        .grating(&[300])
        .batch(3, 0.0)
        .sweep(20.0, 10.0, 30.0)
        .build();
    let plan = plan::compile(&cfg);

    let mut batch_holds_sweep = false;
    plan.visit(&mut |node| {
        if let Plan::Seq { label, repeats, steps } = node {
            if label == "batch" {
                assert_eq!(*repeats, 2);
                batch_holds_sweep = steps
                    .iter()
                    .any(|s| matches!(s, Plan::Seq { label, .. } if label == "sweep"));
            }
        }
    });
    assert!(batch_holds_sweep, "the batch must repeat the whole sweep");
}

#[test]
fn batch_break_resets_the_bath_during_the_delay() {
    let cfg = ExperimentBuilder::new()
        .grating(&[300])
        .batch(3, 5.0)
        .sweep(20.0, 10.0, 30.0)
        .build();
    let plan = plan::compile(&cfg);

    // The inter-spectrum delay runs in a fork with the bath travelling back
    // to the sweep's first setpoint.
    let mut fork_sets_start = false;
    plan.visit(&mut |node| {
        if let Plan::Fork { label, branches } = node {
            if label == "batch break" {
                fork_sets_start = branches.iter().any(|b| {
                    let mut found = false;
                    b.visit(&mut |n| {
                        if matches!(n, Plan::Act(Step::SetBath { celsius }) if *celsius == 20.0) {
                            found = true;
                        }
                    });
                    found
                });
            }
        }
    });
    assert!(fork_sets_start, "batch delay fork must re-set the sweep start");
}

#[test]
fn single_position_range_behaves_as_disabled() {
    let cfg = ExperimentBuilder::new()
        .grating(&[300])
        .extended_range(true)
        .build();
    assert!(!cfg.is_ranged());

    let plan = plan::compile(&cfg);
    assert_eq!(plan.count_steps(|s| matches!(s, Step::ShiftIndex { .. })), 0);
}

#[test]
fn one_entry_parameter_lists_broadcast() {
    let cfg = ExperimentBuilder::new()
        .grating(&[300, 600, 900])
        .exposure_s(&[1.5])
        .accumulations(&[7])
        .build();

    assert_eq!(cfg.positions.len(), 3);
    for pos in &cfg.positions {
        assert_eq!(pos.exposure.exposure_s, 1.5);
        assert_eq!(pos.exposure.accumulations, 7);
    }
}

#[test]
fn mismatched_longer_lists_truncate_to_the_shortest() {
    init_tracing();

    let cfg = ExperimentBuilder::new()
        .grating(&[300, 600, 900])
        .exposure_s(&[1.0, 2.0])
        .build();

    assert_eq!(cfg.positions.len(), 2);
    assert_eq!(cfg.positions[1].exposure.exposure_s, 2.0);
}

#[test]
fn range_pass_is_index_neutral() {
    let cfg = ExperimentBuilder::new()
        .grating(&[300, 600, 900])
        .extended_range(true)
        .batch(4, 0.0)
        .sweep(20.0, 10.0, 40.0)
        .build();
    let plan = plan::compile(&cfg);

    let mut pass_sum: Option<i32> = None;
    plan.visit(&mut |node| {
        if let Plan::Seq { label, steps, .. } = node {
            if label == "range pass" && pass_sum.is_none() {
                let sum = steps
                    .iter()
                    .filter_map(|s| match s {
                        Plan::Act(Step::ShiftIndex { delta }) => Some(*delta),
                        _ => None,
                    })
                    .sum();
                pass_sum = Some(sum);
            }
        }
    });

    assert_eq!(pass_sum, Some(0), "a full range pass must be index-neutral");
}

#[test]
fn file_names_are_zero_padded_from_the_numbering_scheme() {
    let naming = FileNaming {
        base: "sample".to_string(),
        directory: ".".to_string(),
        first_number: 5,
        number_step: 2,
        digits: 4,
    };
    assert_eq!(naming.file_name(0), "sample0005");
    assert_eq!(naming.file_name(3), "sample0011");
    // Negative indices clamp to the first number.
    assert_eq!(naming.file_name(-2), "sample0005");
}

#[test]
fn auto_file_names_suffix_positions_in_extended_range() {
    let cfg = ExperimentBuilder::new()
        .grating(&[300, 600])
        .extended_range(true)
        .file_name_base("scan")
        .build();
    let plan = plan::compile(&cfg);

    let mut bases = Vec::new();
    plan.visit(&mut |node| {
        if let Plan::Act(Step::AppendRecord { naming, .. }) = node {
            bases.push(naming.base.clone());
        }
    });
    assert_eq!(bases, vec!["scan_g300".to_string(), "scan_g600".to_string()]);
}
