use proptest::prelude::*;

use specflow::plan::{self, Plan, Step, index, sweep};
use specflow_test_utils::builders::ExperimentBuilder;

// Sweep endpoints and steps on a 0.25-degree grid, so the arithmetic stays
// exact and the properties don't fight float noise.
fn grid(range: std::ops::Range<i32>) -> impl Strategy<Value = f64> {
    range.prop_map(|q| f64::from(q) * 0.25)
}

proptest! {
    #[test]
    fn looped_ladder_has_2n_minus_1_entries(
        start in grid(-200..200),
        step in grid(1..40),
        end in grid(-200..200),
    ) {
        let n = sweep::step_count(start, step, end) as usize;
        let ladder = sweep::ladder(start, step, end, true);
        if n > 1 {
            prop_assert_eq!(ladder.len(), 2 * n - 1);
            // The reversal point is measured exactly once.
            prop_assert_eq!(ladder[n - 1], ladder.iter().copied().fold(ladder[0], |acc, t| {
                if step > 0.0 { acc.max(t) } else { acc.min(t) }
            }));
            // The walk returns to its starting point.
            prop_assert_eq!(ladder[0], ladder[ladder.len() - 1]);
        } else {
            prop_assert_eq!(ladder.len(), 1);
        }
    }

    #[test]
    fn setpoints_never_overshoot_the_end(
        start in grid(-200..200),
        step in grid(1..40),
        end in grid(-200..200),
    ) {
        let points = sweep::setpoints(start, step, end);
        prop_assert!(!points.is_empty());
        prop_assert_eq!(points[0], start);
        if end >= start {
            for p in &points {
                prop_assert!(*p <= end + 1e-9);
            }
        }
    }

    #[test]
    fn pass_rewind_cancels_the_strides(
        positions in 1..12usize,
        batch_spectra in 1..6u32,
        batched_sweep in any::<bool>(),
        loop_back in any::<bool>(),
    ) {
        let stride = index::position_stride(batch_spectra, batched_sweep, loop_back);
        let hops = (positions - 1) as i32;
        prop_assert_eq!(hops * stride + index::pass_rewind(positions, stride), 0);
    }

    #[test]
    fn compiled_range_passes_are_index_neutral(
        positions in 2..6usize,
        batch_spectra in 2..5u32,
        sweep_on in any::<bool>(),
        loop_back in any::<bool>(),
    ) {
        let grating: Vec<i32> = (0..positions).map(|i| 300 + 100 * i as i32).collect();
        let mut builder = ExperimentBuilder::new()
            .grating(&grating)
            .extended_range(true)
            .batch(batch_spectra, 0.0);
        if sweep_on {
            builder = builder.sweep(20.0, 10.0, 40.0);
            if loop_back {
                builder = builder.loop_back(0.0);
            }
        }
        let cfg = builder.build();
        let compiled = plan::compile(&cfg);

        // Every range pass in the tree sums its index shifts to zero.
        let mut checked = 0;
        compiled.visit(&mut |node| {
            if let Plan::Seq { label, steps, .. } = node {
                if label == "range pass" {
                    let sum: i32 = steps
                        .iter()
                        .filter_map(|s| match s {
                            Plan::Act(Step::ShiftIndex { delta }) => Some(*delta),
                            _ => None,
                        })
                        .sum();
                    assert_eq!(sum, 0, "range pass is not index-neutral");
                    checked += 1;
                }
            }
        });
        prop_assert!(checked > 0, "no range pass found in the compiled plan");
    }
}
