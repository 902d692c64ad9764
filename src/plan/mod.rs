// src/plan/mod.rs

//! The plan compiler.
//!
//! Compilation turns a validated [`ExperimentConfig`] into a pure [`Plan`]
//! data tree: sequences, fork/join groups, and fully-resolved leaf steps.
//! The tree contains no callbacks and no hardware handles, so tests can
//! assert its exact shape; `task::build` later turns it into a runnable
//! task tree.

pub mod builders;
pub mod index;
pub mod sweep;

use std::fmt::Write as _;
use std::time::Duration;

use crate::config::{ExperimentConfig, ExposureParams, FileNaming};

/// An immediate-effect leaf step. All parameters are resolved at compile
/// time; only the exposure index is read at run time.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Acquire {
        calibration: bool,
        exposure: ExposureParams,
    },
    LogExposure {
        exposure: ExposureParams,
    },
    AppendRecord {
        naming: FileNaming,
        exposure: ExposureParams,
    },
    ReadBath,
    SetBath {
        celsius: f64,
    },
    LampOn {
        relay: u8,
    },
    LampOff {
        relay: u8,
    },
    StagePower {
        on: bool,
    },
    StageMove {
        target: i32,
    },
    GratingMove {
        target: i32,
    },
    ShiftIndex {
        delta: i32,
    },
}

/// A polled wait leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitSpec {
    /// Fixed delay.
    Delay { duration: Duration },
    /// Lamp warm-up; a fixed delay flagged as a lamp wait.
    LampSettle { duration: Duration },
    /// Acquisition in flight.
    Acquisition,
    /// Stage motor moving; polling starts after `initial_delay`.
    Motor { initial_delay: Duration },
    /// Grating axis moving; polling starts after `initial_delay`.
    Grating { initial_delay: Duration },
}

/// Compiled plan tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Ordered children, executed `repeats + 1` times in total.
    Seq {
        label: String,
        repeats: u32,
        steps: Vec<Plan>,
    },
    /// Parallel branches joined on completion of all of them.
    Fork { label: String, branches: Vec<Plan> },
    Act(Step),
    Wait(WaitSpec),
}

impl Plan {
    pub fn seq(label: impl Into<String>, repeats: u32, steps: Vec<Plan>) -> Plan {
        Plan::Seq {
            label: label.into(),
            repeats,
            steps,
        }
    }

    pub fn fork(label: impl Into<String>, branches: Vec<Plan>) -> Plan {
        Plan::Fork {
            label: label.into(),
            branches,
        }
    }

    /// Depth-first visit over the whole tree, self included.
    pub fn visit(&self, f: &mut impl FnMut(&Plan)) {
        f(self);
        match self {
            Plan::Seq { steps, .. } => {
                for s in steps {
                    s.visit(f);
                }
            }
            Plan::Fork { branches, .. } => {
                for b in branches {
                    b.visit(f);
                }
            }
            Plan::Act(_) | Plan::Wait(_) => {}
        }
    }

    /// Count leaf steps matching a predicate. Repeat counts are *not*
    /// multiplied in; this counts plan nodes, not executions.
    pub fn count_steps(&self, pred: impl Fn(&Step) -> bool) -> usize {
        let mut n = 0;
        self.visit(&mut |p| {
            if let Plan::Act(step) = p {
                if pred(step) {
                    n += 1;
                }
            }
        });
        n
    }

    /// Human-readable tree rendering, used by `--dry-run`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        match self {
            Plan::Seq {
                label,
                repeats,
                steps,
            } => {
                if *repeats > 0 {
                    let _ = writeln!(out, "{pad}{label} (x{})", repeats + 1);
                } else {
                    let _ = writeln!(out, "{pad}{label}");
                }
                for s in steps {
                    s.render_into(out, depth + 1);
                }
            }
            Plan::Fork { label, branches } => {
                let _ = writeln!(out, "{pad}{label} [fork]");
                for b in branches {
                    b.render_into(out, depth + 1);
                }
            }
            Plan::Act(step) => {
                let _ = writeln!(out, "{pad}- {}", describe_step(step));
            }
            Plan::Wait(wait) => {
                let _ = writeln!(out, "{pad}~ {}", describe_wait(wait));
            }
        }
    }
}

fn describe_step(step: &Step) -> String {
    match step {
        Step::Acquire {
            calibration,
            exposure,
        } => {
            let kind = if *calibration { "calibration" } else { "measurement" };
            format!(
                "acquire {kind} ({}s x{} acc, {} frm)",
                exposure.exposure_s, exposure.accumulations, exposure.frames
            )
        }
        Step::LogExposure { .. } => "log exposure parameters".to_string(),
        Step::AppendRecord { naming, .. } => {
            format!("append measurement record ({}*)", naming.base)
        }
        Step::ReadBath => "read bath temperature".to_string(),
        Step::SetBath { celsius } => format!("set bath to {celsius} C"),
        Step::LampOn { relay } => format!("lamp on (relay {relay})"),
        Step::LampOff { relay } => format!("lamp off (relay {relay})"),
        Step::StagePower { on } => format!("stage power {}", if *on { "on" } else { "off" }),
        Step::StageMove { target } => format!("stage to {target}"),
        Step::GratingMove { target } => format!("grating to {target}"),
        Step::ShiftIndex { delta } => format!("shift exposure index by {delta}"),
    }
}

fn describe_wait(wait: &WaitSpec) -> String {
    match wait {
        WaitSpec::Delay { duration } => format!("wait {:.3}s", duration.as_secs_f64()),
        WaitSpec::LampSettle { duration } => {
            format!("wait for lamp ({:.3}s)", duration.as_secs_f64())
        }
        WaitSpec::Acquisition => "wait for acquisition".to_string(),
        WaitSpec::Motor { .. } => "wait for motor".to_string(),
        WaitSpec::Grating { .. } => "wait for grating".to_string(),
    }
}

/// Compile an experiment configuration into its root plan.
///
/// Composition order, innermost out:
/// 1. per-position exposure unit (with optional calibration interleaving),
/// 2. extended-range pass over all grating positions,
/// 3. temperature sweep,
/// 4. batch repetition of the whole sweep-and-range composition,
/// 5. epilogue returning the grating to the first position.
pub fn compile(cfg: &ExperimentConfig) -> Plan {
    let sweeping = builders::active_sweep(cfg).is_some();
    let ranged = cfg.is_ranged();
    let batched = cfg.is_batched();

    let loop_back = builders::active_sweep(cfg).is_some_and(|s| s.loop_back);
    let stride = index::position_stride(cfg.batch.num_spectra, batched && sweeping, loop_back);

    let mut body = if ranged {
        builders::range_pass(cfg, sweeping, stride)
    } else {
        builders::exposure_unit(cfg, 0, cfg.positions[0].auto_cal, sweeping)
    };

    if let Some(sweep) = builders::active_sweep(cfg) {
        body = builders::sweep_wrapper(sweep, body);
    }

    if batched {
        let next_setpoint = builders::active_sweep(cfg).map(|s| s.start);
        body = builders::batch_wrapper(cfg, body, next_setpoint);
    }

    let mut steps = vec![body];
    if ranged {
        steps.extend(builders::grating_leg(cfg, cfg.positions[0].grating));
    }

    Plan::seq("experiment", 0, steps)
}
