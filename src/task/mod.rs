// src/task/mod.rs

//! The cooperative task state machine.
//!
//! A task is a polled state machine over [`Status`]. Leaves either perform
//! their effect immediately ([`action::ActionTask`]) or wait on a hardware
//! condition ([`wait::WaitTask`]); composites ([`sequence::TaskSequence`],
//! [`fork_join::ForkJoin`]) drive their children. Completion is observed by
//! exactly one sink: the parent reading the returned status.

pub mod action;
pub mod build;
pub mod fork_join;
pub mod sequence;
pub mod wait;

pub use action::ActionTask;
pub use build::build;
pub use fork_join::ForkJoin;
pub use sequence::TaskSequence;
pub use wait::WaitTask;

use std::fmt;

use crate::hardware::Rig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Running,
    Finished,
    Failed,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Finished | Status::Failed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Idle => "idle",
            Status::Running => "running",
            Status::Finished => "finished",
            Status::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A cooperatively-scheduled unit of work.
///
/// - `start` performs or initiates the effect and returns the new status.
/// - `poll` advances a running task; it is a no-op in any other state.
/// - `stop` is idempotent, forces `Idle` and actively commands the hardware
///   to stop whatever this task set in motion. It never sends a hardware
///   stop twice.
/// - `reset` returns a terminal task to `Idle` for the next repeat run,
///   without touching hardware.
pub trait Task: Send {
    fn label(&self) -> &str;
    fn status(&self) -> Status;
    fn start(&mut self, rig: &mut Rig) -> Status;
    fn poll(&mut self, rig: &mut Rig) -> Status;
    fn stop(&mut self, rig: &mut Rig);
    fn reset(&mut self);
}
