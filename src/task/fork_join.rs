// src/task/fork_join.rs

//! Parallel composite joining on completion of all branches.

use tracing::{debug, warn};

use crate::hardware::Rig;
use crate::task::{Status, Task};

/// Starts all branches together and finishes when every branch has
/// finished.
///
/// On a branch failure the join first stops every surviving branch, issuing
/// their hardware stops synchronously, and only then reports `Failed`.
pub struct ForkJoin {
    label: String,
    branches: Vec<Box<dyn Task>>,
    status: Status,
}

impl ForkJoin {
    pub fn new(label: impl Into<String>, branches: Vec<Box<dyn Task>>) -> Self {
        Self {
            label: label.into(),
            branches,
            status: Status::Idle,
        }
    }

    fn join(&mut self, rig: &mut Rig) -> Status {
        let mut any_failed = false;
        let mut all_finished = true;

        for branch in &self.branches {
            match branch.status() {
                Status::Failed => any_failed = true,
                Status::Finished => {}
                _ => all_finished = false,
            }
        }

        if any_failed {
            // Wait-for-all-stops: every surviving branch is stopped before
            // the failure propagates to the parent.
            for branch in &mut self.branches {
                branch.stop(rig);
            }
            warn!(task = %self.label, "branch failed; all siblings stopped");
            self.status = Status::Failed;
        } else if all_finished {
            debug!(task = %self.label, "all branches finished");
            self.status = Status::Finished;
        }
        self.status
    }
}

impl Task for ForkJoin {
    fn label(&self) -> &str {
        &self.label
    }

    fn status(&self) -> Status {
        self.status
    }

    fn start(&mut self, rig: &mut Rig) -> Status {
        if self.branches.is_empty() {
            self.status = Status::Finished;
            return self.status;
        }
        self.status = Status::Running;
        for branch in &mut self.branches {
            debug!(task = %self.label, branch = %branch.label(), "starting branch");
            branch.start(rig);
        }
        self.join(rig)
    }

    fn poll(&mut self, rig: &mut Rig) -> Status {
        if self.status != Status::Running {
            return self.status;
        }
        for branch in &mut self.branches {
            if branch.status() == Status::Running {
                branch.poll(rig);
            }
        }
        self.join(rig)
    }

    fn stop(&mut self, rig: &mut Rig) {
        for branch in &mut self.branches {
            branch.stop(rig);
        }
        self.status = Status::Idle;
    }

    fn reset(&mut self) {
        for branch in &mut self.branches {
            branch.reset();
        }
        self.status = Status::Idle;
    }
}
