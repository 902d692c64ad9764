// src/task/sequence.rs

//! Ordered composite with a repeat count.

use tracing::{debug, warn};

use crate::hardware::Rig;
use crate::task::{Status, Task};

/// Runs its children in order, `repeats + 1` times in total.
///
/// `repeats = 0` runs the children once. An empty sequence finishes
/// immediately on start. A child failure fails the sequence after stopping
/// the remaining children; a stop mid-repeat discards the remaining runs.
pub struct TaskSequence {
    label: String,
    children: Vec<Box<dyn Task>>,
    repeats: u32,
    cursor: usize,
    runs_done: u32,
    status: Status,
}

impl TaskSequence {
    pub fn new(label: impl Into<String>, repeats: u32, children: Vec<Box<dyn Task>>) -> Self {
        Self {
            label: label.into(),
            children,
            repeats,
            cursor: 0,
            runs_done: 0,
            status: Status::Idle,
        }
    }

    /// Start children from the cursor, cascading through any that finish
    /// within their own `start`. Returns the sequence status.
    fn advance(&mut self, rig: &mut Rig) -> Status {
        loop {
            if self.cursor >= self.children.len() {
                self.runs_done += 1;
                if self.runs_done > self.repeats {
                    debug!(task = %self.label, runs = self.runs_done, "sequence finished");
                    self.status = Status::Finished;
                    return self.status;
                }
                debug!(
                    task = %self.label,
                    run = self.runs_done + 1,
                    total = self.repeats + 1,
                    "sequence repeating"
                );
                for child in &mut self.children {
                    child.reset();
                }
                self.cursor = 0;
            }

            let child = &mut self.children[self.cursor];
            debug!(task = %self.label, child = %child.label(), "starting child");
            match child.start(rig) {
                Status::Finished => {
                    self.cursor += 1;
                }
                Status::Running => {
                    self.status = Status::Running;
                    return self.status;
                }
                Status::Failed => {
                    return self.fail(rig);
                }
                Status::Idle => {
                    // A child that refuses to start cannot make progress.
                    warn!(task = %self.label, child = %child.label(), "child did not start");
                    return self.fail(rig);
                }
            }
        }
    }

    fn fail(&mut self, rig: &mut Rig) -> Status {
        // Stop everything this run may have set in motion; stop on an idle
        // or terminal child is a no-op.
        for child in &mut self.children {
            child.stop(rig);
        }
        warn!(task = %self.label, "sequence failed");
        self.status = Status::Failed;
        self.status
    }
}

impl Task for TaskSequence {
    fn label(&self) -> &str {
        &self.label
    }

    fn status(&self) -> Status {
        self.status
    }

    fn start(&mut self, rig: &mut Rig) -> Status {
        self.cursor = 0;
        self.runs_done = 0;
        if self.children.is_empty() {
            self.status = Status::Finished;
            return self.status;
        }
        self.status = Status::Running;
        self.advance(rig)
    }

    fn poll(&mut self, rig: &mut Rig) -> Status {
        if self.status != Status::Running {
            return self.status;
        }
        match self.children[self.cursor].poll(rig) {
            Status::Running => self.status,
            Status::Finished => {
                self.cursor += 1;
                self.advance(rig)
            }
            Status::Failed => self.fail(rig),
            Status::Idle => self.status,
        }
    }

    fn stop(&mut self, rig: &mut Rig) {
        for child in &mut self.children {
            child.stop(rig);
        }
        self.cursor = 0;
        self.runs_done = 0;
        self.status = Status::Idle;
    }

    fn reset(&mut self) {
        for child in &mut self.children {
            child.reset();
        }
        self.cursor = 0;
        self.runs_done = 0;
        self.status = Status::Idle;
    }
}
