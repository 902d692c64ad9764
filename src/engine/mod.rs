// src/engine/mod.rs

//! The cooperative engine.
//!
//! [`Engine`] is a pure synchronous state machine: it owns the task tree and
//! the rig, and advances one step per `tick`. The async IO shell lives in
//! [`runtime`]: a tokio interval drives the ticks, and a channel delivers
//! cancellation (Ctrl-C or programmatic).

pub mod runtime;

pub use runtime::{RunOutcome, Runtime, RuntimeEvent};

use tracing::{info, warn};

use crate::hardware::Rig;
use crate::plan::Plan;
use crate::task::{self, Status, Task};

pub struct Engine {
    root: Box<dyn Task>,
    rig: Rig,
    ticks: u64,
    cancelled: bool,
}

impl Engine {
    pub fn new(plan: Plan, rig: Rig) -> Self {
        Self {
            root: task::build(plan),
            rig,
            ticks: 0,
            cancelled: false,
        }
    }

    pub fn status(&self) -> Status {
        self.root.status()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The rig, for observers and tests.
    pub fn rig(&mut self) -> &mut Rig {
        &mut self.rig
    }

    pub fn start(&mut self) -> Status {
        info!(task = %self.root.label(), "experiment starting");
        self.root.start(&mut self.rig)
    }

    /// Advance the task tree by one step. Call once per timer tick.
    pub fn tick(&mut self) -> Status {
        self.ticks += 1;
        let status = self.root.poll(&mut self.rig);
        if status.is_terminal() {
            info!(task = %self.root.label(), %status, ticks = self.ticks, "experiment done");
        }
        status
    }

    /// Cascade stop from the root and leave the hardware in a safe state.
    ///
    /// All hardware stops are issued synchronously before this returns.
    /// Idempotent.
    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;

        info!(task = %self.root.label(), "cancelling experiment");
        self.root.stop(&mut self.rig);

        if let Err(err) = self.rig.stage.power(false) {
            warn!(error = %err, "failed to power off stage during cancel");
        }
        self.rig.state.with(|s| s.waiting.clear());
    }
}
