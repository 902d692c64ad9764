// src/engine/runtime.rs

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::task::Status;

use super::Engine;

/// Events flowing into the runtime from outside (Ctrl-C handler, a
/// supervising UI, tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// Stop the experiment and unwind to a hardware-safe state.
    CancelRequested,
}

/// How a runtime run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed,
    Cancelled,
}

/// Async IO shell around [`Engine`].
///
/// The engine holds all semantics; this struct only owns the tick interval
/// and the event channel. Cancellation is not an error: the engine unwinds
/// synchronously and the run reports [`RunOutcome::Cancelled`].
pub struct Runtime {
    engine: Engine,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    tick: Duration,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(engine: Engine, event_rx: mpsc::Receiver<RuntimeEvent>, tick: Duration) -> Self {
        Self {
            engine,
            event_rx,
            tick,
        }
    }

    /// Main loop: one engine step per interval tick, until the task tree
    /// reaches a terminal state or a cancel arrives.
    pub async fn run(mut self) -> Result<RunOutcome> {
        info!(tick_ms = self.tick.as_millis() as u64, "specflow runtime started");

        match self.engine.start() {
            Status::Finished => {
                info!("experiment finished before the first tick");
                return Ok(RunOutcome::Completed);
            }
            Status::Failed => {
                warn!("experiment failed to start");
                return Ok(RunOutcome::Failed);
            }
            _ => {}
        }

        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.engine.tick() {
                        Status::Finished => {
                            info!("runtime exiting: experiment completed");
                            return Ok(RunOutcome::Completed);
                        }
                        Status::Failed => {
                            warn!("runtime exiting: experiment failed");
                            return Ok(RunOutcome::Failed);
                        }
                        status => {
                            debug!(%status, "tick");
                        }
                    }
                }

                event = self.event_rx.recv() => {
                    match event {
                        Some(RuntimeEvent::CancelRequested) => {
                            info!("cancel requested; unwinding");
                        }
                        None => {
                            info!("runtime event channel closed; unwinding");
                        }
                    }
                    self.engine.cancel();
                    return Ok(RunOutcome::Cancelled);
                }
            }
        }
    }
}
