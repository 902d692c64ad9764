// src/state/mod.rs

//! Shared experiment state.
//!
//! A single record behind one mutex. Observers (the engine loop, tests, a
//! future UI) read snapshots; tasks mutate it through short accessor calls.
//! Guards are never held across a tick boundary or an `.await`.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::ExposureParams;

/// Conditions the experiment can be waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitFor {
    Delay,
    Acquisition,
    Motor,
    Grating,
    Lamp,
}

impl WaitFor {
    pub const ALL: [WaitFor; 5] = [
        WaitFor::Delay,
        WaitFor::Acquisition,
        WaitFor::Motor,
        WaitFor::Grating,
        WaitFor::Lamp,
    ];

    fn slot(self) -> usize {
        match self {
            WaitFor::Delay => 0,
            WaitFor::Acquisition => 1,
            WaitFor::Motor => 2,
            WaitFor::Grating => 3,
            WaitFor::Lamp => 4,
        }
    }
}

impl fmt::Display for WaitFor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WaitFor::Delay => "delay",
            WaitFor::Acquisition => "acquisition",
            WaitFor::Motor => "motor",
            WaitFor::Grating => "grating",
            WaitFor::Lamp => "lamp",
        };
        f.write_str(s)
    }
}

/// Reference-counted wait flag set.
///
/// Each flag carries a count, not a bit: two concurrent waits on the same
/// condition each add the flag, and the flag stays set until both have
/// removed it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitFlags {
    counts: [u32; 5],
}

impl WaitFlags {
    pub fn add(&mut self, flag: WaitFor) {
        self.counts[flag.slot()] += 1;
    }

    /// Saturating: removing a flag that is not set is a no-op.
    pub fn remove(&mut self, flag: WaitFor) {
        let slot = flag.slot();
        self.counts[slot] = self.counts[slot].saturating_sub(1);
    }

    pub fn contains(&self, flag: WaitFor) -> bool {
        self.counts[flag.slot()] > 0
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    pub fn clear(&mut self) {
        self.counts = [0; 5];
    }

    pub fn active(&self) -> Vec<WaitFor> {
        WaitFor::ALL
            .into_iter()
            .filter(|f| self.contains(*f))
            .collect()
    }
}

/// The mutable experiment record.
///
/// Timestamps are monotonic offsets from the rig clock's epoch.
#[derive(Debug, Clone, Default)]
pub struct ExperimentState {
    /// Index into the file-number sequence for the next spectrum.
    pub exposure_index: i32,

    /// Live accumulation/frame counters mirrored from the spectrometer while
    /// an acquisition is in flight.
    pub accumulation: u32,
    pub frame: u32,

    pub stage_position: Option<i32>,
    pub grating_position: Option<i32>,

    pub last_exposure: Option<ExposureParams>,
    pub last_bath_reading: Option<f64>,
    pub last_bath_setpoint: Option<f64>,

    pub measurement_started: Option<Duration>,
    pub measurement_finished: Option<Duration>,

    pub waiting_started: Option<Duration>,
    pub waiting_expected_end: Option<Duration>,
    pub waiting_finished: Option<Duration>,

    pub waiting: WaitFlags,
}

/// Cloneable handle to the single-lock experiment state.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<ExperimentState>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a closure under the lock. Keep closures short; never call back
    /// into task or hardware code from inside.
    pub fn with<R>(&self, f: impl FnOnce(&mut ExperimentState) -> R) -> R {
        let mut guard = self.inner.lock().unwrap();
        f(&mut guard)
    }

    pub fn snapshot(&self) -> ExperimentState {
        self.with(|s| s.clone())
    }

    pub fn add_wait(&self, flag: WaitFor) {
        self.with(|s| s.waiting.add(flag));
    }

    pub fn remove_wait(&self, flag: WaitFor) {
        self.with(|s| s.waiting.remove(flag));
    }

    pub fn is_waiting_on(&self, flag: WaitFor) -> bool {
        self.with(|s| s.waiting.contains(flag))
    }

    pub fn exposure_index(&self) -> i32 {
        self.with(|s| s.exposure_index)
    }

    pub fn shift_exposure_index(&self, delta: i32) -> i32 {
        self.with(|s| {
            s.exposure_index += delta;
            s.exposure_index
        })
    }
}
