// src/plan/index.rs

//! Exposure-index arithmetic.
//!
//! The exposure index selects the file number of the next spectrum. Within
//! an extended-range pass the index advances by a stride between positions
//! and rewinds at the end, so a full pass is net-zero; the outer batch and
//! sweep wrappers advance the index by one slot per repetition. Spectra
//! taken at the same position across repetitions therefore number
//! consecutively.

/// Index stride between consecutive positions of one range pass.
///
/// When a batch repeats a sweep, every position accumulates `num_spectra`
/// files per setpoint, so the stride widens accordingly; a looped sweep
/// visits each setpoint twice and doubles it again.
pub fn position_stride(batch_spectra: u32, batched_sweep: bool, loop_back: bool) -> i32 {
    let base: i32 = if batched_sweep {
        i32::try_from(batch_spectra).unwrap_or(i32::MAX)
    } else {
        1
    };
    if loop_back { base * 2 } else { base }
}

/// Rewind applied after the last position of a pass, cancelling the
/// accumulated per-position strides exactly.
pub fn pass_rewind(positions: usize, stride: i32) -> i32 {
    let hops = i32::try_from(positions.saturating_sub(1)).unwrap_or(i32::MAX);
    -(hops * stride)
}
