// src/plan/sweep.rs

//! Temperature-sweep arithmetic.

/// Number of setpoints visited when stepping from `start` towards `end`.
///
/// `floor((end - start) / step) + 1` when `step` points from `start` towards
/// `end`; a zero difference, a zero step, or a step pointing away from `end`
/// all yield a single setpoint.
pub fn step_count(start: f64, step: f64, end: f64) -> u32 {
    let diff = end - start;
    if diff == 0.0 || step == 0.0 {
        return 1;
    }
    if (diff > 0.0) != (step > 0.0) {
        return 1;
    }
    (diff / step).floor() as u32 + 1
}

/// The setpoints of a one-way sweep, in visit order.
pub fn setpoints(start: f64, step: f64, end: f64) -> Vec<f64> {
    (0..step_count(start, step, end))
        .map(|i| start + f64::from(i) * step)
        .collect()
}

/// The full temperature ladder.
///
/// Looping appends the reverse walk, re-using the endpoint without measuring
/// it twice, so a looped ladder over N setpoints has `2N - 1` entries.
pub fn ladder(start: f64, step: f64, end: f64, loop_back: bool) -> Vec<f64> {
    let mut points = setpoints(start, step, end);
    if loop_back && points.len() > 1 {
        let back: Vec<f64> = points[..points.len() - 1].iter().rev().copied().collect();
        points.extend(back);
    }
    points
}
