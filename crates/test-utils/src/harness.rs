use std::time::Duration;

use specflow::engine::Engine;
use specflow::hardware::sim::SimClock;
use specflow::task::Status;

/// Drive an engine to a terminal status, advancing the simulated clock by
/// `tick` per engine tick. Panics if the engine does not finish within
/// `max_ticks`.
pub fn drive_to_terminal(
    engine: &mut Engine,
    clock: &SimClock,
    tick: Duration,
    max_ticks: u32,
) -> Status {
    let mut status = engine.start();
    let mut ticks = 0;
    while !status.is_terminal() {
        assert!(
            ticks < max_ticks,
            "engine did not reach a terminal status within {max_ticks} ticks"
        );
        clock.advance(tick);
        status = engine.tick();
        ticks += 1;
    }
    status
}
