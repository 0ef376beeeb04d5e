//! Ticker: the fixed-interval update loop.
//!
//! Each tick measures the wall-clock time since the previous tick, hands it
//! to the update hook, then sleeps a full tick budget. There is no overrun
//! compensation: a slow hook stretches the tick instead of being caught up.

use super::state::SharedState;
use std::thread;
use std::time::{Duration, Instant};

/// Sleep budget per tick for `rate` ticks per second.
///
/// Whole milliseconds, rounded down. A rate of 0 is treated as 1. Rates
/// above 1000 give a zero budget; no minimum sleep is enforced.
pub fn tick_budget(rate: u32) -> Duration {
    Duration::from_millis(1000 / u64::from(rate.max(1)))
}

/// Run update ticks until the run flag is cleared.
///
/// The rate is re-read every tick. The first delta is measured from the
/// moment this function starts.
///
/// # Arguments
///
/// * `state` - Shared run flag and target rate.
/// * `on_tick` - Called with the time elapsed since the previous tick.
pub(crate) fn run_loop(state: &SharedState, mut on_tick: impl FnMut(Duration)) {
    let mut last = Instant::now();

    while state.is_running() {
        let now = Instant::now();
        let delta = now - last;
        last = now;

        on_tick(delta);

        thread::sleep(tick_budget(state.target_rate()));
    }
}
