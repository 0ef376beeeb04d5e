//! Renderer: the fixed-interval render loop and its frame-rate meter.
//!
//! Same pacing as the update ticker, on its own thread and timer. Frames
//! are counted and the count is published once per elapsed second, so the
//! reported rate lags by up to a second.

use super::state::SharedState;
use super::ticker::tick_budget;
use std::thread;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(1);

/// Counts frames over one-second windows.
#[derive(Debug, Clone)]
pub struct RateMeter {
    window_start: Instant,
    frames: u32,
}

impl RateMeter {
    /// Start a window at `now`.
    pub const fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
        }
    }

    /// Count a frame starting at `now`.
    ///
    /// Once a second or more has passed since the window opened, returns
    /// the number of frames in it (including this one) and opens a new
    /// window.
    pub fn frame(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        if now.duration_since(self.window_start) < WINDOW {
            return None;
        }
        let frames = self.frames;
        self.frames = 0;
        self.window_start = now;
        Some(frames)
    }
}

/// Run frames until the run flag is cleared, publishing the measured rate
/// into `state`.
pub(crate) fn run_loop(state: &SharedState, mut on_frame: impl FnMut()) {
    let mut meter = RateMeter::new(Instant::now());

    while state.is_running() {
        if let Some(fps) = meter.frame(Instant::now()) {
            state.publish_rate(fps);
            tracing::trace!(fps, "frame rate measured");
        }

        on_frame();

        thread::sleep(tick_budget(state.target_rate()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_publishes_once_per_second() {
        let start = Instant::now();
        let mut meter = RateMeter::new(start);

        for i in 0..59 {
            assert_eq!(meter.frame(start + Duration::from_millis(i * 16)), None);
        }
        assert_eq!(meter.frame(start + Duration::from_millis(1000)), Some(60));

        // New window opens at the publishing frame.
        assert_eq!(meter.frame(start + Duration::from_millis(1500)), None);
        assert_eq!(meter.frame(start + Duration::from_millis(2000)), Some(2));
    }

    #[test]
    fn test_meter_long_gap() {
        let start = Instant::now();
        let mut meter = RateMeter::new(start);
        assert_eq!(meter.frame(start + Duration::from_secs(3)), Some(1));
    }

    #[test]
    fn test_render_loop_measures_rate() {
        let state = SharedState::new(50);
        state.set_running(true);

        let start = Instant::now();
        let mut frames = 0u32;
        run_loop(&state, || {
            frames += 1;
            if start.elapsed() >= Duration::from_millis(1300) {
                state.set_running(false);
            }
        });

        // 20 ms budget: about 50 frames per second.
        let measured = state.measured_rate();
        assert!((40..=52).contains(&measured), "measured {measured}");
        assert!(frames > measured);
    }
}
