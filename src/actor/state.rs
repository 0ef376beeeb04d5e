//! Flags and counters shared by every loop of one engine run.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// Lifecycle of an [`Engine`](super::Engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// Constructed, `run()` not called yet.
    Idle,
    /// `run()` is executing and the loops are live.
    Running,
    /// A stop was observed; threads are being joined and hooks finished.
    ShuttingDown,
    /// `run()` has returned. The engine cannot be run again.
    Finished,
}

impl EngineState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::ShuttingDown,
            _ => Self::Finished,
        }
    }

    const fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
            Self::ShuttingDown => 2,
            Self::Finished => 3,
        }
    }
}

/// Run flag, target rate and measured rate of one engine.
///
/// All plain atomics: a loop may observe a stale value for at most one of
/// its iterations.
#[derive(Debug)]
pub struct SharedState {
    running: AtomicBool,
    stop_requested: AtomicBool,
    phase: AtomicU8,
    target_rate: AtomicU32,
    measured_rate: AtomicU32,
}

impl SharedState {
    /// Create a stopped state with the given target rate.
    pub const fn new(target_rate: u32) -> Self {
        Self {
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            phase: AtomicU8::new(0),
            target_rate: AtomicU32::new(target_rate),
            measured_rate: AtomicU32::new(0),
        }
    }

    /// Whether the worker loops should keep going.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Set the run flag directly.
    #[inline]
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// Raise the run flag unless a stop was already requested.
    ///
    /// A stop racing with this call always wins.
    pub fn start_running(&self) {
        self.running.store(true, Ordering::SeqCst);
        if self.stop_requested.load(Ordering::SeqCst) {
            self.running.store(false, Ordering::SeqCst);
        }
    }

    /// Clear the run flag and remember that a stop was asked for.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> EngineState {
        EngineState::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Move to `next`.
    pub(crate) fn set_phase(&self, next: EngineState) {
        self.phase.store(next.as_u8(), Ordering::Release);
    }

    /// Move from `Idle` to `Running`. Fails if the engine ever ran.
    pub(crate) fn begin(&self) -> bool {
        self.phase
            .compare_exchange(
                EngineState::Idle.as_u8(),
                EngineState::Running.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Ticks/frames per second the loops aim for.
    #[inline]
    pub fn target_rate(&self) -> u32 {
        self.target_rate.load(Ordering::Relaxed)
    }

    /// Change the target rate; loops pick it up on their next tick.
    #[inline]
    pub fn set_target_rate(&self, rate: u32) {
        self.target_rate.store(rate, Ordering::Relaxed);
    }

    /// Frames rendered during the last full second.
    #[inline]
    pub fn measured_rate(&self) -> u32 {
        self.measured_rate.load(Ordering::Relaxed)
    }

    /// Publish a new measurement. Only the render loop calls this.
    #[inline]
    pub fn publish_rate(&self, rate: u32) {
        self.measured_rate.store(rate, Ordering::Relaxed);
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(60)
    }
}
