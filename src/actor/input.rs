//! Input Actor: Dedicated thread that turns raw input bytes into key events.
//!
//! The capture thread waits on its [`InputSource`] with a short timeout,
//! decodes what arrives and appends it to a [`KeyQueue`]. Consumers read
//! the queue from any thread.

use super::messages::{decode, KeyEvent};
use super::queue::KeyQueue;
use crate::error::EngineError;
use crate::terminal::{InputSource, RawModeSnapshot};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default readability wait per poll.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// Default pause at the end of every capture iteration.
pub const DEFAULT_IDLE_SLEEP: Duration = Duration::from_millis(10);

/// The asynchronous input capture subsystem.
///
/// Starting it switches the terminal (if any) to raw mode; stopping it
/// joins the capture thread and restores the terminal. Only one capture
/// backed by the real terminal can be running per process.
pub struct InputCapture {
    /// Events decoded so far.
    queue: KeyQueue,
    /// Cleared to ask the capture thread to exit.
    running: Arc<AtomicBool>,
    /// Capture thread; hands the source back when it exits.
    handle: Option<JoinHandle<Box<dyn InputSource>>>,
    /// The source while no thread owns it.
    source: Option<Box<dyn InputSource>>,
    /// Terminal settings to put back on stop.
    snapshot: Option<RawModeSnapshot>,
    poll_timeout: Duration,
    idle_sleep: Duration,
}

impl InputCapture {
    /// Create a stopped capture subsystem over `source`.
    pub fn new(source: Box<dyn InputSource>) -> Self {
        Self::with_timing(source, DEFAULT_POLL_TIMEOUT, DEFAULT_IDLE_SLEEP)
    }

    /// Create a stopped capture subsystem with custom timing.
    ///
    /// # Arguments
    ///
    /// * `source` - Byte stream to read keys from.
    /// * `poll_timeout` - Bound on each readability wait, and on each
    ///   escape follow-up byte.
    /// * `idle_sleep` - Pause at the end of every capture iteration.
    ///
    /// # Returns
    ///
    /// The capture subsystem, not yet running.
    pub fn with_timing(
        source: Box<dyn InputSource>,
        poll_timeout: Duration,
        idle_sleep: Duration,
    ) -> Self {
        Self {
            queue: KeyQueue::new(),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
            source: Some(source),
            snapshot: None,
            poll_timeout,
            idle_sleep,
        }
    }

    /// Enter raw mode and spawn the capture thread.
    ///
    /// Does nothing if already running. Raw mode failures are logged and
    /// capture proceeds anyway; only a failed thread spawn is an error.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.handle.is_some() {
            return Ok(());
        }
        let Some(mut source) = self.source.take() else {
            tracing::warn!("input source was lost by a previous capture thread; not starting");
            return Ok(());
        };

        match source.enter_raw_mode() {
            Ok(snapshot) => self.snapshot = snapshot,
            Err(e) => tracing::warn!("continuing without raw mode: {e}"),
        }

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let queue = self.queue.clone();
        let (poll_timeout, idle_sleep) = (self.poll_timeout, self.idle_sleep);

        let spawned = thread::Builder::new()
            .name("gridloop-input".to_string())
            .spawn(move || {
                Self::run_loop(source.as_mut(), &queue, &running, poll_timeout, idle_sleep);
                source
            });

        match spawned {
            Ok(handle) => {
                tracing::debug!("input capture started");
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                self.restore_terminal();
                Err(EngineError::Spawn {
                    thread: "input",
                    source: e,
                })
            }
        }
    }

    /// Stop the capture thread, join it, and restore the terminal.
    ///
    /// Does nothing if not running. Never panics.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.running.store(false, Ordering::Release);

        match handle.join() {
            Ok(source) => self.source = Some(source),
            Err(_) => tracing::error!("input capture thread panicked"),
        }
        self.restore_terminal();
        tracing::debug!("input capture stopped");
    }

    fn restore_terminal(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            if let Err(e) = snapshot.restore() {
                tracing::warn!("{e}");
            }
        }
    }

    /// Whether the capture thread is running.
    pub const fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether any key event is waiting.
    pub fn has_input(&self) -> bool {
        self.queue.has_input()
    }

    /// Pop the oldest key event, or [`KeyEvent::None`].
    pub fn get_key(&self) -> KeyEvent {
        self.queue.get_key()
    }

    /// Whether `key` is waiting anywhere in the queue, without consuming it.
    pub fn is_key_pressed(&self, key: KeyEvent) -> bool {
        self.queue.is_key_pressed(key)
    }

    /// Shared handle to the event queue.
    pub const fn queue(&self) -> &KeyQueue {
        &self.queue
    }

    /// Main capture loop.
    fn run_loop(
        source: &mut dyn InputSource,
        queue: &KeyQueue,
        running: &AtomicBool,
        poll_timeout: Duration,
        idle_sleep: Duration,
    ) {
        while running.load(Ordering::Acquire) {
            match source.read_byte(poll_timeout) {
                Ok(Some(byte)) => {
                    if let Some(key) = decode(byte, source, poll_timeout) {
                        tracing::trace!(?key, "key captured");
                        queue.push(key);
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::debug!("input read failed: {e}"),
            }
            thread::sleep(idle_sleep);
        }
    }
}

impl fmt::Debug for InputCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputCapture")
            .field("running", &self.is_running())
            .field("queued", &self.queue.len())
            .field("raw_mode", &self.snapshot.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for InputCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
