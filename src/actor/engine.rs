//! Engine: Main coordinator that ties the loops together.
//!
//! The Engine owns the input capture subsystem and the console, runs the
//! update and render loops on their own threads, and watches for the exit
//! key on the calling thread.
//!
//! Teardown is ordered: both worker threads are joined before the shutdown
//! hook runs, and raw mode is restored after it.

use super::input::{InputCapture, DEFAULT_IDLE_SLEEP, DEFAULT_POLL_TIMEOUT};
use super::messages::KeyEvent;
use super::queue::KeyQueue;
use super::state::{EngineState, SharedState};
use super::{renderer, ticker};
use crate::error::EngineError;
use crate::terminal::{ChannelInput, Console, InputSource, TerminalInput};
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ScopedJoinHandle};
use std::time::Duration;

/// The key that ends a run.
pub const EXIT_KEY: KeyEvent = KeyEvent::Escape;

/// Configuration for the Engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Target ticks and frames per second.
    pub target_rate: u32,
    /// How often the calling thread checks for the exit key.
    pub exit_poll_interval: Duration,
    /// Input readability wait, also used for escape follow-up bytes.
    pub input_poll_timeout: Duration,
    /// Pause after every input capture iteration.
    pub input_idle_sleep: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_rate: 60,
            exit_poll_interval: Duration::from_millis(16),
            input_poll_timeout: DEFAULT_POLL_TIMEOUT,
            input_idle_sleep: DEFAULT_IDLE_SLEEP,
        }
    }
}

/// The four hooks an engine drives.
///
/// `on_update` and `on_render` run concurrently on different threads with
/// no ordering between them, so hooks take `&self` and implementors keep
/// their state behind their own locks or atomics.
pub trait Game: Sync {
    /// Called once on the calling thread, before the loops start.
    fn on_init(&self, _ctx: &Context<'_>) {}

    /// Called every update tick with the time since the previous tick.
    ///
    /// The exit watcher only peeks at the input queue. A hook that pops
    /// events with [`KeyQueue::get_key`] can take [`EXIT_KEY`] before the
    /// watcher sees it, and must then call [`Context::stop`] itself.
    fn on_update(&self, ctx: &Context<'_>, delta: Duration);

    /// Called every render frame. The console is flushed afterwards.
    fn on_render(&self, ctx: &Context<'_>);

    /// Called once on the calling thread, after both loops have exited.
    fn on_shutdown(&self, _ctx: &Context<'_>) {}
}

/// What hooks can reach while the engine runs.
pub struct Context<'a> {
    state: &'a Arc<SharedState>,
    input: &'a KeyQueue,
    console: &'a Mutex<Console>,
}

impl Context<'_> {
    /// Ask the engine to stop. Safe from any hook.
    pub fn stop(&self) {
        self.state.request_stop();
    }

    /// Whether the loops are still meant to run.
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Frames rendered during the last full second.
    pub fn measured_rate(&self) -> u32 {
        self.state.measured_rate()
    }

    /// Current target rate.
    pub fn target_rate(&self) -> u32 {
        self.state.target_rate()
    }

    /// Change the target rate, effective from each loop's next tick.
    pub fn set_target_rate(&self, rate: u32) {
        self.state.set_target_rate(rate);
    }

    /// Captured key events.
    ///
    /// Popping [`EXIT_KEY`] from here hides it from the exit watcher.
    pub const fn input(&self) -> &KeyQueue {
        self.input
    }

    /// Lock the console for drawing.
    pub fn console(&self) -> MutexGuard<'_, Console> {
        lock_console(self.console)
    }

    /// A handle that outlives this context.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            state: Arc::clone(self.state),
        }
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Cloneable handle for stopping and observing an engine from any thread.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    state: Arc<SharedState>,
}

impl EngineHandle {
    /// Ask the engine to stop. Idempotent.
    pub fn stop(&self) {
        self.state.request_stop();
    }

    /// Whether the loops are still meant to run.
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Frames rendered during the last full second.
    pub fn measured_rate(&self) -> u32 {
        self.state.measured_rate()
    }

    /// Change the target rate, effective from each loop's next tick.
    pub fn set_target_rate(&self, rate: u32) {
        self.state.set_target_rate(rate);
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> EngineState {
        self.state.phase()
    }
}

/// The real-time loop runner.
pub struct Engine {
    config: EngineConfig,
    state: Arc<SharedState>,
    capture: InputCapture,
    console: Mutex<Console>,
}

impl Engine {
    /// Create an engine on the terminal with default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine on the terminal.
    ///
    /// Without a controlling terminal the engine still runs, it just never
    /// sees any input.
    pub fn with_config(config: EngineConfig) -> Self {
        let source: Box<dyn InputSource> = match TerminalInput::open() {
            Ok(terminal) => Box::new(terminal),
            Err(e) => {
                tracing::warn!("no terminal input available: {e}");
                Box::new(ChannelInput::new().1)
            }
        };
        Self::with_io(config, source, Box::new(std::io::stdout()))
    }

    /// Create an engine over an explicit input source and output sink.
    ///
    /// # Arguments
    ///
    /// * `config` - Rates and polling intervals.
    /// * `source` - Where key bytes come from. Raw mode is entered on it
    ///   for the duration of [`Engine::run`].
    /// * `output` - Where the console writes its escape sequences.
    ///
    /// # Returns
    ///
    /// An idle engine; nothing is spawned until [`Engine::run`].
    pub fn with_io(
        config: EngineConfig,
        source: Box<dyn InputSource>,
        output: Box<dyn Write + Send>,
    ) -> Self {
        let capture =
            InputCapture::with_timing(source, config.input_poll_timeout, config.input_idle_sleep);
        Self {
            state: Arc::new(SharedState::new(config.target_rate)),
            config,
            capture,
            console: Mutex::new(Console::new(output)),
        }
    }

    /// A handle for stopping the engine from other threads.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Ask the engine to stop. Idempotent; a stop issued before `run()`
    /// makes the run exit as soon as it has started.
    pub fn stop(&self) {
        self.state.request_stop();
    }

    /// Change the target rate, effective from each loop's next tick.
    pub fn set_target_rate(&self, rate: u32) {
        self.state.set_target_rate(rate);
    }

    /// Frames rendered during the last full second.
    pub fn measured_rate(&self) -> u32 {
        self.state.measured_rate()
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> EngineState {
        self.state.phase()
    }

    /// Captured key events.
    pub const fn input(&self) -> &KeyQueue {
        self.capture.queue()
    }

    /// Run `game` until the exit key is pressed or a stop is requested.
    ///
    /// One-shot: calling it again after it returned does nothing. Only a
    /// failure to spawn a thread is reported, and even then the terminal
    /// is restored before returning.
    pub fn run<G: Game>(&mut self, game: &G) -> Result<(), EngineError> {
        if !self.state.begin() {
            tracing::warn!("engine already ran; ignoring run()");
            return Ok(());
        }
        tracing::debug!(target_rate = self.state.target_rate(), "engine starting");

        let teardown = Teardown {
            state: &self.state,
            console: &self.console,
        };
        with_console(&self.console, Console::init);
        let result = self.capture.start().and_then(|()| self.run_loops(game));
        if result.is_err() {
            self.state.request_stop();
        }

        self.capture.stop();
        drop(teardown);
        tracing::debug!("engine finished");
        result
    }

    fn run_loops<G: Game>(&self, game: &G) -> Result<(), EngineError> {
        let ctx = Context {
            state: &self.state,
            input: self.capture.queue(),
            console: &self.console,
        };

        game.on_init(&ctx);
        with_console(&self.console, Console::flush);
        self.state.start_running();

        let state: &SharedState = &self.state;
        let result = thread::scope(|s| {
            let update = thread::Builder::new()
                .name("gridloop-update".to_string())
                .spawn_scoped(s, || {
                    let _guard = StopOnPanic(state);
                    ticker::run_loop(state, |delta| game.on_update(&ctx, delta));
                })
                .map_err(|source| EngineError::Spawn {
                    thread: "update",
                    source,
                });

            let render = thread::Builder::new()
                .name("gridloop-render".to_string())
                .spawn_scoped(s, || {
                    let _guard = StopOnPanic(state);
                    renderer::run_loop(state, || {
                        game.on_render(&ctx);
                        ctx.console().flush();
                    });
                })
                .map_err(|source| EngineError::Spawn {
                    thread: "render",
                    source,
                });

            if update.is_ok() && render.is_ok() {
                self.watch_exit_key();
            }
            state.request_stop();
            state.set_phase(EngineState::ShuttingDown);

            let update = update.map(|handle| join_worker("update", handle));
            let render = render.map(|handle| join_worker("render", handle));
            update.and(render)
        });

        game.on_shutdown(&ctx);
        with_console(&self.console, Console::flush);
        result
    }

    /// Poll for the exit key until the run flag drops.
    fn watch_exit_key(&self) {
        while self.state.is_running() {
            if self.capture.is_key_pressed(EXIT_KEY) {
                tracing::debug!("exit key pressed");
                self.state.request_stop();
                break;
            }
            thread::sleep(self.config.exit_poll_interval);
        }
    }

}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("capture", &self.capture)
            .finish_non_exhaustive()
    }
}

/// Drops the run flag if a worker unwinds, so the controller stops waiting.
struct StopOnPanic<'a>(&'a SharedState);

impl Drop for StopOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.request_stop();
        }
    }
}

/// Shows the cursor again and marks the run finished, also when a hook on
/// the calling thread unwinds. Raw mode then comes back when the engine
/// drops its input capture.
struct Teardown<'a> {
    state: &'a SharedState,
    console: &'a Mutex<Console>,
}

impl Drop for Teardown<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.state.request_stop();
        }
        with_console(self.console, Console::reset);
        self.state.set_running(false);
        self.state.set_phase(EngineState::Finished);
    }
}

fn join_worker(name: &str, handle: ScopedJoinHandle<'_, ()>) {
    if handle.join().is_err() {
        tracing::error!("{name} thread panicked");
    }
}

fn with_console(console: &Mutex<Console>, f: impl FnOnce(&mut Console)) {
    let mut console = lock_console(console);
    f(&mut console);
    console.flush();
}

fn lock_console(console: &Mutex<Console>) -> MutexGuard<'_, Console> {
    console.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::testing::SharedBuffer;
    use crate::terminal::InputFeed;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Instant;

    fn test_engine(target_rate: u32) -> (Engine, InputFeed, SharedBuffer) {
        let (feed, source) = ChannelInput::new();
        let sink = SharedBuffer::default();
        let config = EngineConfig {
            target_rate,
            ..EngineConfig::default()
        };
        let engine = Engine::with_io(config, Box::new(source), Box::new(sink.clone()));
        (engine, feed, sink)
    }

    /// Records which hooks ran, in order, collapsing repeats.
    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<&'static str>>,
        updates: AtomicU32,
        renders: AtomicU32,
        stop_after_updates: Option<u32>,
        workers_done_at_shutdown: AtomicBool,
    }

    impl Recorder {
        fn record(&self, event: &'static str) {
            let mut log = self.log.lock().unwrap();
            if log.last() != Some(&event) {
                log.push(event);
            }
        }

        fn log(&self) -> Vec<&'static str> {
            self.log.lock().unwrap().clone()
        }
    }

    impl Game for Recorder {
        fn on_init(&self, _ctx: &Context<'_>) {
            self.record("init");
        }

        fn on_update(&self, ctx: &Context<'_>, _delta: Duration) {
            self.record("tick");
            let n = self.updates.fetch_add(1, Ordering::SeqCst) + 1;
            if self.stop_after_updates == Some(n) {
                ctx.stop();
            }
        }

        fn on_render(&self, _ctx: &Context<'_>) {
            self.record("tick");
            self.renders.fetch_add(1, Ordering::SeqCst);
        }

        fn on_shutdown(&self, ctx: &Context<'_>) {
            let updates = self.updates.load(Ordering::SeqCst);
            let renders = self.renders.load(Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            let quiet = updates == self.updates.load(Ordering::SeqCst)
                && renders == self.renders.load(Ordering::SeqCst);
            self.workers_done_at_shutdown
                .store(quiet && !ctx.is_running(), Ordering::SeqCst);
            self.record("shutdown");
        }
    }

    #[test]
    fn test_stop_from_update_hook() {
        let (mut engine, _feed, _sink) = test_engine(100);
        let game = Recorder {
            stop_after_updates: Some(5),
            ..Recorder::default()
        };

        engine.run(&game).unwrap();

        assert_eq!(game.log(), vec!["init", "tick", "shutdown"]);
        assert!(game.updates.load(Ordering::SeqCst) >= 5);
        assert!(game.workers_done_at_shutdown.load(Ordering::SeqCst));
        assert_eq!(engine.state(), EngineState::Finished);
    }

    #[test]
    fn test_exit_key_ends_run() {
        let (mut engine, feed, _sink) = test_engine(60);
        let game = Recorder::default();
        let start = Instant::now();

        feed.send(b"w\x1b");
        engine.run(&game).unwrap();

        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(game.workers_done_at_shutdown.load(Ordering::SeqCst));
        assert_eq!(game.log().last(), Some(&"shutdown"));
        // The exit key is left in the queue for the game to see.
        assert!(engine.input().is_key_pressed(KeyEvent::Escape));
    }

    #[test]
    fn test_stop_from_other_thread() {
        let (mut engine, _feed, _sink) = test_engine(60);
        let handle = engine.handle();
        let game = Recorder::default();

        let stopper = thread::spawn(move || {
            while handle.state() != EngineState::Running {
                thread::sleep(Duration::from_millis(1));
            }
            thread::sleep(Duration::from_millis(100));
            handle.stop();
            handle.stop();
        });

        engine.run(&game).unwrap();
        stopper.join().unwrap();

        assert!(game.updates.load(Ordering::SeqCst) > 0);
        assert!(game.renders.load(Ordering::SeqCst) > 0);
        assert!(game.workers_done_at_shutdown.load(Ordering::SeqCst));
    }

    #[test]
    fn test_stop_before_run() {
        let (mut engine, _feed, _sink) = test_engine(60);
        let game = Recorder::default();

        engine.stop();
        engine.run(&game).unwrap();

        assert_eq!(game.log(), vec!["init", "shutdown"]);
        assert_eq!(game.updates.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_run_is_one_shot() {
        let (mut engine, _feed, _sink) = test_engine(100);
        let game = Recorder {
            stop_after_updates: Some(1),
            ..Recorder::default()
        };
        engine.run(&game).unwrap();
        let first = game.log();

        engine.run(&game).unwrap();
        assert_eq!(game.log(), first);
        assert_eq!(engine.state(), EngineState::Finished);
    }

    #[test]
    fn test_measured_rate_near_target() {
        struct Idle;
        impl Game for Idle {
            fn on_update(&self, _ctx: &Context<'_>, _delta: Duration) {}
            fn on_render(&self, _ctx: &Context<'_>) {}
        }

        let (mut engine, _feed, _sink) = test_engine(60);
        let handle = engine.handle();
        let probe = thread::spawn(move || {
            thread::sleep(Duration::from_millis(1300));
            let rate = handle.measured_rate();
            handle.stop();
            rate
        });

        engine.run(&Idle).unwrap();
        let rate = probe.join().unwrap();
        assert!((50..=66).contains(&rate), "measured {rate}");
    }

    #[test]
    fn test_worker_panic_does_not_hang() {
        struct Faulty {
            shutdown: AtomicBool,
        }
        impl Game for Faulty {
            fn on_update(&self, _ctx: &Context<'_>, _delta: Duration) {
                panic!("update failed");
            }
            fn on_render(&self, _ctx: &Context<'_>) {}
            fn on_shutdown(&self, _ctx: &Context<'_>) {
                self.shutdown.store(true, Ordering::SeqCst);
            }
        }

        let (mut engine, _feed, _sink) = test_engine(60);
        let game = Faulty {
            shutdown: AtomicBool::new(false),
        };
        engine.run(&game).unwrap();
        assert!(game.shutdown.load(Ordering::SeqCst));
    }

    #[test]
    fn test_console_lifecycle() {
        struct Painter;
        impl Game for Painter {
            fn on_update(&self, ctx: &Context<'_>, _delta: Duration) {
                ctx.stop();
            }
            fn on_render(&self, ctx: &Context<'_>) {
                ctx.console().draw_text(1, 1, "frame");
            }
            fn on_shutdown(&self, ctx: &Context<'_>) {
                ctx.console().draw_text(1, 2, "bye");
            }
        }

        let (mut engine, _feed, sink) = test_engine(60);
        engine.run(&Painter).unwrap();

        let parser = sink.screen();
        let screen = parser.screen();
        assert_eq!(screen.rows(0, 80).nth(1).unwrap(), "bye");
        assert!(!screen.hide_cursor());

        let hidden = b"\x1b[?25l";
        assert!(sink
            .contents()
            .windows(hidden.len())
            .any(|w| w == hidden));
    }

    #[test]
    fn test_hook_popping_exit_key_stops_itself() {
        /// Pops one key per tick, the way a game steering on input does.
        struct Steering {
            popped: Mutex<Vec<KeyEvent>>,
        }
        impl Game for Steering {
            fn on_update(&self, ctx: &Context<'_>, _delta: Duration) {
                let key = ctx.input().get_key();
                if key == EXIT_KEY {
                    ctx.stop();
                }
                if !key.is_none() {
                    self.popped.lock().unwrap().push(key);
                }
            }
            fn on_render(&self, _ctx: &Context<'_>) {}
        }

        for _ in 0..5 {
            let (mut engine, feed, _sink) = test_engine(60);
            let handle = engine.handle();
            let game = Steering {
                popped: Mutex::new(Vec::new()),
            };

            let typist = thread::spawn(move || {
                while handle.state() != EngineState::Running {
                    thread::sleep(Duration::from_millis(1));
                }
                thread::sleep(Duration::from_millis(150));
                feed.send(b"a\x1b");
                feed
            });

            let start = Instant::now();
            engine.run(&game).unwrap();
            let _feed = typist.join().unwrap();

            assert!(start.elapsed() < Duration::from_secs(2));
            assert_eq!(engine.state(), EngineState::Finished);
            let popped = game.popped.lock().unwrap().clone();
            assert!(popped.is_empty() || popped[0] == KeyEvent::Left);
        }
    }

    #[test]
    fn test_init_panic_still_resets_console() {
        struct BrokenInit;
        impl Game for BrokenInit {
            fn on_init(&self, _ctx: &Context<'_>) {
                panic!("init failed");
            }
            fn on_update(&self, _ctx: &Context<'_>, _delta: Duration) {}
            fn on_render(&self, _ctx: &Context<'_>) {}
        }

        let (mut engine, _feed, sink) = test_engine(60);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            engine.run(&BrokenInit)
        }));

        assert!(outcome.is_err());
        assert_eq!(engine.state(), EngineState::Finished);
        assert!(!engine.handle().is_running());
        assert!(!sink.screen().screen().hide_cursor());
    }

    #[test]
    fn test_shutdown_panic_still_resets_console() {
        struct BrokenShutdown;
        impl Game for BrokenShutdown {
            fn on_update(&self, ctx: &Context<'_>, _delta: Duration) {
                ctx.stop();
            }
            fn on_render(&self, _ctx: &Context<'_>) {}
            fn on_shutdown(&self, ctx: &Context<'_>) {
                let _console = ctx.console();
                panic!("shutdown failed");
            }
        }

        let (mut engine, _feed, sink) = test_engine(60);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            engine.run(&BrokenShutdown)
        }));

        assert!(outcome.is_err());
        assert_eq!(engine.state(), EngineState::Finished);
        assert!(!sink.screen().screen().hide_cursor());
    }

    #[test]
    fn test_rate_change_while_running() {
        let (mut engine, _feed, _sink) = test_engine(1000);
        let handle = engine.handle();
        let game = Recorder::default();

        let driver = thread::spawn(move || {
            while handle.state() != EngineState::Running {
                thread::sleep(Duration::from_millis(1));
            }
            handle.set_target_rate(10);
            thread::sleep(Duration::from_millis(100));
            handle.stop();
        });

        engine.run(&game).unwrap();
        driver.join().unwrap();
        assert!(game.updates.load(Ordering::SeqCst) < 100);
    }
}
