//! Loop machinery: the engine, its two scheduled loops, and input capture.
//!
//! Four threads take part in one run:
//! - **Input thread**: polls the input source, decodes keys into the queue
//! - **Update thread**: fixed-interval simulation ticks
//! - **Render thread**: fixed-interval frames plus frame-rate measurement
//! - **Calling thread**: watches for the exit key and tears everything down
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   KeyEvent    ┌──────────┐
//! │ Input Thread │ ────────────▶ │ KeyQueue │ ◀──── hooks, exit watcher
//! └──────────────┘               └──────────┘
//!
//! ┌───────────────┐              ┌───────────────┐
//! │ Update Thread │ ◀─ running ─▶│ Render Thread │
//! └───────────────┘  target_rate └───────────────┘
//!          ▲                        │ measured_rate
//!          └──── SharedState ◀──────┘
//! ```

mod engine;
mod input;
mod messages;
mod queue;
mod renderer;
mod state;
mod ticker;

pub use engine::{Context, Engine, EngineConfig, EngineHandle, Game, EXIT_KEY};
pub use input::{InputCapture, DEFAULT_IDLE_SLEEP, DEFAULT_POLL_TIMEOUT};
pub use messages::{decode, KeyEvent, ESC};
pub use queue::KeyQueue;
pub use renderer::RateMeter;
pub use state::{EngineState, SharedState};
pub use ticker::tick_budget;
