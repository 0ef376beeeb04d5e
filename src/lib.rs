//! # Gridloop
//!
//! A minimal real-time loop runner for character-grid terminal programs.
//!
//! Gridloop drives a simulation at a target rate, renders on an
//! independent timer, and captures keyboard input on its own thread, all
//! while the terminal sits in raw mode.
//!
//! ## Core Concepts
//!
//! - **Decoupled loops**: update and render threads pace themselves
//!   independently; nothing orders a render against an update
//! - **Asynchronous input**: a capture thread decodes keys into a FIFO
//!   that any hook can drain or peek
//! - **Ordered teardown**: workers are joined before the shutdown hook, and
//!   the terminal is restored after it
//!
//! ## Example
//!
//! ```rust,ignore
//! use gridloop::{Context, Engine, Game};
//! use std::time::Duration;
//!
//! struct Blink;
//!
//! impl Game for Blink {
//!     fn on_update(&self, _ctx: &Context<'_>, _delta: Duration) {}
//!     fn on_render(&self, ctx: &Context<'_>) {
//!         ctx.console().draw_text(1, 1, "press ESC");
//!     }
//! }
//!
//! Engine::new().run(&Blink)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod actor;
pub mod error;
pub mod terminal;

// Re-exports for convenience
pub use actor::{
    Context, Engine, EngineConfig, EngineHandle, EngineState, Game, InputCapture, KeyEvent,
    KeyQueue, EXIT_KEY,
};
pub use error::{EngineError, TerminalError};
pub use terminal::{ChannelInput, Color, Console, InputFeed, InputSource, RawModeSnapshot, TerminalInput};
