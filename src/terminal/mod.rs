//! Terminal access: raw mode, input bytes, and drawing.

mod color;
mod console;
mod raw_mode;
mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use color::Color;
pub use console::Console;
pub use raw_mode::RawModeSnapshot;
pub use source::{ChannelInput, InputFeed, InputSource, TerminalInput};
