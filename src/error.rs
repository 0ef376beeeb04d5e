//! Error types.
//!
//! Terminal failures are reported by the raw-mode layer but the capture
//! subsystem only logs them: a program keeps running with degraded input
//! rather than terminating.

use std::io;

/// Failures while switching the terminal line discipline.
#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    /// Neither stdin nor `/dev/tty` refers to a terminal.
    #[error("no controlling terminal available: {0}")]
    NotATerminal(#[source] io::Error),

    /// `tcgetattr` failed.
    #[error("failed to retrieve terminal attributes: {0}")]
    GetAttributes(#[source] io::Error),

    /// `tcsetattr` failed.
    #[error("failed to set terminal attributes: {0}")]
    SetAttributes(#[source] io::Error),

    /// Another snapshot already holds the terminal in raw mode.
    #[error("raw mode is already active in this process")]
    AlreadyActive,
}

/// Failures surfaced by the engine and the capture subsystem.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn {thread} thread: {source}")]
    Spawn {
        /// Name of the thread that could not be started.
        thread: &'static str,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}
