//! Raw mode: save, switch, and restore the terminal line discipline.
//!
//! There is exactly one terminal per process, so at most one
//! [`RawModeSnapshot`] may be alive at a time. The snapshot is an owned
//! handle: entering raw mode returns it, restoring consumes it.

use crate::error::TerminalError;
use rustix::termios::{self, LocalModes, OptionalActions, SpecialCodeIndex, Termios};
use std::fmt;
use std::io;
use std::os::fd::{AsFd, OwnedFd};
use std::sync::atomic::{AtomicBool, Ordering};

/// Set while a snapshot holds the terminal.
static RAW_MODE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Read timeout applied in raw mode, in tenths of a second.
const RAW_VTIME: u8 = 1;

/// The terminal's original line-discipline settings.
///
/// Dropping a snapshot without calling [`restore`](Self::restore) still
/// restores the terminal, but the error (if any) is only logged.
pub struct RawModeSnapshot {
    fd: OwnedFd,
    original: Termios,
    restored: bool,
}

impl RawModeSnapshot {
    /// Snapshot the settings of `fd` and switch it to raw mode.
    ///
    /// Echo and canonical (line-buffered) input are disabled, `VMIN` is 0
    /// and `VTIME` is one tenth of a second. Pending input is flushed.
    ///
    /// # Arguments
    ///
    /// * `fd` - Descriptor of the terminal. It is duplicated, so the
    ///   snapshot can outlive the caller's handle.
    ///
    /// # Returns
    ///
    /// A snapshot that puts the settings back on `restore()` or drop, or
    /// an error if `fd` is not a terminal or another snapshot is active.
    pub fn enter<Fd: AsFd>(fd: Fd) -> Result<Self, TerminalError> {
        if RAW_MODE_ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TerminalError::AlreadyActive);
        }

        Self::apply(fd.as_fd()).inspect_err(|_| {
            RAW_MODE_ACTIVE.store(false, Ordering::Release);
        })
    }

    fn apply(fd: std::os::fd::BorrowedFd<'_>) -> Result<Self, TerminalError> {
        if !termios::isatty(fd) {
            return Err(TerminalError::NotATerminal(io::Error::other(
                "file descriptor is not a tty",
            )));
        }

        let original =
            termios::tcgetattr(fd).map_err(|e| TerminalError::GetAttributes(e.into()))?;
        let fd = fd
            .try_clone_to_owned()
            .map_err(TerminalError::GetAttributes)?;

        let mut raw = original.clone();
        raw.local_modes.remove(LocalModes::ECHO | LocalModes::ICANON);
        raw.special_codes[SpecialCodeIndex::VMIN] = 0;
        raw.special_codes[SpecialCodeIndex::VTIME] = RAW_VTIME;

        termios::tcsetattr(&fd, OptionalActions::Flush, &raw)
            .map_err(|e| TerminalError::SetAttributes(e.into()))?;

        tracing::debug!("terminal switched to raw mode");
        Ok(Self {
            fd,
            original,
            restored: false,
        })
    }

    /// Whether any snapshot currently holds the terminal.
    pub fn is_active() -> bool {
        RAW_MODE_ACTIVE.load(Ordering::Acquire)
    }

    /// Put the original settings back.
    pub fn restore(mut self) -> Result<(), TerminalError> {
        self.restore_inner()
    }

    fn restore_inner(&mut self) -> Result<(), TerminalError> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        let result = termios::tcsetattr(&self.fd, OptionalActions::Flush, &self.original)
            .map_err(|e| TerminalError::SetAttributes(e.into()));
        RAW_MODE_ACTIVE.store(false, Ordering::Release);
        tracing::debug!("terminal line discipline restored");
        result
    }
}

impl fmt::Debug for RawModeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawModeSnapshot")
            .field("fd", &self.fd)
            .field("restored", &self.restored)
            .finish_non_exhaustive()
    }
}

impl Drop for RawModeSnapshot {
    fn drop(&mut self) {
        if let Err(e) = self.restore_inner() {
            tracing::warn!("failed to restore terminal on drop: {e}");
        }
    }
}
