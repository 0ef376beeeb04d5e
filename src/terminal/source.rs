//! Byte sources for the input capture thread.
//!
//! The capture loop only needs two things from its input stream: a way to
//! put it in raw mode and a way to wait a bounded time for one byte.

use super::raw_mode::RawModeSnapshot;
use crate::error::TerminalError;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use rustix::event::{self, PollFd, PollFlags, Timespec};
use rustix::io::Errno;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::os::fd::{AsFd, OwnedFd};
use std::thread;
use std::time::Duration;

/// A stream of raw input bytes.
pub trait InputSource: Send {
    /// Switch the underlying terminal to raw mode.
    ///
    /// Sources that are not backed by a terminal return `Ok(None)`.
    fn enter_raw_mode(&mut self) -> Result<Option<RawModeSnapshot>, TerminalError> {
        Ok(None)
    }

    /// Wait up to `timeout` for the stream to become readable, then read
    /// a single byte.
    ///
    /// Returns `Ok(None)` when nothing arrived in time. Never blocks longer
    /// than `timeout` (plus scheduling slack).
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>>;
}

/// The controlling terminal, read without any userspace buffering.
#[derive(Debug)]
pub struct TerminalInput {
    fd: OwnedFd,
}

impl TerminalInput {
    /// Open the controlling terminal.
    ///
    /// Uses stdin when it is a tty, otherwise falls back to `/dev/tty`
    /// (e.g. when stdin is piped).
    pub fn open() -> io::Result<Self> {
        let stdin = io::stdin();
        let fd = if stdin.is_terminal() {
            stdin.as_fd().try_clone_to_owned()?
        } else {
            File::options()
                .read(true)
                .write(true)
                .open("/dev/tty")?
                .into()
        };
        Ok(Self { fd })
    }

    /// Read from an already opened descriptor.
    pub const fn from_fd(fd: OwnedFd) -> Self {
        Self { fd }
    }
}

impl InputSource for TerminalInput {
    fn enter_raw_mode(&mut self) -> Result<Option<RawModeSnapshot>, TerminalError> {
        RawModeSnapshot::enter(&self.fd).map(Some)
    }

    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        let timeout = Timespec {
            tv_sec: i64::try_from(timeout.as_secs()).unwrap_or(i64::MAX),
            tv_nsec: timeout.subsec_nanos().into(),
        };
        let mut fds = [PollFd::new(&self.fd, PollFlags::IN)];

        match event::poll(&mut fds, Some(&timeout)) {
            Ok(0) | Err(Errno::INTR) => return Ok(None),
            Ok(_) => {}
            Err(e) => return Err(e.into()),
        }

        let mut buf = [0u8; 1];
        match rustix::io::read(&self.fd, &mut buf[..]) {
            Ok(1) => Ok(Some(buf[0])),
            Ok(_) | Err(Errno::INTR | Errno::AGAIN) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Sending half of a [`ChannelInput`].
#[derive(Debug, Clone)]
pub struct InputFeed {
    tx: Sender<u8>,
}

impl InputFeed {
    /// Queue bytes as if they had been typed.
    ///
    /// Returns `false` if the source has been dropped.
    pub fn send(&self, bytes: &[u8]) -> bool {
        bytes.iter().all(|&b| self.tx.send(b).is_ok())
    }
}

/// Input bytes delivered through a channel instead of a terminal.
///
/// Useful for scripted or headless runs, where the engine should be driven
/// without touching the real terminal.
#[derive(Debug)]
pub struct ChannelInput {
    rx: Receiver<u8>,
}

impl ChannelInput {
    /// Create a connected feed/source pair.
    pub fn new() -> (InputFeed, Self) {
        let (tx, rx) = unbounded();
        (InputFeed { tx }, Self { rx })
    }
}

impl InputSource for ChannelInput {
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        match self.rx.recv_timeout(timeout) {
            Ok(byte) => Ok(Some(byte)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                // Keep the caller's pacing even with every feed gone.
                thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}
