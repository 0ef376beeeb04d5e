//! Test fixtures: a pseudo-terminal and an in-memory output sink.

use rustix::pty::{self, OpenptFlags};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::OwnedFd;
use std::sync::{Arc, Mutex};

/// A master/slave pseudo-terminal pair.
pub struct Pty {
    /// Writing here feeds the slave's input.
    pub master: OwnedFd,
    /// The terminal end, as a program would see it.
    pub slave: File,
}

impl Pty {
    pub fn open() -> Self {
        let master = pty::openpt(OpenptFlags::RDWR | OpenptFlags::NOCTTY).expect("openpt");
        pty::grantpt(&master).expect("grantpt");
        pty::unlockpt(&master).expect("unlockpt");
        let name = pty::ptsname(&master, Vec::new()).expect("ptsname");
        let path = name.to_str().expect("utf-8 pty name").to_owned();
        let slave = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .expect("open pty slave");
        Self { master, slave }
    }

    /// Type bytes into the terminal.
    pub fn feed(&self, bytes: &[u8]) {
        let written = rustix::io::write(&self.master, bytes).expect("write to pty master");
        assert_eq!(written, bytes.len());
    }
}

/// A cloneable in-memory sink for console output.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }

    /// Parse everything written so far as an 80x24 screen.
    pub fn screen(&self) -> vt100::Parser {
        let mut parser = vt100::Parser::new(24, 80, 0);
        parser.process(&self.contents());
        parser
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
