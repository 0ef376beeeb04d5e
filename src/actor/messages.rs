//! Key events and the byte-level decoder that produces them.

use crate::terminal::InputSource;
use std::time::Duration;

/// The escape byte.
pub const ESC: u8 = 0x1b;

/// A decoded key press.
///
/// The printable keys (`Up`/`Down`/`Left`/`Right` on WASD, `Space`,
/// `Enter`) and the four arrow keys are distinct variants, so an escape
/// sequence never aliases a printable key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEvent {
    /// No event.
    #[default]
    None,
    /// `w`.
    Up,
    /// `s`.
    Down,
    /// `a`.
    Left,
    /// `d`.
    Right,
    /// Space bar.
    Space,
    /// Enter/Return.
    Enter,
    /// Escape, also the exit key.
    Escape,
    /// Up arrow (`ESC [ A`).
    ArrowUp,
    /// Down arrow (`ESC [ B`).
    ArrowDown,
    /// Left arrow (`ESC [ D`).
    ArrowLeft,
    /// Right arrow (`ESC [ C`).
    ArrowRight,
}

impl KeyEvent {
    /// Map a single input byte to its key, if it is one we recognize.
    ///
    /// Raw terminals deliver Return as `\r`, so both `\r` and `\n` map to
    /// [`KeyEvent::Enter`].
    pub const fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            b'w' => Self::Up,
            b's' => Self::Down,
            b'a' => Self::Left,
            b'd' => Self::Right,
            b' ' => Self::Space,
            b'\n' | b'\r' => Self::Enter,
            ESC => Self::Escape,
            _ => return None,
        })
    }

    /// Map the final byte of a cursor-movement sequence `ESC [ <byte>`.
    pub const fn from_csi(byte: u8) -> Option<Self> {
        Some(match byte {
            b'A' => Self::ArrowUp,
            b'B' => Self::ArrowDown,
            b'C' => Self::ArrowRight,
            b'D' => Self::ArrowLeft,
            _ => return None,
        })
    }

    /// Whether this is the "no event" sentinel.
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}

/// Decode one key event starting with `first`, pulling follow-up bytes from
/// `source` when `first` is [`ESC`].
///
/// After an escape byte, two more bytes are read, each within `timeout`.
/// Only `[` followed by `A`-`D` is an arrow key. Everything else after an
/// escape, including a sequence cut short by the timeout, decodes as
/// [`KeyEvent::Escape`]: a lone Escape press and a truncated sequence look
/// the same on the wire. Unrecognized single bytes yield `None`.
pub fn decode<S>(first: u8, source: &mut S, timeout: Duration) -> Option<KeyEvent>
where
    S: InputSource + ?Sized,
{
    if first != ESC {
        return KeyEvent::from_byte(first);
    }

    let mut follow_up = || source.read_byte(timeout).ok().flatten();
    let Some(intro) = follow_up() else {
        return Some(KeyEvent::Escape);
    };
    let Some(last) = follow_up() else {
        return Some(KeyEvent::Escape);
    };

    if intro == b'[' {
        if let Some(key) = KeyEvent::from_csi(last) {
            return Some(key);
        }
    }
    Some(KeyEvent::Escape)
}
