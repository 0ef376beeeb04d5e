//! Color tokens for the console.

use crossterm::style;

/// One of the 16 ANSI palette colors.
///
/// Every token can be used as a foreground color. As a background only the
/// hue counts, so `BrightRed` and `Red` both give the standard red
/// background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl Color {
    /// The standard color with the same hue.
    pub const fn base(self) -> Self {
        match self {
            Self::Black | Self::BrightBlack => Self::Black,
            Self::Red | Self::BrightRed => Self::Red,
            Self::Green | Self::BrightGreen => Self::Green,
            Self::Yellow | Self::BrightYellow => Self::Yellow,
            Self::Blue | Self::BrightBlue => Self::Blue,
            Self::Magenta | Self::BrightMagenta => Self::Magenta,
            Self::Cyan | Self::BrightCyan => Self::Cyan,
            Self::White | Self::BrightWhite => Self::White,
        }
    }
}

impl From<Color> for style::Color {
    fn from(color: Color) -> Self {
        match color {
            Color::Black => Self::Black,
            Color::Red => Self::DarkRed,
            Color::Green => Self::DarkGreen,
            Color::Yellow => Self::DarkYellow,
            Color::Blue => Self::DarkBlue,
            Color::Magenta => Self::DarkMagenta,
            Color::Cyan => Self::DarkCyan,
            Color::White => Self::Grey,
            Color::BrightBlack => Self::DarkGrey,
            Color::BrightRed => Self::Red,
            Color::BrightGreen => Self::Green,
            Color::BrightYellow => Self::Yellow,
            Color::BrightBlue => Self::Blue,
            Color::BrightMagenta => Self::Magenta,
            Color::BrightCyan => Self::Cyan,
            Color::BrightWhite => Self::White,
        }
    }
}
