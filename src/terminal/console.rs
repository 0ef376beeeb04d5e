//! `Console`: buffered ANSI drawing on a character grid.
//!
//! Drawing calls accumulate escape sequences in memory; [`Console::flush`]
//! writes them out in a single `write()` so a frame never reaches the
//! terminal half drawn. Coordinates are 1-based: `x` is the column, `y` the
//! row. Points left of column 1 or above row 1 are skipped.

use super::color::Color;
use crossterm::{
    cursor,
    style::{self, Attribute},
    terminal::{Clear, ClearType},
    Command, QueueableCommand,
};
use std::fmt;
use std::io::Write;

/// A buffered drawing surface over any byte sink.
pub struct Console {
    data: Vec<u8>,
    out: Box<dyn Write + Send>,
}

impl Console {
    /// Create a console writing to `out`.
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            data: Vec::with_capacity(4096),
            out,
        }
    }

    /// Queue a command. Writing into a `Vec` cannot fail.
    #[inline]
    fn queue(&mut self, command: impl Command) {
        let _ = self.data.queue(command);
    }

    /// Clear the screen and hide the cursor.
    pub fn init(&mut self) {
        self.clear();
        self.hide_cursor();
    }

    /// Clear the screen and home the cursor.
    pub fn clear(&mut self) {
        self.queue(Clear(ClearType::All));
        self.queue(cursor::MoveTo(0, 0));
    }

    /// Restore default attributes and show the cursor.
    pub fn reset(&mut self) {
        self.queue(style::SetAttribute(Attribute::Reset));
        self.queue(style::ResetColor);
        self.show_cursor();
    }

    /// Hide cursor.
    #[inline]
    pub fn hide_cursor(&mut self) {
        self.queue(cursor::Hide);
    }

    /// Show cursor.
    #[inline]
    pub fn show_cursor(&mut self) {
        self.queue(cursor::Show);
    }

    /// Move the cursor to column `x`, row `y`.
    pub fn move_to(&mut self, x: i32, y: i32) {
        if let Some((col, row)) = to_cell(x, y) {
            self.queue(cursor::MoveTo(col, row));
        }
    }

    /// Move the cursor `n` rows up.
    pub fn move_up(&mut self, n: u16) {
        self.queue(cursor::MoveUp(n));
    }

    /// Move the cursor `n` rows down.
    pub fn move_down(&mut self, n: u16) {
        self.queue(cursor::MoveDown(n));
    }

    /// Move the cursor `n` columns right.
    pub fn move_right(&mut self, n: u16) {
        self.queue(cursor::MoveRight(n));
    }

    /// Move the cursor `n` columns left.
    pub fn move_left(&mut self, n: u16) {
        self.queue(cursor::MoveLeft(n));
    }

    /// Set the foreground color for subsequent drawing.
    pub fn set_color(&mut self, color: Color) {
        self.queue(style::SetForegroundColor(color.into()));
    }

    /// Set the background color for subsequent drawing.
    pub fn set_background_color(&mut self, color: Color) {
        self.queue(style::SetBackgroundColor(color.base().into()));
    }

    /// Reset foreground and background colors.
    pub fn reset_color(&mut self) {
        self.queue(style::ResetColor);
    }

    /// Draw a single glyph.
    pub fn draw_point(&mut self, x: i32, y: i32, glyph: char) {
        if let Some((col, row)) = to_cell(x, y) {
            self.queue(cursor::MoveTo(col, row));
            self.queue(style::Print(glyph));
        }
    }

    /// Draw a line between two points (Bresenham).
    pub fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, glyph: char) {
        let dx = (x2 - x1).abs();
        let dy = (y2 - y1).abs();
        let sx = if x1 < x2 { 1 } else { -1 };
        let sy = if y1 < y2 { 1 } else { -1 };
        let mut err = dx - dy;
        let (mut x, mut y) = (x1, y1);

        loop {
            self.draw_point(x, y, glyph);
            if x == x2 && y == y2 {
                break;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Draw the outline of a `width` x `height` rectangle.
    pub fn draw_rect(&mut self, x: i32, y: i32, width: i32, height: i32, glyph: char) {
        for i in 0..width {
            self.draw_point(x + i, y, glyph);
            self.draw_point(x + i, y + height - 1, glyph);
        }
        for i in 0..height {
            self.draw_point(x, y + i, glyph);
            self.draw_point(x + width - 1, y + i, glyph);
        }
    }

    /// Draw text starting at column `x`, row `y`.
    pub fn draw_text(&mut self, x: i32, y: i32, text: &str) {
        if let Some((col, row)) = to_cell(x, y) {
            self.queue(cursor::MoveTo(col, row));
            self.queue(style::Print(text));
        }
    }

    /// Bytes queued since the last flush.
    #[inline]
    pub fn pending(&self) -> &[u8] {
        &self.data
    }

    /// Write everything queued so far in one call.
    ///
    /// Output failures are not reported; the frame is dropped.
    pub fn flush(&mut self) {
        if self.data.is_empty() {
            return;
        }
        let result = self
            .out
            .write_all(&self.data)
            .and_then(|()| self.out.flush());
        if let Err(e) = result {
            tracing::debug!("console flush failed: {e}");
        }
        self.data.clear();
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console")
            .field("pending", &self.data.len())
            .finish_non_exhaustive()
    }
}

/// Convert 1-based coordinates to crossterm's 0-based cell.
fn to_cell(x: i32, y: i32) -> Option<(u16, u16)> {
    let col = u16::try_from(x.checked_sub(1)?).ok()?;
    let row = u16::try_from(y.checked_sub(1)?).ok()?;
    Some((col, row))
}
