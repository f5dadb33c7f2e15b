//! Single refreshing status line for streaming build output.
//!
//! Each update rewinds to column zero with `\r` and pads the text to the
//! terminal width so leftovers of a longer previous line are blanked out.
//! Committed lines end with `\n` and stay in the scrollback.

use std::io::{self, Stdout, Write};

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Width used when stdout is not a terminal
pub const DEFAULT_WIDTH: usize = 80;

/// Current terminal width in columns
pub fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(cols, _)| cols as usize)
        .ok()
        .filter(|cols| *cols > 0)
        .unwrap_or(DEFAULT_WIDTH)
}

/// Trim `line` and cut it to at most `width` display columns
pub fn fit_to_width(line: &str, width: usize) -> String {
    let mut fitted = String::new();
    let mut used = 0;

    for ch in line.trim().chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        fitted.push(ch);
    }

    fitted.trim().to_string()
}

/// A status line rendered over and over at the start of the current row
pub struct StatusLine<W: Write> {
    out: W,
    width: usize,
}

impl StatusLine<Stdout> {
    /// Status line on stdout sized to the terminal
    pub fn stdout() -> Self {
        Self::new(io::stdout(), terminal_width())
    }
}

impl<W: Write> StatusLine<W> {
    pub fn new(out: W, width: usize) -> Self {
        Self { out, width }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Overwrite the status line with `text`
    pub fn update(&mut self, text: &str) -> io::Result<()> {
        let pad = self.width.saturating_sub(text.width());
        write!(self.out, "\r{}{}", text, " ".repeat(pad))?;
        self.out.flush()
    }

    /// Overwrite the status line with `text` and keep it in the scrollback
    pub fn commit(&mut self, text: &str) -> io::Result<()> {
        self.update(text)?;
        writeln!(self.out)?;
        self.out.flush()
    }

    /// Move past the status line
    pub fn finish(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
