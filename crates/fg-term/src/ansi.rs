// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. No state,
// no decisions about when to emit; that belongs to `Output`, which caches
// what the terminal already shows. This module only knows the byte-level
// encoding of each command.
//
// Cursor positions are 0-indexed in our API and converted to 1-indexed for
// the terminal.
//
// All functions return `io::Result` propagated from the underlying writer.
// In practice they never fail when writing to `OutputBuffer` (backed by a Vec).

use std::io::{self, Write};

use crate::style::Style;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` with CUP. ANSI CUP is 1-indexed.
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

/// Move the cursor to the top-left corner (CUP without parameters).
#[inline]
pub fn cursor_home(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[H")
}

#[inline]
pub fn cursor_up(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}A")
}

#[inline]
pub fn cursor_down(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}B")
}

#[inline]
pub fn cursor_right(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}C")
}

#[inline]
pub fn cursor_left(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}D")
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

/// Start cursor blinking (att610).
#[inline]
pub fn cursor_blink_on(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?12h")
}

#[inline]
pub fn cursor_blink_off(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?12l")
}

/// Save the cursor position (SCOSC).
#[inline]
pub fn save_cursor(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[s")
}

/// Restore the cursor position saved by [`save_cursor`] (SCORC).
#[inline]
pub fn restore_cursor(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[u")
}

/// Ask the terminal to report the cursor position (DSR 6).
///
/// The reply arrives on stdin as `CSI row;col R` and is decoded into
/// `Event::CursorPosition`.
#[inline]
pub fn request_cursor_position(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[6n")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2).
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Clear from the cursor to the end of the screen (ED 0).
#[inline]
pub fn clear_to_end_of_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0J")
}

/// Clear the whole current line (EL 2).
#[inline]
pub fn clear_line(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2K")
}

/// Clear from the cursor to the end of the line (EL 0).
#[inline]
pub fn clear_to_end_of_line(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0K")
}

/// Scroll the screen up by `n` lines (SU).
#[inline]
pub fn scroll_up(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}S")
}

/// Scroll the screen down by `n` lines (SD).
#[inline]
pub fn scroll_down(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}T")
}

/// Set the window title (OSC 2, BEL-terminated).
#[inline]
pub fn set_title(w: &mut impl Write, title: &str) -> io::Result<()> {
    write!(w, "\x1b]2;{title}\x07")
}

// ─── Graphic Rendition ───────────────────────────────────────────────────────

/// Reset all SGR attributes to terminal defaults (SGR 0).
///
/// The stateful writer must invalidate its tracked style after calling this.
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

/// Emit raw SGR codes as one semicolon-separated CSI sequence.
///
/// Does nothing if `codes` is empty.
pub fn sgr(w: &mut impl Write, codes: &[u8]) -> io::Result<()> {
    let Some((first, rest)) = codes.split_first() else {
        return Ok(());
    };
    write!(w, "\x1b[{first}")?;
    for code in rest {
        write!(w, ";{code}")?;
    }
    w.write_all(b"m")
}

/// Emit the SGR codes for every bit set in `style`.
#[inline]
pub fn style(w: &mut impl Write, style: Style) -> io::Result<()> {
    sgr(w, &style.sgr_codes())
}

/// Set a 24-bit foreground color.
#[inline]
pub fn fg_rgb(w: &mut impl Write, r: u8, g: u8, b: u8) -> io::Result<()> {
    write!(w, "\x1b[38;2;{r};{g};{b}m")
}

/// Set a 24-bit background color.
#[inline]
pub fn bg_rgb(w: &mut impl Write, r: u8, g: u8, b: u8) -> io::Result<()> {
    write!(w, "\x1b[48;2;{r};{g};{b}m")
}

// ─── Alternate Screen ───────────────────────────────────────────────────────

/// Enter the alternate screen buffer (DEC Private Mode 1049).
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

/// Exit the alternate screen buffer and restore the original content.
#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// ─── Mouse Protocol ─────────────────────────────────────────────────────────

/// Enable button-event mouse tracking (DEC 1002) with X10 report encoding.
///
/// Reports arrive as `CSI M` followed by three bytes, each offset by 32.
#[inline]
pub fn enable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1002h")
}

#[inline]
pub fn disable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1002l")
}

// ─── Bracketed Paste ────────────────────────────────────────────────────────

/// Enable bracketed paste mode (DEC 2004).
///
/// Pasted text is wrapped with `\x1b[200~` / `\x1b[201~`, letting the
/// application distinguish typed input from a clipboard paste.
#[inline]
pub fn enable_bracketed_paste(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2004h")
}

/// Disable bracketed paste mode.
#[inline]
pub fn disable_bracketed_paste(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2004l")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
