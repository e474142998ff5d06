// SPDX-License-Identifier: MIT
//
// Output buffering and stateful terminal control.
//
// Two components work together to minimize terminal I/O:
//
//   OutputBuffer: accumulates all ANSI bytes in memory so a whole frame
//   goes out in a single write() syscall.
//
//   Output: wraps a sink and remembers what the terminal currently shows:
//   the active style and the on/off state of each terminal mode. Requests
//   that would not change anything emit nothing. A mode toggle can be
//   forced when the cache may be stale (after the user ran a subprocess
//   that fiddled with the terminal, say).
//
// Writes into the buffer cannot fail. Only `flush` touches the sink and
// returns an `io::Result`.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::ansi;
use crate::style::Style;

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// A byte buffer that accumulates ANSI output for a single `write()` syscall.
///
/// Default capacity: 16 KB, enough for most frames without reallocation.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 16_384;

impl OutputBuffer {
    /// Create an empty buffer with default capacity (16 KB).
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes (for testing and debugging).
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append a character as UTF-8.
    #[inline]
    pub fn push_char(&mut self, ch: char) {
        let mut enc = [0u8; 4];
        self.buf
            .extend_from_slice(ch.encode_utf8(&mut enc).as_bytes());
    }

    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Clear the buffer for reuse (keeps allocated capacity).
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write accumulated output to `w`, flush it, and clear the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails. The buffer is kept intact
    /// in that case.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if !self.buf.is_empty() {
            w.write_all(&self.buf)?;
            w.flush()?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Real flushing goes through flush_to().
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Property cache ──────────────────────────────────────────────────────────

/// Terminal modes whose last applied state is cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    CursorVisible,
    CursorBlink,
    MouseTracking,
    BracketedPaste,
    AlternateScreen,
}

impl Property {
    const COUNT: usize = 5;

    const fn index(self) -> usize {
        self as usize
    }
}

/// Last applied value of each [`Property`]; `None` until first set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyCache {
    values: [Option<bool>; Property::COUNT],
}

impl PropertyCache {
    #[must_use]
    pub const fn get(&self, prop: Property) -> Option<bool> {
        self.values[prop.index()]
    }

    /// Record `value`. Returns `false` if it was already the cached value.
    pub fn set(&mut self, prop: Property, value: bool) -> bool {
        let slot = &mut self.values[prop.index()];
        if *slot == Some(value) {
            return false;
        }
        *slot = Some(value);
        true
    }

    /// Forget every cached value.
    pub fn invalidate(&mut self) {
        self.values = [None; Property::COUNT];
    }
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// Buffered, state-tracking writer for terminal control and text.
///
/// Everything is buffered until [`flush`](Self::flush).
///
/// ```
/// use fg_term::output::Output;
/// use fg_term::style::Style;
///
/// let mut out = Output::new(Vec::new());
/// out.set_style(Style::BOLD);
/// out.write("hi");
/// out.set_style(Style::BOLD); // already bold: nothing emitted
/// out.reset();
/// out.flush().unwrap();
/// assert_eq!(out.sink().as_slice(), b"\x1b[0m\x1b[1mhi\x1b[0m");
/// ```
pub struct Output<W: Write> {
    sink: W,
    buf: OutputBuffer,
    props: PropertyCache,
    /// Style the terminal currently renders with; `None` when unknown.
    style: Option<Style>,
    fg_rgb: Option<(u8, u8, u8)>,
    bg_rgb: Option<(u8, u8, u8)>,
    mouse_flag: Arc<AtomicBool>,
}

impl<W: Write> Output<W> {
    #[must_use]
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            buf: OutputBuffer::new(),
            props: PropertyCache::default(),
            style: None,
            fg_rgb: None,
            bg_rgb: None,
            mouse_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The sink bytes are flushed to.
    #[must_use]
    pub const fn sink(&self) -> &W {
        &self.sink
    }

    /// Bytes written since the last flush.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        self.buf.as_bytes()
    }

    /// The style the terminal is known to use, if known.
    #[must_use]
    pub const fn style(&self) -> Option<Style> {
        self.style
    }

    #[must_use]
    pub const fn property(&self, prop: Property) -> Option<bool> {
        self.props.get(prop)
    }

    /// Flag mirroring whether mouse tracking is enabled. The input decoder
    /// reads it to decide whether `CSI M` starts a mouse report.
    #[must_use]
    pub fn mouse_tracking_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.mouse_flag)
    }

    /// Forget all cached terminal state, so the next request of each kind
    /// is emitted unconditionally.
    pub fn invalidate(&mut self) {
        self.props.invalidate();
        self.style = None;
        self.fg_rgb = None;
        self.bg_rgb = None;
    }

    /// Send buffered bytes to the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink write fails.
    pub fn flush(&mut self) -> io::Result<()> {
        self.buf.flush_to(&mut self.sink)
    }

    // ── Text ────────────────────────────────────────────────────────

    pub fn write(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    pub fn write_char(&mut self, ch: char) {
        self.buf.push_char(ch);
    }

    /// Write `line` followed by `\r\n` (raw mode needs the explicit CR).
    pub fn write_line(&mut self, line: &str) {
        self.buf.push_str(line);
        self.buf.push_str("\r\n");
    }

    pub fn write_at(&mut self, x: u16, y: u16, text: &str) {
        self.set_cursor_pos(x, y);
        self.write(text);
    }

    /// Fill a `w`×`h` rectangle at `(x, y)` with `ch`.
    pub fn fill_rect(&mut self, x: u16, y: u16, w: u16, h: u16, ch: char) {
        let row: String = std::iter::repeat_n(ch, usize::from(w)).collect();
        for i in 0..h {
            self.write_at(x, y.saturating_add(i), &row);
        }
    }

    // ── Cursor ──────────────────────────────────────────────────────

    pub fn set_cursor_pos(&mut self, x: u16, y: u16) {
        ansi::cursor_to(&mut self.buf, x, y).ok();
    }

    pub fn home(&mut self) {
        ansi::cursor_home(&mut self.buf).ok();
    }

    pub fn cursor_up(&mut self, n: u16) {
        ansi::cursor_up(&mut self.buf, n).ok();
    }

    pub fn cursor_down(&mut self, n: u16) {
        ansi::cursor_down(&mut self.buf, n).ok();
    }

    pub fn cursor_left(&mut self, n: u16) {
        ansi::cursor_left(&mut self.buf, n).ok();
    }

    pub fn cursor_right(&mut self, n: u16) {
        ansi::cursor_right(&mut self.buf, n).ok();
    }

    pub fn save_cursor_pos(&mut self) {
        ansi::save_cursor(&mut self.buf).ok();
    }

    pub fn restore_cursor_pos(&mut self) {
        ansi::restore_cursor(&mut self.buf).ok();
    }

    /// Ask for a cursor position report; the reply arrives as
    /// `Event::CursorPosition`.
    pub fn request_cursor_pos(&mut self) {
        ansi::request_cursor_position(&mut self.buf).ok();
    }

    // ── Screen ──────────────────────────────────────────────────────

    pub fn clear_screen(&mut self) {
        ansi::clear_screen(&mut self.buf).ok();
    }

    pub fn clear_line(&mut self) {
        ansi::clear_line(&mut self.buf).ok();
    }

    pub fn clear_to_end_of_line(&mut self) {
        ansi::clear_to_end_of_line(&mut self.buf).ok();
    }

    pub fn clear_to_end_of_screen(&mut self) {
        ansi::clear_to_end_of_screen(&mut self.buf).ok();
    }

    pub fn scroll_up(&mut self, n: u16) {
        ansi::scroll_up(&mut self.buf, n).ok();
    }

    pub fn scroll_down(&mut self, n: u16) {
        ansi::scroll_down(&mut self.buf, n).ok();
    }

    pub fn set_title(&mut self, title: &str) {
        ansi::set_title(&mut self.buf, title).ok();
    }

    // ── Style ───────────────────────────────────────────────────────

    /// Return to default rendition. No-op if the style is known to be
    /// reset already.
    pub fn reset(&mut self) {
        if self.style == Some(Style::RESET) {
            return;
        }
        ansi::reset(&mut self.buf).ok();
        self.style = Some(Style::RESET);
        self.fg_rgb = None;
        self.bg_rgb = None;
    }

    /// Switch to exactly `style`.
    ///
    /// Bits can only be cleared by a full reset, so one is issued when the
    /// current style has a bit `style` lacks (or is unknown). Then each
    /// missing bit is emitted.
    pub fn set_style(&mut self, style: Style) {
        match self.style {
            Some(current) if !current.difference(style).is_empty() => self.reset(),
            None => self.reset(),
            Some(_) => {}
        }
        self.add_style(style);
    }

    /// Turn on the bits of `style` not already active.
    pub fn add_style(&mut self, style: Style) {
        if self.style.is_none() {
            self.reset();
        }
        let current = self.style.unwrap_or_default();
        let missing = style.difference(current);
        if missing.is_empty() {
            return;
        }
        ansi::style(&mut self.buf, missing).ok();
        if missing.intersects(Style::FG_MASK) {
            self.fg_rgb = None;
        }
        if missing.intersects(Style::BG_MASK) {
            self.bg_rgb = None;
        }
        self.style = Some(current | missing);
    }

    /// Turn off the bits of `style`.
    pub fn remove_style(&mut self, style: Style) {
        if self.style.is_none() {
            self.reset();
        }
        let current = self.style.unwrap_or_default();
        self.set_style(current.difference(style));
    }

    /// Set a 24-bit foreground color. Skipped if it is already active,
    /// unless `force`. Does not combine with `Style` color bits.
    pub fn set_fg_rgb(&mut self, r: u8, g: u8, b: u8, force: bool) -> bool {
        if self.fg_rgb == Some((r, g, b)) && !force {
            return false;
        }
        ansi::fg_rgb(&mut self.buf, r, g, b).ok();
        self.fg_rgb = Some((r, g, b));
        true
    }

    /// Background counterpart of [`set_fg_rgb`](Self::set_fg_rgb).
    pub fn set_bg_rgb(&mut self, r: u8, g: u8, b: u8, force: bool) -> bool {
        if self.bg_rgb == Some((r, g, b)) && !force {
            return false;
        }
        ansi::bg_rgb(&mut self.buf, r, g, b).ok();
        self.bg_rgb = Some((r, g, b));
        true
    }

    // ── Modes ───────────────────────────────────────────────────────
    //
    // Each toggle returns whether anything was emitted.

    fn toggle(&mut self, prop: Property, value: bool, force: bool, emit: fn(&mut Self)) -> bool {
        if !self.props.set(prop, value) && !force {
            return false;
        }
        emit(self);
        true
    }

    pub fn show_cursor(&mut self, force: bool) -> bool {
        self.toggle(Property::CursorVisible, true, force, |o| {
            ansi::cursor_show(&mut o.buf).ok();
        })
    }

    pub fn hide_cursor(&mut self, force: bool) -> bool {
        self.toggle(Property::CursorVisible, false, force, |o| {
            ansi::cursor_hide(&mut o.buf).ok();
        })
    }

    pub fn set_cursor_blink(&mut self, blink: bool, force: bool) -> bool {
        if blink {
            self.toggle(Property::CursorBlink, true, force, |o| {
                ansi::cursor_blink_on(&mut o.buf).ok();
            })
        } else {
            self.toggle(Property::CursorBlink, false, force, |o| {
                ansi::cursor_blink_off(&mut o.buf).ok();
            })
        }
    }

    /// Enable mouse reports and tell the decoder to expect them.
    pub fn enable_mouse_tracking(&mut self, force: bool) -> bool {
        self.mouse_flag.store(true, Ordering::Release);
        self.toggle(Property::MouseTracking, true, force, |o| {
            ansi::enable_mouse(&mut o.buf).ok();
        })
    }

    pub fn disable_mouse_tracking(&mut self, force: bool) -> bool {
        self.mouse_flag.store(false, Ordering::Release);
        self.toggle(Property::MouseTracking, false, force, |o| {
            ansi::disable_mouse(&mut o.buf).ok();
        })
    }

    pub fn enable_bracketed_paste(&mut self, force: bool) -> bool {
        self.toggle(Property::BracketedPaste, true, force, |o| {
            ansi::enable_bracketed_paste(&mut o.buf).ok();
        })
    }

    pub fn disable_bracketed_paste(&mut self, force: bool) -> bool {
        self.toggle(Property::BracketedPaste, false, force, |o| {
            ansi::disable_bracketed_paste(&mut o.buf).ok();
        })
    }

    /// Switch to the alternate screen: saves the cursor, resets the style
    /// and clears the new screen.
    pub fn enable_alternate_screen(&mut self, force: bool) -> bool {
        self.toggle(Property::AlternateScreen, true, force, |o| {
            o.save_cursor_pos();
            ansi::enter_alt_screen(&mut o.buf).ok();
            o.reset();
            o.clear_screen();
        })
    }

    /// Leave the alternate screen and restore the saved cursor.
    pub fn disable_alternate_screen(&mut self, force: bool) -> bool {
        self.toggle(Property::AlternateScreen, false, force, |o| {
            ansi::exit_alt_screen(&mut o.buf).ok();
            o.restore_cursor_pos();
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::style::Color;

    fn output() -> Output<Vec<u8>> {
        Output::new(Vec::new())
    }

    fn taken(out: &mut Output<Vec<u8>>) -> String {
        let s = String::from_utf8(out.pending().to_vec()).unwrap();
        out.buf.clear();
        s
    }

    // ── OutputBuffer ────────────────────────────────────────────────────

    #[test]
    fn output_buffer_new_is_empty() {
        let buf = OutputBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn output_buffer_write_trait() {
        let mut buf = OutputBuffer::new();
        write!(buf, "hello {}", 42).unwrap();
        assert_eq!(buf.as_bytes(), b"hello 42");
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn output_buffer_push_char_unicode() {
        let mut buf = OutputBuffer::new();
        buf.push_char('A');
        buf.push_char('é');
        assert_eq!(buf.as_bytes(), "Aé".as_bytes());
    }

    #[test]
    fn output_buffer_flush_to_clears() {
        let mut buf = OutputBuffer::new();
        buf.push_str("abc");
        let mut sink = Vec::new();
        buf.flush_to(&mut sink).unwrap();
        assert_eq!(sink, b"abc");
        assert!(buf.is_empty());
    }

    // ── PropertyCache ───────────────────────────────────────────────────

    #[test]
    fn property_cache_reports_changes() {
        let mut cache = PropertyCache::default();
        assert_eq!(cache.get(Property::MouseTracking), None);
        assert!(cache.set(Property::MouseTracking, true));
        assert!(!cache.set(Property::MouseTracking, true));
        assert!(cache.set(Property::MouseTracking, false));
        assert_eq!(cache.get(Property::MouseTracking), Some(false));
        cache.invalidate();
        assert_eq!(cache.get(Property::MouseTracking), None);
    }

    // ── Flush ───────────────────────────────────────────────────────────

    #[test]
    fn nothing_reaches_sink_before_flush() {
        let mut out = output();
        out.write("abc");
        assert!(out.sink().is_empty());
        out.flush().unwrap();
        assert_eq!(out.sink().as_slice(), b"abc");
        assert!(out.pending().is_empty());
    }

    // ── Text ────────────────────────────────────────────────────────────

    #[test]
    fn write_line_uses_crlf() {
        let mut out = output();
        out.write_line("row");
        assert_eq!(taken(&mut out), "row\r\n");
    }

    #[test]
    fn write_at_positions_first() {
        let mut out = output();
        out.write_at(2, 3, "x");
        assert_eq!(taken(&mut out), "\x1b[4;3Hx");
    }

    #[test]
    fn fill_rect_writes_each_row() {
        let mut out = output();
        out.fill_rect(1, 1, 3, 2, '#');
        assert_eq!(taken(&mut out), "\x1b[2;2H###\x1b[3;2H###");
    }

    // ── Style ───────────────────────────────────────────────────────────

    #[test]
    fn first_style_change_resets_unknown_state() {
        let mut out = output();
        out.set_style(Style::BOLD);
        assert_eq!(taken(&mut out), "\x1b[0m\x1b[1m");
        assert_eq!(out.style(), Some(Style::BOLD));
    }

    #[test]
    fn reset_is_noop_when_reset() {
        let mut out = output();
        out.reset();
        assert_eq!(taken(&mut out), "\x1b[0m");
        out.reset();
        assert_eq!(taken(&mut out), "");
    }

    #[test]
    fn set_style_superset_only_adds() {
        let mut out = output();
        out.set_style(Style::BOLD);
        taken(&mut out);
        out.set_style(Style::BOLD | Style::fg(Color::Red));
        assert_eq!(taken(&mut out), "\x1b[31m");
    }

    #[test]
    fn set_style_dropping_bit_resets() {
        let mut out = output();
        out.set_style(Style::BOLD | Style::ITALIC);
        taken(&mut out);
        out.set_style(Style::ITALIC);
        assert_eq!(taken(&mut out), "\x1b[0m\x1b[3m");
    }

    #[test]
    fn set_same_style_emits_nothing() {
        let mut out = output();
        out.set_style(Style::UNDERLINE);
        taken(&mut out);
        out.set_style(Style::UNDERLINE);
        assert_eq!(taken(&mut out), "");
    }

    #[test]
    fn add_and_remove_style() {
        let mut out = output();
        out.reset();
        out.add_style(Style::BOLD);
        out.add_style(Style::BOLD | Style::INVERSE);
        assert_eq!(taken(&mut out), "\x1b[0m\x1b[1m\x1b[7m");

        out.remove_style(Style::INVERSE);
        assert_eq!(taken(&mut out), "\x1b[0m\x1b[1m");
        assert_eq!(out.style(), Some(Style::BOLD));
    }

    #[test]
    fn rgb_colors_are_cached() {
        let mut out = output();
        assert!(out.set_fg_rgb(1, 2, 3, false));
        assert!(!out.set_fg_rgb(1, 2, 3, false));
        assert!(out.set_fg_rgb(1, 2, 3, true));
        assert!(out.set_bg_rgb(9, 9, 9, false));
        assert_eq!(
            taken(&mut out),
            "\x1b[38;2;1;2;3m\x1b[38;2;1;2;3m\x1b[48;2;9;9;9m"
        );
    }

    #[test]
    fn reset_forgets_rgb_colors() {
        let mut out = output();
        out.set_fg_rgb(1, 2, 3, false);
        out.reset();
        assert!(out.set_fg_rgb(1, 2, 3, false));
    }

    // ── Modes ───────────────────────────────────────────────────────────

    #[test]
    fn toggles_are_gated_by_cache() {
        let mut out = output();
        assert!(out.enable_bracketed_paste(false));
        assert!(!out.enable_bracketed_paste(false));
        assert!(out.enable_bracketed_paste(true));
        assert!(out.disable_bracketed_paste(false));
        assert_eq!(
            taken(&mut out),
            "\x1b[?2004h\x1b[?2004h\x1b[?2004l"
        );
    }

    #[test]
    fn disable_from_unknown_state_emits() {
        let mut out = output();
        assert!(out.disable_mouse_tracking(false));
        assert_eq!(taken(&mut out), "\x1b[?1002l");
    }

    #[test]
    fn cursor_toggles() {
        let mut out = output();
        assert!(out.hide_cursor(false));
        assert!(!out.hide_cursor(false));
        assert!(out.show_cursor(false));
        assert!(out.set_cursor_blink(true, false));
        assert!(!out.set_cursor_blink(true, false));
        assert!(out.set_cursor_blink(false, false));
        assert_eq!(
            taken(&mut out),
            "\x1b[?25l\x1b[?25h\x1b[?12h\x1b[?12l"
        );
    }

    #[test]
    fn mouse_tracking_flips_shared_flag() {
        let mut out = output();
        let flag = out.mouse_tracking_flag();
        assert!(!flag.load(Ordering::Acquire));
        out.enable_mouse_tracking(false);
        assert!(flag.load(Ordering::Acquire));
        out.disable_mouse_tracking(false);
        assert!(!flag.load(Ordering::Acquire));
    }

    #[test]
    fn alternate_screen_sequences() {
        let mut out = output();
        assert!(out.enable_alternate_screen(false));
        assert_eq!(taken(&mut out), "\x1b[s\x1b[?1049h\x1b[0m\x1b[2J");
        assert!(!out.enable_alternate_screen(false));
        assert!(out.disable_alternate_screen(false));
        assert_eq!(taken(&mut out), "\x1b[?1049l\x1b[u");
    }

    #[test]
    fn invalidate_reemits_everything() {
        let mut out = output();
        out.hide_cursor(false);
        out.reset();
        taken(&mut out);
        out.invalidate();
        assert!(out.hide_cursor(false));
        out.reset();
        assert_eq!(taken(&mut out), "\x1b[?25l\x1b[0m");
    }
}
