// SPDX-License-Identifier: MIT
//
// Terminal input decoder.
//
// Turns raw stdin bytes into events: keys, mouse reports, paste blocks and
// cursor-position replies. Handles what the terminal sends in the modes
// `Output` can enable:
//
// - Legacy CSI sequences (arrows, editing keys, function keys, modifiers)
// - SS3 sequences (F1-F4 and application-cursor arrows)
// - X10 mouse reports (`CSI M` + three offset bytes)
// - Bracketed paste (text between `CSI 200~` and `CSI 201~`)
// - Alt+key (ESC followed by another key)
// - UTF-8 multi-byte characters
//
// # Design
//
// A byte-at-a-time state machine. Sequences can span any number of
// `read()` calls; the state carries over between `feed` calls. Time is an
// explicit argument: a lone ESC is only known to be the Escape key once
// `alt_timeout` has passed with nothing after it, so the caller either
// feeds the next byte or calls `tick` with the current time.
//
// Nothing here is fatal. Malformed or unknown sequences are logged and
// dropped; over-long CSI sequences are replayed as literal keys.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::event::{
    Event, KeyCode, KeyEvent, Modifiers, MouseButton, MouseEvent, MouseModifiers,
};

/// Keys for `CSI n ~`, indexed by `n - 1`. `None` marks unassigned codes.
const TILDE_KEYS: [Option<KeyCode>; 35] = [
    Some(KeyCode::Home),
    Some(KeyCode::Insert),
    Some(KeyCode::Delete),
    Some(KeyCode::End),
    Some(KeyCode::PageUp),
    Some(KeyCode::PageDown),
    Some(KeyCode::Home),
    Some(KeyCode::End),
    None,
    None,
    Some(KeyCode::F(1)),
    Some(KeyCode::F(2)),
    Some(KeyCode::F(3)),
    Some(KeyCode::F(4)),
    Some(KeyCode::F(5)),
    None,
    Some(KeyCode::F(6)),
    Some(KeyCode::F(7)),
    Some(KeyCode::F(8)),
    Some(KeyCode::F(9)),
    Some(KeyCode::F(10)),
    None,
    Some(KeyCode::F(11)),
    Some(KeyCode::F(12)),
    Some(KeyCode::F(13)),
    Some(KeyCode::F(14)),
    None,
    Some(KeyCode::F(15)),
    Some(KeyCode::F(16)),
    None,
    Some(KeyCode::F(17)),
    Some(KeyCode::F(18)),
    Some(KeyCode::F(19)),
    Some(KeyCode::F(20)),
    None,
];

const PASTE_BEGIN: u16 = 200;
const PASTE_END: u16 = 201;

/// Offset added to every byte of an X10 mouse report.
const MOUSE_OFFSET: u8 = 32;
const MOUSE_BUTTON_MASK: u8 = 0b0100_0011;
const MOUSE_MODIFIER_MASK: u8 = 0b0011_1100;

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Ground,
    /// ESC seen at `Decoder::escape_at`.
    Escape,
    /// Inside `ESC [`, bytes so far.
    Csi(Vec<u8>),
    /// After `ESC O`.
    Ss3,
    /// After `CSI M`, report bytes so far.
    Mouse(Vec<u8>),
    /// Partial UTF-8 character.
    Utf8 {
        buf: [u8; 4],
        len: usize,
        need: usize,
        alt: bool,
    },
}

/// Byte → event state machine. One per input stream.
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::AtomicBool;
/// use std::time::Instant;
///
/// use fg_term::config::EngineConfig;
/// use fg_term::event::{Event, KeyCode};
/// use fg_term::input::Decoder;
///
/// let mut decoder = Decoder::new(&EngineConfig::default(), Arc::new(AtomicBool::new(false)));
/// let mut events = Vec::new();
/// decoder.feed_all(b"\x1b[A", Instant::now(), &mut events);
/// assert_eq!(events, vec![Event::key(KeyCode::Up)]);
/// ```
pub struct Decoder {
    state: State,
    escape_at: Option<Instant>,
    /// Bracketed-paste text collected so far; `Some` while pasting.
    paste: Option<Vec<u8>>,
    alt_timeout: Duration,
    csi_max_len: usize,
    paste_max_bytes: usize,
    mouse_tracking: Arc<AtomicBool>,
}

impl Decoder {
    /// Create a decoder. `mouse_tracking` tells it whether `CSI M` starts a
    /// mouse report; the terminal's output side keeps it current.
    #[must_use]
    pub fn new(config: &EngineConfig, mouse_tracking: Arc<AtomicBool>) -> Self {
        Self {
            state: State::Ground,
            escape_at: None,
            paste: None,
            alt_timeout: config.alt_timeout,
            csi_max_len: config.csi_max_len,
            paste_max_bytes: config.paste_max_bytes.max(1),
            mouse_tracking,
        }
    }

    /// Whether a sequence or character is partially decoded.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.state != State::Ground
    }

    /// Whether a bracketed paste is open.
    #[must_use]
    pub const fn is_pasting(&self) -> bool {
        self.paste.is_some()
    }

    /// When a pending lone ESC turns into the Escape key, if one is pending.
    #[must_use]
    pub fn escape_deadline(&self) -> Option<Instant> {
        match self.state {
            State::Escape => self.escape_at.map(|t| t + self.alt_timeout),
            _ => None,
        }
    }

    /// Feed every byte of `bytes`, all received at `now`.
    pub fn feed_all(&mut self, bytes: &[u8], now: Instant, out: &mut Vec<Event>) {
        for &byte in bytes {
            self.feed(byte, now, out);
        }
    }

    /// Report the passage of time without new input.
    ///
    /// Resolves a lone ESC older than the alt timeout into the Escape key.
    pub fn tick(&mut self, now: Instant, out: &mut Vec<Event>) {
        if self.escape_expired(now) {
            self.state = State::Ground;
            self.escape_at = None;
            self.emit_escape(out);
        }
    }

    /// Feed one byte received at `now`.
    pub fn feed(&mut self, byte: u8, now: Instant, out: &mut Vec<Event>) {
        self.tick(now, out);

        match std::mem::replace(&mut self.state, State::Ground) {
            State::Ground => self.ground(byte, now, out),
            State::Escape => self.escape(byte, out),
            State::Csi(buf) => self.csi(buf, byte, out),
            State::Ss3 => self.ss3(byte, out),
            State::Mouse(buf) => self.mouse(buf, byte, out),
            State::Utf8 {
                buf,
                len,
                need,
                alt,
            } => self.utf8(buf, len, need, alt, byte, now, out),
        }
    }

    fn escape_expired(&self, now: Instant) -> bool {
        self.escape_deadline().is_some_and(|deadline| now >= deadline)
    }

    fn emit_escape(&mut self, out: &mut Vec<Event>) {
        if let Some(paste) = &mut self.paste {
            paste.push(0x1b);
        } else {
            out.push(Event::key(KeyCode::Escape));
        }
    }

    // ── States ──────────────────────────────────────────────────────────

    fn ground(&mut self, byte: u8, now: Instant, out: &mut Vec<Event>) {
        if byte == 0x1b {
            self.state = State::Escape;
            self.escape_at = Some(now);
            return;
        }
        if self.paste.is_some() {
            let byte = if byte == b'\r' { b'\n' } else { byte };
            self.push_paste(&[byte], out);
            return;
        }
        self.key_byte(byte, Modifiers::empty(), out);
    }

    /// Decode a byte that starts a key, outside of any sequence.
    fn key_byte(&mut self, byte: u8, modifiers: Modifiers, out: &mut Vec<Event>) {
        if let Some(key) = ground_key(byte) {
            out.push(Event::Key(key.with(modifiers)));
            return;
        }
        match utf8_char_len(byte) {
            0 | 1 => tracing::debug!(byte, "invalid UTF-8 lead byte dropped"),
            need => {
                let mut buf = [0u8; 4];
                buf[0] = byte;
                self.state = State::Utf8 {
                    buf,
                    len: 1,
                    need,
                    alt: modifiers.contains(Modifiers::ALT),
                };
            }
        }
    }

    fn escape(&mut self, byte: u8, out: &mut Vec<Event>) {
        self.escape_at = None;
        match byte {
            b'[' => self.state = State::Csi(Vec::new()),
            b'O' => self.state = State::Ss3,
            _ if self.paste.is_some() => {
                let byte = if byte == b'\r' { b'\n' } else { byte };
                self.push_paste(&[0x1b, byte], out);
            }
            0x1b => out.push(Event::Key(KeyEvent::alt(KeyCode::Escape))),
            _ => self.key_byte(byte, Modifiers::ALT, out),
        }
    }

    fn csi(&mut self, mut buf: Vec<u8>, byte: u8, out: &mut Vec<Event>) {
        if buf.is_empty() && byte == b'M' {
            self.state = State::Mouse(Vec::with_capacity(3));
            return;
        }

        // The final byte counts toward the bound.
        buf.push(byte);
        if buf.len() > self.csi_max_len {
            tracing::debug!(len = buf.len(), "CSI sequence too long, replaying as keys");
            if self.paste.is_some() {
                let mut literal = b"\x1b[".to_vec();
                literal.extend_from_slice(&buf);
                self.push_paste(&literal, out);
            } else {
                out.push(Event::key(KeyCode::Escape));
                out.push(Event::key(KeyCode::Char('[')));
                replay_literal(&buf, out);
            }
            return;
        }

        if byte.is_ascii_alphabetic() || byte == b'~' {
            let (params, _) = buf.split_at(buf.len() - 1);
            self.csi_command(params, byte, out);
            return;
        }

        self.state = State::Csi(buf);
    }

    fn csi_command(&mut self, params: &[u8], final_byte: u8, out: &mut Vec<Event>) {
        if self.paste.is_some() {
            if final_byte == b'~' && parse_decimal(params) == Some(PASTE_END) {
                self.finish_paste(out);
            } else {
                let mut literal = b"\x1b[".to_vec();
                literal.extend_from_slice(params);
                literal.push(final_byte);
                self.push_paste(&literal, out);
            }
            return;
        }

        let mut fields = params.split(|&b| b == b';');
        let first = fields.next().unwrap_or_default();
        let second = fields.next();
        let modifiers = second
            .and_then(parse_decimal)
            .map_or(Modifiers::empty(), decode_modifiers);

        let code = match final_byte.to_ascii_uppercase() {
            b'A' => KeyCode::Up,
            b'B' => KeyCode::Down,
            b'C' => KeyCode::Right,
            b'D' => KeyCode::Left,
            b'F' => KeyCode::End,
            b'H' => KeyCode::Home,
            b'Z' => {
                out.push(Event::Key(KeyEvent::new(KeyCode::Tab, Modifiers::SHIFT)));
                return;
            }
            b'R' => {
                match (parse_decimal(first), second.and_then(parse_decimal)) {
                    (Some(row), Some(col)) => out.push(Event::CursorPosition {
                        x: col.saturating_sub(1),
                        y: row.saturating_sub(1),
                    }),
                    _ => tracing::debug!(
                        params = %String::from_utf8_lossy(params),
                        "malformed cursor position report"
                    ),
                }
                return;
            }
            b'~' => {
                let Some(n) = parse_decimal(first) else {
                    tracing::debug!(
                        params = %String::from_utf8_lossy(params),
                        "invalid CSI argument for '~'"
                    );
                    return;
                };
                match n {
                    PASTE_BEGIN => self.paste = Some(Vec::new()),
                    PASTE_END => tracing::debug!("paste end outside of a paste"),
                    _ => match tilde_key(n) {
                        Some(code) => out.push(Event::Key(KeyEvent::new(code, modifiers))),
                        None => tracing::debug!(n, "unassigned CSI '~' key"),
                    },
                }
                return;
            }
            _ => {
                tracing::debug!(
                    params = %String::from_utf8_lossy(params),
                    command = %char::from(final_byte),
                    "unknown CSI command"
                );
                return;
            }
        };
        out.push(Event::Key(KeyEvent::new(code, modifiers)));
    }

    fn ss3(&mut self, byte: u8, out: &mut Vec<Event>) {
        if self.paste.is_some() {
            self.push_paste(&[0x1b, b'O', byte], out);
            return;
        }
        let code = match byte {
            b'P' => KeyCode::F(1),
            b'Q' => KeyCode::F(2),
            b'R' => KeyCode::F(3),
            b'S' => KeyCode::F(4),
            b'A' => KeyCode::Up,
            b'B' => KeyCode::Down,
            b'C' => KeyCode::Right,
            b'D' => KeyCode::Left,
            b'H' => KeyCode::Home,
            b'F' => KeyCode::End,
            _ => {
                tracing::debug!(byte, "invalid SS3 key");
                return;
            }
        };
        out.push(Event::key(code));
    }

    fn mouse(&mut self, mut buf: Vec<u8>, byte: u8, out: &mut Vec<Event>) {
        buf.push(byte);
        if buf.len() < 3 {
            self.state = State::Mouse(buf);
            return;
        }

        if self.paste.is_some() {
            let mut literal = b"\x1b[M".to_vec();
            literal.extend_from_slice(&buf);
            self.push_paste(&literal, out);
            return;
        }
        if !self.mouse_tracking.load(Ordering::Acquire) {
            tracing::warn!("mouse report received while mouse tracking is disabled");
            return;
        }
        out.push(Event::Mouse(decode_mouse(buf[0], buf[1], buf[2])));
    }

    #[allow(clippy::too_many_arguments)]
    fn utf8(
        &mut self,
        mut buf: [u8; 4],
        len: usize,
        need: usize,
        alt: bool,
        byte: u8,
        now: Instant,
        out: &mut Vec<Event>,
    ) {
        if byte & 0b1100_0000 != 0b1000_0000 {
            tracing::debug!(lead = buf[0], byte, "truncated UTF-8 sequence dropped");
            self.ground(byte, now, out);
            return;
        }
        buf[len] = byte;
        let len = len + 1;
        if len < need {
            self.state = State::Utf8 {
                buf,
                len,
                need,
                alt,
            };
            return;
        }

        match std::str::from_utf8(&buf[..len]).ok().and_then(|s| s.chars().next()) {
            Some(ch) => {
                let key = KeyEvent::plain(KeyCode::Char(ch));
                let key = if alt { key.with(Modifiers::ALT) } else { key };
                out.push(Event::Key(key));
            }
            None => tracing::debug!(bytes = ?&buf[..len], "invalid UTF-8 sequence dropped"),
        }
    }

    // ── Bracketed paste ─────────────────────────────────────────────────

    fn push_paste(&mut self, bytes: &[u8], out: &mut Vec<Event>) {
        let Some(paste) = &mut self.paste else {
            return;
        };
        paste.extend_from_slice(bytes);
        if paste.len() < self.paste_max_bytes {
            return;
        }
        let tail = split_at_char_boundary(paste);
        if paste.is_empty() {
            // Limit smaller than one character: wait for it to complete.
            *paste = tail;
            return;
        }
        tracing::warn!(
            bytes = paste.len(),
            "bracketed paste exceeds buffer limit, emitting partial paste"
        );
        let chunk = std::mem::replace(paste, tail);
        out.push(Event::Paste(String::from_utf8_lossy(&chunk).into_owned()));
    }

    fn finish_paste(&mut self, out: &mut Vec<Event>) {
        if let Some(paste) = self.paste.take() {
            out.push(Event::Paste(String::from_utf8_lossy(&paste).into_owned()));
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Key for a single byte outside any sequence, or `None` for bytes that
/// start (or continue) a multi-byte character.
const fn ground_key(byte: u8) -> Option<KeyEvent> {
    let key = match byte {
        b'\r' | b'\n' => KeyEvent::plain(KeyCode::Enter),
        b'\t' => KeyEvent::plain(KeyCode::Tab),
        0x08 | 0x7f => KeyEvent::plain(KeyCode::Backspace),
        0x1b => KeyEvent::plain(KeyCode::Escape),
        0x00 => KeyEvent::ctrl('@'),
        b @ 0x01..=0x1a => KeyEvent::ctrl((b + b'a' - 1) as char),
        b @ 0x1c..=0x1f => KeyEvent::ctrl((b + 0x40) as char),
        b @ 0x20..=0x7e => KeyEvent::plain(KeyCode::Char(b as char)),
        _ => return None,
    };
    Some(key)
}

/// Emit the bytes of an abandoned sequence as individual keys.
fn replay_literal(bytes: &[u8], out: &mut Vec<Event>) {
    for ch in String::from_utf8_lossy(bytes).chars() {
        let key = if ch.is_ascii() {
            ground_key(ch as u8)
        } else {
            Some(KeyEvent::plain(KeyCode::Char(ch)))
        };
        if let Some(key) = key {
            out.push(Event::Key(key));
        }
    }
}

fn tilde_key(n: u16) -> Option<KeyCode> {
    let index = usize::from(n).checked_sub(1)?;
    TILDE_KEYS.get(index).copied().flatten()
}

/// Parse a non-empty, all-digit parameter. Saturates at `u16::MAX`.
fn parse_decimal(param: &[u8]) -> Option<u16> {
    if param.is_empty() || !param.iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(param.iter().fold(0u16, |val, &d| {
        val.saturating_mul(10).saturating_add(u16::from(d - b'0'))
    }))
}

/// Decode a CSI modifier parameter. The encoding is `1 + bitmask`; 0 and 1
/// mean no modifiers. Bits above Ctrl (Super, Meta) are ignored.
#[allow(clippy::cast_possible_truncation)]
const fn decode_modifiers(param: u16) -> Modifiers {
    let val = if param > 0 { param - 1 } else { 0 };
    Modifiers::from_bits_truncate(val as u8)
}

fn decode_mouse(button: u8, x: u8, y: u8) -> MouseEvent {
    let b = button.wrapping_sub(MOUSE_OFFSET);
    MouseEvent {
        button: MouseButton::from_id(b & MOUSE_BUTTON_MASK),
        x: u16::from(x.saturating_sub(MOUSE_OFFSET + 1)),
        y: u16::from(y.saturating_sub(MOUSE_OFFSET + 1)),
        modifiers: MouseModifiers::from_bits_truncate(b & MOUSE_MODIFIER_MASK),
    }
}

/// Expected byte length of a UTF-8 character from its lead byte.
/// Returns 0 for invalid lead bytes (continuation bytes, 0xF8 and up).
const fn utf8_char_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 0,
    }
}

/// Split off an incomplete trailing UTF-8 character, leaving only whole
/// characters in `buf`. Returns the split-off tail.
fn split_at_char_boundary(buf: &mut Vec<u8>) -> Vec<u8> {
    match std::str::from_utf8(buf.as_slice()) {
        Err(e) if e.error_len().is_none() => buf.split_off(e.valid_up_to()),
        _ => Vec::new(),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn decoder() -> Decoder {
        Decoder::new(&EngineConfig::default(), Arc::new(AtomicBool::new(true)))
    }

    /// Helper: decode bytes all arriving at one instant.
    fn parse(data: &[u8]) -> Vec<Event> {
        let mut d = decoder();
        let mut out = Vec::new();
        d.feed_all(data, Instant::now(), &mut out);
        out
    }

    fn key(code: KeyCode) -> Event {
        Event::key(code)
    }

    fn key_mod(code: KeyCode, modifiers: Modifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    // ── Plain keys ──────────────────────────────────────────────────────

    #[test]
    fn ascii_chars() {
        assert_eq!(
            parse(b"a~ 1"),
            vec![
                key(KeyCode::Char('a')),
                key(KeyCode::Char('~')),
                key(KeyCode::Char(' ')),
                key(KeyCode::Char('1')),
            ]
        );
    }

    #[test]
    fn enter_tab_backspace() {
        assert_eq!(
            parse(b"\r\n\t\x7f\x08"),
            vec![
                key(KeyCode::Enter),
                key(KeyCode::Enter),
                key(KeyCode::Tab),
                key(KeyCode::Backspace),
                key(KeyCode::Backspace),
            ]
        );
    }

    #[test]
    fn ctrl_letters() {
        assert_eq!(parse(b"\x03"), vec![Event::Key(KeyEvent::ctrl('c'))]);
        assert_eq!(parse(b"\x04"), vec![Event::Key(KeyEvent::ctrl('d'))]);
        assert_eq!(parse(b"\x1a"), vec![Event::Key(KeyEvent::ctrl('z'))]);
        assert_eq!(parse(b"\x00"), vec![Event::Key(KeyEvent::ctrl('@'))]);
        assert_eq!(parse(b"\x1c"), vec![Event::Key(KeyEvent::ctrl('\\'))]);
    }

    #[test]
    fn utf8_characters() {
        assert_eq!(
            parse("é中🔥".as_bytes()),
            vec![
                key(KeyCode::Char('é')),
                key(KeyCode::Char('中')),
                key(KeyCode::Char('🔥')),
            ]
        );
    }

    #[test]
    fn utf8_split_across_feeds() {
        let mut d = decoder();
        let mut out = Vec::new();
        let bytes = "中".as_bytes();
        let now = Instant::now();
        d.feed_all(&bytes[..1], now, &mut out);
        assert!(out.is_empty());
        assert!(d.has_pending());
        d.feed_all(&bytes[1..], now, &mut out);
        assert_eq!(out, vec![key(KeyCode::Char('中'))]);
        assert!(!d.has_pending());
    }

    #[test]
    fn truncated_utf8_keeps_following_byte() {
        assert_eq!(parse(b"\xe4a"), vec![key(KeyCode::Char('a'))]);
    }

    #[test]
    fn stray_continuation_byte_dropped() {
        assert_eq!(parse(b"\x80b"), vec![key(KeyCode::Char('b'))]);
    }

    // ── CSI ─────────────────────────────────────────────────────────────

    #[test]
    fn arrows() {
        assert_eq!(
            parse(b"\x1b[A\x1b[B\x1b[C\x1b[D"),
            vec![
                key(KeyCode::Up),
                key(KeyCode::Down),
                key(KeyCode::Right),
                key(KeyCode::Left),
            ]
        );
    }

    #[test]
    fn home_end_letters() {
        assert_eq!(parse(b"\x1b[H"), vec![key(KeyCode::Home)]);
        assert_eq!(parse(b"\x1b[F"), vec![key(KeyCode::End)]);
    }

    #[test]
    fn final_byte_is_case_insensitive() {
        assert_eq!(parse(b"\x1b[a"), vec![key(KeyCode::Up)]);
    }

    #[test]
    fn modified_arrows() {
        assert_eq!(parse(b"\x1b[1;2A"), vec![key_mod(KeyCode::Up, Modifiers::SHIFT)]);
        assert_eq!(parse(b"\x1b[1;3B"), vec![key_mod(KeyCode::Down, Modifiers::ALT)]);
        assert_eq!(parse(b"\x1b[1;5C"), vec![key_mod(KeyCode::Right, Modifiers::CTRL)]);
        assert_eq!(
            parse(b"\x1b[1;6D"),
            vec![key_mod(KeyCode::Left, Modifiers::SHIFT | Modifiers::CTRL)]
        );
    }

    #[test]
    fn shift_tab() {
        assert_eq!(parse(b"\x1b[Z"), vec![key_mod(KeyCode::Tab, Modifiers::SHIFT)]);
    }

    #[test]
    fn tilde_keys() {
        assert_eq!(parse(b"\x1b[1~"), vec![key(KeyCode::Home)]);
        assert_eq!(parse(b"\x1b[2~"), vec![key(KeyCode::Insert)]);
        assert_eq!(parse(b"\x1b[3~"), vec![key(KeyCode::Delete)]);
        assert_eq!(parse(b"\x1b[4~"), vec![key(KeyCode::End)]);
        assert_eq!(parse(b"\x1b[5~"), vec![key(KeyCode::PageUp)]);
        assert_eq!(parse(b"\x1b[6~"), vec![key(KeyCode::PageDown)]);
        assert_eq!(parse(b"\x1b[7~"), vec![key(KeyCode::Home)]);
        assert_eq!(parse(b"\x1b[8~"), vec![key(KeyCode::End)]);
    }

    #[test]
    fn function_keys() {
        assert_eq!(parse(b"\x1b[11~"), vec![key(KeyCode::F(1))]);
        assert_eq!(parse(b"\x1b[15~"), vec![key(KeyCode::F(5))]);
        assert_eq!(parse(b"\x1b[17~"), vec![key(KeyCode::F(6))]);
        assert_eq!(parse(b"\x1b[24~"), vec![key(KeyCode::F(12))]);
        assert_eq!(parse(b"\x1b[34~"), vec![key(KeyCode::F(20))]);
    }

    #[test]
    fn modified_tilde_key() {
        assert_eq!(parse(b"\x1b[3;5~"), vec![key_mod(KeyCode::Delete, Modifiers::CTRL)]);
        assert_eq!(parse(b"\x1b[15;2~"), vec![key_mod(KeyCode::F(5), Modifiers::SHIFT)]);
    }

    #[test]
    fn unassigned_tilde_codes_produce_nothing() {
        assert!(parse(b"\x1b[0~").is_empty());
        assert!(parse(b"\x1b[9~").is_empty());
        assert!(parse(b"\x1b[16~").is_empty());
        assert!(parse(b"\x1b[35~").is_empty());
        assert!(parse(b"\x1b[99~").is_empty());
    }

    #[test]
    fn non_numeric_tilde_dropped() {
        assert_eq!(parse(b"\x1b[1:2~q"), vec![key(KeyCode::Char('q'))]);
    }

    #[test]
    fn unknown_command_dropped() {
        assert_eq!(parse(b"\x1b[5Xz"), vec![key(KeyCode::Char('z'))]);
    }

    #[test]
    fn cursor_position_report() {
        assert_eq!(
            parse(b"\x1b[12;40R"),
            vec![Event::CursorPosition { x: 39, y: 11 }]
        );
    }

    #[test]
    fn malformed_cursor_report_dropped() {
        assert!(parse(b"\x1b[12R").is_empty());
    }

    #[test]
    fn csi_split_across_feeds() {
        let mut d = decoder();
        let mut out = Vec::new();
        let now = Instant::now();
        d.feed_all(b"\x1b[1", now, &mut out);
        d.feed_all(b"5;5", now, &mut out);
        assert!(out.is_empty());
        d.feed_all(b"~", now, &mut out);
        assert_eq!(out, vec![key_mod(KeyCode::F(5), Modifiers::CTRL)]);
    }

    #[test]
    fn overlong_csi_replays_literally() {
        // 11 non-final bytes exceed the default bound of 10.
        let out = parse(b"\x1b[12345678901");
        let mut expected = vec![key(KeyCode::Escape), key(KeyCode::Char('['))];
        expected.extend("12345678901".chars().map(|c| key(KeyCode::Char(c))));
        assert_eq!(out, expected);
    }

    #[test]
    fn ten_byte_csi_still_accepted() {
        assert_eq!(parse(b"\x1b[000000003~"), vec![key(KeyCode::Delete)]);
    }

    #[test]
    fn final_byte_past_bound_is_replayed() {
        // Ten parameter bytes plus the final byte make eleven.
        let out = parse(b"\x1b[0000000003~x");
        let mut expected = vec![key(KeyCode::Escape), key(KeyCode::Char('['))];
        expected.extend("0000000003~x".chars().map(|c| key(KeyCode::Char(c))));
        assert_eq!(out, expected);
    }

    // ── SS3 ─────────────────────────────────────────────────────────────

    #[test]
    fn ss3_function_keys() {
        assert_eq!(
            parse(b"\x1bOP\x1bOQ\x1bOR\x1bOS"),
            vec![
                key(KeyCode::F(1)),
                key(KeyCode::F(2)),
                key(KeyCode::F(3)),
                key(KeyCode::F(4)),
            ]
        );
    }

    #[test]
    fn ss3_cursor_keys() {
        assert_eq!(parse(b"\x1bOA\x1bOH"), vec![key(KeyCode::Up), key(KeyCode::Home)]);
    }

    #[test]
    fn ss3_invalid_dropped() {
        assert_eq!(parse(b"\x1bOzq"), vec![key(KeyCode::Char('q'))]);
    }

    // ── Escape and Alt ──────────────────────────────────────────────────

    #[test]
    fn lone_escape_waits_for_timeout() {
        let mut d = decoder();
        let mut out = Vec::new();
        let t0 = Instant::now();
        d.feed(0x1b, t0, &mut out);
        assert!(out.is_empty());
        assert_eq!(d.escape_deadline(), Some(t0 + Duration::from_millis(100)));

        d.tick(t0 + Duration::from_millis(50), &mut out);
        assert!(out.is_empty());

        d.tick(t0 + Duration::from_millis(100), &mut out);
        assert_eq!(out, vec![key(KeyCode::Escape)]);
        assert!(!d.has_pending());

        d.tick(t0 + Duration::from_millis(500), &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn late_byte_after_escape_is_plain() {
        let mut d = decoder();
        let mut out = Vec::new();
        let t0 = Instant::now();
        d.feed(0x1b, t0, &mut out);
        d.feed(b'a', t0 + Duration::from_millis(150), &mut out);
        assert_eq!(out, vec![key(KeyCode::Escape), key(KeyCode::Char('a'))]);
    }

    #[test]
    fn alt_char() {
        assert_eq!(
            parse(b"\x1ba"),
            vec![Event::Key(KeyEvent::alt(KeyCode::Char('a')))]
        );
    }

    #[test]
    fn alt_enter_and_alt_ctrl() {
        assert_eq!(parse(b"\x1b\r"), vec![Event::Key(KeyEvent::alt(KeyCode::Enter))]);
        assert_eq!(
            parse(b"\x1b\x01"),
            vec![key_mod(KeyCode::Char('a'), Modifiers::ALT | Modifiers::CTRL)]
        );
    }

    #[test]
    fn alt_utf8() {
        assert_eq!(
            parse("\x1bé".as_bytes()),
            vec![Event::Key(KeyEvent::alt(KeyCode::Char('é')))]
        );
    }

    #[test]
    fn double_escape_is_alt_escape() {
        assert_eq!(
            parse(b"\x1b\x1b"),
            vec![Event::Key(KeyEvent::alt(KeyCode::Escape))]
        );
    }

    // ── Mouse ───────────────────────────────────────────────────────────

    #[test]
    fn mouse_left_press() {
        assert_eq!(
            parse(&[0x1b, b'[', b'M', 32, 32 + 5, 32 + 10]),
            vec![Event::Mouse(MouseEvent {
                button: MouseButton::Left,
                x: 4,
                y: 9,
                modifiers: MouseModifiers::empty(),
            })]
        );
    }

    #[test]
    fn mouse_scroll_with_modifiers() {
        let out = parse(&[0x1b, b'[', b'M', 32 + 64 + 16 + 4, 33, 33]);
        assert_eq!(
            out,
            vec![Event::Mouse(MouseEvent {
                button: MouseButton::ScrollUp,
                x: 0,
                y: 0,
                modifiers: MouseModifiers::CTRL | MouseModifiers::SHIFT,
            })]
        );
    }

    #[test]
    fn mouse_drag_reports_hold() {
        let out = parse(&[0x1b, b'[', b'M', 32 + 32 + 2, 40, 40]);
        let Event::Mouse(m) = &out[0] else {
            panic!("expected mouse event, got {out:?}");
        };
        assert_eq!(m.button, MouseButton::Right);
        assert!(m.hold());
    }

    #[test]
    fn mouse_ignored_when_tracking_disabled() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut d = Decoder::new(&EngineConfig::default(), Arc::clone(&flag));
        let mut out = Vec::new();
        d.feed_all(&[0x1b, b'[', b'M', 32, 40, 40, b'x'], Instant::now(), &mut out);
        // The three report bytes are consumed, not typed.
        assert_eq!(out, vec![key(KeyCode::Char('x'))]);

        flag.store(true, Ordering::Release);
        d.feed_all(&[0x1b, b'[', b'M', 32, 40, 40], Instant::now(), &mut out);
        assert_eq!(out.len(), 2);
    }

    // ── Bracketed paste ─────────────────────────────────────────────────

    #[test]
    fn paste_block_is_one_event() {
        assert_eq!(
            parse(b"\x1b[200~text\x1b[201~"),
            vec![Event::Paste("text".into())]
        );
    }

    #[test]
    fn paste_normalizes_cr() {
        assert_eq!(
            parse(b"\x1b[200~a\r\nb\rc\x1b[201~"),
            vec![Event::Paste("a\n\nb\nc".into())]
        );
    }

    #[test]
    fn paste_keeps_escape_sequences_verbatim() {
        assert_eq!(
            parse(b"\x1b[200~x\x1b[Ay\x1bOPz\x1b[201~"),
            vec![Event::Paste("x\x1b[Ay\x1bOPz".into())]
        );
    }

    #[test]
    fn paste_keeps_utf8() {
        assert_eq!(
            parse("\x1b[200~中文\x1b[201~".as_bytes()),
            vec![Event::Paste("中文".into())]
        );
    }

    #[test]
    fn empty_paste() {
        assert_eq!(parse(b"\x1b[200~\x1b[201~"), vec![Event::Paste(String::new())]);
    }

    #[test]
    fn keys_resume_after_paste() {
        assert_eq!(
            parse(b"\x1b[200~p\x1b[201~k"),
            vec![Event::Paste("p".into()), key(KeyCode::Char('k'))]
        );
    }

    #[test]
    fn paste_end_outside_paste_ignored() {
        assert_eq!(parse(b"\x1b[201~k"), vec![key(KeyCode::Char('k'))]);
    }

    #[test]
    fn paste_split_across_feeds() {
        let mut d = decoder();
        let mut out = Vec::new();
        let now = Instant::now();
        d.feed_all(b"\x1b[200~hel", now, &mut out);
        assert!(d.is_pasting());
        d.feed_all(b"lo\x1b[20", now, &mut out);
        assert!(out.is_empty());
        d.feed_all(b"1~", now, &mut out);
        assert_eq!(out, vec![Event::Paste("hello".into())]);
        assert!(!d.is_pasting());
    }

    #[test]
    fn oversized_paste_emits_chunks() {
        let config = EngineConfig::default().with_paste_max_bytes(4);
        let mut d = Decoder::new(&config, Arc::new(AtomicBool::new(false)));
        let mut out = Vec::new();
        d.feed_all(b"\x1b[200~abcdefg\x1b[201~", Instant::now(), &mut out);
        assert_eq!(
            out,
            vec![Event::Paste("abcd".into()), Event::Paste("efg".into())]
        );
    }

    #[test]
    fn paste_chunks_split_on_char_boundary() {
        let config = EngineConfig::default().with_paste_max_bytes(4);
        let mut d = Decoder::new(&config, Arc::new(AtomicBool::new(false)));
        let mut out = Vec::new();
        // "ab" + 3-byte char: the limit is hit mid-character.
        d.feed_all("\x1b[200~ab中\x1b[201~".as_bytes(), Instant::now(), &mut out);
        assert_eq!(
            out,
            vec![Event::Paste("ab".into()), Event::Paste("中".into())]
        );
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    #[test]
    fn parse_decimal_rules() {
        assert_eq!(parse_decimal(b"42"), Some(42));
        assert_eq!(parse_decimal(b""), None);
        assert_eq!(parse_decimal(b"4a"), None);
        assert_eq!(parse_decimal(b"99999999"), Some(u16::MAX));
    }

    #[test]
    fn modifier_decoding() {
        assert_eq!(decode_modifiers(0), Modifiers::empty());
        assert_eq!(decode_modifiers(1), Modifiers::empty());
        assert_eq!(decode_modifiers(2), Modifiers::SHIFT);
        assert_eq!(decode_modifiers(8), Modifiers::all());
    }

    #[test]
    fn tilde_table_gaps() {
        assert_eq!(tilde_key(0), None);
        assert_eq!(tilde_key(10), None);
        assert_eq!(tilde_key(22), None);
        assert_eq!(tilde_key(23), Some(KeyCode::F(11)));
        assert_eq!(tilde_key(36), None);
    }
}
