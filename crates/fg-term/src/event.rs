// SPDX-License-Identifier: MIT
//
// Event model.
//
// Everything the engine produces or dispatches is an `Event`: decoded
// keys, mouse reports, paste blocks, resizes, cursor-position replies,
// listener failures, and free-form application events. The set of
// payload shapes is closed; applications that need their own signals use
// `Event::Custom` with a tag.
//
// Listeners select events through a `Matcher`. Besides exact type tags,
// matching supports the shorthand forms that make key bindings pleasant
// to write: a bare name (`"up"`, `"q"`, `"resize"`), an exact key with
// modifiers, or a mouse position.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::error::{BoxError, Error, Result};
use crate::terminal::Size;

// ─── Keys ───────────────────────────────────────────────────────────────────

/// Identity of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A character, printable or produced by Ctrl+letter.
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Insert,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// F1 through F20.
    F(u8),
}

impl KeyCode {
    /// Canonical name used for bare-name matching.
    ///
    /// Named keys are lowercase words (`"up"`, `"pagedown"`, `"f5"`);
    /// characters are the character itself.
    #[must_use]
    pub fn name(self) -> Cow<'static, str> {
        let name = match self {
            Self::Char(c) => return Cow::Owned(c.to_string()),
            Self::F(n) => return Cow::Owned(format!("f{n}")),
            Self::Enter => "enter",
            Self::Tab => "tab",
            Self::Backspace => "backspace",
            Self::Escape => "escape",
            Self::Insert => "insert",
            Self::Delete => "delete",
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Home => "home",
            Self::End => "end",
            Self::PageUp => "pageup",
            Self::PageDown => "pagedown",
        };
        Cow::Borrowed(name)
    }
}

bitflags! {
    /// Keyboard modifier flags.
    ///
    /// Bit values follow the xterm CSI modifier encoding, where the wire
    /// parameter is `1 + bitmask`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const CTRL  = 0b0000_0100;
    }
}

/// A key press with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    #[inline]
    #[must_use]
    pub const fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    /// A key with no modifiers.
    #[inline]
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, Modifiers::empty())
    }

    /// Ctrl + a character, e.g. `KeyEvent::ctrl('c')`.
    #[inline]
    #[must_use]
    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), Modifiers::CTRL)
    }

    /// Alt + a key (ESC-prefixed on the wire).
    #[inline]
    #[must_use]
    pub const fn alt(code: KeyCode) -> Self {
        Self::new(code, Modifiers::ALT)
    }

    /// This key with extra modifiers added.
    #[inline]
    #[must_use]
    pub const fn with(self, modifiers: Modifiers) -> Self {
        Self::new(self.code, self.modifiers.union(modifiers))
    }

    #[inline]
    #[must_use]
    pub const fn is_alt(&self) -> bool {
        self.modifiers.contains(Modifiers::ALT)
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(Modifiers::CTRL) {
            f.write_str("ctrl+")?;
        }
        if self.modifiers.contains(Modifiers::ALT) {
            f.write_str("alt+")?;
        }
        if self.modifiers.contains(Modifiers::SHIFT) {
            f.write_str("shift+")?;
        }
        match self.code {
            KeyCode::Char(c) => write!(f, "{c:?}"),
            code => f.write_str(&code.name()),
        }
    }
}

// ─── Mouse ──────────────────────────────────────────────────────────────────

/// Button identity from an X10 mouse report (`button_byte & 0b0100_0011`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    /// Any button released (X10 reports do not say which).
    Release,
    ScrollUp,
    ScrollDown,
    /// An id outside the known set (extra buttons on some terminals).
    Other(u8),
}

impl MouseButton {
    /// Decode a masked button id.
    #[must_use]
    pub const fn from_id(id: u8) -> Self {
        match id {
            0 => Self::Left,
            1 => Self::Middle,
            2 => Self::Right,
            3 => Self::Release,
            64 => Self::ScrollUp,
            65 => Self::ScrollDown,
            other => Self::Other(other),
        }
    }

    /// The wire id this button decodes from.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Left => 0,
            Self::Middle => 1,
            Self::Right => 2,
            Self::Release => 3,
            Self::ScrollUp => 64,
            Self::ScrollDown => 65,
            Self::Other(id) => id,
        }
    }
}

bitflags! {
    /// Modifier bits of an X10 mouse report, at their wire positions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct MouseModifiers: u8 {
        const SHIFT = 4;
        const ALT   = 8;
        const CTRL  = 16;
        /// Motion with a button held (drag).
        const HOLD  = 32;
    }
}

impl MouseModifiers {
    /// Terminals report Meta on the same bit as Alt.
    pub const META: Self = Self::ALT;
}

/// A decoded mouse report. Coordinates are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub button: MouseButton,
    pub x: u16,
    pub y: u16,
    pub modifiers: MouseModifiers,
}

impl MouseEvent {
    #[must_use]
    pub const fn shift(&self) -> bool {
        self.modifiers.contains(MouseModifiers::SHIFT)
    }

    #[must_use]
    pub const fn alt(&self) -> bool {
        self.modifiers.contains(MouseModifiers::ALT)
    }

    #[must_use]
    pub const fn meta(&self) -> bool {
        self.modifiers.contains(MouseModifiers::META)
    }

    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(MouseModifiers::CTRL)
    }

    #[must_use]
    pub const fn hold(&self) -> bool {
        self.modifiers.contains(MouseModifiers::HOLD)
    }
}

// ─── Errors and custom events ───────────────────────────────────────────────

/// A captured failure, carried by `Event::Error`.
///
/// The error is shared so the event stays cheap to clone. Two error events
/// are equal when they carry the same error object or the same message.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    error: Arc<dyn std::error::Error + Send + Sync + 'static>,
}

impl ErrorEvent {
    #[must_use]
    pub fn new(error: BoxError) -> Self {
        Self {
            error: Arc::from(error),
        }
    }

    /// The original failure.
    #[must_use]
    pub fn error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.error
    }

    #[must_use]
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl PartialEq for ErrorEvent {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.error, &other.error) || self.message() == other.message()
    }
}

impl Eq for ErrorEvent {}

impl From<std::io::Error> for ErrorEvent {
    fn from(err: std::io::Error) -> Self {
        Self::new(Box::new(err))
    }
}

/// An application-defined event: a tag plus positional string fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomEvent {
    pub tag: String,
    pub args: Vec<String>,
}

impl CustomEvent {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

// ─── Event ──────────────────────────────────────────────────────────────────

/// A terminal or application event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// Text delivered as one bracketed-paste block.
    Paste(String),
    /// The terminal window changed size.
    Resize(Size),
    /// Reply to a cursor-position request, 0-based.
    CursorPosition { x: u16, y: u16 },
    /// Broadcast wrapper around another event.
    Any(Box<Self>),
    /// A listener or the input reader failed.
    Error(ErrorEvent),
    Custom(CustomEvent),
}

impl Event {
    /// Shorthand for an unmodified key event.
    #[must_use]
    pub const fn key(code: KeyCode) -> Self {
        Self::Key(KeyEvent::plain(code))
    }

    /// Shorthand for a tagged custom event without fields.
    #[must_use]
    pub fn custom(tag: impl Into<String>) -> Self {
        Self::Custom(CustomEvent::new(tag))
    }

    /// Shorthand for an error event.
    #[must_use]
    pub fn error(error: impl Into<BoxError>) -> Self {
        Self::Error(ErrorEvent::new(error.into()))
    }

    /// This event's type tag.
    #[must_use]
    pub fn tag(&self) -> EventTag {
        match self {
            Self::Key(_) => EventTag::Key,
            Self::Mouse(_) => EventTag::Mouse,
            Self::Paste(_) => EventTag::Paste,
            Self::Resize(_) => EventTag::Resize,
            Self::CursorPosition { .. } => EventTag::CursorPosition,
            Self::Any(_) => EventTag::Any,
            Self::Error(_) => EventTag::Error,
            Self::Custom(c) => EventTag::Custom(c.tag.clone()),
        }
    }

    /// Whether this event is selected by `matcher`.
    #[must_use]
    pub fn matches(&self, matcher: &Matcher) -> bool {
        match matcher {
            Matcher::Tag(tag) => self.tag_is(tag),
            Matcher::Name(name) => {
                self.tag_name().eq_ignore_ascii_case(name)
                    || matches!(self, Self::Key(k) if k.code.name() == name.as_str())
            }
            Matcher::Key(key) => matches!(self, Self::Key(k) if k == key),
            Matcher::MousePos(x, y) => matches!(self, Self::Mouse(m) if m.x == *x && m.y == *y),
        }
    }

    fn tag_is(&self, tag: &EventTag) -> bool {
        match (self, tag) {
            (Self::Custom(c), EventTag::Custom(t)) => c.tag == *t,
            _ => self.tag() == *tag,
        }
    }

    fn tag_name(&self) -> &str {
        match self {
            Self::Custom(c) => &c.tag,
            _ => self.tag().static_name(),
        }
    }
}

// ─── Tags and matchers ──────────────────────────────────────────────────────

/// The type tag of an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventTag {
    Key,
    Mouse,
    Paste,
    Resize,
    CursorPosition,
    Any,
    Error,
    Custom(String),
}

impl EventTag {
    /// The tag's name as used by `Matcher::Name` and handler names.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Custom(tag) => tag,
            other => other.static_name(),
        }
    }

    const fn static_name(&self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Mouse => "mouse",
            Self::Paste => "paste",
            Self::Resize => "resize",
            Self::CursorPosition => "cursor_position",
            Self::Any => "any",
            Self::Error => "error",
            Self::Custom(_) => "custom",
        }
    }
}

/// Selects which events a listener receives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Matcher {
    /// Every event with this tag.
    Tag(EventTag),
    /// A bare name: matches events whose tag name equals it (ignoring
    /// ASCII case), and key events whose key name equals it exactly.
    /// `"key"` selects all keys, `"up"` the Up arrow, `"q"` the q key.
    Name(String),
    /// One key with exactly these modifiers.
    Key(KeyEvent),
    /// Mouse events at this 0-based cell.
    MousePos(u16, u16),
}

impl Matcher {
    /// Matcher for a custom event tag.
    #[must_use]
    pub fn custom(tag: impl Into<String>) -> Self {
        Self::Tag(EventTag::Custom(tag.into()))
    }

    /// Derive a matcher from a handler name such as `"on_resize"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandlerName`] if the name lacks the `on_` prefix
    /// or nothing follows it.
    pub fn from_handler_name(name: &str) -> Result<Self> {
        match name.strip_prefix("on_") {
            Some(rest) if !rest.is_empty() => Ok(Self::Name(rest.to_owned())),
            _ => Err(Error::HandlerName(name.to_owned())),
        }
    }
}

impl From<&str> for Matcher {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<EventTag> for Matcher {
    fn from(tag: EventTag) -> Self {
        Self::Tag(tag)
    }
}

impl From<KeyEvent> for Matcher {
    fn from(key: KeyEvent) -> Self {
        Self::Key(key)
    }
}

impl From<KeyCode> for Matcher {
    fn from(code: KeyCode) -> Self {
        Self::Key(KeyEvent::plain(code))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
