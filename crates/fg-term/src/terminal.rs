// SPDX-License-Identifier: MIT
//
// Terminal control: raw mode, input thread lifecycle, and restore paths.
//
// Safety: termios (tcgetattr, tcsetattr), ioctl (TIOCGWINSZ), isatty and
// the raw fd write in the panic hook are POSIX interfaces with no safe
// wrapper in std. Each unsafe block is minimal.
#![allow(unsafe_code)]
//
// A `Terminal` ties together the pieces an application needs around one
// tty: the stateful `Output` writer, the background `InputReader`, the
// SIGWINCH handler, and the saved termios. Restoration runs on three
// paths so the user's shell is never left in raw mode:
//
//   - `uninit()` / `stop()`, called by the application,
//   - `Drop`, for early returns and `?`,
//   - the panic hook, which writes a fixed restore sequence straight to
//     fd 1 (bypassing the stdout lock, which the panicking frame may
//     hold) and puts the saved termios back.

use std::io::{self, Stdout, Write};
use std::sync::{Mutex, Once};

use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::event::{Event, KeyCode, KeyEvent, Modifiers};
use crate::output::Output;
use crate::queue::EventSender;
use crate::reader::InputReader;
use crate::signal;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

impl Size {
    /// Used when the size cannot be queried (pipes, tests).
    pub const FALLBACK: Self = Self { cols: 80, rows: 24 };
}

// ─── Terminal Queries ───────────────────────────────────────────────────────

/// Query the terminal size via `ioctl(TIOCGWINSZ)` on stdout.
///
/// Returns `None` if stdout is not a terminal or the query fails.
#[cfg(unix)]
#[must_use]
pub fn get_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some(Size {
            cols: ws.ws_col,
            rows: ws.ws_row,
        })
    } else {
        None
    }
}

#[cfg(not(unix))]
#[must_use]
pub fn get_size() -> Option<Size> {
    None
}

/// Whether stdin is a terminal.
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── Panic-Safe Restore ─────────────────────────────────────────────────────

/// Termios saved by `init`, for the panic hook.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some(ref original) = *guard {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
            }
        }
    }
}

/// Disable bracketed paste and mouse tracking, reset SGR, show the cursor,
/// and leave the alternate screen (last, so the shell reappears clean).
#[rustfmt::skip]
const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[?2004l\
    \x1b[?1002l\
    \x1b[0m\
    \x1b[?25h\
    \x1b[?1049l";

static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install (once per process) a panic hook that restores the terminal
/// before the default hook prints the message.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();

            #[cfg(unix)]
            restore_termios_from_backup();

            original(info);
        }));
    });
}

fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// One terminal session.
///
/// ```no_run
/// use fg_term::config::EngineConfig;
/// use fg_term::dispatch::Dispatcher;
/// use fg_term::terminal::Terminal;
///
/// let mut dispatcher = Dispatcher::new(EngineConfig::default());
/// let mut term = Terminal::new(EngineConfig::default(), dispatcher.sender());
/// term.default_listeners(&mut dispatcher);
/// term.init()?;
/// term.enter_fullscreen()?;
/// term.start_get_chars()?;
/// // ... drain the dispatcher, draw canvases to `term.output()` ...
/// term.stop()?;
/// # Ok::<(), fg_term::Error>(())
/// ```
pub struct Terminal<W: Write = Stdout> {
    config: EngineConfig,
    sender: EventSender,
    output: Output<W>,
    reader: Option<InputReader>,

    /// Descriptor whose termios `init` switches to raw mode.
    #[cfg(unix)]
    tty: libc::c_int,
    #[cfg(unix)]
    original_termios: Option<libc::termios>,

    /// Set by `init` or `enter_fullscreen`; cleared by `uninit`.
    active: bool,
    /// Raw mode and the SIGWINCH handler are ours to undo.
    initialized: bool,
    /// Echo typed characters (see [`echo_key`](Self::echo_key)).
    echo: bool,
}

impl Terminal<Stdout> {
    /// A terminal writing to stdout and queueing input on `sender`.
    ///
    /// Does not touch the tty yet; see [`init`](Self::init).
    #[must_use]
    pub fn new(config: EngineConfig, sender: EventSender) -> Self {
        Self::with_output(config, sender, Output::new(io::stdout()))
    }
}

impl<W: Write> Terminal<W> {
    /// A terminal drawing through an arbitrary output.
    #[must_use]
    pub fn with_output(config: EngineConfig, sender: EventSender, output: Output<W>) -> Self {
        Self {
            config,
            sender,
            output,
            reader: None,
            #[cfg(unix)]
            tty: libc::STDIN_FILENO,
            #[cfg(unix)]
            original_termios: None,
            active: false,
            initialized: false,
            echo: false,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current size, queried from the OS each call.
    #[must_use]
    pub fn size(&self) -> Size {
        get_size().unwrap_or(Size::FALLBACK)
    }

    #[must_use]
    pub fn width(&self) -> u16 {
        self.size().cols
    }

    #[must_use]
    pub fn height(&self) -> u16 {
        self.size().rows
    }

    /// The stateful writer for everything drawn on this terminal.
    pub const fn output(&mut self) -> &mut Output<W> {
        &mut self.output
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the input thread is running.
    #[must_use]
    pub fn is_reading(&self) -> bool {
        self.reader.as_ref().is_some_and(|r| !r.is_finished())
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Enter raw mode and install the SIGWINCH handler and panic hook.
    ///
    /// Raw mode is skipped when stdin is not a tty. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the termios calls fail.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        install_panic_hook();
        self.enable_raw_mode()?;
        signal::install_resize_handler();
        self.initialized = true;
        self.active = true;
        tracing::info!("terminal initialized");
        Ok(())
    }

    /// Switch to the alternate screen, hide the cursor, and turn on mouse
    /// tracking and bracketed paste.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the terminal fails.
    pub fn enter_fullscreen(&mut self) -> Result<()> {
        self.active = true;
        self.output.enable_alternate_screen(false);
        self.output.hide_cursor(false);
        self.output.enable_mouse_tracking(false);
        self.output.enable_bracketed_paste(false);
        self.output.flush()?;
        Ok(())
    }

    /// Undo everything `init` and `enter_fullscreen` changed.
    ///
    /// Modes the output cache already knows to be off are not re-sent.
    /// Idempotent; also run on drop.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the terminal or restoring termios
    /// fails. Restoration continues past either error, and the terminal
    /// counts as released afterwards.
    pub fn uninit(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.output.disable_alternate_screen(false);
        self.output.disable_mouse_tracking(false);
        self.output.disable_bracketed_paste(false);
        self.output.show_cursor(false);
        self.output.reset();
        let flushed = self.output.flush();

        let restored = if self.initialized {
            let restored = self.disable_raw_mode();
            signal::uninstall_resize_handler();
            self.initialized = false;
            restored
        } else {
            Ok(())
        };
        self.active = false;
        match &restored {
            Ok(()) => tracing::info!("terminal restored"),
            Err(err) => tracing::warn!(error = %err, "terminal released, termios not restored"),
        }
        restored?;
        flushed?;
        Ok(())
    }

    /// Start the input thread. No-op if it is already running.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn start_get_chars(&mut self) -> Result<()> {
        if self.is_reading() {
            tracing::debug!("input thread already running");
            return Ok(());
        }
        let reader = InputReader::spawn(
            &self.config,
            self.sender.clone(),
            self.output.mouse_tracking_flag(),
        )?;
        self.reader = Some(reader);
        Ok(())
    }

    /// Stop the input thread and wait for it. No-op if it is not running.
    pub fn stop_get_chars(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.stop();
        }
    }

    /// `uninit` followed by `stop_get_chars`.
    ///
    /// # Errors
    ///
    /// Returns the `uninit` error; the input thread is stopped regardless.
    pub fn stop(&mut self) -> Result<()> {
        let restored = self.uninit();
        self.stop_get_chars();
        restored
    }

    // ── Listeners ───────────────────────────────────────────────────

    /// Register the standard bindings: Ctrl-C and Ctrl-D queue
    /// `Custom("stop")`.
    pub fn default_listeners(&self, dispatcher: &mut Dispatcher) {
        for key in ['c', 'd'] {
            let sender = self.sender.clone();
            dispatcher.on(KeyEvent::ctrl(key), move |_| {
                sender.send(Event::custom("stop"));
                Ok(())
            });
        }
    }

    /// Turn echoing of typed characters on or off.
    pub const fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    #[must_use]
    pub const fn echo(&self) -> bool {
        self.echo
    }

    /// With echo on, write a typed key back to the terminal: printable
    /// characters as themselves, Enter as a line break, Backspace as an
    /// erase of the previous cell. Returns whether anything was written.
    pub fn echo_key(&mut self, key: &KeyEvent) -> bool {
        if !self.echo || !key.modifiers.difference(Modifiers::SHIFT).is_empty() {
            return false;
        }
        match key.code {
            KeyCode::Enter => self.output.write("\r\n"),
            KeyCode::Char(c) if !c.is_control() => self.output.write_char(c),
            KeyCode::Backspace => {
                self.output.cursor_left(1);
                self.output.write_char(' ');
                self.output.cursor_left(1);
            }
            _ => return false,
        }
        true
    }

    // ── Raw Mode (termios) ──────────────────────────────────────────

    #[cfg(unix)]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        if !is_tty() {
            tracing::debug!("stdin is not a tty, raw mode skipped");
            return Ok(());
        }

        let fd = self.tty;
        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }

            self.original_termios = Some(termios);
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = Some(termios);
            }

            // cfmakeraw equivalent.
            termios.c_iflag &= !(libc::IGNBRK
                | libc::BRKINT
                | libc::PARMRK
                | libc::ISTRIP
                | libc::INLCR
                | libc::IGNCR
                | libc::ICRNL
                | libc::IXON);
            termios.c_oflag &= !libc::OPOST;
            termios.c_lflag &=
                !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
            termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
            termios.c_cflag |= libc::CS8;
            termios.c_cc[libc::VMIN] = 1;
            termios.c_cc[libc::VTIME] = 0;

            if libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const termios) != 0 {
                return Err(io::Error::last_os_error());
            }
        }

        tracing::info!("raw mode enabled");
        Ok(())
    }

    #[cfg(not(unix))]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    #[cfg(unix)]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        let Some(original) = self.original_termios.take() else {
            return Ok(());
        };
        unsafe {
            if libc::tcsetattr(self.tty, libc::TCSAFLUSH, &raw const original) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = None;
        }
        tracing::info!("raw mode disabled");
        Ok(())
    }

    #[cfg(not(unix))]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: Write> Drop for Terminal<W> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "terminal restore on drop failed");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
