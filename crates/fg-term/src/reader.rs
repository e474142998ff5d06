// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Background input thread: stdin bytes in, events out.
//
// The thread owns its `Decoder` and talks to the rest of the engine only
// through an `EventSender` and two atomics (its running flag and the
// mouse-tracking flag the output side maintains). Each iteration it:
//
//   1. turns a pending SIGWINCH into `Event::Resize`,
//   2. polls the input fd, waking no later than a pending ESC deadline,
//   3. feeds whatever arrived to the decoder, or ticks it on timeout,
//   4. queues the decoded events.
//
// The poll timeout doubles as shutdown latency: `stop` clears the flag
// and the thread notices within one `poll_interval`.

#[cfg(unix)]
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::event::Event;
use crate::input::Decoder;
use crate::queue::EventSender;
use crate::signal::ResizeWatch;
use crate::terminal;

/// Bytes read per `read()` call. A keypress is 1-6 bytes, a paste can be
/// kilobytes.
const READ_BUF_SIZE: usize = 4096;

/// Name of the input thread.
pub const THREAD_NAME: &str = "fg-input";

/// Handle to the background input thread.
///
/// The thread queues `Custom("start")` once it is running, then one event
/// per decoded input. It stops on [`stop`](Self::stop), on drop, at end of
/// input, or after a read error (reported as `Event::Error`).
///
/// ```no_run
/// use std::sync::Arc;
/// use std::sync::atomic::AtomicBool;
///
/// use fg_term::config::EngineConfig;
/// use fg_term::queue::EventQueue;
/// use fg_term::reader::InputReader;
///
/// let queue = EventQueue::new();
/// let mut reader = InputReader::spawn(
///     &EngineConfig::default(),
///     queue.sender(),
///     Arc::new(AtomicBool::new(false)),
/// )?;
/// // ... drain `queue` ...
/// reader.stop();
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct InputReader {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl InputReader {
    /// Spawn a reader on stdin.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to create the thread.
    pub fn spawn(
        config: &EngineConfig,
        sender: EventSender,
        mouse_tracking: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        #[cfg(unix)]
        {
            Self::spawn_fd(libc::STDIN_FILENO, config, sender, mouse_tracking)
        }
        #[cfg(not(unix))]
        {
            Self::spawn_with(config, sender, mouse_tracking)
        }
    }

    /// Spawn a reader on an arbitrary readable file descriptor.
    ///
    /// The descriptor is borrowed: it must stay open until the reader has
    /// stopped, and it is not closed by the reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to create the thread.
    #[cfg(unix)]
    pub fn spawn_fd(
        fd: std::os::unix::io::RawFd,
        config: &EngineConfig,
        sender: EventSender,
        mouse_tracking: Arc<AtomicBool>,
    ) -> io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let config = *config;

        let handle = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || {
                let decoder = Decoder::new(&config, mouse_tracking);
                reader_loop(fd, &config, decoder, &sender, &flag);
            })?;

        Ok(Self {
            handle: Some(handle),
            running,
        })
    }

    #[cfg(not(unix))]
    fn spawn_with(
        config: &EngineConfig,
        sender: EventSender,
        mouse_tracking: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let config = *config;

        let handle = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || {
                let decoder = Decoder::new(&config, mouse_tracking);
                reader_loop(&config, decoder, &sender, &flag);
            })?;

        Ok(Self {
            handle: Some(handle),
            running,
        })
    }

    /// Whether the thread has exited (stopped, end of input, or error).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Ask the thread to exit and wait for it.
    ///
    /// Called from the reader thread itself (e.g. by a listener running
    /// there), it only clears the flag. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            tracing::error!("input thread panicked");
        }
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.stop();
    }
}

// ─── Thread body ────────────────────────────────────────────────────────────

fn send_resize(resize: &mut ResizeWatch, sender: &EventSender) {
    if !resize.take() {
        return;
    }
    match terminal::get_size() {
        Some(size) => {
            sender.send(Event::Resize(size));
        }
        None => tracing::debug!("resize signalled but the size query failed"),
    }
}

/// Send decoded events. Returns `false` once the consumer is gone.
fn send_all(events: &mut Vec<Event>, sender: &EventSender) -> bool {
    events.drain(..).all(|event| sender.send(event))
}

/// Poll timeout: the poll interval, shortened to wake at a pending ESC
/// deadline. Rounded up so a wake-up never lands just before the deadline.
fn poll_timeout(interval: Duration, deadline: Option<Instant>, now: Instant) -> Duration {
    deadline.map_or(interval, |d| interval.min(d.saturating_duration_since(now)))
}

#[cfg(unix)]
fn poll_readable(fd: libc::c_int, timeout: Duration) -> io::Result<bool> {
    let ms = i32::try_from(timeout.as_micros().div_ceil(1000)).unwrap_or(i32::MAX);
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let ready = unsafe { libc::poll(&raw mut pfd, 1, ms) };
    match ready {
        n if n < 0 => Err(io::Error::last_os_error()),
        0 => Ok(false),
        _ => Ok(true),
    }
}

#[cfg(unix)]
fn read_fd(fd: libc::c_int, buf: &mut [u8]) -> io::Result<usize> {
    let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
    usize::try_from(n).map_err(|_| io::Error::last_os_error())
}

#[cfg(unix)]
fn reader_loop(
    fd: libc::c_int,
    config: &EngineConfig,
    mut decoder: Decoder,
    sender: &EventSender,
    running: &AtomicBool,
) {
    let mut resize = ResizeWatch::new();
    let mut buf = [0u8; READ_BUF_SIZE];
    let mut events = Vec::new();

    sender.send(Event::custom("start"));
    tracing::info!("input thread started");

    while running.load(Ordering::Acquire) {
        send_resize(&mut resize, sender);

        let timeout = poll_timeout(config.poll_interval, decoder.escape_deadline(), Instant::now());
        let outcome = poll_readable(fd, timeout).and_then(|ready| {
            if ready {
                read_fd(fd, &mut buf).map(Some)
            } else {
                Ok(None)
            }
        });

        match outcome {
            Ok(Some(0)) => {
                tracing::info!("end of input");
                // A trailing lone ESC is the Escape key.
                decoder.tick(Instant::now() + config.alt_timeout, &mut events);
                send_all(&mut events, sender);
                break;
            }
            Ok(Some(n)) => decoder.feed_all(&buf[..n], Instant::now(), &mut events),
            Ok(None) => decoder.tick(Instant::now(), &mut events),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::error!(error = %e, "input read failed");
                sender.send(Event::Error(e.into()));
                break;
            }
        }

        if !send_all(&mut events, sender) {
            tracing::debug!("event queue closed");
            break;
        }
    }

    tracing::info!("input thread stopped");
}

/// Non-unix fallback: blocking reads, no poll. Shutdown waits for the next
/// byte, and a lone ESC resolves only when more input arrives.
#[cfg(not(unix))]
fn reader_loop(
    _config: &EngineConfig,
    mut decoder: Decoder,
    sender: &EventSender,
    running: &AtomicBool,
) {
    use std::io::Read;

    let stdin = std::io::stdin();
    let mut resize = ResizeWatch::new();
    let mut buf = [0u8; READ_BUF_SIZE];
    let mut events = Vec::new();

    sender.send(Event::custom("start"));
    tracing::info!("input thread started");

    while running.load(Ordering::Acquire) {
        send_resize(&mut resize, sender);
        match stdin.lock().read(&mut buf) {
            Ok(0) => break,
            Ok(n) => decoder.feed_all(&buf[..n], Instant::now(), &mut events),
            Err(e) => {
                sender.send(Event::Error(e.into()));
                break;
            }
        }
        decoder.tick(Instant::now(), &mut events);
        if !send_all(&mut events, sender) {
            break;
        }
    }

    tracing::info!("input thread stopped");
}

// ─── Tests ───────────────────────────────────────────────────────────────────
