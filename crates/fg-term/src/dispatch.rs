// SPDX-License-Identifier: MIT
//
// Event dispatch: listener registry and the drain loop.
//
// The owning thread calls `Dispatcher::drain` once per frame. Each popped
// event goes to every listener whose matcher selects it, in registration
// order, and then to the consumer's `Handler` method for its tag.
//
// Callback isolation: a listener that returns `Err` does not abort the
// pass. Its failure is queued as one `Event::Error` and the next listener
// runs. Failures while handling an `Event::Error` are only logged, so a
// broken error handler cannot feed itself.
//
// Auto-remove listeners are dropped after their first successful call.
// Callbacks never see the registry, so removal can be applied while
// walking it without invalidating the walk.

use crate::config::EngineConfig;
use crate::error::{BoxError, Error, Result};
use crate::event::{CustomEvent, ErrorEvent, Event, KeyEvent, Matcher, MouseEvent};
use crate::queue::{EventQueue, EventSender};
use crate::terminal::Size;

/// What a listener or handler returns.
pub type ListenerResult = std::result::Result<(), BoxError>;

type Callback = Box<dyn FnMut(&Event) -> ListenerResult>;

/// Handle for removing a single listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    callback: Callback,
    auto_remove: bool,
}

struct Entry {
    matcher: Matcher,
    listeners: Vec<Listener>,
}

// ─── Handler ─────────────────────────────────────────────────────────────────

/// Per-tag fallback handlers, called after the matching listeners.
///
/// Every method defaults to a no-op, so a consumer implements only the
/// tags it cares about. `()` is the empty handler.
pub trait Handler {
    fn on_key(&mut self, _key: &KeyEvent) -> ListenerResult {
        Ok(())
    }

    fn on_mouse(&mut self, _mouse: &MouseEvent) -> ListenerResult {
        Ok(())
    }

    fn on_paste(&mut self, _text: &str) -> ListenerResult {
        Ok(())
    }

    fn on_resize(&mut self, _size: Size) -> ListenerResult {
        Ok(())
    }

    fn on_cursor_position(&mut self, _x: u16, _y: u16) -> ListenerResult {
        Ok(())
    }

    /// Receives the wrapped event of an `Event::Any` broadcast.
    fn on_any(&mut self, _event: &Event) -> ListenerResult {
        Ok(())
    }

    fn on_error(&mut self, _error: &ErrorEvent) -> ListenerResult {
        Ok(())
    }

    fn on_custom(&mut self, _event: &CustomEvent) -> ListenerResult {
        Ok(())
    }
}

impl Handler for () {}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

/// Owns the event queue and the listener registry.
///
/// # Example
///
/// ```
/// use fg_term::config::EngineConfig;
/// use fg_term::dispatch::Dispatcher;
/// use fg_term::event::{Event, KeyCode};
///
/// let mut dispatcher = Dispatcher::new(EngineConfig::default());
/// dispatcher.on("up", |_| {
///     println!("up pressed");
///     Ok(())
/// });
/// dispatcher.queue_event(Event::key(KeyCode::Up));
/// assert_eq!(dispatcher.drain(16, &mut ()).unwrap(), 1);
/// ```
pub struct Dispatcher {
    queue: EventQueue,
    entries: Vec<Entry>,
    next_id: u64,
    config: EngineConfig,
}

impl Dispatcher {
    /// Create a dispatcher with a fresh queue.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_queue(EventQueue::new(), config)
    }

    /// Create a dispatcher draining an existing queue.
    #[must_use]
    pub const fn with_queue(queue: EventQueue, config: EngineConfig) -> Self {
        Self {
            queue,
            entries: Vec::new(),
            next_id: 0,
            config,
        }
    }

    /// A producer handle for this dispatcher's queue.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        self.queue.sender()
    }

    #[must_use]
    pub const fn queue(&self) -> &EventQueue {
        &self.queue
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Append an event to the queue.
    pub fn queue_event(&self, event: Event) {
        self.queue.queue_event(event);
    }

    // ── Registration ────────────────────────────────────────────────

    /// Register `callback` for events selected by `matcher`.
    ///
    /// Listeners run in registration order. With `auto_remove`, the
    /// listener is dropped after its first successful call.
    pub fn add_listener<F>(
        &mut self,
        matcher: impl Into<Matcher>,
        callback: F,
        auto_remove: bool,
    ) -> ListenerId
    where
        F: FnMut(&Event) -> ListenerResult + 'static,
    {
        let matcher = matcher.into();
        let id = ListenerId(self.next_id);
        self.next_id += 1;

        let listener = Listener {
            id,
            callback: Box::new(callback),
            auto_remove,
        };

        if let Some(entry) = self.entries.iter_mut().find(|e| e.matcher == matcher) {
            entry.listeners.push(listener);
        } else {
            self.entries.push(Entry {
                matcher,
                listeners: vec![listener],
            });
        }
        id
    }

    /// Register a persistent listener.
    pub fn on<F>(&mut self, matcher: impl Into<Matcher>, callback: F) -> ListenerId
    where
        F: FnMut(&Event) -> ListenerResult + 'static,
    {
        self.add_listener(matcher, callback, false)
    }

    /// Register a listener removed after its first successful call.
    pub fn once<F>(&mut self, matcher: impl Into<Matcher>, callback: F) -> ListenerId
    where
        F: FnMut(&Event) -> ListenerResult + 'static,
    {
        self.add_listener(matcher, callback, true)
    }

    /// Remove one listener. Returns whether it was registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let mut removed = false;
        for entry in &mut self.entries {
            let before = entry.listeners.len();
            entry.listeners.retain(|l| l.id != id);
            removed |= entry.listeners.len() != before;
        }
        self.prune();
        removed
    }

    /// Remove every listener registered under `matcher`. Returns how many.
    pub fn remove_listeners(&mut self, matcher: &Matcher) -> usize {
        let mut removed = 0;
        self.entries.retain(|e| {
            if e.matcher == *matcher {
                removed += e.listeners.len();
                false
            } else {
                true
            }
        });
        removed
    }

    /// Drop all listeners.
    pub fn reset_listeners(&mut self) {
        self.entries.clear();
    }

    /// Total number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.entries.iter().map(|e| e.listeners.len()).sum()
    }

    // ── Dispatch ────────────────────────────────────────────────────

    /// Handle up to `limit` queued events in FIFO order.
    ///
    /// Returns how many were handled. A return value below `limit` means
    /// the queue was empty for this pass. Never blocks.
    ///
    /// # Errors
    ///
    /// Only when error catching is disabled: the first listener failure is
    /// returned as [`Error::Listener`].
    pub fn drain(&mut self, limit: usize, handler: &mut impl Handler) -> Result<usize> {
        let mut handled = 0;
        while handled < limit {
            let Some(event) = self.queue.pop() else {
                break;
            };
            self.dispatch(&event, handler)?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Drain in passes of the configured limit until the queue is empty.
    ///
    /// # Errors
    ///
    /// See [`drain`](Self::drain).
    pub fn drain_all(&mut self, handler: &mut impl Handler) -> Result<usize> {
        let limit = self.config.drain_limit.max(1);
        let mut total = 0;
        loop {
            let n = self.drain(limit, handler)?;
            total += n;
            if n < limit {
                return Ok(total);
            }
        }
    }

    /// Dispatch one event immediately, bypassing the queue.
    ///
    /// # Errors
    ///
    /// See [`drain`](Self::drain).
    pub fn dispatch(&mut self, event: &Event, handler: &mut impl Handler) -> Result<()> {
        self.dispatch_one(event, handler)?;

        if self.config.any_events && !matches!(event, Event::Any(_)) {
            let any = Event::Any(Box::new(event.clone()));
            self.dispatch_one(&any, handler)?;
        }
        Ok(())
    }

    fn dispatch_one(&mut self, event: &Event, handler: &mut impl Handler) -> Result<()> {
        let catch = self.config.catch_errors;

        for entry in &mut self.entries {
            if !event.matches(&entry.matcher) {
                continue;
            }
            let mut i = 0;
            while i < entry.listeners.len() {
                let listener = &mut entry.listeners[i];
                let ok = match (listener.callback)(event) {
                    Ok(()) => true,
                    Err(err) => {
                        report_failure(&self.queue, event, err, catch)?;
                        false
                    }
                };
                if ok && listener.auto_remove {
                    entry.listeners.remove(i);
                } else {
                    i += 1;
                }
            }
        }
        self.prune();

        let result = match event {
            Event::Key(key) => handler.on_key(key),
            Event::Mouse(mouse) => handler.on_mouse(mouse),
            Event::Paste(text) => handler.on_paste(text),
            Event::Resize(size) => handler.on_resize(*size),
            Event::CursorPosition { x, y } => handler.on_cursor_position(*x, *y),
            Event::Any(inner) => handler.on_any(inner),
            Event::Error(error) => handler.on_error(error),
            Event::Custom(custom) => handler.on_custom(custom),
        };
        if let Err(err) = result {
            report_failure(&self.queue, event, err, catch)?;
        }
        Ok(())
    }

    fn prune(&mut self) {
        self.entries.retain(|e| !e.listeners.is_empty());
    }
}

/// Turn a callback failure into an `Event::Error`, or hand it back when
/// catching is off. Failures while handling an error, bare or wrapped in
/// `Any`, are only logged.
fn report_failure(queue: &EventQueue, event: &Event, err: BoxError, catch: bool) -> Result<()> {
    if !catch {
        return Err(Error::Listener(err));
    }
    if is_error(event) {
        tracing::error!(error = %err, "error handler failed");
    } else {
        tracing::warn!(error = %err, tag = event.tag().name(), "listener failed");
        queue.queue_event(Event::Error(ErrorEvent::new(err)));
    }
    Ok(())
}

fn is_error(event: &Event) -> bool {
    match event {
        Event::Error(_) => true,
        Event::Any(inner) => is_error(inner),
        _ => false,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
