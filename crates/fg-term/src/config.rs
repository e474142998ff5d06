// SPDX-License-Identifier: MIT
//
// Engine configuration.
//
// Everything that used to be a tunable constant or a process-wide flag
// lives here, and the struct is handed to the `Terminal` and the
// `Dispatcher` at construction. Nothing in the engine reads global
// configuration.

use std::time::Duration;

/// Timing and behavior knobs for the decoder, reader, and dispatcher.
///
/// The defaults suit an interactive full-screen application over a local
/// terminal. Raise [`alt_timeout`](Self::alt_timeout) for slow links where
/// escape sequences can arrive split across packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long a lone ESC waits for a follow-up byte before it is
    /// reported as the Escape key.
    pub alt_timeout: Duration,
    /// Maximum number of bytes accumulated after `ESC [` before the
    /// sequence is abandoned and replayed as literal keys.
    pub csi_max_len: usize,
    /// Upper bound on buffered bracketed-paste text. When reached, the
    /// buffered text is emitted as a `Paste` event and buffering restarts.
    pub paste_max_bytes: usize,
    /// Poll interval of the input thread. Must stay well below
    /// `alt_timeout`.
    pub poll_interval: Duration,
    /// Default number of events handled per `drain` pass.
    pub drain_limit: usize,
    /// Convert listener failures into `Event::Error` instead of returning
    /// them from `drain`.
    pub catch_errors: bool,
    /// Broadcast every event a second time wrapped in `Event::Any`.
    pub any_events: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            alt_timeout: Duration::from_millis(100),
            csi_max_len: 10,
            paste_max_bytes: 1 << 20,
            poll_interval: Duration::from_millis(10),
            drain_limit: 16,
            catch_errors: true,
            any_events: false,
        }
    }
}

impl EngineConfig {
    /// Set the lone-ESC disambiguation window.
    #[must_use]
    pub const fn with_alt_timeout(mut self, timeout: Duration) -> Self {
        self.alt_timeout = timeout;
        self
    }

    /// Set the CSI length bound.
    #[must_use]
    pub const fn with_csi_max_len(mut self, len: usize) -> Self {
        self.csi_max_len = len;
        self
    }

    /// Set the bracketed-paste buffer bound.
    #[must_use]
    pub const fn with_paste_max_bytes(mut self, bytes: usize) -> Self {
        self.paste_max_bytes = bytes;
        self
    }

    /// Set the input thread poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the per-pass drain limit.
    #[must_use]
    pub const fn with_drain_limit(mut self, limit: usize) -> Self {
        self.drain_limit = limit;
        self
    }

    /// Enable or disable listener error catching.
    #[must_use]
    pub const fn with_catch_errors(mut self, catch: bool) -> Self {
        self.catch_errors = catch;
        self
    }

    /// Enable or disable `Any` broadcasting.
    #[must_use]
    pub const fn with_any_events(mut self, any: bool) -> Self {
        self.any_events = any;
        self
    }
}
