// SPDX-License-Identifier: MIT
//
// Error types for the terminal engine.
//
// Most failures inside the engine are deliberately non-fatal: malformed
// input is logged and dropped, and a failing listener becomes an
// `Event::Error`. What remains here is the short list of things a caller
// actually has to handle: I/O on the terminal, a listener failure when
// error catching is switched off, and misuse of the registration helpers.

use std::io;

use thiserror::Error;

/// Boxed error returned by listener callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Engine error type.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while talking to the terminal.
    #[error("terminal I/O error: {0}")]
    Io(#[from] io::Error),

    /// A listener failed and [`EngineConfig::catch_errors`](crate::config::EngineConfig::catch_errors)
    /// is disabled, so the failure is handed back to the caller of `drain`.
    #[error("listener failed: {0}")]
    Listener(BoxError),

    /// A handler name passed to `Matcher::from_handler_name` lacks the `on_` prefix.
    #[error("event listeners must start with 'on_' when no event is given: {0:?}")]
    HandlerName(String),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
