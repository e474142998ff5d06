// SPDX-License-Identifier: MIT
//
// fg-term: terminal engine for the fgraph grapher.
//
// Raw-mode terminal control, a byte-level input decoder, an event queue
// with listener dispatch, and character canvases drawn through a
// state-caching output writer. No TUI framework underneath: escape
// sequences are written directly and termios is driven through libc.
//
// Data flows one way:
//
//   stdin → reader thread → Decoder → EventQueue → Dispatcher → listeners
//   listeners → Canvas mutations → Canvas::draw → Output → stdout

pub mod ansi;
pub mod canvas;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod input;
pub mod logging;
pub mod output;
pub mod queue;
pub mod reader;
pub mod signal;
pub mod style;
pub mod terminal;

pub use error::{Error, Result};
