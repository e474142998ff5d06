// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// SIGWINCH → resize generation counter.
//
// The handler only bumps a static atomic counter, one of the few things
// allowed inside a signal handler. Consumers remember the last generation
// they saw; a different value means at least one resize arrived since.
// Each consumer tracks its own generation, so several readers never steal
// a resize from one another.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Incremented once per SIGWINCH.
static RESIZE_GENERATION: AtomicUsize = AtomicUsize::new(0);

/// Install the SIGWINCH handler. Safe to call more than once.
#[cfg(unix)]
pub fn install_resize_handler() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigwinch_handler as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(libc::SIGWINCH, &raw const sa, std::ptr::null_mut());
    }
    tracing::debug!("SIGWINCH handler installed");
}

/// Restore the default SIGWINCH disposition.
#[cfg(unix)]
pub fn uninstall_resize_handler() {
    unsafe {
        libc::signal(libc::SIGWINCH, libc::SIG_DFL);
    }
    tracing::debug!("SIGWINCH handler removed");
}

#[cfg(unix)]
extern "C" fn sigwinch_handler(_sig: libc::c_int) {
    RESIZE_GENERATION.fetch_add(1, Ordering::Relaxed);
}

#[cfg(not(unix))]
pub fn install_resize_handler() {}

#[cfg(not(unix))]
pub fn uninstall_resize_handler() {}

/// Held by tests that install or remove the process-wide handler.
#[cfg(test)]
pub(crate) static HANDLER_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Current resize generation.
#[must_use]
pub fn resize_generation() -> usize {
    RESIZE_GENERATION.load(Ordering::Relaxed)
}

/// Tracks resizes seen by one consumer.
#[derive(Debug, Clone, Copy)]
pub struct ResizeWatch {
    seen: usize,
}

impl ResizeWatch {
    /// Start watching from the current generation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            seen: resize_generation(),
        }
    }

    /// Whether a resize arrived since the last call (or since `new`).
    pub fn take(&mut self) -> bool {
        let current = resize_generation();
        if current == self.seen {
            return false;
        }
        self.seen = current;
        true
    }
}

impl Default for ResizeWatch {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
