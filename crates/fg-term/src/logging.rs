// SPDX-License-Identifier: MIT
//
// File logging setup.
//
// A full-screen application owns stdout, so log output goes to a file.
// The binary calls `init_file_logging` once at startup; library code only
// uses the `tracing` macros and never installs a subscriber itself.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::error::Result;

/// Environment variable consulted for the log filter.
pub const LOG_ENV: &str = "FGRAPH_LOG";

/// Install a global `tracing` subscriber writing plain-text lines to `path`.
///
/// The filter comes from [`LOG_ENV`] when set, otherwise `default_filter`
/// (e.g. `"fg_term=debug"`). The file is truncated on open, like a fresh
/// session log. Calling this twice keeps the first subscriber.
///
/// # Errors
///
/// Returns an error if the log file cannot be created.
pub fn init_file_logging(path: &Path, default_filter: &str) -> Result<()> {
    let file = File::create(path)?;
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_names(true)
        .try_init();

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed, keeping it");
    }
    Ok(())
}
