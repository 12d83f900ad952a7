// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Opt-in tracing initialization.
//!
//! The library logs through [`tracing`]; by default nothing is emitted. An
//! application that wants the event/lifecycle logs calls [`init_tracing`]
//! with a log file path. Logs must never go to stdout or stderr while the
//! terminal is active - both are wired to the screen - so the subscriber
//! writes to a file through a non-blocking appender.
//!
//! Filtering uses the standard `RUST_LOG` environment variable (e.g.
//! `RUST_LOG=termgrid=debug`).

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Install a global tracing subscriber writing to `log_file`.
///
/// Returns the appender guard; dropping it flushes and stops the writer, so
/// hold it for the life of the session. Returns `None` when a global
/// subscriber is already installed.
pub fn init_tracing(log_file: &Path) -> Option<WorkerGuard> {
    let dir = log_file.parent().unwrap_or_else(|| Path::new("."));
    let name = log_file.file_name()?;
    let appender = tracing_appender::rolling::never(dir, name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .finish();
    match tracing::subscriber::set_global_default(subscriber) {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}
