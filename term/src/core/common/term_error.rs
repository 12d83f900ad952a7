// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Error model for the terminal library.
//!
//! Two classes of failure exist:
//!
//! 1. **Recoverable** - bad handle, bad position, bad page, bad window and
//!    resource exhaustion are all caller mistakes or environment limits and
//!    surface as [`TermError`] values through [`TermResult`].
//! 2. **Fatal** - the terminal device failing mid-emission, or the override
//!    registry found corrupted at shutdown, leave the terminal in an unusable
//!    or unknowable state. These print a single-line diagnostic to stderr and
//!    exit nonzero via [`fatal`].

use std::io;
use thiserror::Error;

/// Result alias used across the crate.
pub type TermResult<T> = Result<T, TermError>;

/// Errors surfaced by the terminal library.
///
/// The variants mirror the distinct failure kinds of the system: handles,
/// positions, pages, windows, device I/O, resource limits and override
/// stacking. Only [`TermError::DeviceIo`] and [`TermError::StackingViolation`]
/// are treated as fatal by the session layer.
#[derive(Debug, Error)]
pub enum TermError {
    /// Invalid file, timer, mouse or joystick identifier.
    #[error("invalid {what} handle: {id}")]
    BadHandle { what: &'static str, id: i64 },

    /// Out-of-range cursor or tab position.
    #[error("invalid screen position ({x}, {y})")]
    BadPosition { x: i32, y: i32 },

    /// Screen page index outside 1..=10.
    #[error("invalid screen page number {page} (valid 1..={max})")]
    BadPage { page: i32, max: i32 },

    /// Duplicate window id, unknown parent, or a stream that is not a window.
    #[error("window fault: {reason}")]
    BadWindow { reason: &'static str },

    /// Read or write on the terminal device failed.
    #[error("terminal device i/o failed")]
    DeviceIo(#[from] io::Error),

    /// No free slot, table entry, or memory left.
    #[error("resource exhausted: {what}")]
    ResourceExhausted { what: &'static str },

    /// The override registry no longer holds the pointer this module
    /// installed; module unload order was violated.
    #[error("override stacking violated on slot `{slot}`")]
    StackingViolation { slot: &'static str },
}

impl TermError {
    /// True for the error kinds the session layer must not try to recover
    /// from (the terminal state can no longer be trusted).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TermError::DeviceIo(_) | TermError::StackingViolation { .. }
        )
    }
}

/// Abort the process over an unrecoverable terminal fault.
///
/// Single-line diagnostic to stderr, then exit nonzero. The screen engine
/// routes failed emissions here because there is no way to continue once the
/// output stream to the terminal is broken.
pub fn fatal(err: &TermError) -> ! {
    eprintln!("*** termgrid: {err}");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(TermError::DeviceIo(io::Error::other("boom")).is_fatal());
        assert!(TermError::StackingViolation { slot: "term_ops" }.is_fatal());
        assert!(!TermError::BadPage { page: 11, max: 10 }.is_fatal());
        assert!(
            !TermError::BadHandle {
                what: "timer",
                id: 0
            }
            .is_fatal()
        );
    }

    #[test]
    fn display_is_single_line() {
        let e = TermError::BadPosition { x: 300, y: -2 };
        assert!(!format!("{e}").contains('\n'));
    }
}
