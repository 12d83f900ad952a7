// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Raw mode and size queries via rustix's safe termios API.
//!
//! Raw mode turns off echo, canonical line assembly, signal characters and
//! output post-processing so the decoder sees every byte the terminal sends,
//! unmodified and immediately. The original settings are saved on first
//! enable and restored on disable.

use crate::{TermResult, TermSize};
use rustix::termios::{self, ControlModes, InputModes, LocalModes, OptionalActions, Termios};
use std::{io,
          sync::{LazyLock, Mutex}};

/// Stores the original terminal settings to restore later.
static ORIGINAL_TERMIOS: LazyLock<Mutex<Option<Termios>>> = LazyLock::new(|| Mutex::new(None));

/// Enable raw mode on stdin.
///
/// Clears BRKINT/ICRNL/INPCK/ISTRIP/IXON on input, OPOST on output, and
/// ECHO/ICANON/IEXTEN/ISIG locally; forces 8-bit characters. Idempotent: the
/// saved original is only captured on the first call.
///
/// # Errors
///
/// Returns a device error if terminal attributes cannot be read or written,
/// or if the settings lock is poisoned.
pub fn enable_raw_mode() -> TermResult<()> {
    let stdin = io::stdin();
    let mut raw = termios::tcgetattr(&stdin).map_err(io::Error::from)?;

    {
        let mut original = ORIGINAL_TERMIOS
            .lock()
            .map_err(|_| io::Error::other("terminal settings lock poisoned"))?;
        if original.is_none() {
            *original = Some(raw.clone());
        }
    }

    // no break, no CR to NL, no parity check, no strip char, no start/stop
    // output control
    raw.input_modes.remove(
        InputModes::BRKINT | InputModes::ICRNL | InputModes::INPCK | InputModes::ISTRIP
            | InputModes::IXON,
    );
    // no post processing such as NL to CR+NL
    raw.output_modes.remove(rustix::termios::OutputModes::OPOST);
    // 8 bit chars
    raw.control_modes.insert(ControlModes::CS8);
    // echo off, canonical off, no extended functions, no signal chars
    raw.local_modes.remove(
        LocalModes::ECHO | LocalModes::ICANON | LocalModes::IEXTEN | LocalModes::ISIG,
    );

    termios::tcsetattr(&stdin, OptionalActions::Flush, &raw).map_err(io::Error::from)?;
    Ok(())
}

/// Restore the terminal settings saved by [`enable_raw_mode`]. No-op if raw
/// mode was never enabled.
///
/// # Errors
///
/// Returns a device error if the saved attributes cannot be applied.
pub fn disable_raw_mode() -> TermResult<()> {
    let original = ORIGINAL_TERMIOS
        .lock()
        .map_err(|_| io::Error::other("terminal settings lock poisoned"))?;
    if let Some(ref saved) = *original {
        let stdin = io::stdin();
        termios::tcsetattr(&stdin, OptionalActions::Flush, saved).map_err(io::Error::from)?;
    }
    Ok(())
}

/// Query the window size from the controlling tty. Falls back to the given
/// size when the query fails (not a tty, or the ioctl is unsupported).
#[must_use]
pub fn query_winsize(fallback: TermSize) -> TermSize {
    let stdin = io::stdin();
    match termios::tcgetwinsize(&stdin) {
        Ok(ws) if ws.ws_col > 0 && ws.ws_row > 0 => {
            TermSize::new(i32::from(ws.ws_col), i32::from(ws.ws_row))
        }
        _ => fallback,
    }
}
