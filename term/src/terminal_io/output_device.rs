// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Shared handle to the terminal output stream.
//!
//! The screen engine, the window manager and the session all hold clones of
//! one [`OutputDevice`]; the emitted byte stream is the single channel to the
//! physical terminal, so everything funnels through here. In tests the device
//! wraps a [`StdoutMock`](super::StdoutMock) so the exact bytes can be
//! asserted.

use crate::{TermError, TermResult};
use std::{io::Write,
          sync::{Arc, Mutex, MutexGuard}};

use super::StdoutMock;

type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// An output device that can be used to write to the terminal. Safe to
/// clone; all clones share the underlying stream.
#[derive(Clone)]
#[allow(missing_debug_implementations)]
pub struct OutputDevice {
    pub resource: SharedWriter,
    pub is_mock: bool,
}

impl Default for OutputDevice {
    fn default() -> Self { Self::new_stdout() }
}

impl OutputDevice {
    #[must_use]
    pub fn new_stdout() -> Self {
        Self {
            resource: Arc::new(Mutex::new(std::io::stdout())),
            is_mock: false,
        }
    }

    /// Mock device for tests; the returned [`StdoutMock`] observes every
    /// byte written through the device.
    #[must_use]
    pub fn new_mock() -> (Self, StdoutMock) {
        let mock = StdoutMock::default();
        let this = Self {
            resource: Arc::new(Mutex::new(mock.clone())),
            is_mock: true,
        };
        (this, mock)
    }

    /// Locks the device for writing.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned (a thread panicked while holding the
    /// lock).
    pub fn lock(&self) -> MutexGuard<'_, dyn Write + Send + 'static> {
        self.resource.lock().unwrap()
    }

    /// Write the full byte slice to the device.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::DeviceIo`] when the underlying stream fails; the
    /// caller (the screen engine) treats that as fatal.
    pub fn write_all(&self, bytes: &[u8]) -> TermResult<()> {
        let mut guard = self.lock();
        guard.write_all(bytes).map_err(TermError::DeviceIo)?;
        guard.flush().map_err(TermError::DeviceIo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mock_device_captures_bytes() {
        let (device, mock) = OutputDevice::new_mock();
        device.write_all(b"\x1b[2J\x1b[H").unwrap();
        device.write_all(b"hi").unwrap();
        assert_eq!(mock.get_copy_of_buffer_as_string(), "\x1b[2J\x1b[Hhi");
        assert!(device.is_mock);
    }
}
