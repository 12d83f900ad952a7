// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! In-memory stand-in for stdout, used by the byte-exact emission tests.

use std::{io::{Result, Write},
          sync::{Arc, Mutex}};

/// You can safely clone this struct; it only contains an
/// `Arc<Mutex<Vec<u8>>>`, so clones observe the same buffer.
#[derive(Clone, Debug, Default)]
pub struct StdoutMock {
    pub buffer: Arc<Mutex<Vec<u8>>>,
}

impl StdoutMock {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// # Panics
    ///
    /// Panics if the buffer lock is poisoned.
    #[must_use]
    pub fn get_copy_of_buffer(&self) -> Vec<u8> { self.buffer.lock().unwrap().clone() }

    /// # Panics
    ///
    /// Panics if the buffer lock is poisoned or the captured bytes are not
    /// UTF-8 (the engine only ever emits ASCII).
    #[must_use]
    pub fn get_copy_of_buffer_as_string(&self) -> String {
        String::from_utf8(self.get_copy_of_buffer()).expect("utf8")
    }

    /// Discard everything captured so far. Lets a test set up state, clear,
    /// then assert only the bytes of the operation under test.
    ///
    /// # Panics
    ///
    /// Panics if the buffer lock is poisoned.
    pub fn clear(&self) { self.buffer.lock().unwrap().clear(); }
}

impl Write for StdoutMock {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> { Ok(()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn clones_share_the_buffer() {
        let mut mock = StdoutMock::default();
        let observer = mock.clone();
        mock.write_all(b"hello world").unwrap();
        assert_eq!(observer.get_copy_of_buffer_as_string(), "hello world");
        observer.clear();
        assert!(mock.get_copy_of_buffer().is_empty());
    }
}
