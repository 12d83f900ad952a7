// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Interposition on the stdio-level I/O primitives.
//!
//! Application-level formatted output reaches the screen engine by routing
//! the five basic calls (`read`, `write`, `open`, `close`, `lseek`) through
//! a filter chain: each filter holds the previous target and calls it on
//! passthrough. The chain base is [`PassthroughTtyIo`], which performs the
//! real system calls; the screen engine filters fds 0 and 1 toward the
//! terminal, which leaves the caller free to redirect other handles
//! wherever it likes.

use crate::{TermError, TermResult};
use bitflags::bitflags;
use std::os::fd::{BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

/// File handle numbers at the system interface level.
pub const INP_FIL: RawFd = 0;
/// See [`INP_FIL`].
pub const OUT_FIL: RawFd = 1;

bitflags! {
    /// Open flags for [`TtyIo::open`].
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct OpenFlags: u8 {
        const READ     = 1 << 0;
        const WRITE    = 1 << 1;
        const CREATE   = 1 << 2;
        const TRUNCATE = 1 << 3;
        const APPEND   = 1 << 4;
    }
}

/// Seek origin for [`TtyIo::lseek`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SeekWhence {
    Set,
    Cur,
    End,
}

/// The interceptable I/O primitive set.
#[allow(clippy::missing_errors_doc)] /* contracts live on the facade */
pub trait TtyIo {
    fn read(&mut self, fd: RawFd, buf: &mut [u8]) -> TermResult<usize>;
    fn write(&mut self, fd: RawFd, buf: &[u8]) -> TermResult<usize>;
    fn open(&mut self, path: &str, flags: OpenFlags) -> TermResult<RawFd>;
    fn close(&mut self, fd: RawFd) -> TermResult<()>;
    fn lseek(&mut self, fd: RawFd, offset: i64, whence: SeekWhence) -> TermResult<i64>;
}

/// Chain base: the real system calls.
#[derive(Debug, Default)]
pub struct PassthroughTtyIo;

impl TtyIo for PassthroughTtyIo {
    fn read(&mut self, fd: RawFd, buf: &mut [u8]) -> TermResult<usize> {
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        rustix::io::read(borrowed, buf)
            .map_err(|e| TermError::DeviceIo(e.into()))
    }

    fn write(&mut self, fd: RawFd, buf: &[u8]) -> TermResult<usize> {
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        rustix::io::write(borrowed, buf)
            .map_err(|e| TermError::DeviceIo(e.into()))
    }

    fn open(&mut self, path: &str, flags: OpenFlags) -> TermResult<RawFd> {
        use rustix::fs::{Mode, OFlags};
        let mut oflags = if flags.contains(OpenFlags::READ | OpenFlags::WRITE) {
            OFlags::RDWR
        } else if flags.contains(OpenFlags::WRITE) {
            OFlags::WRONLY
        } else {
            OFlags::RDONLY
        };
        if flags.contains(OpenFlags::CREATE) {
            oflags |= OFlags::CREATE;
        }
        if flags.contains(OpenFlags::TRUNCATE) {
            oflags |= OFlags::TRUNC;
        }
        if flags.contains(OpenFlags::APPEND) {
            oflags |= OFlags::APPEND;
        }
        let fd = rustix::fs::open(path, oflags, Mode::from_raw_mode(0o644))
            .map_err(|e| TermError::DeviceIo(e.into()))?;
        Ok(fd.into_raw_fd())
    }

    fn close(&mut self, fd: RawFd) -> TermResult<()> {
        // take ownership so the drop performs the close
        let owned = unsafe { OwnedFd::from_raw_fd(fd) };
        drop(owned);
        Ok(())
    }

    fn lseek(&mut self, fd: RawFd, offset: i64, whence: SeekWhence) -> TermResult<i64> {
        use rustix::fs::SeekFrom;
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        let from = match whence {
            SeekWhence::Set => SeekFrom::Start(u64::try_from(offset.max(0)).unwrap_or(0)),
            SeekWhence::Cur => SeekFrom::Current(offset),
            SeekWhence::End => SeekFrom::End(offset),
        };
        let pos = rustix::fs::seek(borrowed, from).map_err(|e| TermError::DeviceIo(e.into()))?;
        i64::try_from(pos).map_err(|_| TermError::DeviceIo(std::io::Error::other("seek overflow")))
    }
}
