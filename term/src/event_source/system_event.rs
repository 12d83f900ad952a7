// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Logical system events.
//!
//! The event source hands out [`Sid`]s (logical system event numbers) when a
//! source is registered, and every wakeup from [`next`] names the sid that
//! fired and which of the three source classes it belongs to.
//!
//! [`next`]: super::SystemEventSource::next

/// Logical system event id, 1-based. Ids are never recycled within a
/// session; a disarmed timer keeps its id and may be rearmed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Sid(pub usize);

/// The three source classes the event source multiplexes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SystemEventKind {
    /// An input file has data to read.
    Input,
    /// A timer has fired.
    Timer,
    /// The OS has issued a signal.
    Signal,
}

/// One wakeup from the event source.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SystemEvent {
    pub sid: Sid,
    pub kind: SystemEventKind,
}
