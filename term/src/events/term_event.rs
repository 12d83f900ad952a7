// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Typed events and the delivery envelope.
//!
//! [`TermEvent`] is a tagged sum with kind-specific payloads; the untyped
//! union of the classic event record becomes one variant per payload shape.
//! [`EventRecord`] wraps an event with the owning window id and the
//! "handled" flag consumed by the handler-override chain.

use crate::{EventCode, TermPos, TermSize};

/// A single input event with its payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TermEvent {
    /// Printable (or otherwise unclaimed single-byte) keyboard input.
    Char(char),
    Up,
    Down,
    Left,
    Right,
    LeftWord,
    RightWord,
    Home,
    HomeScreen,
    HomeLine,
    End,
    EndScreen,
    EndLine,
    ScrollLeft,
    ScrollRight,
    ScrollUp,
    ScrollDown,
    PageDown,
    PageUp,
    Tab,
    Enter,
    Insert,
    InsertLine,
    InsertToggle,
    Delete,
    DeleteLine,
    DeleteCharForward,
    DeleteCharBackward,
    Copy,
    CopyLine,
    Cancel,
    Stop,
    Continue,
    Print,
    PrintBlock,
    PrintScreen,
    /// Function key, 1-based number.
    Function(u8),
    /// Display menu request for a menu item id.
    Menu(i32),
    /// Mouse button pressed.
    MouseAssert { mouse: u8, button: u8 },
    /// Mouse button released.
    MouseDeassert { mouse: u8, button: u8 },
    /// Mouse moved.
    MouseMove { mouse: u8, pos: TermPos },
    /// Timer with the given logical id matured.
    Timer(u8),
    JoyAssert { joy: u8, button: u8 },
    JoyDeassert { joy: u8, button: u8 },
    JoyMove { joy: u8, axes: [i32; 6] },
    /// The terminal surface changed size.
    Resize(TermSize),
    /// Terminate request (ctrl-C or a registered signal).
    Terminate,
    /// Frame-sync timer tick.
    Frame,
}

impl TermEvent {
    /// The payload-free kind of this event, for handler table indexing.
    #[must_use]
    pub fn code(&self) -> EventCode {
        match self {
            TermEvent::Char(_) => EventCode::Char,
            TermEvent::Up => EventCode::Up,
            TermEvent::Down => EventCode::Down,
            TermEvent::Left => EventCode::Left,
            TermEvent::Right => EventCode::Right,
            TermEvent::LeftWord => EventCode::LeftWord,
            TermEvent::RightWord => EventCode::RightWord,
            TermEvent::Home => EventCode::Home,
            TermEvent::HomeScreen => EventCode::HomeScreen,
            TermEvent::HomeLine => EventCode::HomeLine,
            TermEvent::End => EventCode::End,
            TermEvent::EndScreen => EventCode::EndScreen,
            TermEvent::EndLine => EventCode::EndLine,
            TermEvent::ScrollLeft => EventCode::ScrollLeft,
            TermEvent::ScrollRight => EventCode::ScrollRight,
            TermEvent::ScrollUp => EventCode::ScrollUp,
            TermEvent::ScrollDown => EventCode::ScrollDown,
            TermEvent::PageDown => EventCode::PageDown,
            TermEvent::PageUp => EventCode::PageUp,
            TermEvent::Tab => EventCode::Tab,
            TermEvent::Enter => EventCode::Enter,
            TermEvent::Insert => EventCode::Insert,
            TermEvent::InsertLine => EventCode::InsertLine,
            TermEvent::InsertToggle => EventCode::InsertToggle,
            TermEvent::Delete => EventCode::Delete,
            TermEvent::DeleteLine => EventCode::DeleteLine,
            TermEvent::DeleteCharForward => EventCode::DeleteCharForward,
            TermEvent::DeleteCharBackward => EventCode::DeleteCharBackward,
            TermEvent::Copy => EventCode::Copy,
            TermEvent::CopyLine => EventCode::CopyLine,
            TermEvent::Cancel => EventCode::Cancel,
            TermEvent::Stop => EventCode::Stop,
            TermEvent::Continue => EventCode::Continue,
            TermEvent::Print => EventCode::Print,
            TermEvent::PrintBlock => EventCode::PrintBlock,
            TermEvent::PrintScreen => EventCode::PrintScreen,
            TermEvent::Function(_) => EventCode::Function,
            TermEvent::Menu(_) => EventCode::Menu,
            TermEvent::MouseAssert { .. } => EventCode::MouseAssert,
            TermEvent::MouseDeassert { .. } => EventCode::MouseDeassert,
            TermEvent::MouseMove { .. } => EventCode::MouseMove,
            TermEvent::Timer(_) => EventCode::Timer,
            TermEvent::JoyAssert { .. } => EventCode::JoyAssert,
            TermEvent::JoyDeassert { .. } => EventCode::JoyDeassert,
            TermEvent::JoyMove { .. } => EventCode::JoyMove,
            TermEvent::Resize(_) => EventCode::Resize,
            TermEvent::Terminate => EventCode::Terminate,
            TermEvent::Frame => EventCode::Frame,
        }
    }
}

/// Event delivery envelope: the event plus the id of the window it belongs
/// to (0 when windowless) and the handled flag driven by the override chain.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EventRecord {
    /// Identifier of the window for the event; 0 when no window manager is
    /// loaded or no window holds focus.
    pub window: i32,
    /// Set before the handler chain runs; a handler that declines to consume
    /// the event clears it, returning the event to the caller.
    pub handled: bool,
    pub event: TermEvent,
}

impl EventRecord {
    #[must_use]
    pub fn new(event: TermEvent) -> Self {
        Self {
            window: 0,
            handled: false,
            event,
        }
    }

    #[must_use]
    pub fn for_window(window: i32, event: TermEvent) -> Self {
        Self {
            window,
            handled: false,
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trip_for_payload_variants() {
        assert_eq!(TermEvent::Char('q').code(), EventCode::Char);
        assert_eq!(TermEvent::Function(10).code(), EventCode::Function);
        assert_eq!(TermEvent::Timer(3).code(), EventCode::Timer);
        assert_eq!(
            TermEvent::MouseMove {
                mouse: 1,
                pos: TermPos::new(2, 3)
            }
            .code(),
            EventCode::MouseMove
        );
        assert_eq!(
            TermEvent::Resize(TermSize::new(80, 24)).code(),
            EventCode::Resize
        );
    }
}
