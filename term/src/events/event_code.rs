// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The closed enumeration of event kinds.
//!
//! One code per deliverable event. The symbolic keyboard codes follow the
//! CUA-style command set; the rest cover mouse, timers, joysticks and
//! session-level happenings. [`EventCode`] is payload-free so it can index
//! the handler-override table; payloads live in
//! [`TermEvent`](super::TermEvent).

use strum_macros::{EnumCount, EnumIter, IntoStaticStr};

/// Event kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumCount, EnumIter, IntoStaticStr)]
pub enum EventCode {
    /// ANSI character returned.
    Char,
    /// Cursor up one line.
    Up,
    /// Down one line.
    Down,
    /// Left one character.
    Left,
    /// Right one character.
    Right,
    /// Left one word.
    LeftWord,
    /// Right one word.
    RightWord,
    /// Home of document.
    Home,
    /// Home of screen.
    HomeScreen,
    /// Home of line.
    HomeLine,
    /// End of document.
    End,
    /// End of screen.
    EndScreen,
    /// End of line.
    EndLine,
    /// Scroll left one character.
    ScrollLeft,
    /// Scroll right one character.
    ScrollRight,
    /// Scroll up one line.
    ScrollUp,
    /// Scroll down one line.
    ScrollDown,
    /// Page down.
    PageDown,
    /// Page up.
    PageUp,
    Tab,
    /// Enter line.
    Enter,
    /// Insert block.
    Insert,
    /// Insert line.
    InsertLine,
    /// Insert toggle.
    InsertToggle,
    /// Delete block.
    Delete,
    /// Delete line.
    DeleteLine,
    /// Delete character forward.
    DeleteCharForward,
    /// Delete character backward.
    DeleteCharBackward,
    /// Copy block.
    Copy,
    /// Copy line.
    CopyLine,
    /// Cancel current operation.
    Cancel,
    /// Stop current operation.
    Stop,
    /// Continue current operation.
    Continue,
    /// Print document.
    Print,
    /// Print block.
    PrintBlock,
    /// Print screen.
    PrintScreen,
    /// Function key.
    Function,
    /// Display menu.
    Menu,
    /// Mouse button assertion.
    MouseAssert,
    /// Mouse button deassertion.
    MouseDeassert,
    /// Mouse move.
    MouseMove,
    /// Timer matures.
    Timer,
    /// Joystick button assertion.
    JoyAssert,
    /// Joystick button deassertion.
    JoyDeassert,
    /// Joystick move.
    JoyMove,
    /// Window was resized.
    Resize,
    /// Terminate program.
    Terminate,
    /// Frame sync.
    Frame,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::{EnumCount as _, IntoEnumIterator as _};

    #[test]
    fn code_count_is_stable() {
        // The handler table and the keystroke table both size off this.
        assert_eq!(EventCode::COUNT, 48);
        assert_eq!(EventCode::iter().count(), EventCode::COUNT);
    }
}
