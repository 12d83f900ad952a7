// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! ANSI escape sequence generation.
//!
//! One variant per control action the screen engine can emit; the [`Display`]
//! implementation produces the exact byte sequence. Everything the library
//! ever writes to the terminal (other than plain cell characters) goes
//! through this enum, so the wire format lives in exactly one place:
//!
//! | Action              | Sequence                          |
//! |---------------------|-----------------------------------|
//! | Clear + home        | `ESC [ 2 J ESC [ H`               |
//! | Home                | `ESC [ H`                         |
//! | Up/Down/Left/Right  | `ESC [ A` / `B` / `D` / `C`       |
//! | Absolute position   | `ESC [ row ; col H` (1-based)     |
//! | Attributes          | `ESC [ 0/5/7/4/1/3 m`             |
//! | Fg / Bg color       | `ESC [ n m` (see [`TermColor`])   |
//! | Wrap on/off         | `ESC [ 7 h` / `ESC [ 7 l`         |
//! | Cursor on/off       | `ESC [ ? 25 h` / `ESC [ ? 25 l`   |
//! | Alt screen on/off   | `ESC [ ? 1049 h` / `l`            |
//! | Mouse track on/off  | `ESC [ ? 1003 h` / `l`            |
//!
//! Note: gnome-terminal and xterm do not home the cursor on a clear (the
//! ANSI spec says they should), so the clear variant carries an explicit
//! home.

use super::TermColor;
use std::fmt::{Display, Formatter, Result};

const CSI: &str = "\x1b[";

/// A single terminal control action.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AnsiCode {
    /// Clear the screen and home the cursor.
    ClearHome,
    /// Home the cursor.
    CursorHome,
    CursorUp,
    CursorDown,
    CursorLeft,
    CursorRight,
    /// Absolute cursor position, 1-based column/row.
    CursorTo { x: i32, y: i32 },
    /// All attributes off.
    AttrOff,
    AttrBlink,
    AttrReverse,
    AttrUnderline,
    AttrBold,
    AttrItalic,
    Foreground(TermColor),
    Background(TermColor),
    WrapOn,
    WrapOff,
    CursorOn,
    CursorOff,
    AltScreenOn,
    AltScreenOff,
    MouseTrackOn,
    MouseTrackOff,
}

impl Display for AnsiCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match *self {
            AnsiCode::ClearHome => write!(f, "{CSI}2J{CSI}H"),
            AnsiCode::CursorHome => write!(f, "{CSI}H"),
            AnsiCode::CursorUp => write!(f, "{CSI}A"),
            AnsiCode::CursorDown => write!(f, "{CSI}B"),
            AnsiCode::CursorLeft => write!(f, "{CSI}D"),
            AnsiCode::CursorRight => write!(f, "{CSI}C"),
            AnsiCode::CursorTo { x, y } => write!(f, "{CSI}{y};{x}H"),
            AnsiCode::AttrOff => write!(f, "{CSI}0m"),
            AnsiCode::AttrBlink => write!(f, "{CSI}5m"),
            AnsiCode::AttrReverse => write!(f, "{CSI}7m"),
            AnsiCode::AttrUnderline => write!(f, "{CSI}4m"),
            AnsiCode::AttrBold => write!(f, "{CSI}1m"),
            AnsiCode::AttrItalic => write!(f, "{CSI}3m"),
            AnsiCode::Foreground(c) => write!(f, "{CSI}{}m", c.fg_code()),
            AnsiCode::Background(c) => write!(f, "{CSI}{}m", c.bg_code()),
            AnsiCode::WrapOn => write!(f, "{CSI}7h"),
            AnsiCode::WrapOff => write!(f, "{CSI}7l"),
            AnsiCode::CursorOn => write!(f, "{CSI}?25h"),
            AnsiCode::CursorOff => write!(f, "{CSI}?25l"),
            AnsiCode::AltScreenOn => write!(f, "{CSI}?1049h"),
            AnsiCode::AltScreenOff => write!(f, "{CSI}?1049l"),
            AnsiCode::MouseTrackOn => write!(f, "{CSI}?1003h"),
            AnsiCode::MouseTrackOff => write!(f, "{CSI}?1003l"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wire_format_matches_the_table() {
        assert_eq!(AnsiCode::ClearHome.to_string(), "\x1b[2J\x1b[H");
        assert_eq!(AnsiCode::CursorHome.to_string(), "\x1b[H");
        assert_eq!(AnsiCode::CursorUp.to_string(), "\x1b[A");
        assert_eq!(AnsiCode::CursorDown.to_string(), "\x1b[B");
        assert_eq!(AnsiCode::CursorLeft.to_string(), "\x1b[D");
        assert_eq!(AnsiCode::CursorRight.to_string(), "\x1b[C");
        assert_eq!(AnsiCode::AttrOff.to_string(), "\x1b[0m");
        assert_eq!(AnsiCode::WrapOff.to_string(), "\x1b[7l");
        assert_eq!(AnsiCode::CursorOn.to_string(), "\x1b[?25h");
        assert_eq!(AnsiCode::AltScreenOn.to_string(), "\x1b[?1049h");
        assert_eq!(AnsiCode::MouseTrackOff.to_string(), "\x1b[?1003l");
    }

    #[test]
    fn absolute_position_is_row_first_one_based() {
        assert_eq!(
            AnsiCode::CursorTo { x: 12, y: 3 }.to_string(),
            "\x1b[3;12H"
        );
    }

    #[test]
    fn colors_use_the_split_bases() {
        assert_eq!(
            AnsiCode::Foreground(TermColor::Black).to_string(),
            "\x1b[30m"
        );
        assert_eq!(
            AnsiCode::Background(TermColor::White).to_string(),
            "\x1b[107m"
        );
    }
}
