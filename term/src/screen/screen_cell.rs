// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A single character cell.

use crate::{AnsiCode, TermColor};

/// Screen attribute of a cell. A cell holds exactly one; ANSI terminals of
/// the class this library targets cannot be relied on to combine them (the
/// window-manager layer keeps a bitset for its own write state and toggles
/// each through the single-attribute interface).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum CellAttr {
    #[default]
    None,
    /// Blinking text (foreground).
    Blink,
    /// Reverse video.
    Reverse,
    Underline,
    /// No ANSI capability; recorded but not emitted.
    Superscript,
    /// No ANSI capability; recorded but not emitted.
    Subscript,
    Italic,
    Bold,
}

impl CellAttr {
    /// The emission for turning this attribute on, if the terminal has one.
    /// `None` itself maps to the attributes-off sequence and is handled by
    /// the engine separately (it must re-emit colors afterwards).
    #[must_use]
    pub fn on_code(self) -> Option<AnsiCode> {
        match self {
            CellAttr::Blink => Some(AnsiCode::AttrBlink),
            CellAttr::Reverse => Some(AnsiCode::AttrReverse),
            CellAttr::Underline => Some(AnsiCode::AttrUnderline),
            CellAttr::Italic => Some(AnsiCode::AttrItalic),
            CellAttr::Bold => Some(AnsiCode::AttrBold),
            CellAttr::None | CellAttr::Superscript | CellAttr::Subscript => None,
        }
    }
}

/// Single character on screen: the character plus the colors and attribute
/// it was written with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScreenCell {
    pub ch: char,
    pub fg: TermColor,
    pub bg: TermColor,
    pub attr: CellAttr,
}

impl ScreenCell {
    /// A space in the given write state (what cleared regions hold).
    #[must_use]
    pub fn blank(fg: TermColor, bg: TermColor, attr: CellAttr) -> Self {
        Self {
            ch: ' ',
            fg,
            bg,
            attr,
        }
    }
}

impl Default for ScreenCell {
    fn default() -> Self {
        Self::blank(TermColor::Black, TermColor::White, CellAttr::None)
    }
}
