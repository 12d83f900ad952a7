// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The eight-color text palette and its ANSI code mapping.

/// Foreground color base (aixterm bright range).
pub const FORE_COLOR_BASE: u8 = 90;
/// Background color base (aixterm bright range).
pub const BACK_COLOR_BASE: u8 = 100;
/// Standard ANSI foreground base, used only for black.
pub const ANSI_FORE_COLOR_BASE: u8 = 30;
/// Standard ANSI background base, used only for black.
pub const ANSI_BACK_COLOR_BASE: u8 = 40;

/// Colors displayable in text mode. Closed set; declaration order is the
/// portable color order, not the ANSI numeric order (see
/// [`TermColor::ansi_index`]).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum TermColor {
    #[default]
    Black,
    White,
    Red,
    Green,
    Blue,
    Cyan,
    Yellow,
    Magenta,
}

impl TermColor {
    /// Translate to the terminal-specific primary color number.
    #[must_use]
    pub fn ansi_index(self) -> u8 {
        match self {
            TermColor::Black => 0,
            TermColor::Red => 1,
            TermColor::Green => 2,
            TermColor::Yellow => 3,
            TermColor::Blue => 4,
            TermColor::Magenta => 5,
            TermColor::Cyan => 6,
            TermColor::White => 7,
        }
    }

    /// SGR foreground code. Black overrides to the standard 30 base, since
    /// "bright" black renders as grey on most emulators; everything else uses
    /// the aixterm 90 base. The split keeps black-on-white terminals looking
    /// correct.
    #[must_use]
    pub fn fg_code(self) -> u8 {
        match self {
            TermColor::Black => ANSI_FORE_COLOR_BASE,
            c => FORE_COLOR_BASE + c.ansi_index(),
        }
    }

    /// SGR background code; same black override as [`TermColor::fg_code`].
    #[must_use]
    pub fn bg_code(self) -> u8 {
        match self {
            TermColor::Black => ANSI_BACK_COLOR_BASE,
            c => BACK_COLOR_BASE + c.ansi_index(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_uses_standard_bases() {
        assert_eq!(TermColor::Black.fg_code(), 30);
        assert_eq!(TermColor::Black.bg_code(), 40);
    }

    #[test]
    fn non_black_uses_bright_bases() {
        assert_eq!(TermColor::White.fg_code(), 97);
        assert_eq!(TermColor::White.bg_code(), 107);
        assert_eq!(TermColor::Red.fg_code(), 91);
        assert_eq!(TermColor::Blue.bg_code(), 104);
    }
}
