// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Attribute bitset for the window layer.
//!
//! Windows keep a *set* of active write attributes - several may be armed
//! for subsequent writes at once - and reconcile it against the root surface
//! by toggling each differing bit through the engine's single-attribute
//! interface.

use bitflags::bitflags;

bitflags! {
    /// Active write attributes of a window.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct AttrSet: u16 {
        const BLINK       = 1 << 0;
        const REVERSE     = 1 << 1;
        const UNDERLINE   = 1 << 2;
        const SUPERSCRIPT = 1 << 3;
        const SUBSCRIPT   = 1 << 4;
        const ITALIC      = 1 << 5;
        const BOLD        = 1 << 6;
        const STRIKEOUT   = 1 << 7;
    }
}
