// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Keystroke equivalence table.
//!
//! Maps the byte sequences an xterm-class terminal sends for an IBM-PC
//! keyboard onto event codes. The bindings are mostly CUA (common user
//! access); the terminate key keeps its long ctrl-C tradition.
//!
//! xterm returns the same codes for home/end regardless of shift state, and
//! the GUI intercepts some CUA keys (print screen, some ALT-F keys), so
//! several commands bind to alternative keys. F12 stands in for the tenth
//! function key because xterm reserves F10 and F11.
//!
//! Sequences are 1-6 bytes and are only distinguishable under greedy
//! longest match; the decoder in [`input_decoder`](super::input_decoder)
//! owns that algorithm. The mouse leader `ESC [ M` is special: matching it
//! switches the decoder into a fixed-length sub-state for the three report
//! bytes that follow.

use crate::TermEvent;

/// What matching a table sequence does.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// Emit this event.
    Emit(TermEvent),
    /// Enter the three-byte mouse-report sub-state.
    MouseLeader,
}

/// One table entry: a complete byte sequence and its action.
#[derive(Copy, Clone, Debug)]
pub struct KeyEntry {
    pub seq: &'static [u8],
    pub action: KeyAction,
}

const fn emit(seq: &'static [u8], event: TermEvent) -> KeyEntry {
    KeyEntry {
        seq,
        action: KeyAction::Emit(event),
    }
}

/// The keystroke table. Codes with no keyboard equivalent (insert line,
/// copy line, print block/screen, and all the non-keyboard events) have no
/// entry.
pub const KEY_TABLE: &[KeyEntry] = &[
    /* cursor up one line          (up arrow) */
    emit(b"\x1b[A", TermEvent::Up),
    /* down one line               (down arrow) */
    emit(b"\x1b[B", TermEvent::Down),
    /* left one character          (left arrow) */
    emit(b"\x1b[D", TermEvent::Left),
    /* right one character         (right arrow) */
    emit(b"\x1b[C", TermEvent::Right),
    /* left one word               (ctrl-left arrow) */
    emit(b"\x1b[1;5D", TermEvent::LeftWord),
    /* right one word              (ctrl-right arrow) */
    emit(b"\x1b[1;5C", TermEvent::RightWord),
    /* home of document            (ctrl-home) */
    emit(b"\x1b[1;5H", TermEvent::Home),
    /* home of screen              (ctrl-h) */
    emit(b"\x08", TermEvent::HomeScreen),
    /* home of line                (home) */
    emit(b"\x1b[H", TermEvent::HomeLine),
    /* end of document             (ctrl-end) */
    emit(b"\x1b[1;5F", TermEvent::End),
    /* end of screen               (ctrl-e) */
    emit(b"\x05", TermEvent::EndScreen),
    /* end of line                 (end) */
    emit(b"\x1b[F", TermEvent::EndLine),
    /* scroll left one character   (ctrl-page up) */
    emit(b"\x1b[5;5~", TermEvent::ScrollLeft),
    /* scroll right one character  (ctrl-page down) */
    emit(b"\x1b[6;5~", TermEvent::ScrollRight),
    /* scroll up one line          (ctrl-up arrow) */
    emit(b"\x1b[1;5B", TermEvent::ScrollUp),
    /* scroll down one line        (ctrl-down arrow) */
    emit(b"\x1b[1;5A", TermEvent::ScrollDown),
    /* page down                   (page down) */
    emit(b"\x1b[6~", TermEvent::PageDown),
    /* page up                     (page up) */
    emit(b"\x1b[5~", TermEvent::PageUp),
    /* tab                         (tab) */
    emit(b"\x09", TermEvent::Tab),
    /* enter line                  (enter) */
    emit(b"\x0d", TermEvent::Enter),
    /* insert block                (ctrl-v) */
    emit(b"\x16", TermEvent::Insert),
    /* insert toggle               (insert) */
    emit(b"\x1b[2~", TermEvent::InsertToggle),
    /* delete block                (shift-del) */
    emit(b"\x1b[3;2~", TermEvent::Delete),
    /* delete line                 (ctrl-del) */
    emit(b"\x1b[3;5~", TermEvent::DeleteLine),
    /* delete character forward    (del) */
    emit(b"\x1b[3~", TermEvent::DeleteCharForward),
    /* delete character backward   (backspace) */
    emit(b"\x7f", TermEvent::DeleteCharBackward),
    /* copy block                  (alt-c) */
    emit(b"\x1bc", TermEvent::Copy),
    /* cancel current operation    (esc esc) */
    emit(b"\x1b\x1b", TermEvent::Cancel),
    /* stop current operation      (ctrl-s) */
    emit(b"\x13", TermEvent::Stop),
    /* continue current operation  (ctrl-q) */
    emit(b"\x11", TermEvent::Continue),
    /* print document              (ctrl-p) */
    emit(b"\x10", TermEvent::Print),
    /* terminate program           (ctrl-c) */
    emit(b"\x03", TermEvent::Terminate),
    /* mouse move leader; the three report bytes are read in the decoder's
       sub-state */
    KeyEntry {
        seq: b"\x1b[M",
        action: KeyAction::MouseLeader,
    },
    /* function keys F1-F9, then F12 standing in as the tenth */
    emit(b"\x1bOP", TermEvent::Function(1)),
    emit(b"\x1bOQ", TermEvent::Function(2)),
    emit(b"\x1bOR", TermEvent::Function(3)),
    emit(b"\x1bOS", TermEvent::Function(4)),
    emit(b"\x1b[15~", TermEvent::Function(5)),
    emit(b"\x1b[17~", TermEvent::Function(6)),
    emit(b"\x1b[18~", TermEvent::Function(7)),
    emit(b"\x1b[19~", TermEvent::Function(8)),
    emit(b"\x1b[20~", TermEvent::Function(9)),
    emit(b"\x1b[24~", TermEvent::Function(10)),
];

/// Number of function keys the table reports.
pub const MAX_FUNCTION_KEYS: i32 = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_are_within_decoder_buffer() {
        for entry in KEY_TABLE {
            assert!(!entry.seq.is_empty());
            assert!(entry.seq.len() <= 6);
        }
    }

    #[test]
    fn no_duplicate_sequences() {
        for (i, a) in KEY_TABLE.iter().enumerate() {
            for b in &KEY_TABLE[i + 1..] {
                assert_ne!(a.seq, b.seq, "duplicate table sequence");
            }
        }
    }

    #[test]
    fn ten_function_keys() {
        let n = KEY_TABLE
            .iter()
            .filter(|e| matches!(e.action, KeyAction::Emit(TermEvent::Function(_))))
            .count();
        assert_eq!(n as i32, MAX_FUNCTION_KEYS);
    }
}
