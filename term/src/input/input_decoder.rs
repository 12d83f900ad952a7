// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Greedy longest-match keystroke decoder.
//!
//! Bytes are appended one at a time to a small match buffer and compared
//! against every [`KEY_TABLE`] entry:
//!
//! - **full match** with no longer entry still open → emit the event, clear
//!   the buffer;
//! - **partial match** (the buffer is a proper prefix of some entry) → keep
//!   reading;
//! - **no match**: a single buffered byte becomes a plain character event; a
//!   longer buffer is a stillborn escape sequence and is silently discarded.
//!
//! Stillborn sequences come from ill-considered key equivalences or a user
//! typing bytes that happen to begin a special key.
//!
//! Matching the mouse leader switches to a fixed-length sub-state that
//! collects the three report bytes (`btn+32`, `x+32`, `y+32`). The report is
//! diffed against the previous mouse snapshot; button transitions queue
//! before the move event from the same report.

use crate::{KEY_TABLE, KeyAction, MOUSE_COORD_BIAS, MOUSE_REPORT_LEN, TermEvent, TermPos};
use smallvec::SmallVec;
use std::collections::VecDeque;

/// Match buffer capacity; no table sequence comes close to this.
pub const KEY_MATCH_MAX: usize = 10;

/// Decodes raw keyboard bytes into typed events.
#[derive(Debug)]
pub struct InputDecoder {
    buf: SmallVec<[u8; KEY_MATCH_MAX]>,
    /// Report bytes still expected while in the mouse sub-state (0 when
    /// matching normally).
    mouse_expected: usize,
    mouse_bytes: [u8; MOUSE_REPORT_LEN],
    /// Pressed state of buttons 1..=3.
    buttons: [bool; 3],
    pos: TermPos,
    queue: VecDeque<TermEvent>,
}

impl Default for InputDecoder {
    fn default() -> Self { Self::new() }
}

impl InputDecoder {
    /// A fresh decoder: empty buffer, all buttons released, mouse
    /// off-screen. Off-screen matters because an xterm cannot report
    /// whether a mouse exists; a missing mouse stays dead at an impossible
    /// position.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: SmallVec::new(),
            mouse_expected: 0,
            mouse_bytes: [0; MOUSE_REPORT_LEN],
            buttons: [false; 3],
            pos: TermPos::new(-i32::MAX, -i32::MAX),
            queue: VecDeque::new(),
        }
    }

    /// Feed raw input bytes; zero or more events become available via
    /// [`Self::next_event`].
    pub fn feed(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.feed_byte(b);
        }
    }

    /// Take the next decoded event, if any.
    pub fn next_event(&mut self) -> Option<TermEvent> { self.queue.pop_front() }

    /// Current mouse position snapshot.
    #[must_use]
    pub fn mouse_pos(&self) -> TermPos { self.pos }

    fn feed_byte(&mut self, b: u8) {
        if self.mouse_expected > 0 {
            let idx = MOUSE_REPORT_LEN - self.mouse_expected;
            self.mouse_bytes[idx] = b;
            self.mouse_expected -= 1;
            if self.mouse_expected == 0 {
                self.decode_mouse_report();
            }
            return;
        }

        self.buf.push(b);

        let mut full: Option<KeyAction> = None;
        let mut partial = false;
        for entry in KEY_TABLE {
            if entry.seq.len() == self.buf.len() && entry.seq == &self.buf[..] {
                full = Some(entry.action);
            } else if entry.seq.len() > self.buf.len() && entry.seq.starts_with(&self.buf) {
                partial = true;
            }
        }

        match full {
            Some(action) if !partial => {
                self.buf.clear();
                match action {
                    KeyAction::Emit(event) => self.queue.push_back(event),
                    KeyAction::MouseLeader => self.mouse_expected = MOUSE_REPORT_LEN,
                }
            }
            Some(_) | None if partial => { /* keep reading */ }
            _ => {
                // no match at all
                if self.buf.len() == 1 {
                    self.queue.push_back(TermEvent::Char(self.buf[0] as char));
                } else {
                    tracing::trace!(len = self.buf.len(), "discarding stillborn sequence");
                }
                self.buf.clear();
            }
        }
    }

    /// Decompose a complete report into a new mouse state and queue the
    /// differences: button transitions first, movement last.
    fn decode_mouse_report(&mut self) {
        let mut new_buttons = [false; 3];
        match self.mouse_bytes[0] & 0x3 {
            0 => new_buttons[0] = true,
            1 => new_buttons[1] = true,
            2 => new_buttons[2] = true,
            _ => {} // 3 = deassert all
        }
        let new_pos = TermPos::new(
            i32::from(self.mouse_bytes[1]) - i32::from(MOUSE_COORD_BIAS),
            i32::from(self.mouse_bytes[2]) - i32::from(MOUSE_COORD_BIAS),
        );

        for (i, (&now, &was)) in new_buttons.iter().zip(self.buttons.iter()).enumerate() {
            let button = u8::try_from(i).unwrap_or(0) + 1;
            if now && !was {
                self.queue.push_back(TermEvent::MouseAssert { mouse: 1, button });
            } else if !now && was {
                self.queue
                    .push_back(TermEvent::MouseDeassert { mouse: 1, button });
            }
        }
        if new_pos != self.pos {
            self.queue.push_back(TermEvent::MouseMove {
                mouse: 1,
                pos: new_pos,
            });
        }
        self.buttons = new_buttons;
        self.pos = new_pos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn drain(d: &mut InputDecoder) -> Vec<TermEvent> {
        let mut out = vec![];
        while let Some(ev) = d.next_event() {
            out.push(ev);
        }
        out
    }

    #[test_case(b"\x1b[A", TermEvent::Up; "up arrow")]
    #[test_case(b"\x1b[B", TermEvent::Down; "down arrow")]
    #[test_case(b"\x1b[1;5D", TermEvent::LeftWord; "ctrl left arrow")]
    #[test_case(b"\x1b[5~", TermEvent::PageUp; "page up")]
    #[test_case(b"\x1b[5;5~", TermEvent::ScrollLeft; "ctrl page up")]
    #[test_case(b"\x7f", TermEvent::DeleteCharBackward; "backspace")]
    #[test_case(b"\x0d", TermEvent::Enter; "enter")]
    #[test_case(b"\x03", TermEvent::Terminate; "ctrl c")]
    #[test_case(b"\x1b\x1b", TermEvent::Cancel; "esc esc")]
    #[test_case(b"\x1bOP", TermEvent::Function(1); "f1")]
    #[test_case(b"\x1b[24~", TermEvent::Function(10); "f12 reports as tenth")]
    fn table_sequences_decode(seq: &[u8], expected: TermEvent) {
        let mut d = InputDecoder::new();
        d.feed(seq);
        assert_eq!(drain(&mut d), vec![expected]);
    }

    #[test]
    fn every_table_sequence_is_greedy_safe() {
        // each emitting entry, fed alone, yields exactly its own event
        for entry in KEY_TABLE {
            if let KeyAction::Emit(event) = entry.action {
                let mut d = InputDecoder::new();
                d.feed(entry.seq);
                assert_eq!(drain(&mut d), vec![event], "entry {:?}", entry.seq);
            }
        }
    }

    #[test]
    fn plain_byte_is_a_character_event() {
        let mut d = InputDecoder::new();
        d.feed(b"a");
        assert_eq!(drain(&mut d), vec![TermEvent::Char('a')]);
    }

    #[test]
    fn partial_sequence_emits_nothing_until_complete() {
        let mut d = InputDecoder::new();
        d.feed(b"\x1b[1;5");
        assert_eq!(drain(&mut d), vec![]);
        d.feed(b"C");
        assert_eq!(drain(&mut d), vec![TermEvent::RightWord]);
    }

    #[test]
    fn stillborn_sequence_is_discarded_silently() {
        // ESC X starts no table entry once the X arrives
        let mut d = InputDecoder::new();
        d.feed(b"\x1bX");
        assert_eq!(drain(&mut d), vec![]);
        // decoder state is clean afterwards
        d.feed(b"q");
        assert_eq!(drain(&mut d), vec![TermEvent::Char('q')]);
    }

    #[test]
    fn mouse_report_button_before_move() {
        // ESC [ M ! " #: 0x21 & 3 = 1 -> button 2 press, x = 2, y = 3
        let mut d = InputDecoder::new();
        d.feed(b"\x1b[M\x21\x22\x23");
        assert_eq!(
            drain(&mut d),
            vec![
                TermEvent::MouseAssert { mouse: 1, button: 2 },
                TermEvent::MouseMove {
                    mouse: 1,
                    pos: TermPos::new(2, 3)
                },
            ]
        );
    }

    #[test]
    fn mouse_release_report_deasserts() {
        let mut d = InputDecoder::new();
        // press button 1 at (1, 1): btn byte 32+0, coords 33, 33
        d.feed(b"\x1b[M\x20\x21\x21");
        assert_eq!(
            drain(&mut d),
            vec![
                TermEvent::MouseAssert { mouse: 1, button: 1 },
                TermEvent::MouseMove {
                    mouse: 1,
                    pos: TermPos::new(1, 1)
                },
            ]
        );
        // release (code 3) at the same spot: only the deassert fires
        d.feed(b"\x1b[M\x23\x21\x21");
        assert_eq!(
            drain(&mut d),
            vec![TermEvent::MouseDeassert { mouse: 1, button: 1 }]
        );
    }

    #[test]
    fn mouse_button_switch_in_one_report() {
        let mut d = InputDecoder::new();
        d.feed(b"\x1b[M\x20\x21\x21"); // button 1 down
        drain(&mut d);
        // next report asserts button 3; button 1 implicitly releases
        d.feed(b"\x1b[M\x22\x21\x21");
        assert_eq!(
            drain(&mut d),
            vec![
                TermEvent::MouseDeassert { mouse: 1, button: 1 },
                TermEvent::MouseAssert { mouse: 1, button: 3 },
            ]
        );
    }

    #[test]
    fn split_delivery_across_feeds() {
        let mut d = InputDecoder::new();
        d.feed(b"\x1b");
        d.feed(b"[");
        d.feed(b"A");
        assert_eq!(drain(&mut d), vec![TermEvent::Up]);
    }
}
