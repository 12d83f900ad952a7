// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The screen engine.
//!
//! Keeps an in-memory image of the output terminal and its attributes, along
//! the lines of what curses does. Because it always knows what the state of
//! the actual terminal should be, it never reads from the terminal to
//! discover the state of individual character cells: the back buffer and the
//! [`TermShadow`] are authoritative, and every operation updates the model
//! and emits the minimum escape sequence that realizes the new state.
//!
//! Up to [`MAX_PAGES`] pages exist per surface. Exactly one is the *update*
//! page (target of writes) and one is the *display* page (mirrored on the
//! physical terminal); they usually coincide. Writes to a page that is not
//! displayed mutate only its back buffer; selecting it later repaints the
//! terminal from the buffer with running color/attribute state to minimize
//! emission.
//!
//! The engine also owns the event side: the system event source, the
//! keystroke decoder, the timer table and the line-input buffer for the
//! interposed read path.

use crate::{AnsiCode, CellAttr, EventRecord, InputDecoder, MAX_FUNCTION_KEYS, MAX_PAGES,
            OpenFlags, OutputDevice, ScreenCell, ScreenPage, SeekWhence, SharedImpl, Sid, Stream,
            SystemEventKind, SystemEventSource, TermColor, TermError, TermEvent, TermOps, TermPos,
            TermResult, TermShadow, TermSize, TtyIo, fatal, query_winsize};
use std::{collections::VecDeque,
          os::fd::{BorrowedFd, RawFd}};

/// Maximum number of timers available.
pub const MAX_TIMERS: usize = 10;

/// Frame timer period in 100-microsecond ticks (~60 Hz).
const FRAME_PERIOD_100US: i64 = 166;

/// Maximum length of a buffered input line.
const MAX_LINE: usize = 250;

// -- emission helpers ---------------------------------------------------------
//
// A failed write to the terminal is fatal: once the output stream is broken
// there is no way to bring the screen back to a known state.

fn emit(out: &OutputDevice, code: AnsiCode) {
    if let Err(e) = out.write_all(code.to_string().as_bytes()) {
        fatal(&e);
    }
}

fn emit_bytes(out: &OutputDevice, bytes: &[u8]) {
    if let Err(e) = out.write_all(bytes) {
        fatal(&e);
    }
}

/// Emit one cell, updating the running emission state only on transitions.
/// SGR codes are additive on real terminals, so any attribute change goes
/// through a full reset first; the reset clobbers colors, so the running
/// colors are re-emitted after.
fn emit_cell(
    out: &OutputDevice,
    cell: &ScreenCell,
    run_fg: &mut TermColor,
    run_bg: &mut TermColor,
    run_attr: &mut CellAttr,
) {
    if cell.fg != *run_fg {
        emit(out, AnsiCode::Foreground(cell.fg));
        *run_fg = cell.fg;
    }
    if cell.bg != *run_bg {
        emit(out, AnsiCode::Background(cell.bg));
        *run_bg = cell.bg;
    }
    if cell.attr != *run_attr {
        emit(out, AnsiCode::AttrOff);
        if let Some(code) = cell.attr.on_code() {
            emit(out, code);
        }
        emit(out, AnsiCode::Foreground(*run_fg));
        emit(out, AnsiCode::Background(*run_bg));
        *run_attr = cell.attr;
    }
    let mut utf8 = [0u8; 4];
    emit_bytes(out, cell.ch.encode_utf8(&mut utf8).as_bytes());
}

/// Emit the attribute state `attr` from a clean slate: attributes off, the
/// new attribute (if the terminal has a code for it), then the colors again
/// since the reset clobbers them.
fn emit_attr_fresh(out: &OutputDevice, attr: CellAttr, fg: TermColor, bg: TermColor) {
    emit(out, AnsiCode::AttrOff);
    if let Some(code) = attr.on_code() {
        emit(out, code);
    }
    emit(out, AnsiCode::Foreground(fg));
    emit(out, AnsiCode::Background(bg));
}

/// The screen engine: pages, shadow, decoder, event source, timers.
#[allow(missing_debug_implementations)]
pub struct ScreenEngine {
    out: OutputDevice,
    size: TermSize,
    pages: Vec<Option<Box<ScreenPage>>>,
    /// Current update page, 1-based.
    cur_upd: usize,
    /// Current display page, 1-based.
    cur_dsp: usize,
    shadow: TermShadow,
    mux: SystemEventSource,
    decoder: InputDecoder,
    pending: VecDeque<EventRecord>,
    /// Next filter in the I/O interposition chain.
    prev_io: SharedImpl<dyn TtyIo>,
    stdin_fd: Option<RawFd>,
    stdin_sid: Option<Sid>,
    winch_sid: Option<Sid>,
    frame_sid: Option<Sid>,
    timer_sids: [Option<Sid>; MAX_TIMERS],
    /// Window size is re-queried from the tty on resize signals.
    probe_winsize: bool,
    /// Buffered input line for the interposed read path.
    input_line: Vec<u8>,
    input_pos: Option<usize>,
    autohold: bool,
}

impl ScreenEngine {
    /// Build an engine over the given output device and geometry. Page 1
    /// exists from the start; nothing is emitted until
    /// [`Self::startup_paint`].
    #[must_use]
    pub fn new(
        out: OutputDevice,
        size: TermSize,
        mux: SystemEventSource,
        prev_io: SharedImpl<dyn TtyIo>,
    ) -> Self {
        let mut pages: Vec<Option<Box<ScreenPage>>> = (0..MAX_PAGES).map(|_| None).collect();
        pages[0] = Some(Box::new(ScreenPage::new()));
        Self {
            out,
            size,
            pages,
            cur_upd: 1,
            cur_dsp: 1,
            shadow: TermShadow::default(),
            mux,
            decoder: InputDecoder::new(),
            pending: VecDeque::new(),
            prev_io,
            stdin_fd: None,
            stdin_sid: None,
            winch_sid: None,
            frame_sid: None,
            timer_sids: [None; MAX_TIMERS],
            probe_winsize: false,
            input_line: Vec::new(),
            input_pos: None,
            autohold: false,
        }
    }

    /// Bring the terminal to the known starting state: wrap off (the engine
    /// runs its own wrap policy), cursor on, then a full paint of the
    /// display page.
    pub fn startup_paint(&mut self) {
        emit(&self.out, AnsiCode::WrapOff);
        emit(&self.out, AnsiCode::CursorOn);
        self.shadow.cursor_on = true;
        self.restore(self.cur_dsp);
    }

    /// Register the interactive input fd with the event source and switch it
    /// to non-blocking so readiness events can be drained fully.
    ///
    /// # Errors
    ///
    /// Device error when the fd cannot be registered or reconfigured.
    pub fn attach_stdin(&mut self, fd: RawFd) -> TermResult<()> {
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        let mut flags = rustix::fs::fcntl_getfl(borrowed).map_err(std::io::Error::from)?;
        flags |= rustix::fs::OFlags::NONBLOCK;
        rustix::fs::fcntl_setfl(borrowed, flags).map_err(std::io::Error::from)?;
        self.stdin_sid = Some(self.mux.register_input(fd)?);
        self.stdin_fd = Some(fd);
        Ok(())
    }

    /// Register the window-change signal; resizes will re-query the tty and
    /// surface as resize events.
    ///
    /// # Errors
    ///
    /// Device error when the signal cannot be registered.
    pub fn attach_winch(&mut self) -> TermResult<()> {
        self.winch_sid = Some(self.mux.register_signal(signal_hook::consts::SIGWINCH)?);
        self.probe_winsize = true;
        Ok(())
    }

    /// Feed bytes as if they had been read from the input fd. Decoded
    /// events queue for delivery by [`TermOps::event`]. This is the
    /// injection point for tests and for collaborators that source input
    /// from somewhere other than the tty.
    pub fn inject_input(&mut self, bytes: &[u8]) {
        self.decoder.feed(bytes);
        while let Some(ev) = self.decoder.next_event() {
            self.pending.push_back(EventRecord::new(ev));
        }
    }

    /// Current surface dimensions.
    #[must_use]
    pub fn size(&self) -> TermSize { self.size }

    /// The shadow, for layers that compose onto the root surface.
    #[must_use]
    pub fn shadow(&self) -> &TermShadow { &self.shadow }

    // -- internals -----------------------------------------------------------

    fn in_display(&self) -> bool { self.cur_upd == self.cur_dsp }

    fn ensure_page(&mut self, idx: usize) {
        if self.pages[idx - 1].is_none() {
            self.pages[idx - 1] = Some(Box::new(ScreenPage::new()));
        }
    }

    fn upd(&self) -> &ScreenPage {
        self.pages[self.cur_upd - 1].as_ref().expect("update page")
    }

    fn upd_mut(&mut self) -> &mut ScreenPage {
        self.pages[self.cur_upd - 1].as_mut().expect("update page")
    }

    fn cursor_in_bounds(&self) -> bool { self.size.contains(self.upd().cursor) }

    /// Reconcile physical cursor visibility: forced off while the logical
    /// cursor is out of bounds, otherwise the page's visibility; emitted
    /// only on transitions.
    fn cursts(&mut self) {
        if !self.in_display() {
            return;
        }
        let cv = self.upd().cursor_visible && self.cursor_in_bounds();
        if cv != self.shadow.cursor_on {
            emit(
                &self.out,
                if cv { AnsiCode::CursorOn } else { AnsiCode::CursorOff },
            );
            self.shadow.cursor_on = cv;
        }
    }

    /// Reconcile the physical cursor with the update page's cursor using
    /// the minimum motion sequence, then reconcile visibility.
    fn setcur(&mut self) {
        if !self.in_display() {
            return;
        }
        if self.cursor_in_bounds() {
            let target = self.upd().cursor;
            if self.shadow.pos_valid && target == self.shadow.pos {
                // already there
            } else if self.shadow.pos_valid {
                // try some optimized cursor positions to reduce bandwidth;
                // we don't count on real terminal behavior at the borders
                let cur = self.shadow.pos;
                if target == TermPos::HOME {
                    emit(&self.out, AnsiCode::CursorHome);
                } else if target.x == cur.x && target.y == cur.y - 1 {
                    emit(&self.out, AnsiCode::CursorUp);
                } else if target.x == cur.x && target.y == cur.y + 1 {
                    emit(&self.out, AnsiCode::CursorDown);
                } else if target.x == cur.x - 1 && target.y == cur.y {
                    emit(&self.out, AnsiCode::CursorLeft);
                } else if target.x == cur.x + 1 && target.y == cur.y {
                    emit(&self.out, AnsiCode::CursorRight);
                } else if target.x == 1 && target.y == cur.y {
                    emit_bytes(&self.out, b"\r");
                } else {
                    emit(&self.out, AnsiCode::CursorTo { x: target.x, y: target.y });
                }
                self.shadow.pos = target;
            } else {
                // don't count on the physical cursor location, just reset
                emit(&self.out, AnsiCode::CursorTo { x: target.x, y: target.y });
                self.shadow.pos = target;
                self.shadow.pos_valid = true;
            }
        }
        self.cursts();
    }

    /// Emit the attribute state for the update page (only meaningful while
    /// it is displayed); shadow tracks the last emission.
    fn set_attr_state(&mut self, attr: CellAttr) {
        if self.in_display() {
            let (fg, bg) = {
                let p = self.upd();
                (p.fg, p.bg)
            };
            emit_attr_fresh(&self.out, attr, fg, bg);
            self.shadow.attr = attr;
            self.shadow.fg = fg;
            self.shadow.bg = bg;
        }
    }

    /// Shared body of the attribute setters: the new attribute replaces the
    /// old one wholesale (attributes are set singly at this level).
    fn apply_attr(&mut self, e: bool, attr: CellAttr) {
        let new_attr = if e { attr } else { CellAttr::None };
        self.upd_mut().attr = new_attr;
        self.set_attr_state(new_attr);
    }

    /// Full repaint of a page's buffer to the terminal, tracking running
    /// color/attribute state to minimize emission, then cursor restore.
    fn restore(&mut self, page_idx: usize) {
        let out = self.out.clone();
        let size = self.size;
        let page = self.pages[page_idx - 1].as_ref().expect("display page");

        emit(&out, AnsiCode::CursorHome);
        emit(&out, AnsiCode::Foreground(page.fg));
        emit(&out, AnsiCode::Background(page.bg));
        emit_attr_fresh(&out, page.attr, page.fg, page.bg);

        let mut run_fg = page.fg;
        let mut run_bg = page.bg;
        let mut run_attr = page.attr;
        for y in 1..=size.y {
            for x in 1..=size.x {
                emit_cell(
                    &out,
                    page.cell(TermPos::new(x, y)),
                    &mut run_fg,
                    &mut run_bg,
                    &mut run_attr,
                );
            }
            if y < size.y {
                // next-line on all lines but the last, which would scroll
                emit_bytes(&out, b"\r\n");
            }
        }

        let cursor = page.cursor;
        let in_bounds = size.contains(cursor);
        if in_bounds {
            emit(&out, AnsiCode::CursorTo { x: cursor.x, y: cursor.y });
        }
        emit(&out, AnsiCode::Foreground(page.fg));
        emit(&out, AnsiCode::Background(page.bg));
        emit_attr_fresh(&out, page.attr, page.fg, page.bg);

        self.shadow.fg = page.fg;
        self.shadow.bg = page.bg;
        self.shadow.attr = page.attr;
        self.shadow.pos = if in_bounds { cursor } else { TermPos::HOME };
        self.shadow.pos_valid = in_bounds;

        let cv = page.cursor_visible && in_bounds;
        if cv != self.shadow.cursor_on {
            emit(&out, if cv { AnsiCode::CursorOn } else { AnsiCode::CursorOff });
            self.shadow.cursor_on = cv;
        }
    }

    fn icursor(&mut self, x: i32, y: i32) {
        let p = self.upd_mut();
        p.cursor = TermPos::new(x, y);
        self.setcur();
    }

    fn iup(&mut self) {
        let (auto_mode, y) = {
            let p = self.upd();
            (p.auto_mode, p.cursor.y)
        };
        if auto_mode {
            if y > 1 {
                self.upd_mut().cursor.y -= 1;
            } else {
                self.iscroll(0, -1);
            }
        } else if y > -i32::MAX {
            self.upd_mut().cursor.y -= 1;
        }
        self.setcur();
    }

    fn idown(&mut self) {
        let (auto_mode, y) = {
            let p = self.upd();
            (p.auto_mode, p.cursor.y)
        };
        if auto_mode {
            if y < self.size.y {
                self.upd_mut().cursor.y += 1;
            } else {
                self.iscroll(0, 1);
            }
        } else if y < i32::MAX {
            self.upd_mut().cursor.y += 1;
        }
        self.setcur();
    }

    fn ileft(&mut self) {
        let (auto_mode, x) = {
            let p = self.upd();
            (p.auto_mode, p.cursor.x)
        };
        if auto_mode {
            if x > 1 {
                self.upd_mut().cursor.x -= 1;
            } else {
                self.iup();
                self.upd_mut().cursor.x = self.size.x;
            }
        } else if x > -i32::MAX {
            self.upd_mut().cursor.x -= 1;
        }
        self.setcur();
    }

    fn iright(&mut self) {
        let (auto_mode, x) = {
            let p = self.upd();
            (p.auto_mode, p.cursor.x)
        };
        if auto_mode {
            if x < self.size.x {
                self.upd_mut().cursor.x += 1;
            } else {
                self.idown();
                self.upd_mut().cursor.x = 1;
            }
        } else if x < i32::MAX {
            self.upd_mut().cursor.x += 1;
        }
        self.setcur();
    }

    /// Clear the update page and home the cursor.
    fn iclear(&mut self) {
        {
            let p = self.upd_mut();
            p.clear_buffer();
            p.cursor = TermPos::HOME;
        }
        if self.in_display() {
            emit(&self.out, AnsiCode::ClearHome);
            self.shadow.pos = TermPos::HOME;
            self.shadow.pos_valid = true;
            self.setcur();
        }
    }

    /// Logical scroll of the update page by (dx, dy).
    ///
    /// Downward-only scrolls ride the terminal's native scrolling: position
    /// to the bottom row and emit newlines. Linefeeds work no matter the
    /// state of wrap, and use whatever the current background color is.
    /// Everything else adjusts the buffer, then repaints diff-wise against a
    /// pre-adjustment snapshot. Scrolls that would move everything off the
    /// surface degrade to a clear. The cursor stays in place throughout,
    /// even though the text moves under it.
    fn iscroll(&mut self, dx: i32, dy: i32) {
        let out = self.out.clone();
        let size = self.size;
        let in_disp = self.in_display();

        if dy > 0 && dx == 0 {
            if in_disp {
                emit(&out, AnsiCode::CursorTo { x: 1, y: size.y });
                for _ in 0..dy {
                    emit_bytes(&out, b"\n");
                }
                let cursor = self.upd().cursor;
                if size.contains(cursor) {
                    emit(&out, AnsiCode::CursorTo { x: cursor.x, y: cursor.y });
                    self.shadow.pos = cursor;
                    self.shadow.pos_valid = true;
                } else {
                    self.shadow.pos_valid = false;
                }
            }
            self.upd_mut().shift_content(size, 0, dy);
        } else if dx <= -size.x || dx >= size.x || dy <= -size.y || dy >= size.y {
            // scroll would move all content off; just clear
            {
                let p = self.upd_mut();
                p.clear_buffer();
            }
            if in_disp {
                emit(&out, AnsiCode::ClearHome);
                let cursor = self.upd().cursor;
                if size.contains(cursor) {
                    emit(&out, AnsiCode::CursorTo { x: cursor.x, y: cursor.y });
                    self.shadow.pos = cursor;
                    self.shadow.pos_valid = true;
                } else {
                    self.shadow.pos = TermPos::HOME;
                    self.shadow.pos_valid = false;
                }
            }
        } else {
            let page = self.pages[self.cur_upd - 1].as_mut().expect("update page");
            let snapshot = page.snapshot();
            page.shift_content(size, dx, dy);
            if in_disp {
                emit(&out, AnsiCode::CursorHome);
                let mut run_fg = page.fg;
                let mut run_bg = page.bg;
                let mut run_attr = page.attr;
                for y in 1..=size.y {
                    // rightmost differing column; only columns 1..=lx need
                    // emission, since a character output costs no more than
                    // a cursor movement
                    let mut lx = size.x;
                    while lx >= 1 {
                        let pos = TermPos::new(lx, y);
                        if page.cell(pos) != ScreenPage::snapshot_cell(&snapshot, pos) {
                            break;
                        }
                        lx -= 1;
                    }
                    for x in 1..=lx {
                        emit_cell(
                            &out,
                            page.cell(TermPos::new(x, y)),
                            &mut run_fg,
                            &mut run_bg,
                            &mut run_attr,
                        );
                    }
                    if y < size.y {
                        emit_bytes(&out, b"\r\n");
                    }
                }
                let cursor = page.cursor;
                if size.contains(cursor) {
                    emit(&out, AnsiCode::CursorTo { x: cursor.x, y: cursor.y });
                    self.shadow.pos = cursor;
                    self.shadow.pos_valid = true;
                } else {
                    self.shadow.pos_valid = false;
                }
                emit(&out, AnsiCode::Foreground(page.fg));
                emit(&out, AnsiCode::Background(page.bg));
                emit_attr_fresh(&out, page.attr, page.fg, page.bg);
                self.shadow.fg = page.fg;
                self.shadow.bg = page.bg;
                self.shadow.attr = page.attr;
            }
        }
    }

    /// Place one byte at the cursor, interpreting the elementary control
    /// codes. The idea is not to provide a parallel set of screen controls;
    /// that's what the API is for.
    pub fn plcchr(&mut self, c: u8) {
        match c {
            b'\r' => {
                self.upd_mut().cursor.x = 1;
                self.setcur();
            }
            b'\n' => {
                self.idown();
                self.upd_mut().cursor.x = 1;
                self.setcur();
            }
            0x08 => self.ileft(),
            0x0c => self.iclear(),
            b'\t' => {
                let (x, stop) = {
                    let p = self.upd();
                    (p.cursor.x, p.next_tab_after(p.cursor.x, self.size.x))
                };
                if let Some(stop) = stop {
                    let mut cur = x;
                    while cur < stop {
                        self.iright();
                        cur += 1;
                    }
                }
            }
            c if c >= 0x20 && c != 0x7f => {
                let (cursor, fg, bg, attr, auto_mode) = {
                    let p = self.upd();
                    (p.cursor, p.fg, p.bg, p.attr, p.auto_mode)
                };
                if ScreenPage::in_buffer(cursor) {
                    *self.upd_mut().cell_mut(cursor) = ScreenCell {
                        ch: c as char,
                        fg,
                        bg,
                        attr,
                    };
                }
                if self.cursor_in_bounds() && self.in_display() {
                    // placement implicitly moves the physical cursor; at
                    // the right edge, don't count on the screen wrap action
                    emit_bytes(&self.out, &[c]);
                    if self.shadow.pos.x == self.size.x {
                        self.shadow.pos_valid = false;
                    } else {
                        self.shadow.pos.x += 1;
                    }
                    if auto_mode {
                        if cursor.x < self.size.x {
                            self.upd_mut().cursor.x += 1;
                        } else {
                            self.idown();
                            self.upd_mut().cursor.x = 1;
                        }
                    } else {
                        if cursor.x < i32::MAX {
                            self.upd_mut().cursor.x += 1;
                        }
                        self.shadow.pos_valid = false;
                    }
                    self.setcur();
                } else {
                    self.iright();
                }
            }
            _ => {} // other control characters are suppressed
        }
    }

    // -- event fetch ---------------------------------------------------------

    /// Drain whatever the input fd holds into the decoder. The fd is
    /// non-blocking, so a readiness edge is always consumed completely.
    fn drain_stdin(&mut self) -> TermResult<()> {
        let Some(fd) = self.stdin_fd else {
            return Ok(());
        };
        let mut buf = [0u8; 64];
        loop {
            let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
            match rustix::io::read(borrowed, &mut buf[..]) {
                Ok(0) => break,
                Ok(n) => {
                    self.decoder.feed(&buf[..n]);
                    if n < buf.len() {
                        break;
                    }
                }
                Err(e) if e == rustix::io::Errno::AGAIN => break,
                Err(e) if e == rustix::io::Errno::INTR => {}
                Err(e) => return Err(TermError::DeviceIo(e.into())),
            }
        }
        while let Some(ev) = self.decoder.next_event() {
            self.pending.push_back(EventRecord::new(ev));
        }
        Ok(())
    }

    /// Blocking fetch of the next typed event (no handler chain).
    fn ievent(&mut self) -> TermResult<EventRecord> {
        loop {
            if let Some(rec) = self.pending.pop_front() {
                tracing::debug!(event = ?rec.event, window = rec.window, "event");
                return Ok(rec);
            }
            let sev = self.mux.next()?;
            match sev.kind {
                SystemEventKind::Input if Some(sev.sid) == self.stdin_sid => {
                    self.drain_stdin()?;
                }
                SystemEventKind::Input => { /* collaborator-owned fd; not ours */ }
                SystemEventKind::Timer => {
                    if Some(sev.sid) == self.frame_sid {
                        self.pending.push_back(EventRecord::new(TermEvent::Frame));
                    } else if let Some(idx) =
                        self.timer_sids.iter().position(|t| *t == Some(sev.sid))
                    {
                        self.pending.push_back(EventRecord::new(TermEvent::Timer(
                            u8::try_from(idx + 1).unwrap_or(0),
                        )));
                    }
                }
                SystemEventKind::Signal if Some(sev.sid) == self.winch_sid => {
                    let old = self.size;
                    if self.probe_winsize {
                        self.size = query_winsize(old);
                    }
                    // newly exposed area needs a redraw
                    if self.size.x > old.x || self.size.y > old.y {
                        self.restore(self.cur_dsp);
                    }
                    self.pending
                        .push_back(EventRecord::new(TermEvent::Resize(self.size)));
                }
                SystemEventKind::Signal => {
                    self.pending.push_back(EventRecord::new(TermEvent::Terminate));
                }
            }
        }
    }

    // -- line input ----------------------------------------------------------

    /// Read an input line with echo and backspace editing into the line
    /// buffer. Returns false when the session was terminated instead.
    fn readline(&mut self) -> TermResult<bool> {
        self.input_line.clear();
        loop {
            let rec = self.ievent()?;
            match rec.event {
                TermEvent::Terminate => return Ok(false),
                TermEvent::Enter => {
                    self.input_line.push(b'\n');
                    self.plcchr(b'\r');
                    self.plcchr(b'\n');
                    return Ok(true);
                }
                TermEvent::Char(c) => {
                    if self.input_line.len() < MAX_LINE && c.is_ascii() {
                        self.input_line.push(c as u8);
                        self.plcchr(c as u8);
                    }
                }
                TermEvent::DeleteCharBackward => {
                    if !self.input_line.is_empty() {
                        self.plcchr(0x08);
                        self.plcchr(b' ');
                        self.plcchr(0x08);
                        self.input_line.pop();
                    }
                }
                _ => {} // other events are uninteresting while line editing
            }
        }
    }
}

impl TermOps for ScreenEngine {
    fn cursor(&mut self, _s: Stream, x: i32, y: i32) -> TermResult<()> {
        self.icursor(x, y);
        Ok(())
    }

    fn maxx(&mut self, _s: Stream) -> i32 { self.size.x }

    fn maxy(&mut self, _s: Stream) -> i32 { self.size.y }

    fn home(&mut self, _s: Stream) -> TermResult<()> {
        self.upd_mut().cursor = TermPos::HOME;
        self.setcur();
        Ok(())
    }

    fn del(&mut self, _s: Stream) -> TermResult<()> {
        self.ileft();
        self.plcchr(b' ');
        self.ileft();
        Ok(())
    }

    fn up(&mut self, _s: Stream) -> TermResult<()> {
        self.iup();
        Ok(())
    }

    fn down(&mut self, _s: Stream) -> TermResult<()> {
        self.idown();
        Ok(())
    }

    fn left(&mut self, _s: Stream) -> TermResult<()> {
        self.ileft();
        Ok(())
    }

    fn right(&mut self, _s: Stream) -> TermResult<()> {
        self.iright();
        Ok(())
    }

    fn blink(&mut self, _s: Stream, e: bool) -> TermResult<()> {
        self.apply_attr(e, CellAttr::Blink);
        Ok(())
    }

    fn reverse(&mut self, _s: Stream, e: bool) -> TermResult<()> {
        self.apply_attr(e, CellAttr::Reverse);
        Ok(())
    }

    fn underline(&mut self, _s: Stream, e: bool) -> TermResult<()> {
        self.apply_attr(e, CellAttr::Underline);
        Ok(())
    }

    fn superscript(&mut self, _s: Stream, e: bool) -> TermResult<()> {
        self.apply_attr(e, CellAttr::Superscript);
        Ok(())
    }

    fn subscript(&mut self, _s: Stream, e: bool) -> TermResult<()> {
        self.apply_attr(e, CellAttr::Subscript);
        Ok(())
    }

    fn italic(&mut self, _s: Stream, e: bool) -> TermResult<()> {
        self.apply_attr(e, CellAttr::Italic);
        Ok(())
    }

    fn bold(&mut self, _s: Stream, e: bool) -> TermResult<()> {
        self.apply_attr(e, CellAttr::Bold);
        Ok(())
    }

    fn strikeout(&mut self, _s: Stream, _e: bool) -> TermResult<()> {
        // no ANSI capability at this level
        Ok(())
    }

    fn standout(&mut self, s: Stream, e: bool) -> TermResult<()> {
        // standout is implemented as reverse video
        self.reverse(s, e)
    }

    fn fcolor(&mut self, _s: Stream, c: TermColor) -> TermResult<()> {
        self.upd_mut().fg = c;
        if self.in_display() {
            emit(&self.out, AnsiCode::Foreground(c));
            self.shadow.fg = c;
        }
        Ok(())
    }

    fn bcolor(&mut self, _s: Stream, c: TermColor) -> TermResult<()> {
        self.upd_mut().bg = c;
        if self.in_display() {
            emit(&self.out, AnsiCode::Background(c));
            self.shadow.bg = c;
        }
        Ok(())
    }

    fn auto_mode(&mut self, _s: Stream, e: bool) -> TermResult<()> {
        self.upd_mut().auto_mode = e;
        Ok(())
    }

    fn curvis(&mut self, _s: Stream, e: bool) -> TermResult<()> {
        self.upd_mut().cursor_visible = e;
        self.cursts();
        Ok(())
    }

    fn scroll(&mut self, _s: Stream, dx: i32, dy: i32) -> TermResult<()> {
        self.iscroll(dx, dy);
        Ok(())
    }

    fn curx(&mut self, _s: Stream) -> i32 { self.upd().cursor.x }

    fn cury(&mut self, _s: Stream) -> i32 { self.upd().cursor.y }

    fn curbnd(&mut self, _s: Stream) -> bool { self.cursor_in_bounds() }

    fn select(&mut self, _s: Stream, u: i32, d: i32) -> TermResult<()> {
        let max = i32::try_from(MAX_PAGES).unwrap_or(10);
        if !(1..=max).contains(&u) {
            return Err(TermError::BadPage { page: u, max });
        }
        if !(1..=max).contains(&d) {
            return Err(TermError::BadPage { page: d, max });
        }
        self.cur_upd = usize::try_from(u).expect("validated");
        self.ensure_page(self.cur_upd);
        self.cur_dsp = usize::try_from(d).expect("validated");
        self.ensure_page(self.cur_dsp);
        // reselecting the displayed page is a legal refresh
        self.restore(self.cur_dsp);
        Ok(())
    }

    fn event(&mut self, _s: Stream) -> TermResult<EventRecord> { self.ievent() }

    fn timer(&mut self, _s: Stream, id: i32, period_100us: i64, repeat: bool) -> TermResult<()> {
        let max = i32::try_from(MAX_TIMERS).unwrap_or(10);
        if !(1..=max).contains(&id) {
            return Err(TermError::BadHandle {
                what: "timer",
                id: i64::from(id),
            });
        }
        let slot = usize::try_from(id - 1).expect("validated");
        let sid = self.mux.arm_timer(self.timer_sids[slot], period_100us, repeat)?;
        self.timer_sids[slot] = Some(sid);
        Ok(())
    }

    fn killtimer(&mut self, _s: Stream, id: i32) -> TermResult<()> {
        let max = i32::try_from(MAX_TIMERS).unwrap_or(10);
        if !(1..=max).contains(&id) {
            return Err(TermError::BadHandle {
                what: "timer",
                id: i64::from(id),
            });
        }
        let slot = usize::try_from(id - 1).expect("validated");
        let Some(sid) = self.timer_sids[slot] else {
            return Err(TermError::BadHandle {
                what: "timer",
                id: i64::from(id),
            });
        };
        self.mux.disarm_timer(sid)?;
        // an already-decoded fire must not be delivered after this returns
        self.pending
            .retain(|rec| rec.event != TermEvent::Timer(u8::try_from(id).unwrap_or(0)));
        Ok(())
    }

    fn mouse(&mut self, _s: Stream) -> i32 {
        // an xterm cannot say whether a mouse exists; report one, dead if
        // absent
        1
    }

    fn mousebutton(&mut self, _s: Stream, _m: i32) -> i32 { 3 }

    fn joystick(&mut self, _s: Stream) -> i32 {
        // joystick enumeration is the device collaborator's business
        0
    }

    fn joybutton(&mut self, _s: Stream, j: i32) -> TermResult<i32> {
        Err(TermError::BadHandle {
            what: "joystick",
            id: i64::from(j),
        })
    }

    fn joyaxis(&mut self, _s: Stream, j: i32) -> TermResult<i32> {
        Err(TermError::BadHandle {
            what: "joystick",
            id: i64::from(j),
        })
    }

    fn settab(&mut self, _s: Stream, t: i32) -> TermResult<()> {
        if t < 1 || t > self.size.x {
            return Err(TermError::BadPosition { x: t, y: 1 });
        }
        self.upd_mut().set_tab(t);
        Ok(())
    }

    fn restab(&mut self, _s: Stream, t: i32) -> TermResult<()> {
        if t < 1 || t > self.size.x {
            return Err(TermError::BadPosition { x: t, y: 1 });
        }
        self.upd_mut().reset_tab(t);
        Ok(())
    }

    fn clrtab(&mut self, _s: Stream) -> TermResult<()> {
        self.upd_mut().clear_tabs();
        Ok(())
    }

    fn funkey(&mut self, _s: Stream) -> i32 { MAX_FUNCTION_KEYS }

    fn frametimer(&mut self, _s: Stream, e: bool) -> TermResult<()> {
        if e {
            let sid = self.mux.arm_timer(self.frame_sid, FRAME_PERIOD_100US, true)?;
            self.frame_sid = Some(sid);
        } else if let Some(sid) = self.frame_sid {
            self.mux.disarm_timer(sid)?;
        }
        Ok(())
    }

    fn autohold(&mut self, _s: Stream, e: bool) {
        // no use on a terminal (we abort back to the same window); recorded
        // for the graphical collaborators
        self.autohold = e;
    }

    fn wrtstr(&mut self, _s: Stream, text: &str) -> TermResult<()> {
        emit_bytes(&self.out, text.as_bytes());
        // direct output moved the cursor some unknowable amount
        self.shadow.pos_valid = false;
        Ok(())
    }

    fn write_text(&mut self, _s: Stream, text: &str) -> TermResult<()> {
        for &b in text.as_bytes() {
            self.plcchr(b);
        }
        Ok(())
    }
}

impl TtyIo for ScreenEngine {
    /// Reading the terminal input returns line-buffered bytes: everything
    /// up to and including the newline; the next read blocks for a fresh
    /// line. A terminate event during line entry reads as end-of-file.
    fn read(&mut self, fd: RawFd, buf: &mut [u8]) -> TermResult<usize> {
        if fd != crate::INP_FIL {
            return self.prev_io.clone().borrow_mut().read(fd, buf);
        }
        let mut filled = 0;
        while filled < buf.len() {
            if self.input_pos.is_none() {
                if !self.readline()? {
                    break; // terminated: EOF
                }
                self.input_pos = Some(0);
            }
            let pos = self.input_pos.expect("line active");
            let b = self.input_line[pos];
            buf[filled] = b;
            filled += 1;
            if b == b'\n' {
                self.input_pos = None;
                break;
            }
            self.input_pos = Some(pos + 1);
        }
        Ok(filled)
    }

    /// Writes to the terminal output run through cell placement; other fds
    /// pass down the chain.
    fn write(&mut self, fd: RawFd, buf: &[u8]) -> TermResult<usize> {
        if fd != crate::OUT_FIL {
            return self.prev_io.clone().borrow_mut().write(fd, buf);
        }
        for &b in buf {
            self.plcchr(b);
        }
        Ok(buf.len())
    }

    fn open(&mut self, path: &str, flags: OpenFlags) -> TermResult<RawFd> {
        self.prev_io.clone().borrow_mut().open(path, flags)
    }

    fn close(&mut self, fd: RawFd) -> TermResult<()> {
        self.prev_io.clone().borrow_mut().close(fd)
    }

    /// Seeking is never possible on the terminal-attached handles.
    fn lseek(&mut self, fd: RawFd, offset: i64, whence: SeekWhence) -> TermResult<i64> {
        if fd == crate::INP_FIL || fd == crate::OUT_FIL {
            return Err(TermError::BadHandle {
                what: "seekable file",
                id: i64::from(fd),
            });
        }
        self.prev_io.clone().borrow_mut().lseek(fd, offset, whence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PassthroughTtyIo, StdoutMock};
    use pretty_assertions::assert_eq;
    use std::{cell::RefCell, rc::Rc};

    const S: Stream = Stream::STDOUT;

    fn engine(x: i32, y: i32) -> (ScreenEngine, StdoutMock) {
        let (out, mock) = OutputDevice::new_mock();
        let mux = SystemEventSource::new().unwrap();
        let prev: SharedImpl<dyn TtyIo> = Rc::new(RefCell::new(PassthroughTtyIo));
        let mut engine = ScreenEngine::new(out, TermSize::new(x, y), mux, prev);
        engine.startup_paint();
        mock.clear();
        (engine, mock)
    }

    /// The expected full-repaint byte stream for a blank page in the given
    /// state, cursor at home.
    fn blank_repaint(x: usize, y: usize) -> String {
        let mut s = String::new();
        s.push_str("\x1b[H\x1b[30m\x1b[107m"); // home, fg, bg
        s.push_str("\x1b[0m\x1b[30m\x1b[107m"); // attr none re-emits colors
        for row in 1..=y {
            s.push_str(&" ".repeat(x));
            if row < y {
                s.push_str("\r\n");
            }
        }
        s.push_str("\x1b[1;1H\x1b[30m\x1b[107m\x1b[0m\x1b[30m\x1b[107m");
        s
    }

    #[test]
    fn startup_paint_emission() {
        let (out, mock) = OutputDevice::new_mock();
        let mux = SystemEventSource::new().unwrap();
        let prev: SharedImpl<dyn TtyIo> = Rc::new(RefCell::new(PassthroughTtyIo));
        let mut engine = ScreenEngine::new(out, TermSize::new(80, 24), mux, prev);
        engine.startup_paint();
        let expected = format!("\x1b[7l\x1b[?25h{}", blank_repaint(80, 24));
        assert_eq!(mock.get_copy_of_buffer_as_string(), expected);
    }

    #[test]
    fn select_same_page_is_a_full_refresh_both_times() {
        let (mut engine, mock) = engine(10, 4);
        engine.select(S, 1, 1).unwrap();
        let first = mock.get_copy_of_buffer_as_string();
        mock.clear();
        engine.select(S, 1, 1).unwrap();
        let second = mock.get_copy_of_buffer_as_string();
        assert_eq!(first, blank_repaint(10, 4));
        assert_eq!(first, second);
    }

    #[test]
    fn select_rejects_bad_pages() {
        let (mut engine, _mock) = engine(10, 4);
        assert!(matches!(
            engine.select(S, 0, 1),
            Err(TermError::BadPage { page: 0, .. })
        ));
        assert!(matches!(
            engine.select(S, 1, 11),
            Err(TermError::BadPage { page: 11, .. })
        ));
    }

    #[test]
    fn cursor_motion_single_step_is_minimal() {
        let (mut engine, mock) = engine(80, 24);
        engine.cursor(S, 10, 5).unwrap();
        mock.clear();
        engine.cursor(S, 11, 5).unwrap();
        assert_eq!(mock.get_copy_of_buffer_as_string(), "\x1b[C");
        mock.clear();
        engine.cursor(S, 10, 5).unwrap();
        assert_eq!(mock.get_copy_of_buffer_as_string(), "\x1b[D");
        mock.clear();
        engine.cursor(S, 10, 4).unwrap();
        assert_eq!(mock.get_copy_of_buffer_as_string(), "\x1b[A");
        mock.clear();
        engine.cursor(S, 10, 5).unwrap();
        assert_eq!(mock.get_copy_of_buffer_as_string(), "\x1b[B");
        mock.clear();
        engine.cursor(S, 1, 5).unwrap();
        assert_eq!(mock.get_copy_of_buffer_as_string(), "\r");
        mock.clear();
        engine.cursor(S, 1, 1).unwrap();
        assert_eq!(mock.get_copy_of_buffer_as_string(), "\x1b[H");
        mock.clear();
        engine.cursor(S, 40, 12).unwrap();
        assert_eq!(mock.get_copy_of_buffer_as_string(), "\x1b[12;40H");
    }

    #[test]
    fn cursor_to_same_position_emits_nothing() {
        let (mut engine, mock) = engine(80, 24);
        engine.cursor(S, 7, 7).unwrap();
        mock.clear();
        engine.cursor(S, 7, 7).unwrap();
        assert_eq!(mock.get_copy_of_buffer_as_string(), "");
    }

    #[test]
    fn out_of_bounds_cursor_hides_and_does_not_move() {
        let (mut engine, mock) = engine(80, 24);
        engine.auto_mode(S, false).unwrap();
        mock.clear();
        engine.cursor(S, 100, 5).unwrap();
        // no motion sequence, only the forced cursor-off transition
        assert_eq!(mock.get_copy_of_buffer_as_string(), "\x1b[?25l");
        assert_eq!(engine.curx(S), 100);
        assert!(!engine.curbnd(S));
        mock.clear();
        // back in bounds: position plus cursor-on
        engine.cursor(S, 5, 5).unwrap();
        assert_eq!(mock.get_copy_of_buffer_as_string(), "\x1b[5;5H\x1b[?25h");
        assert!(engine.curbnd(S));
    }

    #[test]
    fn scroll_down_fast_path() {
        let (mut engine, mock) = engine(80, 24);
        // fill row 24 without tripping the wrap
        engine.auto_mode(S, false).unwrap();
        engine.cursor(S, 1, 24).unwrap();
        for _ in 0..40 {
            engine.plcchr(b'A');
        }
        engine.auto_mode(S, true).unwrap();
        engine.cursor(S, 1, 1).unwrap();
        mock.clear();
        engine.scroll(S, 0, 1).unwrap();
        assert_eq!(
            mock.get_copy_of_buffer_as_string(),
            "\x1b[24;1H\n\x1b[1;1H"
        );
        // buffer: old row 24 is now row 23; row 24 is blank
        assert_eq!(engine.upd().cell(TermPos::new(1, 23)).ch, 'A');
        assert_eq!(engine.upd().cell(TermPos::new(40, 23)).ch, 'A');
        assert_eq!(engine.upd().cell(TermPos::new(1, 24)).ch, ' ');
    }

    #[test]
    fn scroll_round_trip_keeps_cursor_and_shadow_consistent() {
        let (mut engine, _mock) = engine(20, 6);
        engine.cursor(S, 4, 3).unwrap();
        engine.scroll(S, 2, 1).unwrap();
        engine.scroll(S, -2, -1).unwrap();
        assert_eq!(engine.upd().cursor, TermPos::new(4, 3));
        assert_eq!(engine.shadow.pos, TermPos::new(4, 3));
        assert!(engine.shadow.pos_valid);
    }

    #[test]
    fn oversized_scroll_clears() {
        let (mut engine, _mock) = engine(10, 4);
        engine.cursor(S, 2, 2).unwrap();
        engine.plcchr(b'Z');
        engine.scroll(S, 10, 0).unwrap();
        for y in 1..=4 {
            for x in 1..=10 {
                assert_eq!(engine.upd().cell(TermPos::new(x, y)).ch, ' ');
            }
        }
    }

    #[test]
    fn attribute_reset_preserves_colors() {
        let (mut engine, mock) = engine(80, 24);
        engine.fcolor(S, TermColor::Red).unwrap();
        engine.bcolor(S, TermColor::Blue).unwrap();
        mock.clear();
        engine.bold(S, false).unwrap(); // attr off
        assert_eq!(
            mock.get_copy_of_buffer_as_string(),
            "\x1b[0m\x1b[91m\x1b[104m"
        );
        // the next character carries the page's colors into the buffer
        engine.plcchr(b'x');
        let cell = *engine.upd().cell(TermPos::new(1, 1));
        assert_eq!(cell.fg, TermColor::Red);
        assert_eq!(cell.bg, TermColor::Blue);
    }

    #[test]
    fn attribute_set_resets_then_sets_then_recolors() {
        let (mut engine, mock) = engine(80, 24);
        mock.clear();
        engine.bold(S, true).unwrap();
        assert_eq!(
            mock.get_copy_of_buffer_as_string(),
            "\x1b[0m\x1b[1m\x1b[30m\x1b[107m"
        );
        assert_eq!(engine.upd().attr, CellAttr::Bold);
    }

    #[test]
    fn repaint_resets_between_distinct_attributes() {
        let (mut engine, mock) = engine(6, 2);
        engine.bold(S, true).unwrap();
        engine.plcchr(b'a');
        engine.italic(S, true).unwrap();
        engine.plcchr(b'b');
        mock.clear();
        engine.select(S, 1, 1).unwrap();
        let painted = mock.get_copy_of_buffer_as_string();
        // the bold cell: reset first, then bold, then colors
        assert!(painted.contains("\x1b[0m\x1b[1m\x1b[30m\x1b[107ma"));
        // the italic cell right after: reset again so bold does not bleed
        // into it (SGR codes are additive)
        assert!(painted.contains("a\x1b[0m\x1b[3m\x1b[30m\x1b[107mb"));
        // and back to no attribute for the blanks that follow
        assert!(painted.contains("b\x1b[0m\x1b[30m\x1b[107m "));
    }

    #[test]
    fn place_char_control_codes() {
        let (mut engine, _mock) = engine(80, 24);
        engine.cursor(S, 10, 5).unwrap();
        engine.plcchr(b'\r');
        assert_eq!(engine.upd().cursor, TermPos::new(1, 5));
        engine.plcchr(b'\n');
        assert_eq!(engine.upd().cursor, TermPos::new(1, 6));
        engine.plcchr(b'a');
        engine.plcchr(0x08);
        assert_eq!(engine.upd().cursor, TermPos::new(1, 6));
        // tab advances to the next stop at column 9
        engine.plcchr(b'\t');
        assert_eq!(engine.upd().cursor, TermPos::new(9, 6));
        // DEL and unlisted controls are suppressed
        engine.plcchr(0x7f);
        engine.plcchr(0x01);
        assert_eq!(engine.upd().cursor, TermPos::new(9, 6));
    }

    #[test]
    fn place_char_wraps_at_right_edge_with_auto_on() {
        let (mut engine, _mock) = engine(10, 4);
        engine.cursor(S, 10, 2).unwrap();
        engine.plcchr(b'Q');
        assert_eq!(engine.upd().cell(TermPos::new(10, 2)).ch, 'Q');
        assert_eq!(engine.upd().cursor, TermPos::new(1, 3));
    }

    #[test]
    fn hidden_page_writes_do_not_emit() {
        let (mut engine, mock) = engine(10, 4);
        engine.select(S, 2, 1).unwrap();
        mock.clear();
        engine.cursor(S, 3, 2).unwrap();
        engine.plcchr(b'h');
        engine.fcolor(S, TermColor::Green).unwrap();
        assert_eq!(mock.get_copy_of_buffer_as_string(), "");
        // the write landed in page 2's buffer
        assert_eq!(
            engine.pages[1].as_ref().unwrap().cell(TermPos::new(3, 2)).ch,
            'h'
        );
    }

    #[test]
    fn double_buffer_flip_repaints_from_buffer() {
        let (mut engine, mock) = engine(10, 2);
        engine.select(S, 2, 1).unwrap();
        engine.cursor(S, 1, 1).unwrap();
        for &b in b"hi" {
            engine.plcchr(b);
        }
        mock.clear();
        engine.select(S, 2, 2).unwrap();
        let painted = mock.get_copy_of_buffer_as_string();
        assert!(painted.contains("hi"));
        assert!(painted.starts_with("\x1b[H"));
    }

    #[test]
    fn repaint_is_deterministic_from_buffer() {
        let (mut engine, mock) = engine(12, 3);
        engine.cursor(S, 2, 2).unwrap();
        engine.fcolor(S, TermColor::Red).unwrap();
        for &b in b"abc" {
            engine.plcchr(b);
        }
        engine.select(S, 1, 1).unwrap();
        let first = mock.get_copy_of_buffer_as_string();
        let first_repaint = first.rsplit_once("\x1b[H").map(|(_, tail)| tail.to_string());
        mock.clear();
        engine.select(S, 1, 1).unwrap();
        let second = mock.get_copy_of_buffer_as_string();
        let second_repaint = second
            .rsplit_once("\x1b[H")
            .map(|(_, tail)| tail.to_string());
        assert_eq!(first_repaint, second_repaint);
    }

    #[test]
    fn del_blanks_previous_character() {
        let (mut engine, _mock) = engine(20, 4);
        for &b in b"ab" {
            engine.plcchr(b);
        }
        engine.del(S).unwrap();
        assert_eq!(engine.upd().cell(TermPos::new(2, 1)).ch, ' ');
        assert_eq!(engine.upd().cursor, TermPos::new(2, 1));
    }

    #[test]
    fn tabs_can_be_set_reset_and_cleared() {
        let (mut engine, _mock) = engine(40, 4);
        engine.clrtab(S).unwrap();
        engine.settab(S, 5).unwrap();
        engine.plcchr(b'\t');
        assert_eq!(engine.upd().cursor, TermPos::new(5, 1));
        // no stop right of 5: tab is a no-op
        engine.plcchr(b'\t');
        assert_eq!(engine.upd().cursor, TermPos::new(5, 1));
        engine.restab(S, 5).unwrap();
        engine.cursor(S, 1, 1).unwrap();
        engine.plcchr(b'\t');
        assert_eq!(engine.upd().cursor, TermPos::new(1, 1));
        assert!(matches!(
            engine.settab(S, 0),
            Err(TermError::BadPosition { .. })
        ));
        assert!(matches!(
            engine.settab(S, 41),
            Err(TermError::BadPosition { .. })
        ));
    }

    #[test]
    fn timer_events_round_trip_through_the_engine() {
        let (mut engine, _mock) = engine(10, 4);
        engine.timer(S, 3, 10, false).unwrap(); // 1ms one-shot
        let rec = engine.event(S).unwrap();
        assert_eq!(rec.event, TermEvent::Timer(3));
        assert_eq!(rec.window, 0);
    }

    #[test]
    fn killtimer_stops_a_repeating_timer() {
        let (mut engine, _mock) = engine(10, 4);
        engine.timer(S, 2, 10, true).unwrap();
        let rec = engine.event(S).unwrap();
        assert_eq!(rec.event, TermEvent::Timer(2));
        engine.killtimer(S, 2).unwrap();
        // no further id=2 events: arm another timer and observe only it
        engine.timer(S, 5, 20, false).unwrap();
        let rec = engine.event(S).unwrap();
        assert_eq!(rec.event, TermEvent::Timer(5));
    }

    #[test]
    fn killtimer_of_never_armed_timer_is_bad_handle() {
        let (mut engine, _mock) = engine(10, 4);
        assert!(matches!(
            engine.killtimer(S, 4),
            Err(TermError::BadHandle { .. })
        ));
        assert!(matches!(
            engine.timer(S, 0, 10, false),
            Err(TermError::BadHandle { .. })
        ));
        assert!(matches!(
            engine.timer(S, 11, 10, false),
            Err(TermError::BadHandle { .. })
        ));
    }

    #[test]
    fn injected_keyboard_bytes_become_events() {
        let (mut engine, _mock) = engine(10, 4);
        engine.inject_input(b"\x1b[Ax");
        let rec = engine.event(S).unwrap();
        assert_eq!(rec.event, TermEvent::Up);
        let rec = engine.event(S).unwrap();
        assert_eq!(rec.event, TermEvent::Char('x'));
    }

    #[test]
    fn mouse_record_delivers_button_then_move() {
        let (mut engine, _mock) = engine(10, 4);
        engine.inject_input(b"\x1b[M\x21\x22\x23");
        let rec = engine.event(S).unwrap();
        assert_eq!(rec.event, TermEvent::MouseAssert { mouse: 1, button: 2 });
        let rec = engine.event(S).unwrap();
        assert_eq!(
            rec.event,
            TermEvent::MouseMove {
                mouse: 1,
                pos: TermPos::new(2, 3)
            }
        );
    }

    #[test]
    fn io_write_routes_through_cell_placement() {
        let (mut engine, _mock) = engine(20, 4);
        let n = TtyIo::write(&mut engine, crate::OUT_FIL, b"ok\r\n").unwrap();
        assert_eq!(n, 4);
        assert_eq!(engine.upd().cell(TermPos::new(1, 1)).ch, 'o');
        assert_eq!(engine.upd().cell(TermPos::new(2, 1)).ch, 'k');
        assert_eq!(engine.upd().cursor, TermPos::new(1, 2));
    }

    #[test]
    fn io_read_returns_the_buffered_line_up_to_newline() {
        let (mut engine, _mock) = engine(20, 4);
        engine.inject_input(b"hi\x0d"); // h, i, enter
        let mut buf = [0u8; 16];
        let n = TtyIo::read(&mut engine, crate::INP_FIL, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"hi\n");
        // the line echoed to the screen
        assert_eq!(engine.upd().cell(TermPos::new(1, 1)).ch, 'h');
        assert_eq!(engine.upd().cell(TermPos::new(2, 1)).ch, 'i');
    }

    #[test]
    fn io_read_applies_backspace_editing() {
        let (mut engine, _mock) = engine(20, 4);
        engine.inject_input(b"ax\x7fb\x0d"); // a, x, backspace, b, enter
        let mut buf = [0u8; 16];
        let n = TtyIo::read(&mut engine, crate::INP_FIL, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"ab\n");
        assert_eq!(engine.upd().cell(TermPos::new(2, 1)).ch, 'b');
    }

    #[test]
    fn io_read_terminate_is_eof() {
        let (mut engine, _mock) = engine(20, 4);
        engine.inject_input(b"\x03");
        let mut buf = [0u8; 16];
        let n = TtyIo::read(&mut engine, crate::INP_FIL, &mut buf).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn lseek_on_terminal_handles_is_rejected() {
        let (mut engine, _mock) = engine(20, 4);
        assert!(matches!(
            engine.lseek(crate::OUT_FIL, 0, SeekWhence::Set),
            Err(TermError::BadHandle { .. })
        ));
    }

    #[test]
    fn wrtstr_bypasses_cell_handling() {
        let (mut engine, mock) = engine(20, 4);
        mock.clear();
        engine.wrtstr(S, "raw\x1b[5m").unwrap();
        assert_eq!(mock.get_copy_of_buffer_as_string(), "raw\x1b[5m");
        assert_eq!(engine.upd().cell(TermPos::new(1, 1)).ch, ' ');
        assert!(!engine.shadow.pos_valid);
    }

    #[test]
    fn funkey_and_device_queries() {
        let (mut engine, _mock) = engine(20, 4);
        assert_eq!(engine.funkey(S), 10);
        assert_eq!(engine.mouse(S), 1);
        assert_eq!(engine.mousebutton(S, 1), 3);
        assert_eq!(engine.joystick(S), 0);
        assert!(engine.joybutton(S, 1).is_err());
        assert!(engine.joyaxis(S, 1).is_err());
    }
}
