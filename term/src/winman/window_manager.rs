// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Character-mode window manager.
//!
//! Takes a character surface as provided by the screen engine and subdivides
//! it into windows. It is portable: it relies only on the terminal-level
//! operations, working by overriding the base capability slots and giving a
//! window view to the client program.
//!
//! A few important differences from a built-in window manager:
//!
//! 1. The root window is the original terminal surface, so windows exist
//!    only within it.
//! 2. The default I/O surface is created maximized and frameless, so a
//!    non-manager-aware program runs full screen with the manager entirely
//!    in the background.
//! 3. Only standard ASCII characters depict frame components.
//!
//! Rendering goes through the *previous* operations with cached root state
//! (cursor, colors, attribute bits, cursor visibility), so only transitions
//! reach the engine. Cell characters are written through the I/O chain, so
//! the engine's own root buffer stays in sync. There is no off-screen
//! compositing: overlapping windows repaint on focus change, not on each
//! other's damage.

use crate::{AttrSet, EventRecord, FrameGlyph, MAX_PAGES, MenuItem, OUT_FIL, OpenFlags,
            SeekWhence, SharedImpl, Stream, TermColor, TermError, TermEvent, TermOps, TermPos,
            TermResult, TermSize, TtyIo, WinCell, WinPage, Window};
use std::{collections::{HashMap, VecDeque},
          os::fd::RawFd};

/// Maximum number of windows (and window streams).
pub const MAX_WINDOWS: usize = 100;

/// Window id of the root surface window.
pub const ROOT_WINDOW_ID: i32 = 1;

/// First synthetic stream number handed to opened windows.
const FIRST_WINDOW_STREAM: i32 = 100;

/// Cached state of the root surface pen; only transitions are forwarded to
/// the engine, to cut down on chatter between the layers.
#[derive(Copy, Clone, Debug, Default)]
struct RootCache {
    pos: Option<TermPos>,
    fg: Option<TermColor>,
    bg: Option<TermColor>,
    attrs: AttrSet,
    cursor_on: Option<bool>,
}

/// The window manager. Implements the full operation set by intercepting
/// the override slots; holds the previous implementations for delegation.
#[allow(missing_debug_implementations)]
pub struct WindowManager {
    prev_ops: SharedImpl<dyn TermOps>,
    prev_io: SharedImpl<dyn TtyIo>,
    slots: Vec<Option<Window>>,
    free_slots: Vec<usize>,
    /// Master list of live window slots, creation order.
    master: Vec<usize>,
    by_stream: HashMap<Stream, usize>,
    by_id: HashMap<i32, usize>,
    next_stream_no: i32,
    /// Anonymous ids count down from -1 and are never reused.
    next_anon_id: i32,
    /// Current maximum/front Z order.
    ztop: i64,
    root_size: TermSize,
    cache: RootCache,
    /// Mouse tracking position in root coordinates.
    mouse: TermPos,
    /// Events posted with `sendevent`, delivered ahead of the input queue.
    injected: VecDeque<EventRecord>,
}

impl WindowManager {
    /// Build the manager over the previous implementations and create the
    /// root window: maximized, frameless, focused, bound to the stdout
    /// stream.
    #[must_use]
    pub fn new(
        prev_ops: SharedImpl<dyn TermOps>,
        prev_io: SharedImpl<dyn TtyIo>,
        root_size: TermSize,
    ) -> Self {
        let mut mgr = Self {
            prev_ops,
            prev_io,
            slots: Vec::new(),
            free_slots: Vec::new(),
            master: Vec::new(),
            by_stream: HashMap::new(),
            by_id: HashMap::new(),
            next_stream_no: FIRST_WINDOW_STREAM,
            next_anon_id: -1,
            ztop: 0,
            root_size,
            cache: RootCache::default(),
            mouse: TermPos::new(-i32::MAX, -i32::MAX),
            injected: VecDeque::new(),
        };
        // the root surface runs with auto off; the manager owns wrap and
        // scroll policy for every window
        let _unused = mgr.prev_ops.clone().borrow_mut().auto_mode(Stream::STDOUT, false);
        let root = mgr.new_window(ROOT_WINDOW_ID, Stream::STDOUT, None, true);
        let slot = mgr.insert_window(root).expect("root window slot");
        // the root is transparent: it carries the program's own surface
        if let Some(win) = &mut mgr.slots[slot] {
            win.visible = true;
            win.title = std::env::current_exe()
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()));
        }
        mgr
    }

    // -- window table --------------------------------------------------------

    fn new_window(&mut self, id: i32, stream: Stream, parent: Option<usize>, root: bool) -> Window {
        let extent = self.root_size;
        let mut win = Window {
            id,
            stream,
            parent,
            children: Vec::new(),
            pages: (0..MAX_PAGES).map(|_| None).collect(),
            cur_upd: 1,
            cur_dsp: 1,
            org: TermPos::HOME,
            coff: TermPos::new(0, 0),
            client: extent,
            extent,
            cursor: TermPos::HOME,
            attrs: AttrSet::empty(),
            fg: TermColor::Black,
            bg: TermColor::White,
            cursor_visible: true,
            auto_mode: true,
            buffered: true,
            tabs: default_tabs(),
            framed: !root,
            size_bars: !root,
            sys_bar: !root,
            title: None,
            visible: false,
            focus: false,
            zorder: 0,
            menu: crate::MenuState::default(),
        };
        win.recompute_geometry();
        win
    }

    fn insert_window(&mut self, mut win: Window) -> TermResult<usize> {
        if self.master.len() >= MAX_WINDOWS {
            return Err(TermError::ResourceExhausted {
                what: "window table",
            });
        }
        self.ztop += 1;
        win.zorder = self.ztop;
        self.remove_all_focus();
        win.focus = true; // last window in gets focus

        let slot = match self.free_slots.pop() {
            Some(s) => s,
            None => {
                self.slots.push(None);
                self.slots.len() - 1
            }
        };
        self.by_stream.insert(win.stream, slot);
        self.by_id.insert(win.id, slot);
        self.master.push(slot);
        if let Some(p) = win.parent {
            if let Some(parent) = &mut self.slots[p] {
                parent.children.push(slot);
            }
        }
        tracing::debug!(id = win.id, slot, z = win.zorder, "window opened");
        self.slots[slot] = Some(win);
        Ok(slot)
    }

    fn slot_of(&self, s: Stream) -> TermResult<usize> {
        self.by_stream.get(&s).copied().ok_or(TermError::BadWindow {
            reason: "stream is not a window",
        })
    }

    fn win(&self, slot: usize) -> &Window {
        self.slots[slot].as_ref().expect("live window")
    }

    fn win_mut(&mut self, slot: usize) -> &mut Window {
        self.slots[slot].as_mut().expect("live window")
    }

    // -- focus and hit testing -----------------------------------------------

    /// Remove all windows that show focus; normally at most one does.
    fn remove_all_focus(&mut self) {
        for &slot in &self.master {
            if let Some(win) = self.slots.get_mut(slot).and_then(|w| w.as_mut()) {
                win.focus = false;
            }
        }
    }

    fn find_focus(&self) -> Option<usize> {
        self.master
            .iter()
            .copied()
            .find(|&slot| self.win(slot).focus)
    }

    fn focus_window_id(&self) -> i32 {
        self.find_focus().map_or(0, |slot| self.win(slot).id)
    }

    /// Topmost (highest Z) visible window containing the root point.
    fn find_top_at(&self, pos: TermPos) -> Option<usize> {
        let mut found: Option<usize> = None;
        let mut z = i64::MIN;
        for &slot in &self.master {
            let win = self.win(slot);
            if win.visible && win.extent_contains(pos) && win.zorder > z {
                found = Some(slot);
                z = win.zorder;
            }
        }
        found
    }

    // -- cached root emission ------------------------------------------------

    fn root_cursor(&mut self, pos: TermPos) -> TermResult<()> {
        if self.cache.pos != Some(pos) {
            self.prev_ops
                .clone()
                .borrow_mut()
                .cursor(Stream::STDOUT, pos.x, pos.y)?;
            self.cache.pos = Some(pos);
        }
        Ok(())
    }

    fn root_fg(&mut self, c: TermColor) -> TermResult<()> {
        if self.cache.fg != Some(c) {
            self.prev_ops.clone().borrow_mut().fcolor(Stream::STDOUT, c)?;
            self.cache.fg = Some(c);
        }
        Ok(())
    }

    fn root_bg(&mut self, c: TermColor) -> TermResult<()> {
        if self.cache.bg != Some(c) {
            self.prev_ops.clone().borrow_mut().bcolor(Stream::STDOUT, c)?;
            self.cache.bg = Some(c);
        }
        Ok(())
    }

    fn root_curvis(&mut self, e: bool) -> TermResult<()> {
        if self.cache.cursor_on != Some(e) {
            self.prev_ops.clone().borrow_mut().curvis(Stream::STDOUT, e)?;
            self.cache.cursor_on = Some(e);
        }
        Ok(())
    }

    /// Reconcile the root attribute state with `attrs`, toggling each
    /// differing bit individually. Priority runs low to high; reverse is
    /// toggled last so it wins on single-attribute terminals.
    fn root_attrs(&mut self, attrs: AttrSet) -> TermResult<()> {
        if self.cache.attrs == attrs {
            return Ok(());
        }
        let old = self.cache.attrs;
        let prev = self.prev_ops.clone();
        let mut ops = prev.borrow_mut();
        let toggles: [(AttrSet, fn(&mut dyn TermOps, Stream, bool) -> TermResult<()>); 8] = [
            (AttrSet::SUPERSCRIPT, |o, s, e| o.superscript(s, e)),
            (AttrSet::SUBSCRIPT, |o, s, e| o.subscript(s, e)),
            (AttrSet::BLINK, |o, s, e| o.blink(s, e)),
            (AttrSet::STRIKEOUT, |o, s, e| o.strikeout(s, e)),
            (AttrSet::ITALIC, |o, s, e| o.italic(s, e)),
            (AttrSet::BOLD, |o, s, e| o.bold(s, e)),
            (AttrSet::UNDERLINE, |o, s, e| o.underline(s, e)),
            (AttrSet::REVERSE, |o, s, e| o.reverse(s, e)),
        ];
        for (bit, call) in toggles {
            if old.contains(bit) != attrs.contains(bit) {
                call(&mut *ops, Stream::STDOUT, attrs.contains(bit))?;
            }
        }
        drop(ops);
        self.cache.attrs = attrs;
        // the attribute setters re-emit colors underneath us
        self.cache.fg = None;
        self.cache.bg = None;
        Ok(())
    }

    /// Write one character to the root surface through the I/O chain (so
    /// the engine's own buffer stays in sync) and advance the cached x.
    fn root_putc(&mut self, ch: char) -> TermResult<()> {
        let mut utf8 = [0u8; 4];
        self.prev_io
            .clone()
            .borrow_mut()
            .write(OUT_FIL, ch.encode_utf8(&mut utf8).as_bytes())?;
        if let Some(pos) = &mut self.cache.pos {
            pos.x += 1;
        }
        Ok(())
    }

    fn root_puts(&mut self, text: &str) -> TermResult<()> {
        for ch in text.chars() {
            self.root_putc(ch)?;
        }
        Ok(())
    }

    // -- window drawing ------------------------------------------------------

    /// Reconcile the root cursor with a window's cursor.
    fn setcur_win(&mut self, slot: usize) -> TermResult<()> {
        let (in_display, visible, focus, in_bounds, curv, root_pos) = {
            let win = self.win(slot);
            (
                win.in_display(),
                win.visible,
                win.focus,
                win.cursor_in_bounds(),
                win.cursor_visible,
                win.to_root(win.cursor),
            )
        };
        if in_display && visible {
            if in_bounds && curv {
                self.root_curvis(true)?;
                self.root_cursor(root_pos)?;
            } else if focus {
                // out of bounds forces the cursor off regardless of the
                // user visibility setting
                self.root_curvis(false)?;
            }
        }
        Ok(())
    }

    /// Draw the frame of a window: border, system bar with buttons and
    /// centered title, underbar.
    fn draw_frame(&mut self, slot: usize) -> TermResult<()> {
        let (org, extent, framed, size_bars, sys_bar, title, fg, bg) = {
            let win = self.win(slot);
            (
                win.org,
                win.extent,
                win.framed,
                win.size_bars,
                win.sys_bar,
                win.title.clone(),
                win.fg,
                win.bg,
            )
        };
        if !framed {
            return Ok(());
        }
        self.root_attrs(AttrSet::empty())?;
        self.root_fg(fg)?;
        self.root_bg(bg)?;

        if size_bars {
            // top and bottom
            self.root_cursor(org)?;
            self.root_putc(FrameGlyph::TopLeft.ch())?;
            for _ in 2..extent.x {
                self.root_putc(FrameGlyph::Horizontal.ch())?;
            }
            self.root_putc(FrameGlyph::TopRight.ch())?;

            self.root_cursor(TermPos::new(org.x, org.y + extent.y - 1))?;
            self.root_putc(FrameGlyph::BottomLeft.ch())?;
            for _ in 2..extent.x {
                self.root_putc(FrameGlyph::Horizontal.ch())?;
            }
            self.root_putc(FrameGlyph::BottomRight.ch())?;

            // sides
            for y in (org.y + 1)..(org.y + extent.y - 1) {
                self.root_cursor(TermPos::new(org.x, y))?;
                self.root_putc(FrameGlyph::Vertical.ch())?;
                self.root_cursor(TermPos::new(org.x + extent.x - 1, y))?;
                self.root_putc(FrameGlyph::Vertical.ch())?;
            }
        }
        if sys_bar {
            let bar_y = org.y + i32::from(size_bars);
            let buttons_x = extent.x - 6;
            self.root_cursor(TermPos::new(org.x + buttons_x - 1, bar_y))?;
            self.root_putc(FrameGlyph::MinButton.ch())?;
            self.root_putc(' ')?;
            self.root_putc(FrameGlyph::MaxButton.ch())?;
            self.root_putc(' ')?;
            self.root_putc(FrameGlyph::CancelButton.ch())?;
            self.root_putc(' ')?;

            if let Some(title) = title {
                let avail = (extent.x - 6).max(0) as usize;
                let shown: String = title.chars().take(avail).collect();
                let l = shown.chars().count() as i32;
                self.root_cursor(TermPos::new(
                    org.x + (extent.x - 6) / 2 - l / 2,
                    bar_y,
                ))?;
                self.root_puts(&shown)?;
            }

            // underbar separating system bar from client area
            self.root_cursor(TermPos::new(org.x + 1, bar_y + 1))?;
            for _ in 2..extent.x {
                self.root_putc(FrameGlyph::SysUnderline.ch())?;
            }
        }
        Ok(())
    }

    /// Full back-buffer walk of a window onto the root surface.
    fn restore_window(&mut self, slot: usize) -> TermResult<()> {
        let (buffered, visible, framed) = {
            let win = self.win(slot);
            (win.buffered, win.visible, win.framed)
        };
        if !(buffered && visible) {
            return Ok(());
        }
        if framed {
            self.draw_frame(slot)?;
        }
        let (client, base, page) = {
            let win = self.win(slot);
            (
                win.client,
                win.to_root(TermPos::HOME),
                win.dsp_page().cloned(),
            )
        };
        for y in 1..=client.y {
            self.root_cursor(TermPos::new(base.x, base.y + y - 1))?;
            for x in 1..=client.x {
                let pos = TermPos::new(x, y);
                let cell = match &page {
                    Some(p) if p.in_buffer(pos) => *p.cell(pos),
                    _ => WinCell::default(),
                };
                // attributes first: toggling them re-emits colors below us
                self.root_attrs(cell.attrs)?;
                self.root_fg(cell.fg)?;
                self.root_bg(cell.bg)?;
                self.root_putc(cell.ch)?;
            }
        }
        self.setcur_win(slot)?;
        Ok(())
    }

    /// Present a window (and its parent chain) on first write.
    fn make_visible(&mut self, slot: usize) -> TermResult<()> {
        if self.win(slot).visible {
            return Ok(());
        }
        if let Some(parent) = self.win(slot).parent {
            self.make_visible(parent)?;
        }
        self.win_mut(slot).visible = true;
        self.restore_window(slot)
    }

    // -- per-window cursor motion and placement -------------------------------

    fn iup_win(&mut self, slot: usize) -> TermResult<()> {
        let (y, auto_mode) = {
            let w = self.win(slot);
            (w.cursor.y, w.auto_mode)
        };
        if y > 1 {
            self.win_mut(slot).cursor.y -= 1;
        } else if auto_mode {
            self.scroll_win(slot, 0, -1)?;
        } else if y > -i32::MAX {
            self.win_mut(slot).cursor.y -= 1;
        }
        self.setcur_win(slot)
    }

    fn idown_win(&mut self, slot: usize) -> TermResult<()> {
        let (y, auto_mode, maxy) = {
            let w = self.win(slot);
            (w.cursor.y, w.auto_mode, w.client.y)
        };
        if y < maxy {
            self.win_mut(slot).cursor.y += 1;
        } else if auto_mode {
            self.scroll_win(slot, 0, 1)?;
        } else if y < i32::MAX {
            self.win_mut(slot).cursor.y += 1;
        }
        self.setcur_win(slot)
    }

    fn ileft_win(&mut self, slot: usize) -> TermResult<()> {
        let (x, auto_mode, maxx) = {
            let w = self.win(slot);
            (w.cursor.x, w.auto_mode, w.client.x)
        };
        if x > 1 {
            self.win_mut(slot).cursor.x -= 1;
        } else if auto_mode {
            self.iup_win(slot)?;
            self.win_mut(slot).cursor.x = maxx;
        } else if x > -i32::MAX {
            self.win_mut(slot).cursor.x -= 1;
        }
        self.setcur_win(slot)
    }

    fn iright_win(&mut self, slot: usize) -> TermResult<()> {
        let (x, auto_mode, maxx) = {
            let w = self.win(slot);
            (w.cursor.x, w.auto_mode, w.client.x)
        };
        if x < maxx {
            self.win_mut(slot).cursor.x += 1;
        } else if auto_mode {
            self.idown_win(slot)?;
            self.win_mut(slot).cursor.x = 1;
        } else if x < i32::MAX {
            self.win_mut(slot).cursor.x += 1;
        }
        self.setcur_win(slot)
    }

    /// Scroll a window's content. Buffered mode scrolls the buffer and
    /// restores it to the surface; there is no partial-damage path.
    fn scroll_win(&mut self, slot: usize, dx: i32, dy: i32) -> TermResult<()> {
        let (client, blank, buffered, cur_upd) = {
            let win = self.win(slot);
            (win.client, win.blank(), win.buffered, win.cur_upd)
        };
        if !buffered {
            return Ok(());
        }
        {
            let win = self.win_mut(slot);
            let page = win.upd_page_mut();
            if dx.abs() >= client.x || dy.abs() >= client.y {
                let full = page.size();
                page.resize(full); // full blank
            } else {
                page.shift_content(client, dx, dy, blank);
            }
        }
        let in_display = {
            let win = self.win(slot);
            win.cur_upd == cur_upd && win.in_display() && win.visible
        };
        if in_display {
            self.restore_window(slot)?;
        }
        Ok(())
    }

    /// Clear a window's update page and home its cursor.
    fn clear_win(&mut self, slot: usize) -> TermResult<()> {
        {
            let win = self.win_mut(slot);
            win.cursor = TermPos::HOME;
            let page = win.upd_page_mut();
            let full = page.size();
            page.resize(full);
        }
        let refresh = {
            let win = self.win(slot);
            win.in_display() && win.visible
        };
        if refresh {
            self.restore_window(slot)?;
        }
        self.setcur_win(slot)
    }

    /// Place one byte into a window, with the elementary control codes.
    fn plcchr_win(&mut self, slot: usize, c: u8) -> TermResult<()> {
        if !self.win(slot).visible {
            self.make_visible(slot)?;
        }
        match c {
            b'\r' => {
                self.win_mut(slot).cursor.x = 1;
                self.setcur_win(slot)
            }
            b'\n' => {
                self.win_mut(slot).cursor.x = 1;
                self.idown_win(slot)
            }
            0x08 => self.ileft_win(slot),
            0x0c => self.clear_win(slot),
            b'\t' => {
                let (x, stop) = {
                    let w = self.win(slot);
                    (w.cursor.x, w.next_tab_after(w.cursor.x))
                };
                if let Some(stop) = stop {
                    let mut cur = x;
                    while cur < stop {
                        self.iright_win(slot)?;
                        cur += 1;
                    }
                }
                Ok(())
            }
            c if c >= 0x20 && c != 0x7f => {
                let (in_bounds, buffered, cursor, cell, in_display, visible, root_pos) = {
                    let win = self.win(slot);
                    (
                        win.cursor_in_bounds(),
                        win.buffered,
                        win.cursor,
                        WinCell {
                            ch: c as char,
                            fg: win.fg,
                            bg: win.bg,
                            attrs: win.attrs,
                        },
                        win.in_display(),
                        win.visible,
                        win.to_root(win.cursor),
                    )
                };
                if in_bounds {
                    if buffered {
                        let win = self.win_mut(slot);
                        if win.upd_page_mut().in_buffer(cursor) {
                            *win.upd_page_mut().cell_mut(cursor) = cell;
                        }
                    }
                    if in_display && visible {
                        self.root_attrs(cell.attrs)?;
                        self.root_fg(cell.fg)?;
                        self.root_bg(cell.bg)?;
                        self.root_cursor(root_pos)?;
                        self.root_putc(cell.ch)?;
                    }
                }
                self.iright_win(slot)
            }
            _ => Ok(()),
        }
    }

    /// Close a window (and, recursively, its children). The slot is
    /// recycled; remaining windows repaint back to front.
    fn close_window(&mut self, slot: usize) -> TermResult<()> {
        if self.win(slot).id == ROOT_WINDOW_ID {
            return Err(TermError::BadWindow {
                reason: "cannot close the root window",
            });
        }
        let children = self.win(slot).children.clone();
        for child in children {
            self.close_window(child)?;
        }
        let win = self.slots[slot].take().expect("live window");
        self.by_stream.remove(&win.stream);
        self.by_id.remove(&win.id);
        self.master.retain(|&s| s != slot);
        if let Some(p) = win.parent {
            if let Some(parent) = self.slots.get_mut(p).and_then(|w| w.as_mut()) {
                parent.children.retain(|&s| s != slot);
            }
        }
        self.free_slots.push(slot);
        tracing::debug!(id = win.id, slot, "window closed");

        // repaint what remains, back to front
        let mut order = self.master.clone();
        order.sort_by_key(|&s| self.win(s).zorder);
        for s in order {
            if self.win(s).visible {
                self.restore_window(s)?;
            }
        }
        Ok(())
    }

    // -- event translation ---------------------------------------------------

    /// Translate root events into window events per the focus/hit-test
    /// policy. Undeliverable events are dropped and the fetch continues.
    fn ievent(&mut self) -> TermResult<EventRecord> {
        loop {
            if let Some(rec) = self.injected.pop_front() {
                return Ok(rec);
            }
            let rec = self.prev_ops.clone().borrow_mut().event(Stream::STDIN)?;
            match rec.event {
                TermEvent::MouseAssert { mouse, button } => {
                    let Some(slot) = self.find_top_at(self.mouse) else {
                        // click on unoccupied area: focus becomes none
                        self.remove_all_focus();
                        continue;
                    };
                    if self.win(slot).focus {
                        return Ok(EventRecord::for_window(
                            self.win(slot).id,
                            TermEvent::MouseAssert { mouse, button },
                        ));
                    }
                    // first click with no focus gives focus, next click
                    // gives the event; only button 1 transfers
                    if button == 1 {
                        self.remove_all_focus();
                        self.win_mut(slot).focus = true;
                        self.restore_window(slot)?;
                    }
                }
                TermEvent::MouseDeassert { mouse, button } => {
                    if let Some(slot) = self.find_focus() {
                        return Ok(EventRecord::for_window(
                            self.win(slot).id,
                            TermEvent::MouseDeassert { mouse, button },
                        ));
                    }
                }
                TermEvent::MouseMove { mouse, pos } => {
                    self.mouse = pos;
                    let Some(slot) = self.find_top_at(pos) else {
                        continue;
                    };
                    let win = self.win(slot);
                    if win.focus && win.client_contains(pos) {
                        let client_pos = win.to_client(pos);
                        return Ok(EventRecord::for_window(
                            win.id,
                            TermEvent::MouseMove {
                                mouse,
                                pos: client_pos,
                            },
                        ));
                    }
                }
                TermEvent::Timer(_)
                | TermEvent::Frame
                | TermEvent::Resize(_)
                | TermEvent::Terminate
                | TermEvent::Menu(_)
                | TermEvent::JoyAssert { .. }
                | TermEvent::JoyDeassert { .. }
                | TermEvent::JoyMove { .. } => {
                    return Ok(EventRecord::for_window(self.focus_window_id(), rec.event));
                }
                // everything else came off the keyboard: route to focus,
                // drop when no window holds it
                _ => {
                    if let Some(slot) = self.find_focus() {
                        return Ok(EventRecord::for_window(self.win(slot).id, rec.event));
                    }
                }
            }
        }
    }
}

fn default_tabs() -> Vec<bool> {
    (1..=crate::MAX_DIM_X)
        .map(|col| (col - 1) % 8 == 0 && col != 1)
        .collect()
}

impl TermOps for WindowManager {
    fn cursor(&mut self, s: Stream, x: i32, y: i32) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.win_mut(slot).cursor = TermPos::new(x, y);
        self.setcur_win(slot)
    }

    fn maxx(&mut self, s: Stream) -> i32 {
        self.slot_of(s).map_or(0, |slot| self.win(slot).client.x)
    }

    fn maxy(&mut self, s: Stream) -> i32 {
        self.slot_of(s).map_or(0, |slot| self.win(slot).client.y)
    }

    fn home(&mut self, s: Stream) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.win_mut(slot).cursor = TermPos::HOME;
        self.setcur_win(slot)
    }

    fn del(&mut self, s: Stream) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.ileft_win(slot)?;
        self.plcchr_win(slot, b' ')?;
        self.ileft_win(slot)
    }

    fn up(&mut self, s: Stream) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.iup_win(slot)
    }

    fn down(&mut self, s: Stream) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.idown_win(slot)
    }

    fn left(&mut self, s: Stream) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.ileft_win(slot)
    }

    fn right(&mut self, s: Stream) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.iright_win(slot)
    }

    fn blink(&mut self, s: Stream, e: bool) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.win_mut(slot).attrs.set(AttrSet::BLINK, e);
        Ok(())
    }

    fn reverse(&mut self, s: Stream, e: bool) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.win_mut(slot).attrs.set(AttrSet::REVERSE, e);
        Ok(())
    }

    fn underline(&mut self, s: Stream, e: bool) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.win_mut(slot).attrs.set(AttrSet::UNDERLINE, e);
        Ok(())
    }

    fn superscript(&mut self, s: Stream, e: bool) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.win_mut(slot).attrs.set(AttrSet::SUPERSCRIPT, e);
        Ok(())
    }

    fn subscript(&mut self, s: Stream, e: bool) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.win_mut(slot).attrs.set(AttrSet::SUBSCRIPT, e);
        Ok(())
    }

    fn italic(&mut self, s: Stream, e: bool) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.win_mut(slot).attrs.set(AttrSet::ITALIC, e);
        Ok(())
    }

    fn bold(&mut self, s: Stream, e: bool) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.win_mut(slot).attrs.set(AttrSet::BOLD, e);
        Ok(())
    }

    fn strikeout(&mut self, s: Stream, e: bool) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.win_mut(slot).attrs.set(AttrSet::STRIKEOUT, e);
        Ok(())
    }

    fn standout(&mut self, s: Stream, e: bool) -> TermResult<()> {
        // standout is implemented as reverse video
        self.reverse(s, e)
    }

    fn fcolor(&mut self, s: Stream, c: TermColor) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.win_mut(slot).fg = c;
        Ok(())
    }

    fn bcolor(&mut self, s: Stream, c: TermColor) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.win_mut(slot).bg = c;
        Ok(())
    }

    fn auto_mode(&mut self, s: Stream, e: bool) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.win_mut(slot).auto_mode = e;
        Ok(())
    }

    fn curvis(&mut self, s: Stream, e: bool) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.win_mut(slot).cursor_visible = e;
        self.setcur_win(slot)
    }

    fn scroll(&mut self, s: Stream, dx: i32, dy: i32) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.scroll_win(slot, dx, dy)
    }

    fn curx(&mut self, s: Stream) -> i32 {
        self.slot_of(s).map_or(0, |slot| self.win(slot).cursor.x)
    }

    fn cury(&mut self, s: Stream) -> i32 {
        self.slot_of(s).map_or(0, |slot| self.win(slot).cursor.y)
    }

    fn curbnd(&mut self, s: Stream) -> bool {
        self.slot_of(s).is_ok_and(|slot| self.win(slot).cursor_in_bounds())
    }

    fn select(&mut self, s: Stream, u: i32, d: i32) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        let max = i32::try_from(MAX_PAGES).unwrap_or(10);
        if !(1..=max).contains(&u) {
            return Err(TermError::BadPage { page: u, max });
        }
        if !(1..=max).contains(&d) {
            return Err(TermError::BadPage { page: d, max });
        }
        {
            let win = self.win_mut(slot);
            win.cur_upd = usize::try_from(u).expect("validated");
            win.upd_page_mut();
            win.cur_dsp = usize::try_from(d).expect("validated");
            let client = win.client;
            win.pages[win.cur_dsp - 1].get_or_insert_with(|| Box::new(WinPage::new(client)));
        }
        if self.win(slot).visible {
            self.restore_window(slot)?;
        }
        Ok(())
    }

    fn event(&mut self, _s: Stream) -> TermResult<EventRecord> { self.ievent() }

    fn timer(&mut self, s: Stream, id: i32, period_100us: i64, repeat: bool) -> TermResult<()> {
        self.prev_ops.clone().borrow_mut().timer(s, id, period_100us, repeat)
    }

    fn killtimer(&mut self, s: Stream, id: i32) -> TermResult<()> {
        self.prev_ops.clone().borrow_mut().killtimer(s, id)
    }

    fn mouse(&mut self, s: Stream) -> i32 { self.prev_ops.clone().borrow_mut().mouse(s) }

    fn mousebutton(&mut self, s: Stream, m: i32) -> i32 {
        self.prev_ops.clone().borrow_mut().mousebutton(s, m)
    }

    fn joystick(&mut self, s: Stream) -> i32 { self.prev_ops.clone().borrow_mut().joystick(s) }

    fn joybutton(&mut self, s: Stream, j: i32) -> TermResult<i32> {
        self.prev_ops.clone().borrow_mut().joybutton(s, j)
    }

    fn joyaxis(&mut self, s: Stream, j: i32) -> TermResult<i32> {
        self.prev_ops.clone().borrow_mut().joyaxis(s, j)
    }

    fn settab(&mut self, s: Stream, t: i32) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        let win = self.win_mut(slot);
        if t < 1 || t > win.client.x {
            return Err(TermError::BadPosition { x: t, y: 1 });
        }
        win.tabs[(t - 1) as usize] = true;
        Ok(())
    }

    fn restab(&mut self, s: Stream, t: i32) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        let win = self.win_mut(slot);
        if t < 1 || t > win.client.x {
            return Err(TermError::BadPosition { x: t, y: 1 });
        }
        win.tabs[(t - 1) as usize] = false;
        Ok(())
    }

    fn clrtab(&mut self, s: Stream) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.win_mut(slot).tabs.fill(false);
        Ok(())
    }

    fn funkey(&mut self, s: Stream) -> i32 { self.prev_ops.clone().borrow_mut().funkey(s) }

    fn frametimer(&mut self, s: Stream, e: bool) -> TermResult<()> {
        self.prev_ops.clone().borrow_mut().frametimer(s, e)
    }

    fn autohold(&mut self, s: Stream, e: bool) {
        self.prev_ops.clone().borrow_mut().autohold(s, e);
    }

    fn wrtstr(&mut self, s: Stream, text: &str) -> TermResult<()> {
        self.prev_ops.clone().borrow_mut().wrtstr(s, text)
    }

    fn write_text(&mut self, s: Stream, text: &str) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        for &b in text.as_bytes() {
            self.plcchr_win(slot, b)?;
        }
        Ok(())
    }

    // -- window extensions ----------------------------------------------------

    fn openwin(&mut self, parent: Option<Stream>, wid: i32) -> TermResult<Stream> {
        if wid == 0 {
            return Err(TermError::BadWindow {
                reason: "window id may not be zero",
            });
        }
        if self.by_id.contains_key(&wid) {
            return Err(TermError::BadWindow {
                reason: "window id already in use",
            });
        }
        let parent_slot = match parent {
            Some(p) => Some(self.slot_of(p)?),
            None => None,
        };
        let stream = Stream(self.next_stream_no);
        self.next_stream_no += 1;
        let win = self.new_window(wid, stream, parent_slot, false);
        self.insert_window(win)?;
        Ok(stream)
    }

    fn closewin(&mut self, s: Stream) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.close_window(slot)
    }

    fn title(&mut self, s: Stream, t: &str) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.win_mut(slot).title = Some(t.to_string());
        let redraw = {
            let win = self.win(slot);
            win.visible && win.framed && win.sys_bar
        };
        if redraw {
            self.draw_frame(slot)?;
        }
        Ok(())
    }

    fn buffer_mode(&mut self, s: Stream, e: bool) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.win_mut(slot).buffered = e;
        Ok(())
    }

    fn sizbuf(&mut self, s: Stream, x: i32, y: i32) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        if x < 1 || y < 1 {
            return Err(TermError::BadPosition { x, y });
        }
        let size = TermSize::new(x, y);
        let win = self.win_mut(slot);
        for page in win.pages.iter_mut().flatten() {
            page.resize(size);
        }
        if win.pages[win.cur_upd - 1].is_none() {
            win.pages[win.cur_upd - 1] = Some(Box::new(WinPage::new(size)));
        }
        Ok(())
    }

    fn getsiz(&mut self, s: Stream) -> TermResult<TermSize> {
        let slot = self.slot_of(s)?;
        Ok(self.win(slot).extent)
    }

    fn setsiz(&mut self, s: Stream, x: i32, y: i32) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        if x < 1 || y < 1 {
            return Err(TermError::BadPosition { x, y });
        }
        {
            let win = self.win_mut(slot);
            win.extent = TermSize::new(x, y);
            win.recompute_geometry();
        }
        if self.win(slot).visible {
            self.restore_window(slot)?;
        }
        Ok(())
    }

    fn setpos(&mut self, s: Stream, x: i32, y: i32) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.win_mut(slot).org = TermPos::new(x, y);
        if self.win(slot).visible {
            self.restore_window(slot)?;
        }
        Ok(())
    }

    fn scnsiz(&mut self, s: Stream) -> TermResult<TermSize> {
        let _unused = self.slot_of(s)?;
        Ok(self.root_size)
    }

    fn scncen(&mut self, s: Stream) -> TermResult<TermPos> {
        let _unused = self.slot_of(s)?;
        Ok(TermPos::new(self.root_size.x / 2, self.root_size.y / 2))
    }

    fn winclient(
        &mut self,
        s: Stream,
        cx: i32,
        cy: i32,
        ms: crate::WinModSet,
    ) -> TermResult<TermSize> {
        let _unused = self.slot_of(s)?;
        let framed = ms.contains(crate::WinModSet::FRAME);
        let sized = ms.contains(crate::WinModSet::SIZE);
        let sys = ms.contains(crate::WinModSet::SYSBAR);
        let edge = 2 * i32::from(framed && sized);
        Ok(TermSize::new(cx + edge, cy + edge + 2 * i32::from(sys)))
    }

    fn front(&mut self, s: Stream) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.ztop += 1;
        self.win_mut(slot).zorder = self.ztop;
        if self.win(slot).visible {
            self.restore_window(slot)?;
        }
        Ok(())
    }

    fn back(&mut self, s: Stream) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        let min_z = self
            .master
            .iter()
            .map(|&sl| self.win(sl).zorder)
            .min()
            .unwrap_or(0);
        self.win_mut(slot).zorder = min_z - 1;
        Ok(())
    }

    fn frame(&mut self, s: Stream, e: bool) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        {
            let win = self.win_mut(slot);
            win.framed = e;
            win.recompute_geometry();
        }
        if self.win(slot).visible {
            self.restore_window(slot)?;
        }
        Ok(())
    }

    fn sizable(&mut self, s: Stream, e: bool) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        {
            let win = self.win_mut(slot);
            win.size_bars = e;
            win.recompute_geometry();
        }
        if self.win(slot).visible {
            self.restore_window(slot)?;
        }
        Ok(())
    }

    fn sysbar(&mut self, s: Stream, e: bool) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        {
            let win = self.win_mut(slot);
            win.sys_bar = e;
            win.recompute_geometry();
        }
        if self.win(slot).visible {
            self.restore_window(slot)?;
        }
        Ok(())
    }

    fn menu(&mut self, s: Stream, m: Option<&[MenuItem]>) -> TermResult<()> {
        fn register(state: &mut crate::MenuState, items: &[MenuItem]) {
            for item in items {
                state.enabled.insert(item.id, true);
                state.selected.insert(item.id, false);
                register(state, &item.branch);
            }
        }
        let slot = self.slot_of(s)?;
        let mut state = crate::MenuState::default();
        if let Some(items) = m {
            state.items = items.to_vec();
            register(&mut state, items);
        }
        self.win_mut(slot).menu = state;
        Ok(())
    }

    fn menuena(&mut self, s: Stream, id: i32, on: bool) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        let win = self.win_mut(slot);
        match win.menu.enabled.get_mut(&id) {
            Some(e) => {
                *e = on;
                Ok(())
            }
            None => Err(TermError::BadHandle {
                what: "menu item",
                id: i64::from(id),
            }),
        }
    }

    fn menusel(&mut self, s: Stream, id: i32, on: bool) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        let win = self.win_mut(slot);
        match win.menu.selected.get_mut(&id) {
            Some(e) => {
                *e = on;
                Ok(())
            }
            None => Err(TermError::BadHandle {
                what: "menu item",
                id: i64::from(id),
            }),
        }
    }

    fn getwinid(&mut self) -> TermResult<i32> {
        let id = self.next_anon_id;
        self.next_anon_id -= 1;
        Ok(id)
    }

    fn focus(&mut self, s: Stream) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        self.remove_all_focus();
        self.win_mut(slot).focus = true;
        if self.win(slot).visible {
            self.restore_window(slot)?;
        }
        Ok(())
    }

    fn sendevent(&mut self, s: Stream, mut ev: EventRecord) -> TermResult<()> {
        let slot = self.slot_of(s)?;
        ev.window = self.win(slot).id;
        self.injected.push_back(ev);
        Ok(())
    }
}

impl TtyIo for WindowManager {
    fn read(&mut self, fd: RawFd, buf: &mut [u8]) -> TermResult<usize> {
        self.prev_io.clone().borrow_mut().read(fd, buf)
    }

    /// Writes to the terminal output land in the root window; other fds
    /// pass down the chain.
    fn write(&mut self, fd: RawFd, buf: &[u8]) -> TermResult<usize> {
        if fd != OUT_FIL {
            return self.prev_io.clone().borrow_mut().write(fd, buf);
        }
        let slot = self.slot_of(Stream::STDOUT)?;
        for &b in buf {
            self.plcchr_win(slot, b)?;
        }
        Ok(buf.len())
    }

    fn open(&mut self, path: &str, flags: OpenFlags) -> TermResult<RawFd> {
        self.prev_io.clone().borrow_mut().open(path, flags)
    }

    fn close(&mut self, fd: RawFd) -> TermResult<()> {
        self.prev_io.clone().borrow_mut().close(fd)
    }

    fn lseek(&mut self, fd: RawFd, offset: i64, whence: SeekWhence) -> TermResult<i64> {
        self.prev_io.clone().borrow_mut().lseek(fd, offset, whence)
    }
}
