// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The window record and its page buffers.
//!
//! Window cells carry an attribute *set* (unlike the root engine's
//! single-attribute cells), because a window's pen can have several
//! attributes armed at once. Each window owns up to ten pages, created
//! lazily on first select, sized independently of the client area via
//! `sizbuf`.

use crate::{AttrSet, MenuItem, Stream, TermColor, TermPos, TermSize};
use std::collections::HashMap;

/// Single character in a window page.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WinCell {
    pub ch: char,
    pub fg: TermColor,
    pub bg: TermColor,
    pub attrs: AttrSet,
}

impl Default for WinCell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: TermColor::Black,
            bg: TermColor::White,
            attrs: AttrSet::empty(),
        }
    }
}

/// One back buffer of a window.
#[derive(Clone, Debug)]
pub struct WinPage {
    size: TermSize,
    grid: Vec<WinCell>,
}

impl WinPage {
    #[must_use]
    pub fn new(size: TermSize) -> Self {
        Self {
            size,
            grid: vec![WinCell::default(); (size.x * size.y) as usize],
        }
    }

    #[must_use]
    pub fn size(&self) -> TermSize { self.size }

    /// True when the (1-based) position fits in this buffer.
    #[must_use]
    pub fn in_buffer(&self, pos: TermPos) -> bool { self.size.contains(pos) }

    #[must_use]
    pub fn cell(&self, pos: TermPos) -> &WinCell {
        &self.grid[((pos.y - 1) * self.size.x + (pos.x - 1)) as usize]
    }

    pub fn cell_mut(&mut self, pos: TermPos) -> &mut WinCell {
        &mut self.grid[((pos.y - 1) * self.size.x + (pos.x - 1)) as usize]
    }

    /// Reallocate to a new size; content is discarded.
    pub fn resize(&mut self, size: TermSize) {
        self.size = size;
        self.grid = vec![WinCell::default(); (size.x * size.y) as usize];
    }

    /// Move content by (dx, dy) within `region`, blanking vacated cells
    /// with the given pen.
    pub fn shift_content(&mut self, region: TermSize, dx: i32, dy: i32, blank: WinCell) {
        let w = region.x.min(self.size.x);
        let h = region.y.min(self.size.y);

        if dy > 0 {
            for y in 1..=h {
                for x in 1..=w {
                    *self.cell_mut(TermPos::new(x, y)) = if y + dy <= h {
                        *self.cell(TermPos::new(x, y + dy))
                    } else {
                        blank
                    };
                }
            }
        } else if dy < 0 {
            for y in (1..=h).rev() {
                for x in 1..=w {
                    *self.cell_mut(TermPos::new(x, y)) = if y + dy >= 1 {
                        *self.cell(TermPos::new(x, y + dy))
                    } else {
                        blank
                    };
                }
            }
        }

        if dx > 0 {
            for y in 1..=h {
                for x in 1..=w {
                    *self.cell_mut(TermPos::new(x, y)) = if x + dx <= w {
                        *self.cell(TermPos::new(x + dx, y))
                    } else {
                        blank
                    };
                }
            }
        } else if dx < 0 {
            for y in 1..=h {
                for x in (1..=w).rev() {
                    *self.cell_mut(TermPos::new(x, y)) = if x + dx >= 1 {
                        *self.cell(TermPos::new(x + dx, y))
                    } else {
                        blank
                    };
                }
            }
        }
    }
}

/// Menu bookkeeping: the tree as given, plus per-item enable/select state.
#[derive(Clone, Debug, Default)]
pub struct MenuState {
    pub items: Vec<MenuItem>,
    pub enabled: HashMap<i32, bool>,
    pub selected: HashMap<i32, bool>,
}

/// A window on the character surface.
#[derive(Clone, Debug)]
pub struct Window {
    /// Caller-assigned id (positive) or allocated anonymous id (negative).
    pub id: i32,
    /// The stream handle bound to this window.
    pub stream: Stream,
    /// Parent slot, `None` for roots.
    pub parent: Option<usize>,
    /// Child slots.
    pub children: Vec<usize>,
    /// Page buffers, created lazily on first select.
    pub pages: Vec<Option<Box<WinPage>>>,
    /// Current update page, 1-based.
    pub cur_upd: usize,
    /// Current display page, 1-based.
    pub cur_dsp: usize,
    /// Window origin in the root surface.
    pub org: TermPos,
    /// Client-area offset from the origin (frame/title allowance).
    pub coff: TermPos,
    /// Client size.
    pub client: TermSize,
    /// Parent-relative extent size.
    pub extent: TermSize,
    /// Cursor in client coordinates.
    pub cursor: TermPos,
    /// Armed write attributes.
    pub attrs: AttrSet,
    pub fg: TermColor,
    pub bg: TermColor,
    pub cursor_visible: bool,
    pub auto_mode: bool,
    /// Buffered screen mode.
    pub buffered: bool,
    /// Tab stops by client column.
    pub tabs: Vec<bool>,
    pub framed: bool,
    pub size_bars: bool,
    pub sys_bar: bool,
    pub title: Option<String>,
    pub visible: bool,
    pub focus: bool,
    /// Z ordering; higher is frontmost.
    pub zorder: i64,
    pub menu: MenuState,
}

impl Window {
    /// Client offset for the given dressing flags: one column/row when a
    /// sized frame is present, plus two rows for the system bar and its
    /// underline.
    #[must_use]
    pub fn client_offset(framed: bool, size_bars: bool, sys_bar: bool) -> TermPos {
        let edge = i32::from(framed && size_bars);
        TermPos {
            x: edge,
            y: edge + 2 * i32::from(sys_bar),
        }
    }

    /// Client size inside an extent with the given dressing flags.
    #[must_use]
    pub fn client_size(extent: TermSize, framed: bool, size_bars: bool, sys_bar: bool) -> TermSize {
        let edge = 2 * i32::from(framed && size_bars);
        TermSize {
            x: (extent.x - edge).max(1),
            y: (extent.y - edge - 2 * i32::from(sys_bar)).max(1),
        }
    }

    /// Recompute `coff` and `client` after a dressing or extent change.
    pub fn recompute_geometry(&mut self) {
        self.coff = Self::client_offset(self.framed, self.size_bars, self.sys_bar);
        self.client = Self::client_size(self.extent, self.framed, self.size_bars, self.sys_bar);
    }

    /// True when the root-surface position lies inside the window extent.
    #[must_use]
    pub fn extent_contains(&self, pos: TermPos) -> bool {
        self.org.x <= pos.x
            && pos.x <= self.org.x + self.extent.x - 1
            && self.org.y <= pos.y
            && pos.y <= self.org.y + self.extent.y - 1
    }

    /// True when the root-surface position lies inside the client area.
    #[must_use]
    pub fn client_contains(&self, pos: TermPos) -> bool {
        let cx = self.org.x + self.coff.x;
        let cy = self.org.y + self.coff.y;
        cx <= pos.x
            && pos.x <= cx + self.client.x - 1
            && cy <= pos.y
            && pos.y <= cy + self.client.y - 1
    }

    /// Translate a root position to 1-based client coordinates.
    #[must_use]
    pub fn to_client(&self, pos: TermPos) -> TermPos {
        TermPos {
            x: pos.x - (self.org.x + self.coff.x) + 1,
            y: pos.y - (self.org.y + self.coff.y) + 1,
        }
    }

    /// Translate 1-based client coordinates to a root position.
    #[must_use]
    pub fn to_root(&self, pos: TermPos) -> TermPos {
        TermPos {
            x: self.org.x + self.coff.x + pos.x - 1,
            y: self.org.y + self.coff.y + pos.y - 1,
        }
    }

    /// Cursor within the client area?
    #[must_use]
    pub fn cursor_in_bounds(&self) -> bool {
        self.cursor.x >= 1
            && self.cursor.x <= self.client.x
            && self.cursor.y >= 1
            && self.cursor.y <= self.client.y
    }

    /// The current update page, allocating it on first use at client size.
    pub fn upd_page_mut(&mut self) -> &mut WinPage {
        let client = self.client;
        self.pages[self.cur_upd - 1]
            .get_or_insert_with(|| Box::new(WinPage::new(client)))
    }

    /// The current display page, if allocated.
    #[must_use]
    pub fn dsp_page(&self) -> Option<&WinPage> {
        self.pages[self.cur_dsp - 1].as_deref()
    }

    /// Update and display page coincide?
    #[must_use]
    pub fn in_display(&self) -> bool { self.cur_upd == self.cur_dsp }

    /// The blank cell for the current pen.
    #[must_use]
    pub fn blank(&self) -> WinCell {
        WinCell {
            ch: ' ',
            fg: self.fg,
            bg: self.bg,
            attrs: self.attrs,
        }
    }

    /// Next set tab column strictly right of `x`, inside the client.
    #[must_use]
    pub fn next_tab_after(&self, x: i32) -> Option<i32> {
        let mut i = x + 1;
        while i <= self.client.x {
            if self
                .tabs
                .get((i - 1) as usize)
                .copied()
                .unwrap_or(false)
            {
                return Some(i);
            }
            i += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_PAGES;
    use pretty_assertions::assert_eq;

    #[test]
    fn client_geometry_accounts_for_dressing() {
        // full dressing: 1-cell border each side, 2 rows for sysbar+underbar
        assert_eq!(
            Window::client_offset(true, true, true),
            TermPos::new(1, 3)
        );
        assert_eq!(
            Window::client_size(TermSize::new(40, 20), true, true, true),
            TermSize::new(38, 16)
        );
        // frameless root
        assert_eq!(
            Window::client_offset(false, false, false),
            TermPos::new(0, 0)
        );
        assert_eq!(
            Window::client_size(TermSize::new(80, 24), false, false, false),
            TermSize::new(80, 24)
        );
    }

    #[test]
    fn coordinate_translation_round_trips() {
        let mut win = window_fixture();
        win.org = TermPos::new(5, 3);
        win.recompute_geometry();
        let root = win.to_root(TermPos::new(1, 1));
        assert_eq!(root, TermPos::new(6, 6));
        assert_eq!(win.to_client(root), TermPos::new(1, 1));
        assert!(win.client_contains(root));
        assert!(win.extent_contains(TermPos::new(5, 3)));
        assert!(!win.extent_contains(TermPos::new(4, 3)));
    }

    fn window_fixture() -> Window {
        Window {
            id: 2,
            stream: Stream(100),
            parent: None,
            children: vec![],
            pages: (0..MAX_PAGES).map(|_| None).collect(),
            cur_upd: 1,
            cur_dsp: 1,
            org: TermPos::HOME,
            coff: TermPos::new(0, 0),
            client: TermSize::new(10, 5),
            extent: TermSize::new(12, 10),
            cursor: TermPos::HOME,
            attrs: AttrSet::empty(),
            fg: TermColor::Black,
            bg: TermColor::White,
            cursor_visible: true,
            auto_mode: true,
            buffered: true,
            tabs: vec![false; 250],
            framed: true,
            size_bars: true,
            sys_bar: true,
            title: None,
            visible: false,
            focus: false,
            zorder: 1,
            menu: MenuState::default(),
        }
    }
}
