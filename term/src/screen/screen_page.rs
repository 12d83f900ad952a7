// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! One screen page: a cell matrix plus its write state.
//!
//! The matrix is allocated at the 250x250 ceiling so a terminal resize
//! never reallocates; the live region is whatever the engine's current
//! dimensions say. The page also carries everything that makes up "the pen":
//! cursor, write colors, write attribute, auto flag, cursor visibility, and
//! the tab-stop set.

use crate::{CellAttr, MAX_DIM_X, MAX_DIM_Y, ScreenCell, TermColor, TermPos, TermSize};

/// Number of screen pages selectable per surface.
pub const MAX_PAGES: usize = 10;

/// A page buffer with its write state.
#[derive(Clone, Debug)]
pub struct ScreenPage {
    /// Row-major cell matrix at ceiling capacity.
    grid: Vec<ScreenCell>,
    /// Current cursor, 1-based; may lie outside the surface (auto off).
    pub cursor: TermPos,
    /// Current write foreground.
    pub fg: TermColor,
    /// Current write background.
    pub bg: TermColor,
    /// Current write attribute.
    pub attr: CellAttr,
    /// Combined auto-wrap/auto-scroll policy.
    pub auto_mode: bool,
    /// User-requested cursor visibility.
    pub cursor_visible: bool,
    /// Tab stops by column (1-based).
    tabs: Vec<bool>,
}

impl ScreenPage {
    /// A fresh page: cursor home, black on white, no attribute, auto on,
    /// cursor visible, default tab stops every 8th column from 9, buffer
    /// cleared to spaces in that state.
    #[must_use]
    pub fn new() -> Self {
        let mut page = Self {
            grid: vec![ScreenCell::default(); (MAX_DIM_X * MAX_DIM_Y) as usize],
            cursor: TermPos::HOME,
            fg: TermColor::Black,
            bg: TermColor::White,
            attr: CellAttr::None,
            auto_mode: true,
            cursor_visible: true,
            tabs: vec![false; MAX_DIM_X as usize],
        };
        page.default_tabs();
        page.clear_buffer();
        page
    }

    /// Reset tab stops to columns 9, 17, 25, ...
    pub fn default_tabs(&mut self) {
        for (i, tab) in self.tabs.iter_mut().enumerate() {
            let col = i + 1;
            *tab = (col - 1) % 8 == 0 && col != 1;
        }
    }

    #[must_use]
    pub fn cell(&self, pos: TermPos) -> &ScreenCell {
        &self.grid[Self::index_of(pos)]
    }

    pub fn cell_mut(&mut self, pos: TermPos) -> &mut ScreenCell {
        &mut self.grid[Self::index_of(pos)]
    }

    /// True when the position can be stored in the matrix (inside ceiling
    /// capacity, not necessarily inside the live surface).
    #[must_use]
    pub fn in_buffer(pos: TermPos) -> bool {
        pos.x >= 1 && pos.x <= MAX_DIM_X && pos.y >= 1 && pos.y <= MAX_DIM_Y
    }

    fn index_of(pos: TermPos) -> usize {
        ((pos.y - 1) * MAX_DIM_X + (pos.x - 1)) as usize
    }

    /// Clear the whole buffer to spaces in the current write state.
    pub fn clear_buffer(&mut self) {
        let blank = ScreenCell::blank(self.fg, self.bg, self.attr);
        self.grid.fill(blank);
    }

    /// Copy of the cell matrix, for diff repaints.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ScreenCell> { self.grid.clone() }

    /// Cell from a snapshot taken with [`Self::snapshot`].
    #[must_use]
    pub fn snapshot_cell(snap: &[ScreenCell], pos: TermPos) -> &ScreenCell {
        &snap[Self::index_of(pos)]
    }

    // -- tabs ---------------------------------------------------------------

    /// Set a tab stop at column `t` (validated by the engine).
    pub fn set_tab(&mut self, t: i32) { self.tabs[(t - 1) as usize] = true; }

    /// Clear the tab stop at column `t`.
    pub fn reset_tab(&mut self, t: i32) { self.tabs[(t - 1) as usize] = false; }

    /// Clear all tab stops.
    pub fn clear_tabs(&mut self) { self.tabs.fill(false); }

    /// The next set tab column strictly right of `x`, within `width`.
    #[must_use]
    pub fn next_tab_after(&self, x: i32, width: i32) -> Option<i32> {
        let mut i = x + 1;
        while i <= width {
            if self.tabs[(i - 1) as usize] {
                return Some(i);
            }
            i += 1;
        }
        None
    }

    // -- content scrolling --------------------------------------------------

    /// Move the live region's content by (dx, dy) and fill the vacated
    /// cells with blanks in the current write state. Positive dy moves
    /// content up (screen scrolls down); positive dx moves content left.
    pub fn shift_content(&mut self, size: TermSize, dx: i32, dy: i32) {
        let blank = ScreenCell::blank(self.fg, self.bg, self.attr);

        if dy > 0 {
            // move lines up
            for y in 1..=size.y {
                if y + dy <= size.y {
                    for x in 1..=size.x {
                        *self.cell_mut(TermPos::new(x, y)) =
                            *self.cell(TermPos::new(x, y + dy));
                    }
                }
            }
            for y in (size.y - dy + 1).max(1)..=size.y {
                for x in 1..=size.x {
                    *self.cell_mut(TermPos::new(x, y)) = blank;
                }
            }
        } else if dy < 0 {
            // move lines down
            for y in (1..=size.y).rev() {
                if y + dy >= 1 {
                    for x in 1..=size.x {
                        *self.cell_mut(TermPos::new(x, y)) =
                            *self.cell(TermPos::new(x, y + dy));
                    }
                }
            }
            for y in 1..=(-dy).min(size.y) {
                for x in 1..=size.x {
                    *self.cell_mut(TermPos::new(x, y)) = blank;
                }
            }
        }

        if dx > 0 {
            // move characters left
            for y in 1..=size.y {
                for x in 1..=size.x {
                    if x + dx <= size.x {
                        *self.cell_mut(TermPos::new(x, y)) =
                            *self.cell(TermPos::new(x + dx, y));
                    }
                }
                for x in (size.x - dx + 1).max(1)..=size.x {
                    *self.cell_mut(TermPos::new(x, y)) = blank;
                }
            }
        } else if dx < 0 {
            // move characters right
            for y in 1..=size.y {
                for x in (1..=size.x).rev() {
                    if x + dx >= 1 {
                        *self.cell_mut(TermPos::new(x, y)) =
                            *self.cell(TermPos::new(x + dx, y));
                    }
                }
                for x in 1..=(-dx).min(size.x) {
                    *self.cell_mut(TermPos::new(x, y)) = blank;
                }
            }
        }
    }
}

impl Default for ScreenPage {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_tabs_every_eighth_from_nine() {
        let page = ScreenPage::new();
        assert_eq!(page.next_tab_after(1, 80), Some(9));
        assert_eq!(page.next_tab_after(9, 80), Some(17));
        assert_eq!(page.next_tab_after(12, 80), Some(17));
        assert_eq!(page.next_tab_after(78, 80), None);
        // column 1 is never a default stop
        assert_eq!(page.next_tab_after(0, 80), Some(9));
    }

    #[test]
    fn shift_up_discards_top_and_blanks_bottom() {
        let size = TermSize::new(4, 3);
        let mut page = ScreenPage::new();
        for y in 1..=3 {
            for x in 1..=4 {
                page.cell_mut(TermPos::new(x, y)).ch =
                    char::from_digit(y as u32, 10).unwrap();
            }
        }
        page.shift_content(size, 0, 1);
        assert_eq!(page.cell(TermPos::new(1, 1)).ch, '2');
        assert_eq!(page.cell(TermPos::new(1, 2)).ch, '3');
        assert_eq!(page.cell(TermPos::new(1, 3)).ch, ' ');
    }

    #[test]
    fn shift_left_then_right_loses_columns() {
        let size = TermSize::new(3, 1);
        let mut page = ScreenPage::new();
        page.cell_mut(TermPos::new(1, 1)).ch = 'a';
        page.cell_mut(TermPos::new(2, 1)).ch = 'b';
        page.cell_mut(TermPos::new(3, 1)).ch = 'c';
        page.shift_content(size, 1, 0);
        assert_eq!(page.cell(TermPos::new(1, 1)).ch, 'b');
        assert_eq!(page.cell(TermPos::new(3, 1)).ch, ' ');
        page.shift_content(size, -1, 0);
        assert_eq!(page.cell(TermPos::new(1, 1)).ch, ' ');
        assert_eq!(page.cell(TermPos::new(2, 1)).ch, 'b');
        assert_eq!(page.cell(TermPos::new(3, 1)).ch, 'c');
    }
}
