// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The terminal operations capability.
//!
//! Every public entry point of the library is a method on [`TermOps`]. The
//! screen engine is the base implementation; loading the window manager
//! pushes an override onto the [`OverrideSlot`](super::OverrideSlot) that
//! intercepts every call, holds the previous implementation, and calls down
//! when it chooses not to handle.
//!
//! Calls carry a [`Stream`] handle naming the logical target. The base
//! engine ignores it (there is only one surface); the window manager routes
//! it through its stream-to-window table. The window extension methods have
//! default bodies that fail with a window fault so the base engine does not
//! have to mention them.

use crate::{EventRecord, TermColor, TermError, TermPos, TermResult, TermSize};
use bitflags::bitflags;

/// Logical stream handle identifying the target surface of a call.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Stream(pub i32);

impl Stream {
    /// Standard input.
    pub const STDIN: Stream = Stream(0);
    /// Standard output; the root surface.
    pub const STDOUT: Stream = Stream(1);
}

bitflags! {
    /// Window dressing components, for [`TermOps::winclient`].
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct WinModSet: u8 {
        const FRAME  = 1 << 0;
        const SIZE   = 1 << 1;
        const SYSBAR = 1 << 2;
    }
}

/// One item of a window menu; `branch` holds the pulldown children.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MenuItem {
    pub id: i32,
    pub face: String,
    pub onoff: bool,
    pub oneof: bool,
    pub bar: bool,
    pub branch: Vec<MenuItem>,
}

fn no_window_manager<T>() -> TermResult<T> {
    Err(TermError::BadWindow {
        reason: "window manager not loaded",
    })
}

/// The full public operation set.
#[allow(clippy::missing_errors_doc)] /* contracts live on the facade */
pub trait TermOps {
    // -- cursor and motion --------------------------------------------------
    fn cursor(&mut self, s: Stream, x: i32, y: i32) -> TermResult<()>;
    fn maxx(&mut self, s: Stream) -> i32;
    fn maxy(&mut self, s: Stream) -> i32;
    fn home(&mut self, s: Stream) -> TermResult<()>;
    /// Delete the character left of the cursor and back up over it.
    fn del(&mut self, s: Stream) -> TermResult<()>;
    fn up(&mut self, s: Stream) -> TermResult<()>;
    fn down(&mut self, s: Stream) -> TermResult<()>;
    fn left(&mut self, s: Stream) -> TermResult<()>;
    fn right(&mut self, s: Stream) -> TermResult<()>;

    // -- write attributes ---------------------------------------------------
    fn blink(&mut self, s: Stream, e: bool) -> TermResult<()>;
    fn reverse(&mut self, s: Stream, e: bool) -> TermResult<()>;
    fn underline(&mut self, s: Stream, e: bool) -> TermResult<()>;
    fn superscript(&mut self, s: Stream, e: bool) -> TermResult<()>;
    fn subscript(&mut self, s: Stream, e: bool) -> TermResult<()>;
    fn italic(&mut self, s: Stream, e: bool) -> TermResult<()>;
    fn bold(&mut self, s: Stream, e: bool) -> TermResult<()>;
    fn strikeout(&mut self, s: Stream, e: bool) -> TermResult<()>;
    fn standout(&mut self, s: Stream, e: bool) -> TermResult<()>;

    // -- colors and modes ---------------------------------------------------
    fn fcolor(&mut self, s: Stream, c: TermColor) -> TermResult<()>;
    fn bcolor(&mut self, s: Stream, c: TermColor) -> TermResult<()>;
    fn auto_mode(&mut self, s: Stream, e: bool) -> TermResult<()>;
    fn curvis(&mut self, s: Stream, e: bool) -> TermResult<()>;
    fn scroll(&mut self, s: Stream, dx: i32, dy: i32) -> TermResult<()>;

    // -- queries ------------------------------------------------------------
    fn curx(&mut self, s: Stream) -> i32;
    fn cury(&mut self, s: Stream) -> i32;
    fn curbnd(&mut self, s: Stream) -> bool;

    // -- pages, events, timers ----------------------------------------------
    fn select(&mut self, s: Stream, u: i32, d: i32) -> TermResult<()>;
    /// Fetch the next raw event (no handler chain; the session runs that).
    fn event(&mut self, s: Stream) -> TermResult<EventRecord>;
    fn timer(&mut self, s: Stream, id: i32, period_100us: i64, repeat: bool) -> TermResult<()>;
    fn killtimer(&mut self, s: Stream, id: i32) -> TermResult<()>;

    // -- input devices ------------------------------------------------------
    fn mouse(&mut self, s: Stream) -> i32;
    fn mousebutton(&mut self, s: Stream, m: i32) -> i32;
    fn joystick(&mut self, s: Stream) -> i32;
    fn joybutton(&mut self, s: Stream, j: i32) -> TermResult<i32>;
    fn joyaxis(&mut self, s: Stream, j: i32) -> TermResult<i32>;

    // -- tabs and miscellany ------------------------------------------------
    fn settab(&mut self, s: Stream, t: i32) -> TermResult<()>;
    fn restab(&mut self, s: Stream, t: i32) -> TermResult<()>;
    fn clrtab(&mut self, s: Stream) -> TermResult<()>;
    fn funkey(&mut self, s: Stream) -> i32;
    fn frametimer(&mut self, s: Stream, e: bool) -> TermResult<()>;
    fn autohold(&mut self, s: Stream, e: bool);
    /// Write a string direct to the terminal, bypassing cell handling.
    fn wrtstr(&mut self, s: Stream, text: &str) -> TermResult<()>;
    /// Write text through cell placement on the target surface (the
    /// interposed-stdio path, addressable by stream).
    fn write_text(&mut self, s: Stream, text: &str) -> TermResult<()>;

    // -- window manager extensions (overridden when it is loaded) -----------
    fn openwin(&mut self, parent: Option<Stream>, wid: i32) -> TermResult<Stream> {
        let _unused = (parent, wid);
        no_window_manager()
    }
    fn closewin(&mut self, s: Stream) -> TermResult<()> {
        let _unused = s;
        no_window_manager()
    }
    fn title(&mut self, s: Stream, t: &str) -> TermResult<()> {
        let _unused = (s, t);
        no_window_manager()
    }
    fn buffer_mode(&mut self, s: Stream, e: bool) -> TermResult<()> {
        let _unused = (s, e);
        no_window_manager()
    }
    fn sizbuf(&mut self, s: Stream, x: i32, y: i32) -> TermResult<()> {
        let _unused = (s, x, y);
        no_window_manager()
    }
    fn getsiz(&mut self, s: Stream) -> TermResult<TermSize> {
        let _unused = s;
        no_window_manager()
    }
    fn setsiz(&mut self, s: Stream, x: i32, y: i32) -> TermResult<()> {
        let _unused = (s, x, y);
        no_window_manager()
    }
    fn setpos(&mut self, s: Stream, x: i32, y: i32) -> TermResult<()> {
        let _unused = (s, x, y);
        no_window_manager()
    }
    fn scnsiz(&mut self, s: Stream) -> TermResult<TermSize> {
        let _unused = s;
        no_window_manager()
    }
    fn scncen(&mut self, s: Stream) -> TermResult<TermPos> {
        let _unused = s;
        no_window_manager()
    }
    fn winclient(
        &mut self,
        s: Stream,
        cx: i32,
        cy: i32,
        ms: WinModSet,
    ) -> TermResult<TermSize> {
        let _unused = (s, cx, cy, ms);
        no_window_manager()
    }
    fn front(&mut self, s: Stream) -> TermResult<()> {
        let _unused = s;
        no_window_manager()
    }
    fn back(&mut self, s: Stream) -> TermResult<()> {
        let _unused = s;
        no_window_manager()
    }
    fn frame(&mut self, s: Stream, e: bool) -> TermResult<()> {
        let _unused = (s, e);
        no_window_manager()
    }
    fn sizable(&mut self, s: Stream, e: bool) -> TermResult<()> {
        let _unused = (s, e);
        no_window_manager()
    }
    fn sysbar(&mut self, s: Stream, e: bool) -> TermResult<()> {
        let _unused = (s, e);
        no_window_manager()
    }
    fn menu(&mut self, s: Stream, m: Option<&[MenuItem]>) -> TermResult<()> {
        let _unused = (s, m);
        no_window_manager()
    }
    fn menuena(&mut self, s: Stream, id: i32, on: bool) -> TermResult<()> {
        let _unused = (s, id, on);
        no_window_manager()
    }
    fn menusel(&mut self, s: Stream, id: i32, on: bool) -> TermResult<()> {
        let _unused = (s, id, on);
        no_window_manager()
    }
    fn getwinid(&mut self) -> TermResult<i32> { no_window_manager() }
    fn focus(&mut self, s: Stream) -> TermResult<()> {
        let _unused = s;
        no_window_manager()
    }
    fn sendevent(&mut self, s: Stream, ev: EventRecord) -> TermResult<()> {
        let _unused = (s, ev);
        no_window_manager()
    }
}
