// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The terminal session: explicit init/shutdown and the public API surface.
//!
//! Construction order is fixed: event source, then screen engine, then
//! (optionally) the window manager via [`Terminal::load_window_manager`].
//! [`Terminal::init`] takes the real tty - raw mode, alternate screen, mouse
//! tracking, resize signal - while [`Terminal::init_with`] builds the same
//! session over a caller-supplied output device and geometry, which is how
//! the tests observe exact byte streams.
//!
//! Every public call resolves the currently effective implementation from
//! the override registry and forwards; with the window manager loaded that
//! is the manager, which intercepts and calls down. Shutdown unwinds the
//! override slots and verifies LIFO order; a mismatch means some layer was
//! unloaded out of order, which is unrecoverable, so it aborts.
//!
//! [`Terminal::event`] additionally runs the handler-override chain: a
//! master handler first, then the per-kind handler; a handler that leaves
//! the record unhandled returns it to the caller.

use crate::{AnsiCode, DEFAULT_SIZE, EventCode, EventRecord, MenuItem, OUT_FIL, OpenFlags,
            OutputDevice, OverrideRegistry, PassthroughTtyIo, ScreenEngine, SeekWhence,
            SharedImpl, Stream, SystemEventSource, TermColor, TermPos, TermResult, TermSize,
            TtyIo, WinModSet, WindowManager, disable_raw_mode, enable_raw_mode, fatal,
            query_winsize};
use std::{cell::RefCell, os::fd::RawFd, rc::Rc};
use strum::EnumCount as _;

/// An event handler in the override chain. Clearing `handled` on the record
/// passes the event back to the caller of [`Terminal::event`].
pub type EventHandler = Box<dyn FnMut(&mut EventRecord)>;

/// A terminal session.
#[allow(missing_debug_implementations)]
pub struct Terminal {
    registry: OverrideRegistry,
    engine: Rc<RefCell<ScreenEngine>>,
    engine_ops: SharedImpl<dyn crate::TermOps>,
    engine_io: SharedImpl<dyn TtyIo>,
    io_base: SharedImpl<dyn TtyIo>,
    wm_ops: Option<SharedImpl<dyn crate::TermOps>>,
    wm_io: Option<SharedImpl<dyn TtyIo>>,
    out: OutputDevice,
    handlers: Vec<Option<EventHandler>>,
    master_handler: Option<EventHandler>,
    raw_tty: bool,
    done: bool,
}

impl Terminal {
    /// Take over the controlling terminal: raw mode, alternate screen,
    /// wrap off, cursor on, initial paint, mouse tracking, keyboard and
    /// resize sources.
    ///
    /// # Errors
    ///
    /// Device errors from raw-mode setup or event-source registration.
    pub fn init() -> TermResult<Terminal> {
        enable_raw_mode()?;
        let size = query_winsize(DEFAULT_SIZE);
        let mut term = Self::build(OutputDevice::new_stdout(), size, true)?;
        term.raw_tty = true;
        Ok(term)
    }

    /// Build a session over an arbitrary output device and fixed geometry.
    /// No raw mode, no input fd, no signals; everything else (including the
    /// emission sequence) is identical to [`Terminal::init`].
    ///
    /// # Errors
    ///
    /// Device errors from event-source construction.
    pub fn init_with(out: OutputDevice, size: TermSize) -> TermResult<Terminal> {
        Self::build(out, size, false)
    }

    fn build(out: OutputDevice, size: TermSize, real_tty: bool) -> TermResult<Terminal> {
        let mux = SystemEventSource::new()?;
        let io_base: SharedImpl<dyn TtyIo> = Rc::new(RefCell::new(PassthroughTtyIo));
        let engine = Rc::new(RefCell::new(ScreenEngine::new(
            out.clone(),
            size,
            mux,
            io_base.clone(),
        )));
        let engine_ops: SharedImpl<dyn crate::TermOps> = engine.clone();
        let engine_io: SharedImpl<dyn TtyIo> = engine.clone();

        let mut registry = OverrideRegistry::new(engine_ops.clone(), io_base.clone());
        registry.tty_io.install(engine_io.clone());

        // change to the alternate screen and bring it to a known state
        out.write_all(AnsiCode::AltScreenOn.to_string().as_bytes())?;
        out.write_all(AnsiCode::CursorHome.to_string().as_bytes())?;
        engine.borrow_mut().startup_paint();
        // sign up for all mouse events including movements
        out.write_all(AnsiCode::MouseTrackOn.to_string().as_bytes())?;

        if real_tty {
            let mut eng = engine.borrow_mut();
            eng.attach_stdin(0)?;
            eng.attach_winch()?;
        }

        tracing::debug!(?size, real_tty, "terminal session initialized");
        Ok(Terminal {
            registry,
            engine,
            engine_ops,
            engine_io,
            io_base,
            wm_ops: None,
            wm_io: None,
            out,
            handlers: (0..EventCode::COUNT).map(|_| None).collect(),
            master_handler: None,
            raw_tty: false,
            done: false,
        })
    }

    /// Load the window manager: it overrides the operation and I/O slots
    /// and takes over the surface with a maximized, frameless root window.
    /// Idempotent.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible for parity with init.
    pub fn load_window_manager(&mut self) -> TermResult<()> {
        if self.wm_ops.is_some() {
            return Ok(());
        }
        let prev_ops = self.registry.term_ops.current();
        let prev_io = self.registry.tty_io.current();
        let size = self.engine.borrow().size();
        let wm = Rc::new(RefCell::new(WindowManager::new(prev_ops, prev_io, size)));
        let wm_ops: SharedImpl<dyn crate::TermOps> = wm.clone();
        let wm_io: SharedImpl<dyn TtyIo> = wm.clone();
        self.registry.term_ops.install(wm_ops.clone());
        self.registry.tty_io.install(wm_io.clone());
        self.wm_ops = Some(wm_ops);
        self.wm_io = Some(wm_io);
        tracing::debug!("window manager loaded");
        Ok(())
    }

    /// Tear the session down: unwind the override slots (LIFO-checked),
    /// stop mouse tracking, leave the alternate screen, restore the tty.
    /// Idempotent; also runs from `Drop`.
    ///
    /// A corrupted override stack is a system fault and aborts.
    pub fn shutdown(&mut self) {
        if self.done {
            return;
        }
        self.done = true;

        if let Some(wm) = self.wm_ops.take() {
            if let Err(e) = self.registry.term_ops.uninstall(&wm) {
                fatal(&e);
            }
        }
        if let Some(wm_io) = self.wm_io.take() {
            if let Err(e) = self.registry.tty_io.uninstall(&wm_io) {
                fatal(&e);
            }
        }
        // we must find exactly our own installations below the manager
        if let Err(e) = self.registry.term_ops.verify_unwound(&self.engine_ops) {
            fatal(&e);
        }
        if let Err(e) = self.registry.tty_io.uninstall(&self.engine_io) {
            fatal(&e);
        }
        if let Err(e) = self.registry.tty_io.verify_unwound(&self.io_base) {
            fatal(&e);
        }

        let _unused = self
            .out
            .write_all(AnsiCode::MouseTrackOff.to_string().as_bytes());
        let _unused = self
            .out
            .write_all(AnsiCode::AltScreenOff.to_string().as_bytes());
        if self.raw_tty {
            let _unused = disable_raw_mode();
        }
        tracing::debug!("terminal session shut down");
    }

    fn ops(&self) -> SharedImpl<dyn crate::TermOps> { self.registry.term_ops.current() }

    fn io(&self) -> SharedImpl<dyn TtyIo> { self.registry.tty_io.current() }

    /// Abort on the unrecoverable error kinds, pass the rest through.
    fn check<T>(res: TermResult<T>) -> TermResult<T> {
        match res {
            Err(e) if e.is_fatal() => fatal(&e),
            other => other,
        }
    }

    // -- events ---------------------------------------------------------------

    /// Acquire the next input event. Events go to the master handler first,
    /// then the per-kind handler; an event no handler claims is returned.
    ///
    /// # Errors
    ///
    /// Recoverable event-source errors; device faults abort.
    pub fn event(&mut self) -> TermResult<EventRecord> {
        loop {
            let mut rec = Self::check(self.ops().borrow_mut().event(Stream::STDIN))?;
            rec.handled = true;
            match &mut self.master_handler {
                Some(h) => h(&mut rec),
                None => rec.handled = false,
            }
            if !rec.handled {
                rec.handled = true;
                let idx = rec.event.code() as usize;
                match &mut self.handlers[idx] {
                    Some(h) => h(&mut rec),
                    None => rec.handled = false,
                }
            }
            if !rec.handled {
                return Ok(rec);
            }
        }
    }

    /// Override the handler for one event kind; the previous handler is
    /// returned so the overrider can call down the stack.
    pub fn event_override(&mut self, code: EventCode, handler: EventHandler) -> Option<EventHandler> {
        self.handlers[code as usize].replace(handler)
    }

    /// Override the master event handler (sees every event first).
    pub fn events_override(&mut self, handler: EventHandler) -> Option<EventHandler> {
        self.master_handler.replace(handler)
    }

    // -- interposed stdio -----------------------------------------------------

    /// Write through the I/O interposition chain (the `printf` path): bytes
    /// land on the terminal via cell placement.
    ///
    /// # Errors
    ///
    /// Recoverable I/O-chain errors; device faults abort.
    pub fn print(&mut self, text: &str) -> TermResult<usize> {
        Self::check(self.io().borrow_mut().write(OUT_FIL, text.as_bytes()))
    }

    /// Read from the interposed input: line-buffered with echo and
    /// backspace editing; returns bytes up to and including the newline.
    ///
    /// # Errors
    ///
    /// Recoverable I/O-chain errors; device faults abort.
    pub fn read_input(&mut self, buf: &mut [u8]) -> TermResult<usize> {
        Self::check(self.io().borrow_mut().read(crate::INP_FIL, buf))
    }

    /// Raw access to the interposition chain for collaborators that filter
    /// other descriptors.
    ///
    /// # Errors
    ///
    /// Whatever the chain produces.
    pub fn io_open(&mut self, path: &str, flags: OpenFlags) -> TermResult<RawFd> {
        Self::check(self.io().borrow_mut().open(path, flags))
    }

    /// See [`Terminal::io_open`].
    ///
    /// # Errors
    ///
    /// Whatever the chain produces.
    pub fn io_close(&mut self, fd: RawFd) -> TermResult<()> {
        Self::check(self.io().borrow_mut().close(fd))
    }

    /// See [`Terminal::io_open`]; seeking the terminal handles fails.
    ///
    /// # Errors
    ///
    /// Whatever the chain produces.
    pub fn io_lseek(&mut self, fd: RawFd, offset: i64, whence: SeekWhence) -> TermResult<i64> {
        Self::check(self.io().borrow_mut().lseek(fd, offset, whence))
    }
}

/// The routed operation surface. Each method forwards to the currently
/// effective implementation; see the trait-level docs for contracts.
///
/// Errors: recoverable faults (`bad handle` / `bad position` / `bad page` /
/// `bad window` / `resource exhausted`) return; device and stacking faults
/// abort.
#[allow(clippy::missing_errors_doc)]
impl Terminal {
    pub fn cursor(&mut self, s: Stream, x: i32, y: i32) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().cursor(s, x, y))
    }

    #[must_use]
    pub fn maxx(&mut self, s: Stream) -> i32 { self.ops().borrow_mut().maxx(s) }

    #[must_use]
    pub fn maxy(&mut self, s: Stream) -> i32 { self.ops().borrow_mut().maxy(s) }

    pub fn home(&mut self, s: Stream) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().home(s))
    }

    pub fn del(&mut self, s: Stream) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().del(s))
    }

    pub fn up(&mut self, s: Stream) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().up(s))
    }

    pub fn down(&mut self, s: Stream) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().down(s))
    }

    pub fn left(&mut self, s: Stream) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().left(s))
    }

    pub fn right(&mut self, s: Stream) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().right(s))
    }

    pub fn blink(&mut self, s: Stream, e: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().blink(s, e))
    }

    pub fn reverse(&mut self, s: Stream, e: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().reverse(s, e))
    }

    pub fn underline(&mut self, s: Stream, e: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().underline(s, e))
    }

    pub fn superscript(&mut self, s: Stream, e: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().superscript(s, e))
    }

    pub fn subscript(&mut self, s: Stream, e: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().subscript(s, e))
    }

    pub fn italic(&mut self, s: Stream, e: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().italic(s, e))
    }

    pub fn bold(&mut self, s: Stream, e: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().bold(s, e))
    }

    pub fn strikeout(&mut self, s: Stream, e: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().strikeout(s, e))
    }

    pub fn standout(&mut self, s: Stream, e: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().standout(s, e))
    }

    pub fn fcolor(&mut self, s: Stream, c: TermColor) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().fcolor(s, c))
    }

    pub fn bcolor(&mut self, s: Stream, c: TermColor) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().bcolor(s, c))
    }

    pub fn auto_mode(&mut self, s: Stream, e: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().auto_mode(s, e))
    }

    pub fn curvis(&mut self, s: Stream, e: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().curvis(s, e))
    }

    pub fn scroll(&mut self, s: Stream, dx: i32, dy: i32) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().scroll(s, dx, dy))
    }

    #[must_use]
    pub fn curx(&mut self, s: Stream) -> i32 { self.ops().borrow_mut().curx(s) }

    #[must_use]
    pub fn cury(&mut self, s: Stream) -> i32 { self.ops().borrow_mut().cury(s) }

    #[must_use]
    pub fn curbnd(&mut self, s: Stream) -> bool { self.ops().borrow_mut().curbnd(s) }

    pub fn select(&mut self, s: Stream, u: i32, d: i32) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().select(s, u, d))
    }

    pub fn timer(&mut self, s: Stream, id: i32, period_100us: i64, repeat: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().timer(s, id, period_100us, repeat))
    }

    pub fn killtimer(&mut self, s: Stream, id: i32) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().killtimer(s, id))
    }

    #[must_use]
    pub fn mouse(&mut self, s: Stream) -> i32 { self.ops().borrow_mut().mouse(s) }

    #[must_use]
    pub fn mousebutton(&mut self, s: Stream, m: i32) -> i32 {
        self.ops().borrow_mut().mousebutton(s, m)
    }

    #[must_use]
    pub fn joystick(&mut self, s: Stream) -> i32 { self.ops().borrow_mut().joystick(s) }

    pub fn joybutton(&mut self, s: Stream, j: i32) -> TermResult<i32> {
        Self::check(self.ops().borrow_mut().joybutton(s, j))
    }

    pub fn joyaxis(&mut self, s: Stream, j: i32) -> TermResult<i32> {
        Self::check(self.ops().borrow_mut().joyaxis(s, j))
    }

    pub fn settab(&mut self, s: Stream, t: i32) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().settab(s, t))
    }

    pub fn restab(&mut self, s: Stream, t: i32) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().restab(s, t))
    }

    pub fn clrtab(&mut self, s: Stream) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().clrtab(s))
    }

    #[must_use]
    pub fn funkey(&mut self, s: Stream) -> i32 { self.ops().borrow_mut().funkey(s) }

    pub fn frametimer(&mut self, s: Stream, e: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().frametimer(s, e))
    }

    pub fn autohold(&mut self, s: Stream, e: bool) { self.ops().borrow_mut().autohold(s, e); }

    pub fn wrtstr(&mut self, s: Stream, text: &str) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().wrtstr(s, text))
    }

    pub fn write_text(&mut self, s: Stream, text: &str) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().write_text(s, text))
    }

    // -- window manager surface ----------------------------------------------

    pub fn openwin(&mut self, parent: Option<Stream>, wid: i32) -> TermResult<Stream> {
        Self::check(self.ops().borrow_mut().openwin(parent, wid))
    }

    pub fn closewin(&mut self, s: Stream) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().closewin(s))
    }

    pub fn title(&mut self, s: Stream, t: &str) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().title(s, t))
    }

    pub fn buffer_mode(&mut self, s: Stream, e: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().buffer_mode(s, e))
    }

    pub fn sizbuf(&mut self, s: Stream, x: i32, y: i32) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().sizbuf(s, x, y))
    }

    pub fn getsiz(&mut self, s: Stream) -> TermResult<TermSize> {
        Self::check(self.ops().borrow_mut().getsiz(s))
    }

    pub fn setsiz(&mut self, s: Stream, x: i32, y: i32) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().setsiz(s, x, y))
    }

    pub fn setpos(&mut self, s: Stream, x: i32, y: i32) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().setpos(s, x, y))
    }

    pub fn scnsiz(&mut self, s: Stream) -> TermResult<TermSize> {
        Self::check(self.ops().borrow_mut().scnsiz(s))
    }

    pub fn scncen(&mut self, s: Stream) -> TermResult<TermPos> {
        Self::check(self.ops().borrow_mut().scncen(s))
    }

    pub fn winclient(
        &mut self,
        s: Stream,
        cx: i32,
        cy: i32,
        ms: WinModSet,
    ) -> TermResult<TermSize> {
        Self::check(self.ops().borrow_mut().winclient(s, cx, cy, ms))
    }

    pub fn front(&mut self, s: Stream) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().front(s))
    }

    pub fn back(&mut self, s: Stream) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().back(s))
    }

    pub fn frame(&mut self, s: Stream, e: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().frame(s, e))
    }

    pub fn sizable(&mut self, s: Stream, e: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().sizable(s, e))
    }

    pub fn sysbar(&mut self, s: Stream, e: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().sysbar(s, e))
    }

    pub fn menu(&mut self, s: Stream, m: Option<&[MenuItem]>) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().menu(s, m))
    }

    pub fn menuena(&mut self, s: Stream, id: i32, on: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().menuena(s, id, on))
    }

    pub fn menusel(&mut self, s: Stream, id: i32, on: bool) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().menusel(s, id, on))
    }

    pub fn getwinid(&mut self) -> TermResult<i32> {
        Self::check(self.ops().borrow_mut().getwinid())
    }

    pub fn focus(&mut self, s: Stream) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().focus(s))
    }

    pub fn sendevent(&mut self, s: Stream, ev: EventRecord) -> TermResult<()> {
        Self::check(self.ops().borrow_mut().sendevent(s, ev))
    }

    /// Test/collaborator input injection: bytes enter the decoder as if
    /// read from the tty.
    pub fn inject_input(&mut self, bytes: &[u8]) {
        self.engine.borrow_mut().inject_input(bytes);
    }
}

impl Drop for Terminal {
    fn drop(&mut self) { self.shutdown(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StdoutMock, TermError, TermEvent};
    use pretty_assertions::assert_eq;

    const ROOT: Stream = Stream::STDOUT;

    fn session(x: i32, y: i32) -> (Terminal, StdoutMock) {
        let (out, mock) = OutputDevice::new_mock();
        let term = Terminal::init_with(out, TermSize::new(x, y)).unwrap();
        mock.clear();
        (term, mock)
    }

    /// Decode the mock stream into the visible character matrix by running
    /// a tiny ANSI interpreter over it. Enough for frame/window assertions:
    /// CUP, single-step motions, CR/LF and printable output.
    fn render(bytes: &str, x: usize, y: usize) -> Vec<String> {
        let mut grid = vec![vec![' '; x]; y];
        let (mut cx, mut cy) = (0usize, 0usize);
        let mut chars = bytes.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\x1b' => {
                    if chars.peek() != Some(&'[') {
                        continue;
                    }
                    chars.next();
                    let mut params = String::new();
                    let mut fin = ' ';
                    for c in chars.by_ref() {
                        if c.is_ascii_digit() || c == ';' || c == '?' {
                            params.push(c);
                        } else {
                            fin = c;
                            break;
                        }
                    }
                    match fin {
                        'H' => {
                            let mut it = params.split(';');
                            let row: usize =
                                it.next().and_then(|p| p.parse().ok()).unwrap_or(1);
                            let col: usize =
                                it.next().and_then(|p| p.parse().ok()).unwrap_or(1);
                            cy = row.saturating_sub(1);
                            cx = col.saturating_sub(1);
                        }
                        'A' => cy = cy.saturating_sub(1),
                        'B' => cy += 1,
                        'C' => cx += 1,
                        'D' => cx = cx.saturating_sub(1),
                        _ => {}
                    }
                }
                '\r' => cx = 0,
                '\n' => cy += 1,
                c => {
                    if cy < y && cx < x {
                        grid[cy][cx] = c;
                    }
                    cx += 1;
                }
            }
        }
        grid.into_iter().map(|row| row.into_iter().collect()).collect()
    }

    #[test]
    fn init_emission_sequence() {
        let (out, mock) = OutputDevice::new_mock();
        let mut term = Terminal::init_with(out, TermSize::new(80, 24)).unwrap();
        let stream = mock.get_copy_of_buffer_as_string();
        // alt screen, home, wrap off, cursor on, then the blank paint
        assert!(stream.starts_with("\x1b[?1049h\x1b[H\x1b[7l\x1b[?25h\x1b[H\x1b[30m\x1b[107m"));
        // full screen of spaces in black-on-white
        assert!(stream.contains(&" ".repeat(80)));
        // cursor placed back at (1,1) after the paint
        assert!(stream.contains("\x1b[1;1H"));
        // mouse tracking enabled at the end of init
        assert!(stream.ends_with("\x1b[?1003h"));
        mock.clear();
        term.shutdown();
        assert_eq!(
            mock.get_copy_of_buffer_as_string(),
            "\x1b[?1003l\x1b[?1049l"
        );
    }

    #[test]
    fn select_routes_and_validates() {
        let (mut term, _mock) = session(20, 6);
        term.select(ROOT, 2, 1).unwrap();
        assert!(matches!(
            term.select(ROOT, 0, 1),
            Err(TermError::BadPage { .. })
        ));
    }

    #[test]
    fn handler_chain_intercepts_and_passes_down() {
        let (mut term, _mock) = session(20, 6);
        // master sees everything but passes it on
        term.events_override(Box::new(|rec| {
            rec.handled = false;
        }));
        // the per-kind handler swallows the first timer event only
        let swallowed = Rc::new(RefCell::new(0));
        let counter = swallowed.clone();
        term.event_override(
            EventCode::Timer,
            Box::new(move |rec| {
                let mut n = counter.borrow_mut();
                if *n == 0 {
                    *n += 1; // handled: swallowed
                } else {
                    rec.handled = false;
                }
            }),
        );
        term.timer(ROOT, 1, 10, true).unwrap();
        let rec = term.event().unwrap();
        term.killtimer(ROOT, 1).unwrap();
        assert_eq!(rec.event, TermEvent::Timer(1));
        assert_eq!(*swallowed.borrow(), 1);
    }

    #[test]
    fn event_override_returns_previous_handler() {
        let (mut term, _mock) = session(20, 6);
        assert!(term.event_override(EventCode::Char, Box::new(|_| {})).is_none());
        assert!(term.event_override(EventCode::Char, Box::new(|_| {})).is_some());
    }

    #[test]
    fn print_routes_through_cell_placement() {
        let (mut term, _mock) = session(20, 6);
        term.print("hello").unwrap();
        assert_eq!(term.curx(ROOT), 6);
        assert_eq!(term.cury(ROOT), 1);
    }

    #[test]
    fn window_ops_without_manager_fail() {
        let (mut term, _mock) = session(20, 6);
        assert!(matches!(
            term.openwin(None, 2),
            Err(TermError::BadWindow { .. })
        ));
        assert!(matches!(term.front(ROOT), Err(TermError::BadWindow { .. })));
    }

    #[test]
    fn wm_root_window_is_transparent() {
        let (mut term, _mock) = session(40, 12);
        term.load_window_manager().unwrap();
        // the root window is maximized and frameless: full client size
        assert_eq!(term.maxx(ROOT), 40);
        assert_eq!(term.maxy(ROOT), 12);
        let size = term.getsiz(ROOT).unwrap();
        assert_eq!(size, TermSize::new(40, 12));
    }

    #[test]
    fn wm_frame_rendering_layout() {
        let (mut term, mock) = session(40, 12);
        term.load_window_manager().unwrap();
        let win = term.openwin(None, 2).unwrap();
        term.setsiz(win, 20, 8).unwrap();
        term.setpos(win, 3, 2).unwrap();
        term.title(win, "log").unwrap();
        mock.clear();
        term.write_text(win, "ab").unwrap(); // first write makes it visible
        let grid = render(&mock.get_copy_of_buffer_as_string(), 40, 12);

        // border corners at the extent
        assert_eq!(&grid[1][2..22], "+------------------+");
        assert_eq!(&grid[8][2..22], "+------------------+");
        assert_eq!(grid[3].as_bytes()[2], b'|');
        assert_eq!(grid[3].as_bytes()[21], b'|');
        // system bar row: buttons right-aligned, title centered
        let sysbar = &grid[2];
        assert!(sysbar.contains("_ ^ X"));
        assert!(sysbar.contains("log"));
        // underbar row of '='
        assert_eq!(&grid[3][3..21], "=".repeat(18).as_str());
        // client content at origin + client offset (col 3+1, row 2+3)
        assert_eq!(&grid[4][3..5], "ab");
    }

    #[test]
    fn wm_zorder_monotone_and_front() {
        let (mut term, _mock) = session(40, 12);
        term.load_window_manager().unwrap();
        let a = term.openwin(None, 2).unwrap();
        let b = term.openwin(None, 3).unwrap();
        term.write_text(a, "a").unwrap();
        term.write_text(b, "b").unwrap();
        // tracking reports motion before any click; the pointer lands at
        // (5,5), inside the focused topmost window b
        term.inject_input(b"\x1b[M\x23\x25\x25");
        let rec = term.event().unwrap();
        assert_eq!(rec.window, 3);
        // press: b is topmost and focused -> delivered
        term.inject_input(b"\x1b[M\x20\x25\x25");
        let rec = term.event().unwrap();
        assert_eq!(rec.window, 3);
        assert_eq!(rec.event, TermEvent::MouseAssert { mouse: 1, button: 1 });
        term.inject_input(b"\x1b[M\x23\x25\x25"); // release
        let rec = term.event().unwrap();
        assert_eq!(rec.event, TermEvent::MouseDeassert { mouse: 1, button: 1 });
        // bring a to front: it takes a strictly greater rank and now wins
        // the hit test; the first button-1 press only transfers focus (no
        // event), so the release that follows goes to the new focus
        term.front(a).unwrap();
        term.inject_input(b"\x1b[M\x20\x25\x25");
        term.inject_input(b"\x1b[M\x23\x25\x25");
        let rec = term.event().unwrap();
        assert_eq!(rec.window, 2);
        assert_eq!(rec.event, TermEvent::MouseDeassert { mouse: 1, button: 1 });
    }

    #[test]
    fn wm_keyboard_routes_to_focus() {
        let (mut term, _mock) = session(40, 12);
        term.load_window_manager().unwrap();
        let win = term.openwin(None, 7).unwrap();
        term.write_text(win, "x").unwrap();
        term.inject_input(b"q\x1b[A");
        let rec = term.event().unwrap();
        assert_eq!(rec.window, 7);
        assert_eq!(rec.event, TermEvent::Char('q'));
        let rec = term.event().unwrap();
        assert_eq!(rec.event, TermEvent::Up);
    }

    #[test]
    fn wm_mouse_move_translates_to_client_coords() {
        let (mut term, _mock) = session(40, 12);
        term.load_window_manager().unwrap();
        let win = term.openwin(None, 2).unwrap();
        term.setsiz(win, 20, 8).unwrap();
        term.setpos(win, 3, 2).unwrap();
        term.write_text(win, "z").unwrap();
        // move to root (6, 6): inside the client area (origin 3+1, 2+3)
        term.inject_input(b"\x1b[M\x23\x26\x26");
        let rec = term.event().unwrap();
        assert_eq!(
            rec.event,
            TermEvent::MouseMove {
                mouse: 1,
                pos: TermPos::new(3, 2)
            }
        );
        assert_eq!(rec.window, 2);
    }

    #[test]
    fn wm_duplicate_and_anonymous_ids() {
        let (mut term, _mock) = session(40, 12);
        term.load_window_manager().unwrap();
        term.openwin(None, 2).unwrap();
        assert!(matches!(
            term.openwin(None, 2),
            Err(TermError::BadWindow { .. })
        ));
        assert_eq!(term.getwinid().unwrap(), -1);
        assert_eq!(term.getwinid().unwrap(), -2);
        let anon = term.openwin(None, -3).unwrap();
        term.closewin(anon).unwrap();
        // anonymous ids are never reused
        assert_eq!(term.getwinid().unwrap(), -3);
    }

    #[test]
    fn wm_close_recycles_slots_and_repaints() {
        let (mut term, _mock) = session(40, 12);
        term.load_window_manager().unwrap();
        let a = term.openwin(None, 2).unwrap();
        term.write_text(a, "a").unwrap();
        term.closewin(a).unwrap();
        assert!(matches!(
            term.write_text(a, "x"),
            Err(TermError::BadWindow { .. })
        ));
        // the id is free again
        let b = term.openwin(None, 2).unwrap();
        assert_ne!(a, b); // streams are not recycled
    }

    #[test]
    fn wm_winclient_accounts_for_dressing() {
        let (mut term, _mock) = session(40, 12);
        term.load_window_manager().unwrap();
        let full = WinModSet::FRAME | WinModSet::SIZE | WinModSet::SYSBAR;
        assert_eq!(
            term.winclient(ROOT, 20, 8, full).unwrap(),
            TermSize::new(22, 12)
        );
        assert_eq!(
            term.winclient(ROOT, 20, 8, WinModSet::empty()).unwrap(),
            TermSize::new(20, 8)
        );
        assert_eq!(term.scnsiz(ROOT).unwrap(), TermSize::new(40, 12));
        assert_eq!(term.scncen(ROOT).unwrap(), TermPos::new(20, 6));
    }

    #[test]
    fn wm_unload_then_shutdown_is_clean() {
        let (mut term, _mock) = session(20, 6);
        term.load_window_manager().unwrap();
        term.shutdown();
    }
}
