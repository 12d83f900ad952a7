// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # termgrid
//!
//! Structured terminal I/O for text-mode applications whose output device is
//! a VT100/xterm-compatible ANSI terminal.
//!
//! Applications draw into a two-dimensional grid of character cells with
//! per-cell foreground color, background color and attribute. The library
//! mirrors the intended state of the physical terminal in memory - there is
//! no readback; the terminal is whatever the last emitted sequence said it
//! is - and issues minimal ANSI escape sequences to reconcile the two. A
//! single blocking [`Terminal::event`] call multiplexes keyboard, signal and
//! timer input into one typed event stream, and multiple logical screen
//! pages can be swapped onto the one physical terminal. An optional
//! in-process window manager subdivides the surface into overlapping
//! rectangular subwindows with frames, titles, Z-order and focus.
//!
//! ## Architecture
//!
//! ```text
//! raw bytes + signals + timer fires
//!    |
//!    v
//! event_source (mio: epoll / kqueue)      hooks (override slots)
//!    |                                       ^
//!    v                                       | routed calls
//! input (keystroke table, greedy decoder)  session::Terminal  <- application
//!    |                                       |
//!    v                                       v
//! typed events  <------------------  winman (when loaded)
//!                                            |
//!                                            v
//!                                    screen (pages, shadow, minimal ANSI)
//!                                            |
//!                                            v
//!                                    terminal_io -> the terminal
//! ```
//!
//! Init order is explicit: the event source exists before the screen engine,
//! which exists before the window manager ([`Terminal::init`] then
//! [`Terminal::load_window_manager`]). Public calls route through the
//! override registry, so loading the window manager transparently rebinds
//! every entry point to a per-window version.
//!
//! ## Quick start
//!
//! ```no_run
//! use termgrid::{Stream, TermColor, Terminal};
//!
//! fn main() -> termgrid::TermResult<()> {
//!     let mut term = Terminal::init()?;
//!     let s = Stream::STDOUT;
//!     term.fcolor(s, TermColor::Red)?;
//!     term.cursor(s, 10, 5)?;
//!     term.write_text(s, "hello")?;
//!     let ev = term.event()?; // blocks: keys, mouse, timers, signals
//!     drop(ev);
//!     term.shutdown();
//!     Ok(())
//! }
//! ```

// Attach sources.
pub mod core;
pub mod event_source;
pub mod events;
pub mod hooks;
pub mod input;
pub mod screen;
pub mod session;
pub mod terminal_io;
pub mod winman;

// Re-export.
pub use self::core::*;
pub use event_source::*;
pub use events::*;
pub use hooks::*;
pub use input::*;
pub use screen::*;
pub use session::*;
pub use terminal_io::*;
pub use winman::*;
