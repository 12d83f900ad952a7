// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod screen_cell;
pub mod screen_engine;
pub mod screen_page;
pub mod term_shadow;

// Re-export.
pub use screen_cell::*;
pub use screen_engine::*;
pub use screen_page::*;
pub use term_shadow::*;
