// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod system_event;
pub mod unix_event_source;

// Re-export.
pub use system_event::*;
pub use unix_event_source::*;
