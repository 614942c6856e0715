//! Terminal engine.
//!
//! This module contains the logic behind the faux shell:
//!
//! - **timer**: Clocks and cancellable timers polled by the event loop
//! - **format**: Styling and word wrapping
//! - **links**: OSC 8 hyperlinks around URLs
//! - **typer**: Character-by-character response animation
//! - **input**: Input line buffer and key classification
//! - **dispatch**: Command line to action mapping
//! - **session**: `TerminalSession` tying everything to a display
//!
//! # Architecture
//!
//! ```text
//! TerminalSession
//! ├── Display (text grid surface)
//! ├── InputLine (unsubmitted command)
//! ├── Typer (at most one typing session)
//! └── DisplayAdapter (geometry, resize debounce)
//! ```

pub mod timer;
pub mod format;
pub mod links;
pub mod typer;
pub mod input;
pub mod dispatch;
pub mod session;
