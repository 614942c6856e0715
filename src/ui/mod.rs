//! Display surface and input handling.
//!
//! - **display**: `Display` trait and the crossterm-backed implementation
//! - **adapter**: Sizes the grid to its container
//! - **keymapper**: Keyboard events to raw key data

pub mod display;
pub mod adapter;
pub mod keymapper;

pub use display::{CrosstermDisplay, InputEvent};
