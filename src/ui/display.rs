//! Text grid display surface
//!
//! The session only talks to the [`Display`] trait. `CrosstermDisplay`
//! drives the host terminal; `RecordingDisplay` captures output in tests.

use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::{
    cursor::{MoveTo, SetCursorStyle, Show},
    event::{self, Event, KeyEventKind},
    execute,
    style::{Attribute, ResetColor, SetAttribute},
    terminal::{
        self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
    },
};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::keymapper::KeyMapper;
use crate::config::CellConfig;

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("Display has been disposed")]
    Disposed,

    #[error("Terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, DisplayError>;

/// Measured size of one character cell, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellMetrics {
    pub width: u32,
    pub height: u32,
}

/// Container size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

/// A surface that shows a grid of text
pub trait Display {
    /// Write text (may contain style codes and `\r\n`)
    fn write(&mut self, text: &str) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
    /// Set the usable grid size
    fn resize(&mut self, cols: u16, rows: u16) -> Result<()>;
    fn cols(&self) -> u16;
    fn rows(&self) -> u16;
    fn focus(&mut self) -> Result<()>;
    /// Tear down; every later call fails with [`DisplayError::Disposed`]
    fn dispose(&mut self);
    fn is_disposed(&self) -> bool;

    /// Per-cell pixel size, when the surface can measure it
    fn cell_metrics(&self) -> Option<CellMetrics> {
        None
    }

    /// Pixel size of the area the grid lives in, `None` while unknown
    fn container_size(&self) -> Option<PixelSize>;
}

/// Events delivered by the host terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Raw key data, e.g. `"a"`, `"\r"`, `"\x03"`
    Key(String),
    /// The host window changed size
    Resize,
}

/// Display backed by the process's terminal via crossterm
pub struct CrosstermDisplay {
    out: Stdout,
    cols: u16,
    rows: u16,
    fallback_cell: CellConfig,
    disposed: bool,
}

impl CrosstermDisplay {
    /// Enter raw mode and the alternate screen
    pub fn open(fallback_cell: CellConfig, cursor_blink: bool, title: &str) -> Result<Self> {
        let (cols, rows) = terminal::size()?;
        info!("Terminal size: {}x{}", cols, rows);

        terminal::enable_raw_mode()?;
        let mut out = io::stdout();
        let cursor = if cursor_blink {
            SetCursorStyle::BlinkingBlock
        } else {
            SetCursorStyle::SteadyBlock
        };
        let entered = execute!(
            out,
            EnterAlternateScreen,
            Clear(ClearType::All),
            MoveTo(0, 0),
            cursor,
            Show,
            SetTitle(title)
        );
        leave_raw_mode_on_error(entered, terminal::disable_raw_mode)?;

        Ok(Self {
            out,
            cols,
            rows,
            fallback_cell,
            disposed: false,
        })
    }

    /// Wait up to `timeout` for the next input event
    pub fn poll_input(timeout: Duration) -> Result<Option<InputEvent>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        let event = match event::read()? {
            // Windows reports releases too
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                KeyMapper::map(&key).map(InputEvent::Key)
            }
            Event::Resize(cols, rows) => {
                debug!("Host resized to {}x{}", cols, rows);
                Some(InputEvent::Resize)
            }
            _ => None,
        };
        Ok(event)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.disposed {
            return Err(DisplayError::Disposed);
        }
        Ok(())
    }

    fn window_size() -> Option<terminal::WindowSize> {
        terminal::window_size().ok()
    }
}

impl Display for CrosstermDisplay {
    fn write(&mut self, text: &str) -> Result<()> {
        self.ensure_open()?;
        self.out.write_all(convert_eol(text).as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.ensure_open()?;
        execute!(self.out, Clear(ClearType::All), Clear(ClearType::Purge), MoveTo(0, 0))?;
        Ok(())
    }

    fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        self.ensure_open()?;
        self.cols = cols;
        self.rows = rows;
        Ok(())
    }

    fn cols(&self) -> u16 {
        self.cols
    }

    fn rows(&self) -> u16 {
        self.rows
    }

    fn focus(&mut self) -> Result<()> {
        self.ensure_open()?;
        execute!(self.out, Show)?;
        Ok(())
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        let _ = execute!(
            self.out,
            ResetColor,
            SetAttribute(Attribute::Reset),
            SetCursorStyle::SteadyBlock,
            Show,
            LeaveAlternateScreen
        );
        let _ = self.out.flush();
        let _ = terminal::disable_raw_mode();
        info!("Display disposed");
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn cell_metrics(&self) -> Option<CellMetrics> {
        let size = Self::window_size()?;
        if size.width == 0 || size.height == 0 || size.columns == 0 || size.rows == 0 {
            return None;
        }
        Some(CellMetrics {
            width: u32::from(size.width) / u32::from(size.columns),
            height: u32::from(size.height) / u32::from(size.rows),
        })
    }

    fn container_size(&self) -> Option<PixelSize> {
        if let Some(size) = Self::window_size() {
            if size.width > 0 && size.height > 0 {
                return Some(PixelSize {
                    width: u32::from(size.width),
                    height: u32::from(size.height),
                });
            }
        }
        // No pixel report: estimate from the cell grid
        let (cols, rows) = terminal::size().ok()?;
        Some(PixelSize {
            width: u32::from(cols) * self.fallback_cell.width,
            height: u32::from(rows) * self.fallback_cell.height,
        })
    }
}

impl Drop for CrosstermDisplay {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Turn lone `\n` into `\r\n`
fn convert_eol(text: &str) -> std::borrow::Cow<'_, str> {
    if !text.contains('\n') {
        return std::borrow::Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    let mut prev = '\0';
    for ch in text.chars() {
        if ch == '\n' && prev != '\r' {
            out.push('\r');
        }
        out.push(ch);
        prev = ch;
    }
    std::borrow::Cow::Owned(out)
}

/// In-memory display that records everything written to it
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    output: String,
    writes: usize,
    clears: usize,
    cols: u16,
    rows: u16,
    disposed: bool,
    focused: bool,
    pub container: Option<PixelSize>,
    pub metrics: Option<CellMetrics>,
}

#[cfg(test)]
impl RecordingDisplay {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            ..Self::default()
        }
    }

    /// Everything written since the last clear
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn clears(&self) -> usize {
        self.clears
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }
}

#[cfg(test)]
impl Display for RecordingDisplay {
    fn write(&mut self, text: &str) -> Result<()> {
        if self.disposed {
            return Err(DisplayError::Disposed);
        }
        self.output.push_str(text);
        self.writes += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        if self.disposed {
            return Err(DisplayError::Disposed);
        }
        self.output.clear();
        self.clears += 1;
        Ok(())
    }

    fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        if self.disposed {
            return Err(DisplayError::Disposed);
        }
        self.cols = cols;
        self.rows = rows;
        Ok(())
    }

    fn cols(&self) -> u16 {
        self.cols
    }

    fn rows(&self) -> u16 {
        self.rows
    }

    fn focus(&mut self) -> Result<()> {
        if self.disposed {
            return Err(DisplayError::Disposed);
        }
        self.focused = true;
        Ok(())
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn cell_metrics(&self) -> Option<CellMetrics> {
        self.metrics
    }

    fn container_size(&self) -> Option<PixelSize> {
        self.container
    }
}

/// Setup failed after raw mode was enabled; no `Self` exists to restore it
fn leave_raw_mode_on_error<T>(
    result: io::Result<T>,
    disable_raw_mode: impl FnOnce() -> io::Result<()>,
) -> Result<T> {
    if let Err(e) = &result {
        warn!("Terminal setup failed: {}", e);
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to leave raw mode: {}", e);
        }
    }
    Ok(result?)
}
