//! Display geometry
//!
//! Sizes the text grid to its container. Resizes are debounced, and the
//! first fit is retried a few times while the host settles its layout.

use std::time::{Duration, Instant};

use tracing::debug;

use super::display::{CellMetrics, Display, PixelSize, Result};
use crate::config::Config;
use crate::core::timer::{Debouncer, Timer};

/// Usable grid size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub cols: u16,
    pub rows: u16,
}

/// Fixed inputs to the geometry calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitParams {
    /// Horizontal and vertical padding, per side, in pixels
    pub padding: (u32, u32),
    pub fallback_cell: CellMetrics,
    pub min_cols: u16,
    pub min_rows: u16,
}

impl FitParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            padding: (config.padding.horizontal, config.padding.vertical),
            fallback_cell: CellMetrics {
                width: config.fallback_cell.width,
                height: config.fallback_cell.height,
            },
            min_cols: config.min_cols,
            min_rows: config.min_rows,
        }
    }
}

/// Grid size for a container: content box divided by cell size, floored,
/// clamped to the minimums.
pub fn compute_geometry(
    container: PixelSize,
    measured: Option<CellMetrics>,
    params: &FitParams,
) -> Geometry {
    let cell = measured
        .filter(|c| c.width > 0 && c.height > 0)
        .unwrap_or(params.fallback_cell);

    let content_w = container.width.saturating_sub(params.padding.0 * 2);
    let content_h = container.height.saturating_sub(params.padding.1 * 2);

    let cols = content_w.checked_div(cell.width).unwrap_or(0);
    let rows = content_h.checked_div(cell.height).unwrap_or(0);

    Geometry {
        cols: clamp_cells(cols, params.min_cols),
        rows: clamp_cells(rows, params.min_rows),
    }
}

fn clamp_cells(count: u32, min: u16) -> u16 {
    u16::try_from(count).unwrap_or(u16::MAX).max(min)
}

/// Keeps the display's grid matched to its container
#[derive(Debug)]
pub struct DisplayAdapter {
    params: FitParams,
    debounce: Debouncer,
    initial_fits: Vec<Timer>,
    geometry: Option<Geometry>,
}

impl DisplayAdapter {
    /// Create the adapter and schedule the initial fit attempts
    pub fn new(params: FitParams, debounce: Duration, initial_delays: &[Duration], now: Instant) -> Self {
        let initial_fits = initial_delays
            .iter()
            .map(|delay| {
                let mut timer = Timer::new();
                timer.schedule(now, *delay);
                timer
            })
            .collect();
        Self {
            params,
            debounce: Debouncer::new(debounce),
            initial_fits,
            geometry: None,
        }
    }

    /// Note a container resize; the fit runs after the debounce period
    pub fn request_fit(&mut self, now: Instant) {
        self.debounce.trigger(now);
    }

    /// Run any fit that has come due. Returns the new geometry if it changed.
    pub fn tick<D: Display + ?Sized>(&mut self, display: &mut D, now: Instant) -> Result<Option<Geometry>> {
        let mut due = self.debounce.fire(now);
        for timer in &mut self.initial_fits {
            due |= timer.fire(now);
        }
        self.initial_fits.retain(Timer::is_pending);

        if due {
            self.fit(display)
        } else {
            Ok(None)
        }
    }

    /// Measure now and resize the display if the grid changed
    pub fn fit<D: Display + ?Sized>(&mut self, display: &mut D) -> Result<Option<Geometry>> {
        let Some(container) = display.container_size() else {
            debug!("Container size unavailable; fit skipped");
            return Ok(None);
        };
        let geometry = compute_geometry(container, display.cell_metrics(), &self.params);

        if display.cols() == geometry.cols && display.rows() == geometry.rows {
            self.geometry = Some(geometry);
            return Ok(None);
        }

        debug!(
            "Fit {}x{} px -> {}x{} cells",
            container.width, container.height, geometry.cols, geometry.rows
        );
        display.resize(geometry.cols, geometry.rows)?;
        self.geometry = Some(geometry);
        Ok(Some(geometry))
    }

    /// Drop every pending fit
    pub fn cancel(&mut self) {
        self.debounce.cancel();
        self.initial_fits.clear();
    }

    /// Most recent geometry applied or confirmed
    #[allow(dead_code)]
    pub fn geometry(&self) -> Option<Geometry> {
        self.geometry
    }

    /// Earliest pending fit
    pub fn next_deadline(&self) -> Option<Instant> {
        self.initial_fits
            .iter()
            .filter_map(Timer::deadline)
            .chain(self.debounce.deadline())
            .min()
    }

    #[allow(dead_code)]
    pub fn has_pending(&self) -> bool {
        self.debounce.is_pending() || !self.initial_fits.is_empty()
    }
}
