//! Pixel ⇄ cell conversion.
//!
//! Everything else in [`crate::grid`] works in cell units. This module is the only place that
//! knows about tile size, gaps and container padding.

use crate::grid::rect::{CellPos, GridRect};

/// Gap between neighbouring tiles in pixels.
pub const GRID_GAP: f64 = 8.0;

/// Padding between the grid container edge and the first tile.
pub const GRID_PADDING: f64 = 32.0;

/// Smallest tile edge the layout aims for.
pub const MIN_TILE_SIZE: f64 = 70.0;

pub const MIN_COLUMNS: u32 = 4;
pub const MAX_COLUMNS: u32 = 24;
pub const DEFAULT_COLUMNS: u32 = 12;

/// JavaScript-style rounding (halves go towards positive infinity).
pub(crate) fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

/// A point in layout pixels, already adjusted for scrolling.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: PixelPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A rectangle in layout pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl PixelRect {
    /// Normalised rectangle spanned by two corner points.
    pub fn from_corners(a: PixelPoint, b: PixelPoint) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            w: (a.x - b.x).abs(),
            h: (a.y - b.y).abs(),
        }
    }

    /// Strict overlap, same rule as cell collisions.
    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }

    /// Inclusive point containment, used for click hit tests.
    pub fn contains(&self, point: PixelPoint) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.w
            && point.y >= self.y
            && point.y <= self.y + self.h
    }
}

/// Layout-derived grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub cell_size: f64,
    pub columns: u32,
    pub gap: f64,
    pub padding: f64,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            cell_size: MIN_TILE_SIZE,
            columns: DEFAULT_COLUMNS,
            gap: GRID_GAP,
            padding: GRID_PADDING,
        }
    }
}

impl GridGeometry {
    /// Fits as many columns of at least [`MIN_TILE_SIZE`] as the width allows (between
    /// [`MIN_COLUMNS`] and [`MAX_COLUMNS`]) and stretches the cells to fill it.
    ///
    /// Widths that are not positive keep the default geometry.
    pub fn from_available_width(width: f64) -> Self {
        if !width.is_finite() || width <= 0.0 {
            return Self::default();
        }

        let estimated = ((width + GRID_GAP) / (MIN_TILE_SIZE + GRID_GAP)).floor();
        let columns = (estimated.max(0.0) as u32).clamp(MIN_COLUMNS, MAX_COLUMNS);
        let cell_size = ((width - f64::from(columns - 1) * GRID_GAP) / f64::from(columns)).floor();

        Self {
            cell_size,
            columns,
            ..Self::default()
        }
    }

    /// Distance between the origins of two neighbouring cells.
    pub fn pitch(&self) -> f64 {
        self.cell_size + self.gap
    }

    /// Cell under `pointer`, where `grab_offset` is the pointer's offset inside the dragged tile.
    /// Never returns a coordinate below 1.
    pub fn cell_at(&self, pointer: PixelPoint, grab_offset: PixelPoint) -> CellPos {
        let pitch = self.pitch();
        if pitch <= 0.0 {
            return CellPos::ORIGIN;
        }

        let rel_x = pointer.x - grab_offset.x - self.padding;
        let rel_y = pointer.y - grab_offset.y - self.padding;

        CellPos::new(
            (round_half_up(rel_x / pitch) + 1).max(1),
            (round_half_up(rel_y / pitch) + 1).max(1),
        )
    }

    /// Pixel bounding box of a cell rectangle.
    pub fn bounds(&self, rect: &GridRect) -> PixelRect {
        let pitch = self.pitch();
        PixelRect {
            x: self.padding + f64::from(rect.x - 1) * pitch,
            y: self.padding + f64::from(rect.y - 1) * pitch,
            w: f64::from(rect.w) * self.cell_size + f64::from(rect.w - 1) * self.gap,
            h: f64::from(rect.h) * self.cell_size + f64::from(rect.h - 1) * self.gap,
        }
    }

    pub fn max_columns(&self) -> i32 {
        self.columns as i32
    }
}
