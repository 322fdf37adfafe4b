use serde::{Deserialize, Serialize};

/// A cell coordinate (1-based column `x`, row `y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellPos {
    pub x: i32,
    pub y: i32,
}

impl CellPos {
    pub const ORIGIN: CellPos = CellPos { x: 1, y: 1 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, delta: CellDelta) -> Self {
        Self {
            x: self.x + delta.dx,
            y: self.y + delta.dy,
        }
    }
}

/// A signed step in cell units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellDelta {
    pub dx: i32,
    pub dy: i32,
}

impl CellDelta {
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    pub fn is_zero(self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

/// Axis-aligned rectangle in cell units. Covers columns `x..x + w` and rows `y..y + h`.
///
/// Deserialized rectangles always lie on the grid, see [`GridRect::on_grid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawGridRect")]
pub struct GridRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl GridRect {
    /// Builds a rectangle, flooring both dimensions at one cell.
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            x,
            y,
            w: w.max(1),
            h: h.max(1),
        }
    }

    /// Builds a rectangle that lies on the grid: origin floored at `(1, 1)`, both dimensions
    /// at one cell.
    pub fn on_grid(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self::new(x.max(1), y.max(1), w, h)
    }

    pub fn origin(&self) -> CellPos {
        CellPos::new(self.x, self.y)
    }

    /// First column past the right edge.
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    /// First row past the bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn at(&self, origin: CellPos) -> Self {
        Self {
            x: origin.x,
            y: origin.y,
            ..*self
        }
    }

    pub fn overlaps(&self, other: &GridRect) -> bool {
        is_overlapping(self, other)
    }

    /// Smallest rectangle covering both `self` and `other`.
    pub fn union(&self, other: &GridRect) -> GridRect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        GridRect {
            x,
            y,
            w: self.right().max(other.right()) - x,
            h: self.bottom().max(other.bottom()) - y,
        }
    }
}

#[derive(Deserialize)]
struct RawGridRect {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

impl From<RawGridRect> for GridRect {
    fn from(raw: RawGridRect) -> Self {
        GridRect::on_grid(raw.x, raw.y, raw.w, raw.h)
    }
}

/// Strict overlap on half-open intervals: rectangles that only share an edge do not overlap.
pub fn is_overlapping(a: &GridRect, b: &GridRect) -> bool {
    a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_is_symmetric() {
        let rects = [
            GridRect::new(1, 1, 1, 1),
            GridRect::new(2, 1, 1, 1),
            GridRect::new(1, 1, 3, 2),
            GridRect::new(3, 2, 2, 2),
            GridRect::new(5, 5, 1, 4),
        ];

        for a in &rects {
            for b in &rects {
                assert_eq!(is_overlapping(a, b), is_overlapping(b, a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let a = GridRect::new(1, 1, 1, 1);
        let right = GridRect::new(2, 1, 1, 1);
        let below = GridRect::new(1, 2, 1, 1);
        let diagonal = GridRect::new(2, 2, 1, 1);

        assert!(!is_overlapping(&a, &right));
        assert!(!is_overlapping(&a, &below));
        assert!(!is_overlapping(&a, &diagonal));
    }

    #[test]
    fn test_crossing_rectangles_overlap() {
        let wide = GridRect::new(1, 1, 3, 1);
        let tall = GridRect::new(2, 1, 1, 3);
        assert!(is_overlapping(&wide, &tall));
        assert!(wide.overlaps(&wide));
    }

    #[test]
    fn test_new_floors_dimensions() {
        let rect = GridRect::new(3, 4, 0, -2);
        assert_eq!((rect.w, rect.h), (1, 1));
    }

    #[test]
    fn test_deserialize_puts_rect_on_grid() {
        let rect: GridRect = toml::from_str("x = 0\ny = -3\nw = 0\nh = 0").unwrap();
        assert_eq!(rect, GridRect::new(1, 1, 1, 1));

        let rect: GridRect = toml::from_str("x = 4\ny = 2\nw = 3\nh = 2").unwrap();
        assert_eq!(rect, GridRect::new(4, 2, 3, 2));
    }

    #[test]
    fn test_union_covers_both() {
        let a = GridRect::new(2, 2, 1, 1);
        let b = GridRect::new(4, 1, 2, 3);
        assert_eq!(a.union(&b), GridRect::new(2, 1, 4, 3));
    }
}
