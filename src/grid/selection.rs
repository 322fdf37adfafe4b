//! Tile selection: single-tile clicks and rubber-band gestures.

use std::collections::BTreeSet;

use crate::clip::{Clip, ClipId};
use crate::grid::geometry::{GridGeometry, PixelPoint, PixelRect};

/// Pointer travel (in pixels) below which a gesture counts as a click.
pub const CLICK_THRESHOLD_PX: f64 = 5.0;

/// Applies a click on tile `id` to `selection`.
///
/// Without the multi-select modifier the click selects just this tile. With it, the tile's
/// membership is toggled and the rest of the selection is kept.
pub fn toggle_tile(selection: &BTreeSet<ClipId>, id: &ClipId, multi: bool) -> BTreeSet<ClipId> {
    if !multi {
        return BTreeSet::from([id.clone()]);
    }

    let mut next = selection.clone();
    if !next.remove(id) {
        next.insert(id.clone());
    }
    next
}

/// First clip whose tile contains `point`.
pub fn hit_test<'a>(point: PixelPoint, clips: &'a [Clip], geometry: &GridGeometry) -> Option<&'a Clip> {
    clips
        .iter()
        .find(|clip| geometry.bounds(&clip.rect).contains(point))
}

/// Ids of every clip whose tile intersects `band`.
pub fn clips_in_band(band: &PixelRect, clips: &[Clip], geometry: &GridGeometry) -> BTreeSet<ClipId> {
    clips
        .iter()
        .filter(|clip| geometry.bounds(&clip.rect).intersects(band))
        .map(|clip| clip.id.clone())
        .collect()
}

/// An in-progress rubber-band selection.
#[derive(Debug, Clone)]
pub struct RubberBand {
    origin: PixelPoint,
    initial: BTreeSet<ClipId>,
}

impl RubberBand {
    /// Starts a band at `origin`. With the multi-select modifier held, the current selection is
    /// kept and the band adds to it; otherwise the band starts from an empty selection.
    pub fn begin(origin: PixelPoint, multi: bool, current: &BTreeSet<ClipId>) -> Self {
        let initial = if multi {
            current.clone()
        } else {
            BTreeSet::new()
        };
        Self { origin, initial }
    }

    pub fn origin(&self) -> PixelPoint {
        self.origin
    }

    /// Selection captured when the gesture started.
    pub fn initial(&self) -> &BTreeSet<ClipId> {
        &self.initial
    }

    /// The band rectangle for the current pointer position.
    pub fn band(&self, pointer: PixelPoint) -> PixelRect {
        PixelRect::from_corners(self.origin, pointer)
    }

    /// Live selection while the pointer moves.
    pub fn update(
        &self,
        pointer: PixelPoint,
        clips: &[Clip],
        geometry: &GridGeometry,
    ) -> BTreeSet<ClipId> {
        let mut selection = self.initial.clone();
        selection.extend(clips_in_band(&self.band(pointer), clips, geometry));
        selection
    }

    /// Final selection on pointer release.
    ///
    /// A release within [`CLICK_THRESHOLD_PX`] of the origin is a click: the tile under the
    /// pointer is toggled against the gesture-start selection, and a click on empty space
    /// without the modifier clears the selection.
    pub fn finish(
        self,
        pointer: PixelPoint,
        multi: bool,
        clips: &[Clip],
        geometry: &GridGeometry,
    ) -> BTreeSet<ClipId> {
        if pointer.distance(self.origin) >= CLICK_THRESHOLD_PX {
            return self.update(pointer, clips, geometry);
        }

        match hit_test(pointer, clips, geometry) {
            Some(clip) => toggle_tile(&self.initial, &clip.id, multi),
            None if multi => self.initial,
            None => BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(id: &str, x: i32, y: i32) -> Clip {
        Clip::new(id, "#808080", x, y).with_id(id)
    }

    fn ids(values: &[&str]) -> BTreeSet<ClipId> {
        values.iter().map(|v| ClipId::from(*v)).collect()
    }

    fn center(geometry: &GridGeometry, clip: &Clip) -> PixelPoint {
        let b = geometry.bounds(&clip.rect);
        PixelPoint::new(b.x + b.w / 2.0, b.y + b.h / 2.0)
    }

    #[test]
    fn test_toggle_tile() {
        let selection = ids(&["a", "b"]);

        assert_eq!(toggle_tile(&selection, &"c".into(), false), ids(&["c"]));
        assert_eq!(toggle_tile(&selection, &"a".into(), false), ids(&["a"]));
        assert_eq!(toggle_tile(&selection, &"a".into(), true), ids(&["b"]));
        assert_eq!(toggle_tile(&selection, &"c".into(), true), ids(&["a", "b", "c"]));
    }

    #[test]
    fn test_band_selects_intersecting_tiles() {
        let geometry = GridGeometry::default();
        let clips = vec![tile("a", 1, 1), tile("b", 2, 1), tile("c", 5, 5)];

        let band = RubberBand::begin(PixelPoint::new(0.0, 0.0), false, &ids(&["c"]));
        // Reaches into b's tile (starts at x = 110).
        let selection = band.update(PixelPoint::new(120.0, 60.0), &clips, &geometry);

        assert_eq!(selection, ids(&["a", "b"]));
    }

    #[test]
    fn test_band_with_modifier_unions_initial_selection() {
        let geometry = GridGeometry::default();
        let clips = vec![tile("a", 1, 1), tile("b", 2, 1), tile("c", 5, 5)];

        let band = RubberBand::begin(PixelPoint::new(0.0, 0.0), true, &ids(&["c"]));
        let selection = band.update(PixelPoint::new(50.0, 50.0), &clips, &geometry);

        assert_eq!(selection, ids(&["a", "c"]));
    }

    #[test]
    fn test_band_touching_tile_edge_does_not_select() {
        let geometry = GridGeometry::default();
        let clips = vec![tile("a", 1, 1)];

        // Tile a spans x = 32..102; the band ends exactly at its left edge.
        let band = RubberBand::begin(PixelPoint::new(0.0, 0.0), false, &BTreeSet::new());
        assert!(band.update(PixelPoint::new(32.0, 200.0), &clips, &geometry).is_empty());
    }

    #[test]
    fn test_short_release_is_a_click() {
        let geometry = GridGeometry::default();
        let clips = vec![tile("a", 1, 1), tile("b", 2, 1)];
        let at_b = center(&geometry, &clips[1]);

        let band = RubberBand::begin(at_b, false, &ids(&["a"]));
        let released = PixelPoint::new(at_b.x + 3.0, at_b.y);
        assert_eq!(band.finish(released, false, &clips, &geometry), ids(&["b"]));

        let band = RubberBand::begin(at_b, true, &ids(&["a", "b"]));
        assert_eq!(band.finish(at_b, true, &clips, &geometry), ids(&["a"]));
    }

    #[test]
    fn test_click_on_background() {
        let geometry = GridGeometry::default();
        let clips = vec![tile("a", 1, 1)];
        let empty = PixelPoint::new(600.0, 600.0);

        let band = RubberBand::begin(empty, false, &ids(&["a"]));
        assert!(band.finish(empty, false, &clips, &geometry).is_empty());

        let band = RubberBand::begin(empty, true, &ids(&["a"]));
        assert_eq!(band.finish(empty, true, &clips, &geometry), ids(&["a"]));
    }

    #[test]
    fn test_long_release_keeps_band_result() {
        let geometry = GridGeometry::default();
        let clips = vec![tile("a", 1, 1), tile("b", 2, 1)];

        let band = RubberBand::begin(PixelPoint::new(0.0, 0.0), false, &BTreeSet::new());
        let selection = band.finish(PixelPoint::new(300.0, 80.0), false, &clips, &geometry);
        assert_eq!(selection, ids(&["a", "b"]));
    }
}
