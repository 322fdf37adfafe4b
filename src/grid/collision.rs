use crate::clip::{Clip, ClipId};
use crate::grid::rect::{CellPos, GridRect, is_overlapping};

/// Number of rows the free-spot search walks before giving up.
pub const MAX_SCAN_ROWS: i32 = 200;

/// Returns the first clip (in slice order) that `target` overlaps, skipping `ignore`.
pub fn first_collision<'a>(
    target: &GridRect,
    clips: &'a [Clip],
    ignore: Option<&ClipId>,
) -> Option<&'a Clip> {
    clips
        .iter()
        .filter(|clip| Some(&clip.id) != ignore)
        .find(|clip| is_overlapping(target, &clip.rect))
}

/// True iff `target` overlaps any clip other than `ignore`.
pub fn check_collision(target: &GridRect, clips: &[Clip], ignore: Option<&ClipId>) -> bool {
    first_collision(target, clips, ignore).is_some()
}

/// Row-major first fit for a `w`×`h` tile within `max_columns`.
///
/// Returns `None` when no spot exists within [`MAX_SCAN_ROWS`], or when the tile is wider than
/// the grid.
pub fn try_find_free_spot(w: i32, h: i32, clips: &[Clip], max_columns: i32) -> Option<CellPos> {
    let w = w.max(1);
    let h = h.max(1);
    let last_column = max_columns - w + 1;

    for y in 1..MAX_SCAN_ROWS {
        for x in 1..=last_column {
            let candidate = GridRect::new(x, y, w, h);
            if !check_collision(&candidate, clips, None) {
                return Some(candidate.origin());
            }
        }
    }

    None
}

/// Like [`try_find_free_spot`], but falls back to `(1, 1)` when the grid is exhausted.
///
/// The fallback spot may overlap existing clips; callers that need to tell the user the grid is
/// full should use [`try_find_free_spot`].
pub fn find_first_free_spot(w: i32, h: i32, clips: &[Clip], max_columns: i32) -> CellPos {
    try_find_free_spot(w, h, clips, max_columns).unwrap_or_else(|| {
        log::warn!(
            "no free {w}x{h} spot within {MAX_SCAN_ROWS} rows of {max_columns} columns, using (1, 1)"
        );
        CellPos::ORIGIN
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(id: &str, x: i32, y: i32, w: i32, h: i32) -> Clip {
        Clip::new(id, "#808080", x, y).with_id(id).with_size(w, h)
    }

    #[test]
    fn test_check_collision_respects_ignore() {
        let clips = vec![tile("a", 1, 1, 2, 2)];
        let target = GridRect::new(2, 2, 1, 1);

        assert!(check_collision(&target, &clips, None));
        assert!(!check_collision(&target, &clips, Some(&ClipId::from("a"))));
        assert_eq!(
            first_collision(&target, &clips, None).map(|c| c.id.as_str()),
            Some("a")
        );
    }

    #[test]
    fn test_free_spot_on_empty_grid_is_origin() {
        assert_eq!(find_first_free_spot(1, 1, &[], 12), CellPos::new(1, 1));
        assert_eq!(find_first_free_spot(3, 2, &[], 12), CellPos::new(1, 1));
    }

    #[test]
    fn test_free_spot_is_row_major() {
        let clips = vec![tile("a", 1, 1, 1, 1), tile("b", 3, 1, 1, 1)];
        assert_eq!(find_first_free_spot(1, 1, &clips, 4), CellPos::new(2, 1));

        // A 2-wide tile does not fit between a and b, nor at the end of row 1.
        let clips = vec![tile("a", 1, 1, 1, 1), tile("b", 3, 1, 1, 1)];
        assert_eq!(find_first_free_spot(2, 1, &clips, 4), CellPos::new(1, 2));
    }

    #[test]
    fn test_free_spot_never_collides() {
        let clips = vec![
            tile("a", 1, 1, 2, 2),
            tile("b", 3, 1, 1, 3),
            tile("c", 1, 3, 2, 1),
            tile("d", 4, 2, 1, 1),
        ];

        for (w, h) in [(1, 1), (2, 1), (1, 2), (2, 2), (4, 1)] {
            let spot = find_first_free_spot(w, h, &clips, 4);
            let rect = GridRect::new(spot.x, spot.y, w, h);
            assert!(!check_collision(&rect, &clips, None), "{w}x{h} at {spot:?}");
            assert!(rect.right() - 1 <= 4);
        }
    }

    #[test]
    fn test_full_grid_reports_none_and_falls_back() {
        // A single column fully occupied down past the scan bound.
        let clips = vec![tile("wall", 1, 1, 1, MAX_SCAN_ROWS + 1)];

        assert_eq!(try_find_free_spot(1, 1, &clips, 1), None);
        assert_eq!(find_first_free_spot(1, 1, &clips, 1), CellPos::ORIGIN);
    }

    #[test]
    fn test_tile_wider_than_grid() {
        assert_eq!(try_find_free_spot(5, 1, &[], 4), None);
    }
}
