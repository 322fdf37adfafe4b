//! Placement of new tiles: dropped files, bulk imports and clips saved without a position.
//!
//! Every planner works on a private copy of the snapshot that grows with each planned tile, so
//! later files see the ones placed before them.

use crate::clip::Clip;
use crate::color::generate_smart_color;
use crate::grid::collision::{check_collision, find_first_free_spot};
use crate::grid::rect::{CellPos, GridRect};

/// Where one new 1×1 tile goes and how it looks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilePlacement {
    pub name: String,
    pub file_name: String,
    pub origin: CellPos,
    pub color: String,
}

impl TilePlacement {
    /// A clip with the new-tile defaults at the planned spot. The caller attaches the payload.
    pub fn to_clip(&self) -> Clip {
        let mut clip = Clip::new(
            self.name.as_str(),
            self.color.as_str(),
            self.origin.x,
            self.origin.y,
        );
        clip.file_name = Some(self.file_name.clone());
        clip
    }
}

/// Drop-target highlight for files hovering over `cell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDropPreview {
    pub rect: GridRect,
    /// False when the cell is occupied; the drop will then fall back to a free spot.
    pub valid: bool,
}

/// Clip name for a dropped file: the file name without its last extension.
pub fn file_stem(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(dot) if dot + 1 < file_name.len() && !file_name[dot + 1..].contains('/') => {
            &file_name[..dot]
        }
        _ => file_name,
    }
}

pub fn preview_file_drop(cell: CellPos, clips: &[Clip]) -> FileDropPreview {
    let rect = GridRect::new(cell.x, cell.y, 1, 1);
    FileDropPreview {
        rect,
        valid: !check_collision(&rect, clips, None),
    }
}

/// Plans 1×1 tiles for files dropped on `drop_cell`.
///
/// Files go to the drop cell in order. When the current cell is taken, that file and the
/// following ones continue from the first free spot.
pub fn plan_file_drop<S: AsRef<str>>(
    file_names: &[S],
    drop_cell: CellPos,
    clips: &[Clip],
    max_columns: i32,
) -> Vec<TilePlacement> {
    let mut cursor = CellPos::new(drop_cell.x.max(1), drop_cell.y.max(1));
    plan_tiles(file_names, clips, |snapshot| {
        let rect = GridRect::new(cursor.x, cursor.y, 1, 1);
        if check_collision(&rect, snapshot, None) {
            cursor = find_first_free_spot(1, 1, snapshot, max_columns);
        }
        cursor
    })
}

/// Plans 1×1 tiles for files imported without a target cell, each at the first free spot.
pub fn plan_bulk_import<S: AsRef<str>>(
    file_names: &[S],
    clips: &[Clip],
    max_columns: i32,
) -> Vec<TilePlacement> {
    plan_tiles(file_names, clips, |snapshot| {
        find_first_free_spot(1, 1, snapshot, max_columns)
    })
}

/// Origin for a clip saved without a position: column 1 of the first row below every clip.
pub fn default_new_clip_origin(clips: &[Clip]) -> CellPos {
    let below = clips.iter().map(|clip| clip.rect.bottom()).max().unwrap_or(1);
    CellPos::new(1, below.max(1))
}

fn plan_tiles<S: AsRef<str>>(
    file_names: &[S],
    clips: &[Clip],
    mut next_origin: impl FnMut(&[Clip]) -> CellPos,
) -> Vec<TilePlacement> {
    let mut snapshot = clips.to_vec();
    let mut placements = Vec::with_capacity(file_names.len());

    for file_name in file_names {
        let file_name = file_name.as_ref();
        let name = file_stem(file_name);
        let origin = next_origin(snapshot.as_slice());
        let color = generate_smart_color(name, &snapshot);

        let placement = TilePlacement {
            name: name.to_string(),
            file_name: file_name.to_string(),
            origin,
            color,
        };
        snapshot.push(placement.to_clip());
        placements.push(placement);
    }

    placements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::derive_color_from_leader;

    fn tile(id: &str, x: i32, y: i32, w: i32, h: i32) -> Clip {
        Clip::new(id, "#808080", x, y).with_id(id).with_size(w, h)
    }

    fn origins(placements: &[TilePlacement]) -> Vec<CellPos> {
        placements.iter().map(|p| p.origin).collect()
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("kick.wav"), "kick");
        assert_eq!(file_stem("loop.final.mp3"), "loop.final");
        assert_eq!(file_stem("noext"), "noext");
        assert_eq!(file_stem("trailing."), "trailing.");
    }

    #[test]
    fn test_drop_on_free_cell() {
        let clips = vec![tile("a", 1, 1, 1, 1)];
        let placed = plan_file_drop(&["snare.wav"], CellPos::new(3, 2), &clips, 4);

        assert_eq!(origins(&placed), vec![CellPos::new(3, 2)]);
        assert_eq!(placed[0].name, "snare");
        assert_eq!(placed[0].file_name, "snare.wav");
    }

    #[test]
    fn test_second_dropped_file_falls_back_to_free_spot() {
        let clips = vec![tile("a", 1, 1, 1, 1)];
        let files = ["one.wav", "two.wav", "three.wav"];
        let placed = plan_file_drop(&files, CellPos::new(3, 1), &clips, 4);

        // The second file hits the first one and moves to the first free spot; the third
        // continues from there.
        assert_eq!(
            origins(&placed),
            vec![CellPos::new(3, 1), CellPos::new(2, 1), CellPos::new(4, 1)]
        );

        let mut all = clips.clone();
        all.extend(placed.iter().map(TilePlacement::to_clip));
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert!(!a.rect.overlaps(&b.rect), "{:?} vs {:?}", a.rect, b.rect);
            }
        }
    }

    #[test]
    fn test_drop_on_occupied_cell() {
        let clips = vec![tile("a", 1, 1, 2, 1)];
        let placed = plan_file_drop(&["x.wav"], CellPos::new(2, 1), &clips, 4);
        assert_eq!(origins(&placed), vec![CellPos::new(3, 1)]);
    }

    #[test]
    fn test_dropped_family_follows_its_leader() {
        let placed = plan_file_drop(&["Intro 1.wav", "Intro 2.wav"], CellPos::ORIGIN, &[], 4);

        let expected = derive_color_from_leader(&placed[0].color, 2.0).unwrap();
        assert_eq!(placed[1].color, expected);
    }

    #[test]
    fn test_new_tile_defaults() {
        let placed = plan_file_drop(&["pad.flac"], CellPos::new(0, -1), &[], 4);
        let clip = placed[0].to_clip();

        assert_eq!(clip.rect, GridRect::new(1, 1, 1, 1));
        assert_eq!(clip.name, "pad");
        assert_eq!(clip.file_name.as_deref(), Some("pad.flac"));
        assert!(clip.looping && clip.fade);
        assert!((clip.volume() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_bulk_import_fills_first_free_spots() {
        let clips = vec![tile("a", 2, 1, 1, 1)];
        let placed = plan_bulk_import(&["a.wav", "b.wav", "c.wav"], &clips, 2);

        assert_eq!(
            origins(&placed),
            vec![CellPos::new(1, 1), CellPos::new(1, 2), CellPos::new(2, 2)]
        );
    }

    #[test]
    fn test_preview_validity() {
        let clips = vec![tile("a", 2, 2, 1, 1)];

        let free = preview_file_drop(CellPos::new(1, 1), &clips);
        assert!(free.valid);
        assert_eq!(free.rect, GridRect::new(1, 1, 1, 1));

        assert!(!preview_file_drop(CellPos::new(2, 2), &clips).valid);
    }

    #[test]
    fn test_default_new_clip_origin() {
        assert_eq!(default_new_clip_origin(&[]), CellPos::ORIGIN);

        let clips = vec![tile("a", 1, 1, 1, 1), tile("b", 3, 2, 1, 3)];
        assert_eq!(default_new_clip_origin(&clips), CellPos::new(1, 5));
    }
}
