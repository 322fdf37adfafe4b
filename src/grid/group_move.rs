//! Multi-select drag planning.
//!
//! A drag captures every selected clip's offset from the anchor clip when it starts. While the
//! pointer moves, the anchor's target cell is projected onto the whole group; on drop the group
//! either moves together or not at all.

use std::collections::BTreeSet;

use crate::clip::{Clip, ClipId};
use crate::grid::PlacementError;
use crate::grid::collision::first_collision;
use crate::grid::rect::{CellDelta, CellPos, GridRect, is_overlapping};

/// New origin for one clip of an accepted group move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionUpdate {
    pub id: ClipId,
    pub x: i32,
    pub y: i32,
}

/// Drop-target highlight for an in-progress drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropPreview {
    /// Bounding rectangle of the projected group, `None` if no member is on the grid anymore.
    pub bounds: Option<GridRect>,
    pub valid: bool,
}

#[derive(Debug, Clone)]
struct DragOffset {
    id: ClipId,
    dx: i32,
    dy: i32,
}

/// State captured when a group drag starts.
#[derive(Debug, Clone)]
pub struct GroupDrag {
    anchor: ClipId,
    selection: BTreeSet<ClipId>,
    offsets: Vec<DragOffset>,
    min_dx: i32,
    min_dy: i32,
}

impl GroupDrag {
    /// Starts dragging `anchor` together with `selection`.
    ///
    /// Dragging a clip outside the current selection replaces the selection with that clip
    /// alone. Selected ids that are not in `clips` are ignored.
    pub fn begin(
        selection: &BTreeSet<ClipId>,
        anchor: &ClipId,
        clips: &[Clip],
    ) -> Result<Self, PlacementError> {
        let anchor_clip = clips
            .iter()
            .find(|clip| &clip.id == anchor)
            .ok_or_else(|| PlacementError::UnknownClip(anchor.clone()))?;

        let selection = if selection.contains(anchor) {
            selection.clone()
        } else {
            BTreeSet::from([anchor.clone()])
        };

        let offsets: Vec<DragOffset> = clips
            .iter()
            .filter(|clip| selection.contains(&clip.id))
            .map(|clip| DragOffset {
                id: clip.id.clone(),
                dx: clip.rect.x - anchor_clip.rect.x,
                dy: clip.rect.y - anchor_clip.rect.y,
            })
            .collect();

        let min_dx = offsets.iter().map(|o| o.dx).min().unwrap_or(0).min(0);
        let min_dy = offsets.iter().map(|o| o.dy).min().unwrap_or(0).min(0);

        Ok(Self {
            anchor: anchor.clone(),
            selection,
            offsets,
            min_dx,
            min_dy,
        })
    }

    pub fn anchor(&self) -> &ClipId {
        &self.anchor
    }

    /// The set of clips moving together (may differ from the selection passed to `begin`).
    pub fn selection(&self) -> &BTreeSet<ClipId> {
        &self.selection
    }

    /// Shifts the anchor target so that no member lands left of column 1 or above row 1.
    fn clamp_anchor(&self, target: CellPos) -> CellPos {
        CellPos::new(
            target.x.max(1 - self.min_dx),
            target.y.max(1 - self.min_dy),
        )
    }

    fn project(&self, target: CellPos, clips: &[Clip]) -> Vec<(ClipId, GridRect)> {
        let anchor = self.clamp_anchor(target);

        self.offsets
            .iter()
            .filter_map(|offset| {
                let clip = clips.iter().find(|clip| clip.id == offset.id)?;
                let origin = CellPos::new(
                    (anchor.x + offset.dx).max(1),
                    (anchor.y + offset.dy).max(1),
                );
                Some((offset.id.clone(), clip.rect.at(origin)))
            })
            .collect()
    }

    fn find_blocker(
        &self,
        projected: &[(ClipId, GridRect)],
        clips: &[Clip],
    ) -> Option<PlacementError> {
        let others: Vec<&Clip> = clips
            .iter()
            .filter(|clip| !self.selection.contains(&clip.id))
            .collect();

        projected.iter().find_map(|(id, rect)| {
            others
                .iter()
                .find(|other| is_overlapping(rect, &other.rect))
                .map(|other| PlacementError::Collision {
                    clip: id.clone(),
                    blocked_by: other.id.clone(),
                })
        })
    }

    /// Projects the group for an anchor dropped at `anchor_target` without committing.
    pub fn preview(&self, anchor_target: CellPos, clips: &[Clip]) -> DropPreview {
        let projected = self.project(anchor_target, clips);
        let bounds = projected
            .iter()
            .map(|(_, rect)| *rect)
            .reduce(|acc, rect| acc.union(&rect));

        DropPreview {
            bounds,
            valid: self.find_blocker(&projected, clips).is_none(),
        }
    }

    /// Resolves a drop: either every member moves, or the whole move is rejected.
    pub fn commit(
        &self,
        anchor_target: CellPos,
        clips: &[Clip],
    ) -> Result<Vec<PositionUpdate>, PlacementError> {
        let projected = self.project(anchor_target, clips);

        if let Some(rejection) = self.find_blocker(&projected, clips) {
            log::debug!("group move of {} clips rejected: {rejection}", projected.len());
            return Err(rejection);
        }

        Ok(projected
            .into_iter()
            .map(|(id, rect)| PositionUpdate {
                id,
                x: rect.x,
                y: rect.y,
            })
            .collect())
    }
}

/// Plans moving `selected` so that the anchor clip shifts by `delta` cells.
///
/// Selected clips never block each other. On success every member's new origin is returned;
/// a single collision with a non-selected clip rejects the entire move.
pub fn plan_group_move(
    selected: &BTreeSet<ClipId>,
    anchor_id: &ClipId,
    delta: CellDelta,
    clips: &[Clip],
) -> Result<Vec<PositionUpdate>, PlacementError> {
    let drag = GroupDrag::begin(selected, anchor_id, clips)?;
    let anchor_origin = clips
        .iter()
        .find(|clip| &clip.id == anchor_id)
        .map(|clip| clip.rect.origin())
        .ok_or_else(|| PlacementError::UnknownClip(anchor_id.clone()))?;

    drag.commit(anchor_origin.offset(delta), clips)
}

/// Applies accepted updates to a clip list in place.
pub fn apply_position_updates(clips: &mut [Clip], updates: &[PositionUpdate]) {
    for update in updates {
        if let Some(clip) = clips.iter_mut().find(|clip| clip.id == update.id) {
            clip.move_to(update.x, update.y);
        }
    }
}

/// Single-clip move, validated the same way a one-clip group move is.
pub fn plan_move(
    clip_id: &ClipId,
    target: CellPos,
    clips: &[Clip],
) -> Result<PositionUpdate, PlacementError> {
    let clip = clips
        .iter()
        .find(|clip| &clip.id == clip_id)
        .ok_or_else(|| PlacementError::UnknownClip(clip_id.clone()))?;

    let origin = CellPos::new(target.x.max(1), target.y.max(1));
    let rect = clip.rect.at(origin);
    if let Some(blocker) = first_collision(&rect, clips, Some(clip_id)) {
        return Err(PlacementError::Collision {
            clip: clip_id.clone(),
            blocked_by: blocker.id.clone(),
        });
    }

    Ok(PositionUpdate {
        id: clip_id.clone(),
        x: origin.x,
        y: origin.y,
    })
}
