//! Grid & Collision Engine
//!
//! Pure placement logic for clips on the soundboard grid. Every planning call takes an
//! immutable snapshot of the current clips plus a gesture and returns either the proposed
//! changes or a rejection; nothing here mutates caller state, so the host can commit a
//! result atomically.
//!
//! - [`rect`]: cell rectangles and the overlap rule
//! - [`collision`]: collision checks and free-spot search
//! - [`group_move`]: multi-select drag planning
//! - [`placement`]: dropped files, bulk imports and default positions for new tiles
//! - [`resize`]: edge/corner resize planning
//! - [`geometry`]: pixel ⇄ cell conversion for the layout
//! - [`selection`]: click and rubber-band selection

pub mod collision;
pub mod geometry;
pub mod group_move;
pub mod placement;
pub mod rect;
pub mod resize;
pub mod selection;

use thiserror::Error;

use crate::clip::ClipId;

pub use collision::{check_collision, find_first_free_spot, first_collision, try_find_free_spot};
pub use geometry::{GridGeometry, PixelPoint, PixelRect};
pub use group_move::{
    DropPreview, GroupDrag, PositionUpdate, apply_position_updates, plan_group_move, plan_move,
};
pub use placement::{
    FileDropPreview, TilePlacement, default_new_clip_origin, plan_bulk_import, plan_file_drop,
    preview_file_drop,
};
pub use rect::{CellDelta, CellPos, GridRect, is_overlapping};
pub use resize::{ResizeDirection, ResizePlan, plan_resize};
pub use selection::{RubberBand, toggle_tile};

/// Why a move or resize was not accepted. The caller's clips are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// The proposed rectangle overlaps a clip that is not part of the gesture.
    #[error("clip {clip} would overlap clip {blocked_by}")]
    Collision { clip: ClipId, blocked_by: ClipId },

    /// The gesture refers to a clip that is not in the snapshot.
    #[error("clip {0} is not on the grid")]
    UnknownClip(ClipId),
}
