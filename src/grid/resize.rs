use std::fmt;
use std::str::FromStr;

use crate::clip::{Clip, ClipId};
use crate::grid::PlacementError;
use crate::grid::collision::first_collision;
use crate::grid::geometry::round_half_up;
use crate::grid::rect::GridRect;

/// Edge or corner handle a resize gesture was started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeDirection {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl ResizeDirection {
    pub const ALL: [ResizeDirection; 8] = [
        Self::N,
        Self::S,
        Self::E,
        Self::W,
        Self::NE,
        Self::NW,
        Self::SE,
        Self::SW,
    ];

    fn east(self) -> bool {
        matches!(self, Self::E | Self::NE | Self::SE)
    }

    fn west(self) -> bool {
        matches!(self, Self::W | Self::NW | Self::SW)
    }

    fn south(self) -> bool {
        matches!(self, Self::S | Self::SE | Self::SW)
    }

    fn north(self) -> bool {
        matches!(self, Self::N | Self::NE | Self::NW)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::N => "n",
            Self::S => "s",
            Self::E => "e",
            Self::W => "w",
            Self::NE => "ne",
            Self::NW => "nw",
            Self::SE => "se",
            Self::SW => "sw",
        }
    }
}

impl fmt::Display for ResizeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resize direction: {0:?}")]
pub struct ParseDirectionError(String);

impl FromStr for ResizeDirection {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|dir| dir.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseDirectionError(s.to_string()))
    }
}

/// Accepted outcome of a resize gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizePlan {
    pub id: ClipId,
    pub rect: GridRect,
    /// The origin changed (west/north handles).
    pub moved: bool,
    /// Width or height changed.
    pub resized: bool,
}

/// Converts a pixel distance into whole cell steps.
pub fn cell_steps(pixel_delta: f64, cell_size: f64, gap: f64) -> i32 {
    let pitch = cell_size + gap;
    if !pixel_delta.is_finite() || !pitch.is_finite() || pitch <= 0.0 {
        return 0;
    }
    round_half_up(pixel_delta / pitch)
}

/// Plans resizing `clip` by a pointer drag of `(pixel_dx, pixel_dy)` on the `direction` handle.
///
/// Returns `Ok(None)` when the drag is shorter than half a cell on both axes or leaves the
/// rectangle unchanged. West and north handles move the origin and shrink the opposite way; an
/// axis whose origin would leave the grid is ignored while the other axis still applies.
pub fn plan_resize(
    clip: &Clip,
    direction: ResizeDirection,
    pixel_dx: f64,
    pixel_dy: f64,
    cell_size: f64,
    gap: f64,
    clips: &[Clip],
) -> Result<Option<ResizePlan>, PlacementError> {
    let col_steps = cell_steps(pixel_dx, cell_size, gap);
    let row_steps = cell_steps(pixel_dy, cell_size, gap);
    if col_steps == 0 && row_steps == 0 {
        return Ok(None);
    }

    let GridRect { x, y, w, h } = clip.rect;
    let (mut new_x, mut new_y, mut new_w, mut new_h) = (x, y, w, h);

    if direction.east() {
        new_w = w + col_steps;
    } else if direction.west() && x + col_steps >= 1 {
        new_x = x + col_steps;
        new_w = w - col_steps;
    }

    if direction.south() {
        new_h = h + row_steps;
    } else if direction.north() && y + row_steps >= 1 {
        new_y = y + row_steps;
        new_h = h - row_steps;
    }

    let candidate = GridRect::new(new_x, new_y, new_w, new_h);
    if candidate == clip.rect {
        return Ok(None);
    }

    if let Some(blocker) = first_collision(&candidate, clips, Some(&clip.id)) {
        log::debug!(
            "resize of {} via {direction} rejected, blocked by {}",
            clip.id,
            blocker.id
        );
        return Err(PlacementError::Collision {
            clip: clip.id.clone(),
            blocked_by: blocker.id.clone(),
        });
    }

    Ok(Some(ResizePlan {
        id: clip.id.clone(),
        rect: candidate,
        moved: candidate.x != x || candidate.y != y,
        resized: candidate.w != w || candidate.h != h,
    }))
}
