//! Clip records shared by the grid and playback engines.
//!
//! A [`Clip`] is the unit a user places on the grid and triggers. The engines never persist
//! clips themselves; callers hand them a snapshot of the current profile's clips and write the
//! proposed changes back to their repository.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::audio_engine::constants::{VOLUME_MAX, VOLUME_MIN};
use crate::grid::GridRect;

/// Stable, opaque clip identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(String);

impl ClipId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClipId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ClipId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of an audio payload in the blob store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobKey(String);

impl BlobKey {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BlobKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BlobKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name given to clips saved without one.
pub const DEFAULT_CLIP_NAME: &str = "Untitled";

/// A placed, optionally playable tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,
    pub name: String,

    /// Original file name of the payload, kept for backups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    /// `#rrggbb` tile color.
    pub color: String,

    /// Payload reference; `None` marks a silent placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_key: Option<BlobKey>,

    /// Grid placement in cell units (1-based).
    #[serde(flatten)]
    pub rect: GridRect,

    #[serde(deserialize_with = "deserialize_volume")]
    volume: f32,

    pub looping: bool,
    pub fade: bool,
}

impl Clip {
    /// Creates a 1×1 clip at `(x, y)` with the defaults new tiles get: full volume, looping and
    /// fading enabled. The origin is floored at `(1, 1)`.
    pub fn new(name: impl Into<String>, color: impl Into<String>, x: i32, y: i32) -> Self {
        let name = name.into();
        let name = if name.trim().is_empty() {
            DEFAULT_CLIP_NAME.to_string()
        } else {
            name
        };

        Self {
            id: ClipId::generate(),
            name,
            file_name: None,
            color: color.into(),
            audio_key: None,
            rect: GridRect::on_grid(x, y, 1, 1),
            volume: 1.0,
            looping: true,
            fade: true,
        }
    }

    pub fn with_id(mut self, id: impl Into<ClipId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_size(mut self, width: i32, height: i32) -> Self {
        self.rect = GridRect::new(self.rect.x, self.rect.y, width, height);
        self
    }

    pub fn with_audio(mut self, key: impl Into<BlobKey>) -> Self {
        self.audio_key = Some(key.into());
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.set_volume(volume);
        self
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_fade(mut self, fade: bool) -> Self {
        self.fade = fade;
        self
    }

    /// Clip-relative gain in `[0, 1]`.
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Sets the clip gain, clamped to `[0, 1]`. Non-finite values are ignored.
    pub fn set_volume(&mut self, volume: f32) {
        if volume.is_finite() {
            self.volume = clamp_volume(volume);
        }
    }

    /// Moves the clip origin, floored at `(1, 1)`; width and height stay as they are.
    pub fn move_to(&mut self, x: i32, y: i32) {
        self.rect = GridRect::on_grid(x, y, self.rect.w, self.rect.h);
    }

    /// Changes the clip size, flooring both dimensions at one cell.
    pub fn resize(&mut self, width: i32, height: i32) {
        self.rect = GridRect::new(self.rect.x, self.rect.y, width, height);
    }

    pub fn has_audio(&self) -> bool {
        self.audio_key.is_some()
    }
}

/// Clamps a gain into `[VOLUME_MIN, VOLUME_MAX]`; non-finite values are silence.
pub(crate) fn clamp_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(VOLUME_MIN, VOLUME_MAX)
    } else {
        VOLUME_MIN
    }
}

fn deserialize_volume<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let volume = f32::deserialize(deserializer)?;
    Ok(clamp_volume(volume))
}
