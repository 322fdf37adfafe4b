//! Engine configuration.
//!
//! Every field has a default matching [`crate::audio_engine::constants`], so a config file only
//! needs to name what it changes:
//!
//! ```toml
//! [fades]
//! stop_all_ms = 1000
//!
//! [limiter]
//! threshold_db = -1.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::audio_engine::constants::{
    DEFAULT_STOP_FADE_MS, FADE_IN_MS, FADE_STEPS_PER_SECOND, LIMITER_ATTACK_MS,
    LIMITER_RATIO, LIMITER_RELEASE_MS, LIMITER_THRESHOLD_DB, MASTER_SMOOTHING_MS,
    OUTPUT_BUFFER_FRAMES, RING_BUFFER_CAPACITY, STOP_ALL_FADE_MS,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration for the playback engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub audio: AudioConfig,
    pub fades: FadeConfig,
    pub limiter: LimiterConfig,
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }
}

/// Output stream and master bus settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Frames per device callback.
    pub buffer_frames: u32,

    /// Capacity of the control and feedback ring buffers.
    pub ring_capacity: usize,

    /// Global volume applied when the engine starts.
    pub initial_volume: f32,

    /// Time constant of the master gain smoothing.
    pub master_smoothing_ms: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            buffer_frames: OUTPUT_BUFFER_FRAMES,
            ring_capacity: RING_BUFFER_CAPACITY,
            initial_volume: 1.0,
            master_smoothing_ms: MASTER_SMOOTHING_MS,
        }
    }
}

/// Fade durations and ramp resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FadeConfig {
    pub fade_in_ms: u64,

    /// Fade used when a playing clip is toggled off.
    pub stop_ms: u64,

    pub stop_all_ms: u64,

    /// Gain updates per second while a ramp runs.
    pub steps_per_second: u32,
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            fade_in_ms: FADE_IN_MS,
            stop_ms: DEFAULT_STOP_FADE_MS,
            stop_all_ms: STOP_ALL_FADE_MS,
            steps_per_second: FADE_STEPS_PER_SECOND,
        }
    }
}

impl FadeConfig {
    pub fn fade_in(&self) -> Duration {
        Duration::from_millis(self.fade_in_ms)
    }

    pub fn stop(&self) -> Duration {
        Duration::from_millis(self.stop_ms)
    }

    pub fn stop_all(&self) -> Duration {
        Duration::from_millis(self.stop_all_ms)
    }
}

/// Output peak limiter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            threshold_db: LIMITER_THRESHOLD_DB,
            ratio: LIMITER_RATIO,
            attack_ms: LIMITER_ATTACK_MS,
            release_ms: LIMITER_RELEASE_MS,
        }
    }
}
