//! Audio engine configuration constants and limits.

/// Maximum number of voices that can be active simultaneously.
pub const MAX_VOICES: usize = 64;

/// Minimum volume level (silence).
pub const VOLUME_MIN: f32 = 0.0;

/// Maximum volume level (100%).
pub const VOLUME_MAX: f32 = 1.0;

/// Frames requested per device callback.
pub const OUTPUT_BUFFER_FRAMES: u32 = 512;

/// Capacity of each ring buffer between the control side and the audio thread.
pub const RING_BUFFER_CAPACITY: usize = 1024;

/// Fade-in applied when a clip with fading enabled starts.
pub const FADE_IN_MS: u64 = 300;

/// Fade-out used when a playing clip is toggled off.
pub const DEFAULT_STOP_FADE_MS: u64 = 500;

/// Fade-out used by stop-all.
pub const STOP_ALL_FADE_MS: u64 = 2000;

/// Gain updates per second while a fade ramp runs.
pub const FADE_STEPS_PER_SECOND: u32 = 20;

/// Time constant of the one-pole master gain smoother.
pub const MASTER_SMOOTHING_MS: f32 = 20.0;

/// Limiter threshold in dBFS.
pub const LIMITER_THRESHOLD_DB: f32 = -2.0;

/// Limiter compression ratio (N:1).
pub const LIMITER_RATIO: f32 = 20.0;

/// Limiter attack time.
pub const LIMITER_ATTACK_MS: f32 = 3.0;

/// Limiter release time.
pub const LIMITER_RELEASE_MS: f32 = 250.0;

/// Absolute output ceiling after the limiter.
pub const OUTPUT_CEILING: f32 = 1.0;

/// Sample rate assumed by the offline backend when none is given.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
