//! Soundboard core: clip placement on a spatial grid, clip playback, and clip coloring.
//!
//! - [`grid`]: collision-free placement, group moves, resizes and selection
//! - [`audio_engine`]: per-clip playback with fades, master gain and output limiting
//! - [`color`]: deterministic tile colors for numbered clip families
//! - [`store`]: the blob store holding audio payloads

pub mod audio_engine;
pub mod clip;
pub mod color;
pub mod config;
pub mod grid;
pub mod messages;
pub mod store;

pub use audio_engine::audio_stream::setup_logger;
pub use audio_engine::backend::{OfflineBackend, OutputFormat, PlaybackBackend};
pub use audio_engine::{BackendStatus, ClipState, SoundboardEngine};
pub use clip::{BlobKey, Clip, ClipId};
pub use config::{ConfigError, EngineConfig};
pub use grid::{GridRect, PlacementError};
pub use messages::PlaybackEvent;
pub use store::{BlobStore, FsBlobStore, MemoryBlobStore, StoreError};
