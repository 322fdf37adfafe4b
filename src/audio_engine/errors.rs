//! Audio-specific error types.

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while fetching and decoding a clip's audio payload.
#[derive(Debug, Error)]
pub enum SampleLoadError {
    /// The blob store has no payload under the clip's key.
    #[error("no audio payload stored under key {0}")]
    MissingPayload(String),

    /// The blob store failed while reading the payload.
    #[error("failed to read audio payload: {0}")]
    Store(#[from] StoreError),

    /// Failed to decode the payload.
    #[error("failed to decode audio: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    /// Failed to create resampler.
    #[error("failed to create resampler: {0}")]
    ResamplerConstruction(#[from] rubato::ResamplerConstructionError),

    /// Failed to resample audio.
    #[error("failed to resample audio: {0}")]
    Resample(#[from] rubato::ResampleError),

    /// Payload has no default track.
    #[error("audio payload has no default track")]
    NoDefaultTrack,

    /// Payload is missing sample rate information.
    #[error("audio payload is missing a sample rate")]
    MissingSampleRate,

    /// Payload is missing channel information.
    #[error("audio payload is missing channel information")]
    MissingChannels,

    /// Unsupported channel mapping configuration.
    #[error(
        "unsupported channel mapping: payload has {file_channels} channels, output has {output_channels} channels (only mono↔stereo supported)"
    )]
    UnsupportedChannels {
        /// Number of channels in the payload.
        file_channels: usize,
        /// Number of channels expected for output.
        output_channels: usize,
    },
}

/// Errors raised by a playback backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no audio output device found")]
    NoDevice,

    #[error("failed to query output config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    /// The control ring buffer to the audio thread is full.
    #[error("control queue is full")]
    QueueFull,

    /// The sample does not match the output channel count.
    #[error("sample has {sample} channels, output has {output}")]
    ChannelMismatch { sample: usize, output: usize },
}
