//! Message definitions for communication between the control side and the audio thread.
//!
//! [`ControlMessage`] and [`AudioMessage`] are the wire format of the ring buffers between the
//! engine and the real-time mixer. [`LoaderEvent`] travels from the loader thread back to the
//! engine, and [`PlaybackEvent`] is what the engine reports to its host.

use std::sync::Arc;

use crate::audio_engine::errors::SampleLoadError;
use crate::clip::ClipId;

/// Decoded, interleaved audio at the output channel count and sample rate.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    pub channels: usize,
    pub samples: Arc<[f32]>,
}

impl SampleBuffer {
    pub fn new(channels: usize, samples: Vec<f32>) -> Self {
        Self {
            channels,
            samples: Arc::from(samples.into_boxed_slice()),
        }
    }

    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }
}

/// Identifies one playing voice inside the mixer. Never reused by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

/// Message that is emitted from the audio thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioMessage {
    /// Response to a Ping message.
    Pong,

    /// A non-looping voice reached the end of its sample.
    VoiceEnded(VoiceId),

    /// A voice could not start (no free slot or a channel mismatch).
    VoiceDropped(VoiceId),
}

/// Message that is emitted from the control side.
#[derive(Debug, Clone)]
pub enum ControlMessage {
    /// Used for testing message passing functionality.
    Ping,

    /// Start a voice from the beginning of `sample`.
    StartVoice {
        voice: VoiceId,
        sample: SampleBuffer,
        gain: f32,
        looping: bool,
    },

    /// Retarget a voice's gain. The mixer interpolates over one block.
    SetVoiceGain { voice: VoiceId, gain: f32 },

    /// Halt a voice and release its sample.
    StopVoice(VoiceId),

    /// Set the master gain target (0.0 to 1.0).
    SetMasterGain(f32),
}

/// Result of one background load, tagged with the request ticket.
#[derive(Debug)]
pub struct LoaderEvent {
    pub id: ClipId,
    pub ticket: u64,
    pub result: Result<SampleBuffer, SampleLoadError>,
}

/// Playing-state changes reported by [`SoundboardEngine::pump`].
///
/// [`SoundboardEngine::pump`]: crate::audio_engine::SoundboardEngine::pump
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The clip's voice started.
    Started(ClipId),

    /// The clip stopped (fade completed, hard stop, or natural end).
    Stopped(ClipId),

    /// The payload could not be fetched or decoded. The clip is idle again.
    LoadFailed { id: ClipId, error: String },
}
