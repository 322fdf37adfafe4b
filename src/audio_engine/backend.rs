//! The seam between [`SoundboardEngine`](crate::audio_engine::SoundboardEngine) and an audio
//! output.
//!
//! [`CpalBackend`](crate::audio_engine::audio_stream::CpalBackend) plays through the default
//! device; [`OfflineBackend`] renders in-process, for tests and bounces.

use std::collections::VecDeque;

use crate::audio_engine::constants::DEFAULT_SAMPLE_RATE;
use crate::audio_engine::errors::BackendError;
use crate::audio_engine::mixer::RtMixer;
use crate::config::EngineConfig;
use crate::messages::{AudioMessage, ControlMessage, SampleBuffer, VoiceId};

/// Channel count and sample rate every sample handed to a backend must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub channels: usize,
    pub sample_rate: u32,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

/// Capabilities the engine needs from an audio output.
pub trait PlaybackBackend {
    fn format(&self) -> OutputFormat;

    /// Starts `sample` from its first frame.
    fn start_voice(
        &mut self,
        voice: VoiceId,
        sample: SampleBuffer,
        gain: f32,
        looping: bool,
    ) -> Result<(), BackendError>;

    fn set_voice_gain(&mut self, voice: VoiceId, gain: f32) -> Result<(), BackendError>;

    /// Halts and rewinds the voice, releasing its sample.
    fn stop_voice(&mut self, voice: VoiceId) -> Result<(), BackendError>;

    fn set_master_gain(&mut self, gain: f32) -> Result<(), BackendError>;

    /// Next notification from the output, if any. Never blocks.
    fn poll_message(&mut self) -> Option<AudioMessage>;
}

/// Drives an [`RtMixer`] directly; audio only advances when [`OfflineBackend::render`] is called.
pub struct OfflineBackend {
    format: OutputFormat,
    mixer: RtMixer,
    pending: VecDeque<AudioMessage>,
}

impl OfflineBackend {
    pub fn new(format: OutputFormat, config: &EngineConfig) -> Self {
        Self {
            format,
            mixer: RtMixer::new(format.channels, format.sample_rate, config),
            pending: VecDeque::new(),
        }
    }

    pub fn mixer(&self) -> &RtMixer {
        &self.mixer
    }

    /// Renders interleaved frames into `output`, queueing end-of-voice notifications.
    pub fn render(&mut self, output: &mut [f32]) {
        let pending = &mut self.pending;
        self.mixer
            .render(output, |voice| pending.push_back(AudioMessage::VoiceEnded(voice)));
    }

    /// Renders `frames` frames into a new buffer.
    pub fn render_frames(&mut self, frames: usize) -> Vec<f32> {
        let mut output = vec![0.0; frames * self.format.channels];
        self.render(&mut output);
        output
    }

    fn send(&mut self, message: ControlMessage) {
        if let Some(reply) = self.mixer.handle_message(message) {
            self.pending.push_back(reply);
        }
    }
}

impl PlaybackBackend for OfflineBackend {
    fn format(&self) -> OutputFormat {
        self.format
    }

    fn start_voice(
        &mut self,
        voice: VoiceId,
        sample: SampleBuffer,
        gain: f32,
        looping: bool,
    ) -> Result<(), BackendError> {
        if sample.channels != self.format.channels {
            return Err(BackendError::ChannelMismatch {
                sample: sample.channels,
                output: self.format.channels,
            });
        }

        self.send(ControlMessage::StartVoice {
            voice,
            sample,
            gain,
            looping,
        });
        Ok(())
    }

    fn set_voice_gain(&mut self, voice: VoiceId, gain: f32) -> Result<(), BackendError> {
        self.send(ControlMessage::SetVoiceGain { voice, gain });
        Ok(())
    }

    fn stop_voice(&mut self, voice: VoiceId) -> Result<(), BackendError> {
        self.send(ControlMessage::StopVoice(voice));
        Ok(())
    }

    fn set_master_gain(&mut self, gain: f32) -> Result<(), BackendError> {
        self.send(ControlMessage::SetMasterGain(gain));
        Ok(())
    }

    fn poll_message(&mut self) -> Option<AudioMessage> {
        self.pending.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> OfflineBackend {
        OfflineBackend::new(
            OutputFormat {
                channels: 1,
                sample_rate: 48_000,
            },
            &EngineConfig::default(),
        )
    }

    #[test]
    fn test_voice_end_is_reported_once() {
        let mut backend = backend();
        backend
            .start_voice(VoiceId(1), SampleBuffer::new(1, vec![0.1; 16]), 1.0, false)
            .unwrap();

        backend.render_frames(32);
        backend.render_frames(32);

        assert_eq!(backend.poll_message(), Some(AudioMessage::VoiceEnded(VoiceId(1))));
        assert_eq!(backend.poll_message(), None);
    }

    #[test]
    fn test_channel_mismatch_is_rejected() {
        let mut backend = backend();
        let result = backend.start_voice(VoiceId(1), SampleBuffer::new(2, vec![0.0; 4]), 1.0, true);

        assert!(matches!(result, Err(BackendError::ChannelMismatch { sample: 2, output: 1 })));
        assert_eq!(backend.mixer().active_voices(), 0);
    }

    #[test]
    fn test_stop_voice_silences_output() {
        let mut backend = backend();
        backend
            .start_voice(VoiceId(1), SampleBuffer::new(1, vec![0.1; 16]), 1.0, true)
            .unwrap();
        assert!(backend.render_frames(8).iter().all(|s| *s > 0.0));

        backend.stop_voice(VoiceId(1)).unwrap();
        assert!(backend.render_frames(8).iter().all(|s| *s == 0.0));
        assert_eq!(backend.poll_message(), None);
    }

    #[test]
    fn test_master_gain_reaches_mixer() {
        let mut backend = backend();
        backend.set_master_gain(0.25).unwrap();
        assert_eq!(backend.mixer().master_target(), 0.25);
    }
}
