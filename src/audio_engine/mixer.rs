//! Real-time audio mixer implementation.
//!
//! [`RtMixer`] sums every active voice at its own gain, applies the smoothed master gain and
//! runs the result through the output [`Limiter`]. It is driven from the audio callback (or the
//! offline backend) and never allocates or blocks while rendering.

use cpal::Sample;

use crate::audio_engine::constants::MAX_VOICES;
use crate::audio_engine::limiter::{Limiter, one_pole_coeff};
use crate::audio_engine::voice_slot::VoiceSlot;
use crate::clip::clamp_volume;
use crate::config::EngineConfig;
use crate::messages::{AudioMessage, ControlMessage, SampleBuffer, VoiceId};

pub struct RtMixer {
    /// Number of output channels (1 for mono, 2 for stereo).
    channels: usize,

    /// Smoothed master gain, per sample.
    master_gain: f32,

    /// Master gain the smoother is heading to.
    master_target: f32,

    master_coeff: f32,

    limiter: Limiter,

    /// Active voices with MAX_VOICES slots.
    voices: [VoiceSlot; MAX_VOICES],
}

impl RtMixer {
    pub fn new(channels: usize, sample_rate: u32, config: &EngineConfig) -> Self {
        let master = clamp_volume(config.audio.initial_volume);
        Self {
            channels,
            master_gain: master,
            master_target: master,
            master_coeff: one_pole_coeff(config.audio.master_smoothing_ms, sample_rate),
            limiter: Limiter::new(&config.limiter, sample_rate),
            voices: std::array::from_fn(|_| VoiceSlot::new()),
        }
    }

    /// Applies one control message. Returns the reply for the control side, if any.
    pub fn handle_message(&mut self, message: ControlMessage) -> Option<AudioMessage> {
        match message {
            ControlMessage::Ping => Some(AudioMessage::Pong),
            ControlMessage::StartVoice {
                voice,
                sample,
                gain,
                looping,
            } => (!self.start_voice(voice, sample, gain, looping))
                .then_some(AudioMessage::VoiceDropped(voice)),
            ControlMessage::SetVoiceGain { voice, gain } => {
                self.set_voice_gain(voice, gain);
                None
            }
            ControlMessage::StopVoice(voice) => {
                self.stop_voice(voice);
                None
            }
            ControlMessage::SetMasterGain(gain) => {
                self.set_master_gain(gain);
                None
            }
        }
    }

    /// Starts `sample` on a free slot. Returns `false` when the voice was dropped, either
    /// because every slot is busy or because the sample's channel count does not match.
    pub fn start_voice(
        &mut self,
        voice: VoiceId,
        sample: SampleBuffer,
        gain: f32,
        looping: bool,
    ) -> bool {
        if sample.channels != self.channels {
            return false;
        }

        match self.voices.iter_mut().find(|slot| !slot.active) {
            Some(slot) => {
                slot.start(voice, sample, gain, looping);
                true
            }
            None => false,
        }
    }

    /// Retargets a voice's gain. Unknown voices are ignored.
    pub fn set_voice_gain(&mut self, voice: VoiceId, gain: f32) {
        if let Some(slot) = self.slot_mut(voice) {
            slot.set_target_gain(gain);
        }
    }

    /// Halts a voice and releases its sample.
    pub fn stop_voice(&mut self, voice: VoiceId) {
        if let Some(slot) = self.slot_mut(voice) {
            slot.stop();
        }
    }

    /// Sets the master gain target. Invalid values are ignored; out-of-range values clamp.
    pub fn set_master_gain(&mut self, gain: f32) {
        if gain.is_finite() {
            self.master_target = clamp_volume(gain);
        }
    }

    pub fn master_target(&self) -> f32 {
        self.master_target
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|slot| slot.active).count()
    }

    pub fn is_voice_active(&self, voice: VoiceId) -> bool {
        self.voices.iter().any(|slot| slot.is_playing_voice(voice))
    }

    /// Renders interleaved frames into `output`.
    ///
    /// `on_voice_end` is called for every non-looping voice that ran out of sample during this
    /// block; the voice's slot is already released when it is called.
    pub fn render(&mut self, output: &mut [f32], mut on_voice_end: impl FnMut(VoiceId)) {
        output.fill(f32::EQUILIBRIUM);

        if self.channels == 0 {
            return;
        }

        let frames = output.len() / self.channels;
        if frames == 0 {
            return;
        }

        for slot in &mut self.voices {
            if !slot.active {
                continue;
            }

            let Some(sample) = slot.sample.clone() else {
                slot.stop();
                continue;
            };

            let sample_frames = sample.frames();
            if sample_frames == 0 {
                let voice = slot.voice;
                slot.stop();
                on_voice_end(voice);
                continue;
            }

            let (gain_start, gain_end) = slot.take_block_gains();
            let gain_step = (gain_end - gain_start) / frames as f32;

            let mut ended = false;
            for frame in 0..frames {
                if slot.frame_pos >= sample_frames {
                    if slot.looping {
                        slot.frame_pos = 0;
                    } else {
                        ended = true;
                        break;
                    }
                }

                let gain = gain_start + gain_step * (frame + 1) as f32;
                let src = slot.frame_pos * self.channels;
                let dst = frame * self.channels;
                for channel in 0..self.channels {
                    output[dst + channel] += sample.samples[src + channel] * gain;
                }
                slot.frame_pos += 1;
            }

            if ended || (!slot.looping && slot.frame_pos >= sample_frames) {
                let voice = slot.voice;
                slot.stop();
                on_voice_end(voice);
            }
        }

        for frame in output.chunks_exact_mut(self.channels) {
            self.master_gain =
                self.master_target + self.master_coeff * (self.master_gain - self.master_target);
            for sample in frame {
                *sample *= self.master_gain;
            }
        }

        self.limiter.process(output, self.channels);
    }

    /// Gets the number of channels configured for this mixer.
    pub fn channels(&self) -> usize {
        self.channels
    }

    fn slot_mut(&mut self, voice: VoiceId) -> Option<&mut VoiceSlot> {
        self.voices
            .iter_mut()
            .find(|slot| slot.is_playing_voice(voice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 48_000;

    fn mixer(channels: usize) -> RtMixer {
        RtMixer::new(channels, RATE, &EngineConfig::default())
    }

    fn create_test_sample(channels: usize, frames: usize, value: f32) -> SampleBuffer {
        SampleBuffer::new(channels, vec![value; channels * frames])
    }

    fn render(mixer: &mut RtMixer, len: usize) -> (Vec<f32>, Vec<VoiceId>) {
        let mut output = vec![0.0; len];
        let mut ended = Vec::new();
        mixer.render(&mut output, |voice| ended.push(voice));
        (output, ended)
    }

    #[test]
    fn test_mixer_creation() {
        let mixer = mixer(2);
        assert_eq!(mixer.channels(), 2);
        assert_eq!(mixer.active_voices(), 0);
        assert_eq!(mixer.master_target(), 1.0);
    }

    #[test]
    fn test_render_silence() {
        let mut mixer = mixer(2);
        let (output, ended) = render(&mut mixer, 200);

        assert!(output.iter().all(|&s| s == 0.0));
        assert!(ended.is_empty());
    }

    #[test]
    fn test_start_voice_wrong_channels_is_dropped() {
        let mut mixer = mixer(2);
        let reply = mixer.handle_message(ControlMessage::StartVoice {
            voice: VoiceId(1),
            sample: create_test_sample(1, 10, 0.5),
            gain: 1.0,
            looping: false,
        });

        assert_eq!(reply, Some(AudioMessage::VoiceDropped(VoiceId(1))));
        assert_eq!(mixer.active_voices(), 0);
    }

    #[test]
    fn test_ping() {
        let mut mixer = mixer(1);
        assert_eq!(mixer.handle_message(ControlMessage::Ping), Some(AudioMessage::Pong));
    }

    #[test]
    fn test_render_loop_sample() {
        let mut mixer = mixer(1);
        mixer.start_voice(VoiceId(1), create_test_sample(1, 5, 0.5), 1.0, true);

        let (output, ended) = render(&mut mixer, 20);

        assert!(output.iter().all(|&s| (s - 0.5).abs() < 1e-6));
        assert!(ended.is_empty());
        assert!(mixer.is_voice_active(VoiceId(1)));
    }

    #[test]
    fn test_non_looping_voice_ends_and_releases_sample() {
        let mut mixer = mixer(1);
        let sample = create_test_sample(1, 5, 0.5);
        mixer.start_voice(VoiceId(7), sample.clone(), 1.0, false);

        let (output, ended) = render(&mut mixer, 8);

        assert_eq!(ended, vec![VoiceId(7)]);
        assert!(output[..5].iter().all(|&s| (s - 0.5).abs() < 1e-6));
        assert!(output[5..].iter().all(|&s| s == 0.0));
        assert_eq!(mixer.active_voices(), 0);
        // Only the test holds the sample now.
        assert_eq!(std::sync::Arc::strong_count(&sample.samples), 1);
    }

    #[test]
    fn test_voice_ending_exactly_at_block_boundary() {
        let mut mixer = mixer(1);
        mixer.start_voice(VoiceId(1), create_test_sample(1, 4, 0.5), 1.0, false);

        let (_, ended) = render(&mut mixer, 4);
        assert_eq!(ended, vec![VoiceId(1)]);
    }

    #[test]
    fn test_multiple_voices_mixing() {
        let mut mixer = mixer(2);
        mixer.start_voice(VoiceId(1), create_test_sample(2, 10, 0.3), 1.0, true);
        mixer.start_voice(VoiceId(2), create_test_sample(2, 10, 0.2), 1.0, true);

        let (output, _) = render(&mut mixer, 20);

        assert!(output.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_gain_change_is_interpolated_over_block() {
        let mut mixer = mixer(1);
        mixer.start_voice(VoiceId(1), create_test_sample(1, 100, 0.5), 0.0, true);
        mixer.set_voice_gain(VoiceId(1), 1.0);

        let (output, _) = render(&mut mixer, 10);

        assert!(output.windows(2).all(|w| w[1] > w[0]));
        assert!((output[9] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_stop_voice_leaves_others_playing() {
        let mut mixer = mixer(1);
        mixer.start_voice(VoiceId(1), create_test_sample(1, 10, 0.1), 1.0, true);
        mixer.start_voice(VoiceId(2), create_test_sample(1, 10, 0.1), 1.0, true);

        mixer.stop_voice(VoiceId(1));
        assert!(!mixer.is_voice_active(VoiceId(1)));
        assert!(mixer.is_voice_active(VoiceId(2)));
        assert_eq!(mixer.active_voices(), 1);
    }

    #[test]
    fn test_non_finite_initial_volume_starts_silent() {
        let mut config = EngineConfig::default();
        config.audio.initial_volume = f32::NAN;
        let mut mixer = RtMixer::new(1, RATE, &config);
        assert_eq!(mixer.master_target(), 0.0);

        mixer.start_voice(VoiceId(1), create_test_sample(1, 16, 0.5), 1.0, true);
        let (output, _) = render(&mut mixer, 16);
        assert!(output.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_master_gain_is_smoothed() {
        let mut mixer = mixer(1);
        mixer.start_voice(VoiceId(1), create_test_sample(1, 64, 0.5), 1.0, true);
        mixer.set_master_gain(0.0);

        let (output, _) = render(&mut mixer, 64);

        // No step: the first frame is still close to full level and it decays from there.
        assert!(output[0] > 0.49);
        assert!(output.windows(2).all(|w| w[1] <= w[0]));
        assert!(output[63] > 0.0);

        // Twenty time constants later it is silent.
        let (output, _) = render(&mut mixer, RATE as usize * 2 / 5);
        assert!(output.last().unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_master_gain_clamps_and_ignores_nan() {
        let mut mixer = mixer(1);
        mixer.set_master_gain(3.0);
        assert_eq!(mixer.master_target(), 1.0);
        mixer.set_master_gain(-1.0);
        assert_eq!(mixer.master_target(), 0.0);
        mixer.set_master_gain(f32::NAN);
        assert_eq!(mixer.master_target(), 0.0);
    }

    #[test]
    fn test_loud_mix_is_limited() {
        let mut mixer = mixer(1);
        for id in 0..4 {
            mixer.start_voice(VoiceId(id), create_test_sample(1, 1000, 0.9), 1.0, true);
        }

        let (output, _) = render(&mut mixer, 4800);

        assert!(output.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_voice_limit() {
        let mut mixer = mixer(1);
        let started = (0..(MAX_VOICES as u64 + 5))
            .filter(|id| mixer.start_voice(VoiceId(*id), create_test_sample(1, 10, 0.1), 1.0, true))
            .count();

        assert_eq!(started, MAX_VOICES);
        assert_eq!(mixer.active_voices(), MAX_VOICES);
    }
}
