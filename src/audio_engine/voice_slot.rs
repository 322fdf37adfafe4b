use crate::clip::clamp_volume;
use crate::messages::{SampleBuffer, VoiceId};

/// One mixer slot. The sample handle is held only while the slot is active.
pub struct VoiceSlot {
    pub active: bool,
    pub voice: VoiceId,
    pub sample: Option<SampleBuffer>,
    pub frame_pos: usize,
    pub looping: bool,
    /// Gain applied at the end of the previous block.
    gain: f32,
    /// Gain the next block ramps towards.
    target_gain: f32,
}

impl VoiceSlot {
    pub fn new() -> Self {
        Self {
            active: false,
            voice: VoiceId(0),
            sample: None,
            frame_pos: 0,
            looping: false,
            gain: 0.0,
            target_gain: 0.0,
        }
    }

    pub fn start(&mut self, voice: VoiceId, sample: SampleBuffer, gain: f32, looping: bool) {
        let gain = clamp_volume(gain);
        self.active = true;
        self.voice = voice;
        self.sample = Some(sample);
        self.frame_pos = 0;
        self.looping = looping;
        self.gain = gain;
        self.target_gain = gain;
    }

    /// Halts the voice, rewinds it and drops the sample handle.
    pub fn stop(&mut self) {
        self.active = false;
        self.sample = None;
        self.frame_pos = 0;
        self.looping = false;
        self.gain = 0.0;
        self.target_gain = 0.0;
    }

    pub fn set_target_gain(&mut self, gain: f32) {
        if gain.is_finite() {
            self.target_gain = clamp_volume(gain);
        }
    }

    pub fn is_playing_voice(&self, voice: VoiceId) -> bool {
        self.active && self.voice == voice
    }

    /// Gain at the start and end of the next block, then commits the end value.
    pub fn take_block_gains(&mut self) -> (f32, f32) {
        let start = self.gain;
        self.gain = self.target_gain;
        (start, self.target_gain)
    }
}

impl Default for VoiceSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SampleBuffer {
        SampleBuffer::new(1, vec![0.5; 8])
    }

    #[test]
    fn test_start_and_stop() {
        let mut slot = VoiceSlot::new();
        slot.start(VoiceId(3), sample(), 0.7, true);

        assert!(slot.is_playing_voice(VoiceId(3)));
        assert!(!slot.is_playing_voice(VoiceId(4)));
        assert_eq!(slot.take_block_gains(), (0.7, 0.7));

        slot.frame_pos = 5;
        slot.stop();
        assert!(!slot.active);
        assert!(slot.sample.is_none());
        assert_eq!(slot.frame_pos, 0);
    }

    #[test]
    fn test_gain_change_spans_one_block() {
        let mut slot = VoiceSlot::new();
        slot.start(VoiceId(1), sample(), 0.0, false);

        slot.set_target_gain(0.5);
        assert_eq!(slot.take_block_gains(), (0.0, 0.5));
        assert_eq!(slot.take_block_gains(), (0.5, 0.5));

        slot.set_target_gain(f32::NAN);
        slot.set_target_gain(4.0);
        assert_eq!(slot.take_block_gains(), (0.5, 1.0));
    }
}
