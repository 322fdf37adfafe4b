//! Output peak limiter.
//!
//! A feed-forward compressor with a hard knee: the per-frame peak across channels is compared
//! against the threshold, the gain reduction is smoothed with separate attack and release time
//! constants, and a hard clamp at [`OUTPUT_CEILING`] catches whatever the attack lets through.

use crate::audio_engine::constants::OUTPUT_CEILING;
use crate::config::LimiterConfig;

/// One-pole coefficient for a time constant in milliseconds.
pub(crate) fn one_pole_coeff(time_ms: f32, sample_rate: u32) -> f32 {
    if !time_ms.is_finite() || time_ms <= 0.0 || sample_rate == 0 {
        return 0.0;
    }
    (-1.0 / (time_ms * 0.001 * sample_rate as f32)).exp()
}

#[derive(Debug, Clone)]
pub struct Limiter {
    threshold_db: f32,
    slope: f32,
    attack_coeff: f32,
    release_coeff: f32,
    /// Smoothed gain reduction in dB (>= 0).
    reduction_db: f32,
}

impl Limiter {
    pub fn new(config: &LimiterConfig, sample_rate: u32) -> Self {
        let ratio = if config.ratio.is_finite() && config.ratio >= 1.0 {
            config.ratio
        } else {
            1.0
        };

        Self {
            threshold_db: config.threshold_db,
            slope: 1.0 - 1.0 / ratio,
            attack_coeff: one_pole_coeff(config.attack_ms, sample_rate),
            release_coeff: one_pole_coeff(config.release_ms, sample_rate),
            reduction_db: 0.0,
        }
    }

    /// Current gain reduction in dB.
    pub fn reduction_db(&self) -> f32 {
        self.reduction_db
    }

    pub fn reset(&mut self) {
        self.reduction_db = 0.0;
    }

    /// Limits interleaved `buffer` in place.
    pub fn process(&mut self, buffer: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }

        for frame in buffer.chunks_exact_mut(channels) {
            let peak = frame.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
            let level_db = if peak > 0.0 {
                20.0 * peak.log10()
            } else {
                f32::NEG_INFINITY
            };

            let target = if level_db > self.threshold_db {
                (level_db - self.threshold_db) * self.slope
            } else {
                0.0
            };

            let coeff = if target > self.reduction_db {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.reduction_db = target + coeff * (self.reduction_db - target);

            let gain = 10.0_f32.powf(-self.reduction_db / 20.0);
            for sample in frame {
                *sample = (*sample * gain).clamp(-OUTPUT_CEILING, OUTPUT_CEILING);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 48_000;

    fn limiter() -> Limiter {
        Limiter::new(&LimiterConfig::default(), RATE)
    }

    #[test]
    fn test_quiet_signal_passes_unchanged() {
        let mut limiter = limiter();
        let mut buffer = vec![0.25_f32; 2 * 1024];

        limiter.process(&mut buffer, 2);

        assert!(buffer.iter().all(|s| (*s - 0.25).abs() < 1e-6));
        assert_eq!(limiter.reduction_db(), 0.0);
    }

    #[test]
    fn test_output_never_exceeds_ceiling() {
        let mut limiter = limiter();
        let mut buffer: Vec<f32> = (0..4096)
            .map(|i| if i % 2 == 0 { 3.0 } else { -3.0 })
            .collect();

        limiter.process(&mut buffer, 2);

        assert!(buffer.iter().all(|s| s.abs() <= OUTPUT_CEILING));
    }

    #[test]
    fn test_sustained_overload_settles_near_threshold() {
        let mut limiter = limiter();
        // 0 dBFS for one second, 2 dB over the threshold.
        let mut buffer = vec![1.0_f32; RATE as usize];

        limiter.process(&mut buffer, 1);

        // 2 dB over at 20:1 leaves 0.1 dB over the threshold.
        let expected = 10.0_f32.powf((-2.0 + 0.1) / 20.0);
        let last = *buffer.last().unwrap();
        assert!((last - expected).abs() < 1e-3, "{last} vs {expected}");
    }

    #[test]
    fn test_release_recovers_gain() {
        let mut limiter = limiter();
        let mut loud = vec![1.0_f32; RATE as usize / 10];
        limiter.process(&mut loud, 1);
        assert!(limiter.reduction_db() > 1.0);

        // Two seconds of silence is eight release time constants.
        let mut silence = vec![0.0_f32; 2 * RATE as usize];
        limiter.process(&mut silence, 1);
        assert!(limiter.reduction_db() < 0.01);
    }

    #[test]
    fn test_one_pole_coeff() {
        assert_eq!(one_pole_coeff(0.0, RATE), 0.0);
        assert_eq!(one_pole_coeff(10.0, 0), 0.0);
        let c = one_pole_coeff(20.0, RATE);
        assert!(c > 0.99 && c < 1.0);
    }
}
