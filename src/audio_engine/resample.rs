//! Sample-rate conversion of decoded clips to the output device rate.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::audio_engine::channels::{deinterleave, interleave};
use crate::audio_engine::errors::SampleLoadError;

const CHUNK_FRAMES: usize = 1024;

/// Resamples interleaved `samples` from `from_hz` to `to_hz`.
///
/// The output is trimmed to the expected length so clip durations are preserved.
pub fn resample_interleaved(
    samples: &[f32],
    channels: usize,
    from_hz: u32,
    to_hz: u32,
) -> Result<Vec<f32>, SampleLoadError> {
    if from_hz == to_hz || samples.is_empty() || channels == 0 {
        return Ok(samples.to_vec());
    }

    let ratio = f64::from(to_hz) / f64::from(from_hz);
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_FRAMES, channels)?;

    let planar = deinterleave(samples, channels);
    let input_frames = planar[0].len();
    let expected_frames = (input_frames as f64 * ratio).round() as usize;
    let delay = resampler.output_delay();

    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected_frames + delay); channels];
    let mut pos = 0;
    // Keep feeding (zero-padded) chunks until the delayed tail has come out.
    while output[0].len() < expected_frames + delay {
        let chunk: Vec<Vec<f32>> = planar
            .iter()
            .map(|channel| {
                let end = (pos + CHUNK_FRAMES).min(channel.len());
                let mut chunk = channel.get(pos..end).unwrap_or_default().to_vec();
                chunk.resize(CHUNK_FRAMES, 0.0);
                chunk
            })
            .collect();
        pos += CHUNK_FRAMES;

        let out = resampler.process(&chunk, None)?;
        for (dst, src) in output.iter_mut().zip(out) {
            dst.extend_from_slice(&src);
        }
    }

    for channel in &mut output {
        channel.drain(..delay.min(channel.len()));
        channel.truncate(expected_frames);
    }

    log::debug!(
        "resampled {input_frames} frames @ {from_hz} Hz to {expected_frames} frames @ {to_hz} Hz"
    );
    Ok(interleave(&output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_is_passthrough() {
        let input = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(resample_interleaved(&input, 2, 44_100, 44_100).unwrap(), input);
    }

    #[test]
    fn test_upsample_preserves_duration() {
        let frames = 4410;
        let input: Vec<f32> = (0..frames * 2)
            .map(|i| ((i / 2) as f32 * 0.01).sin() * 0.5)
            .collect();

        let output = resample_interleaved(&input, 2, 44_100, 48_000).unwrap();

        assert_eq!(output.len(), 4800 * 2);
        assert!(output.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_downsample_preserves_duration() {
        let input = vec![0.25_f32; 9600];
        let output = resample_interleaved(&input, 1, 48_000, 24_000).unwrap();

        assert_eq!(output.len(), 4800);
        // A DC signal stays DC away from the edges.
        assert!((output[2400] - 0.25).abs() < 0.05);
    }
}
