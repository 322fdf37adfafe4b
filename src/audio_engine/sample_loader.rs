//! Audio payload decoding.
//!
//! Turns the raw bytes of a clip's payload into a [`SampleBuffer`] at the output channel count
//! and sample rate, ready to hand to the real-time mixer.

use std::io::Cursor;
use std::path::Path;

use symphonia::core::{
    audio::SampleBuffer as SymphoniaSampleBuffer, codecs::DecoderOptions,
    errors::Error as SymphoniaError, formats::FormatOptions, io::MediaSourceStream,
    meta::MetadataOptions, probe::Hint,
};
use symphonia::default::{get_codecs, get_probe};

use crate::audio_engine::channels::map_channels;
use crate::audio_engine::errors::SampleLoadError;
use crate::audio_engine::resample::resample_interleaved;
use crate::clip::BlobKey;
use crate::messages::SampleBuffer;
use crate::store::BlobStore;

/// Fetches `key` from `store` and decodes it.
///
/// A key with no stored payload is [`SampleLoadError::MissingPayload`].
pub fn load_clip_audio(
    store: &dyn BlobStore,
    key: &BlobKey,
    file_name: Option<&str>,
    output_channels: usize,
    output_rate_hz: u32,
) -> Result<SampleBuffer, SampleLoadError> {
    let bytes = store
        .get(key)?
        .ok_or_else(|| SampleLoadError::MissingPayload(key.to_string()))?;

    decode_audio_bytes_to_sample_buffer(bytes, file_name, output_channels, output_rate_hz)
}

/// Decodes an in-memory audio payload.
///
/// `file_name` only feeds the format probe a hint from its extension; the payload is probed
/// either way. Corrupt packets are skipped; a stream that cannot be probed or has no usable
/// track is an error.
pub fn decode_audio_bytes_to_sample_buffer(
    bytes: Vec<u8>,
    file_name: Option<&str>,
    output_channels: usize,
    output_rate_hz: u32,
) -> Result<SampleBuffer, SampleLoadError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|e| e.to_str())
    {
        hint.with_extension(ext);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or(SampleLoadError::NoDefaultTrack)?;
    let track_id = track.id;
    let file_rate_hz = track
        .codec_params
        .sample_rate
        .ok_or(SampleLoadError::MissingSampleRate)?;
    let file_channels = track
        .codec_params
        .channels
        .ok_or(SampleLoadError::MissingChannels)?
        .count();

    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut decoded: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(SampleLoadError::Decode(err)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let audio_buf = match decoder.decode(&packet) {
            Ok(buf) => buf,
            Err(SymphoniaError::DecodeError(err)) => {
                log::warn!("skipping corrupt packet: {err}");
                continue;
            }
            Err(err) => return Err(SampleLoadError::Decode(err)),
        };
        let spec = *audio_buf.spec();
        let duration = audio_buf.capacity() as u64;

        let mut sample_buf = SymphoniaSampleBuffer::<f32>::new(duration, spec);
        sample_buf.copy_interleaved_ref(audio_buf);
        decoded.extend_from_slice(sample_buf.samples());
    }

    let resampled = resample_interleaved(&decoded, file_channels, file_rate_hz, output_rate_hz)?;
    let mapped = map_channels(resampled, file_channels, output_channels)?;

    log::debug!(
        "decoded {} frames ({file_channels} ch @ {file_rate_hz} Hz) to {output_channels} ch @ {output_rate_hz} Hz",
        mapped.len() / output_channels.max(1)
    );

    Ok(SampleBuffer::new(output_channels, mapped))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::MemoryBlobStore;

    /// Encodes a PCM16 WAV payload.
    pub(crate) fn pcm16_wav(channels: u16, sample_rate_hz: u32, samples: &[i16]) -> Vec<u8> {
        let bits_per_sample = 16u16;
        let block_align = channels * (bits_per_sample / 8);
        let byte_rate = sample_rate_hz * u32::from(block_align);
        let data_len_bytes = u32::try_from(samples.len() * 2).expect("sample data too large");
        let chunk_size = 36 + data_len_bytes;

        let mut out = Vec::with_capacity(44 + samples.len() * 2);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&chunk_size.to_le_bytes());
        out.extend_from_slice(b"WAVE");

        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate_hz.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&bits_per_sample.to_le_bytes());

        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len_bytes.to_le_bytes());
        for sample in samples {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_decode_wav_to_f32_buffer() {
        let samples = [0i16, 16_384i16, -16_384i16, 32_767i16];
        let bytes = pcm16_wav(1, 44_100, &samples);

        let decoded =
            decode_audio_bytes_to_sample_buffer(bytes, Some("kick.wav"), 1, 44_100).unwrap();
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.samples.len(), samples.len());
        assert!(decoded.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!((decoded.samples[1] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_decode_without_name_hint() {
        let bytes = pcm16_wav(1, 44_100, &[0, 100, 200]);
        let decoded = decode_audio_bytes_to_sample_buffer(bytes, None, 1, 44_100).unwrap();
        assert_eq!(decoded.frames(), 3);
    }

    #[test]
    fn test_decode_channel_mapping_mono_to_stereo() {
        let samples = [0i16, 16_384i16, -16_384i16];
        let bytes = pcm16_wav(1, 44_100, &samples);

        let decoded = decode_audio_bytes_to_sample_buffer(bytes, None, 2, 44_100).unwrap();
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.samples.len(), samples.len() * 2);

        for frame in decoded.samples.chunks_exact(2) {
            assert!((frame[0] - frame[1]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_decode_resamples_to_output_rate() {
        let samples = vec![8_000i16; 22_050];
        let bytes = pcm16_wav(1, 22_050, &samples);

        let decoded = decode_audio_bytes_to_sample_buffer(bytes, None, 1, 44_100).unwrap();
        assert_eq!(decoded.frames(), 44_100);
    }

    #[test]
    fn test_decode_garbage_is_an_error() {
        let result = decode_audio_bytes_to_sample_buffer(b"not audio".to_vec(), None, 1, 44_100);
        assert!(matches!(result, Err(SampleLoadError::Decode(_))));
    }

    #[test]
    fn test_load_missing_payload() {
        let store = MemoryBlobStore::new();
        let result = load_clip_audio(&store, &BlobKey::from("absent"), None, 2, 48_000);
        assert!(matches!(result, Err(SampleLoadError::MissingPayload(_))));
    }

    #[test]
    fn test_load_from_store() {
        let store = MemoryBlobStore::new();
        let key = BlobKey::from("clap");
        store.put(&key, &pcm16_wav(2, 48_000, &[1, 2, 3, 4])).unwrap();

        let decoded = load_clip_audio(&store, &key, Some("clap.wav"), 2, 48_000).unwrap();
        assert_eq!(decoded.frames(), 2);
    }
}
