//! Audio Stream Module
//!
//! CPAL output stream management:
//! - Stream initialization against the default output device
//! - The real-time callback draining control messages into the [`RtMixer`]
//! - [`CpalBackend`], the [`PlaybackBackend`] the engine talks to

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Stream, StreamConfig};
use env_logger::{Builder, Env};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::audio_engine::backend::{OutputFormat, PlaybackBackend};
use crate::audio_engine::errors::BackendError;
use crate::audio_engine::mixer::RtMixer;
use crate::config::EngineConfig;
use crate::messages::{AudioMessage, ControlMessage, SampleBuffer, VoiceId};

/// Setup and configure the logger.
pub fn setup_logger() {
    // Users can override via `RUST_LOG`, e.g. `RUST_LOG=debug` when troubleshooting.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init()
        .unwrap_or(()); // Ignore initialization errors
}

/// Output through the default CPAL device.
///
/// Commands travel to the audio callback over an `rtrb` ring buffer; end-of-voice
/// notifications come back over a second one.
pub struct CpalBackend {
    // Dropping the stream stops the callback.
    _stream: Stream,
    producer: Producer<ControlMessage>,
    consumer: Consumer<AudioMessage>,
    format: OutputFormat,
}

impl CpalBackend {
    /// Opens and starts the default output device.
    pub fn open(config: &EngineConfig) -> Result<Self, BackendError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(BackendError::NoDevice)?;

        let device_config = device.default_output_config()?;
        let sample_rate = device_config.sample_rate();
        let channels = device_config.channels();

        log::info!("Starting audio output... ({} ch@{} Hz)", channels, sample_rate);

        let capacity = config.audio.ring_capacity.max(1);

        // Control side -> audio thread
        let (producer_in, mut consumer_in) = RingBuffer::<ControlMessage>::new(capacity);

        // Audio thread -> control side
        let (mut producer_out, consumer_out) = RingBuffer::<AudioMessage>::new(capacity);

        let mut mixer = RtMixer::new(channels as usize, sample_rate, config);

        let stream_config = StreamConfig {
            channels,
            sample_rate,
            buffer_size: BufferSize::Fixed(config.audio.buffer_frames),
        };

        let stream = device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                while let Ok(message) = consumer_in.pop() {
                    if let Some(reply) = mixer.handle_message(message) {
                        let _ = producer_out.push(reply);
                    }
                }

                mixer.render(data, |voice| {
                    let _ = producer_out.push(AudioMessage::VoiceEnded(voice));
                });
            },
            |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )?;

        stream.play()?;

        Ok(Self {
            _stream: stream,
            producer: producer_in,
            consumer: consumer_out,
            format: OutputFormat {
                channels: channels as usize,
                sample_rate,
            },
        })
    }

    /// Round-trips a message through the audio thread; the `Pong` arrives via `poll_message`.
    pub fn ping(&mut self) -> Result<(), BackendError> {
        self.send(ControlMessage::Ping)
    }

    fn send(&mut self, message: ControlMessage) -> Result<(), BackendError> {
        self.producer
            .push(message)
            .map_err(|_| BackendError::QueueFull)
    }
}

impl PlaybackBackend for CpalBackend {
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
        })
    }

    fn set_voice_gain(&mut self, voice: VoiceId, gain: f32) -> Result<(), BackendError> {
        self.send(ControlMessage::SetVoiceGain { voice, gain })
    }

    fn stop_voice(&mut self, voice: VoiceId) -> Result<(), BackendError> {
        self.send(ControlMessage::StopVoice(voice))
    }

    fn set_master_gain(&mut self, gain: f32) -> Result<(), BackendError> {
        self.send(ControlMessage::SetMasterGain(gain))
    }

    fn poll_message(&mut self) -> Option<AudioMessage> {
        self.consumer.pop().ok()
    }
}
