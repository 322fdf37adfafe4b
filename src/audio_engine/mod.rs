//! Audio Engine Module
//!
//! Clip playback with per-clip gain, fades, a smoothed master gain and an output limiter:
//!
//! ```text
//! clip gain -> master gain -> limiter -> output
//! ```
//!
//! - [`audio_stream`]: CPAL output and the real-time callback
//! - [`backend`]: the backend trait and the offline renderer
//! - [`constants`]: Configuration constants and limits
//! - [`errors`]: Audio-specific error types
//! - [`limiter`]: output peak limiter
//! - [`mixer`]: Real-time mixing engine
//! - [`ramp`]: timer-driven fade ramps
//! - [`sample_loader`]: payload fetching and decoding
//!
//! [`SoundboardEngine`] owns the control side. It is single-threaded: the host calls
//! [`SoundboardEngine::tick`] from its timer and [`SoundboardEngine::pump`] from its event loop,
//! and every other call runs to completion. Payloads are fetched and decoded on a loader
//! thread; the result is only committed from `pump`, after re-checking that the clip still
//! wants to play.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use crate::audio_engine::audio_stream::CpalBackend;
use crate::audio_engine::backend::PlaybackBackend;
use crate::audio_engine::ramp::GainRamp;
use crate::audio_engine::sample_loader::load_clip_audio;
use crate::clip::{Clip, ClipId, clamp_volume};
use crate::config::EngineConfig;
use crate::messages::{AudioMessage, LoaderEvent, PlaybackEvent, VoiceId};
use crate::store::BlobStore;

pub mod audio_stream;
pub mod backend;
pub mod channels;
pub mod constants;
pub mod errors;
pub mod limiter;
pub mod mixer;
pub mod ramp;
pub mod resample;
pub mod sample_loader;
mod voice_slot;

/// Where a clip is in its playback lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipState {
    Idle,
    /// The payload is being fetched and decoded.
    Loading,
    Playing,
    /// Playing, with a fade-out that ends in teardown.
    FadingOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    Ready,
    /// No audio output. Playback requests are ignored.
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FadeKind {
    In,
    Out,
}

#[derive(Debug)]
struct PendingLoad {
    ticket: u64,
    volume: f32,
    fade: bool,
    looping: bool,
    /// Toggled by `play` and set by `stop` while loading; checked when the load lands.
    cancelled: bool,
}

#[derive(Debug)]
struct PlaybackInstance {
    voice: VoiceId,
    /// Gain last sent to the backend.
    gain: f32,
    /// Clip volume the instance plays at once faded in.
    base_volume: f32,
    ramp: Option<(FadeKind, GainRamp)>,
    /// The backend refused the stop; retried from `tick` and `pump`.
    stop_pending: bool,
}

#[derive(Debug)]
enum ClipSlot {
    Loading(PendingLoad),
    Live(PlaybackInstance),
}

/// Control side of the playback engine. At most one instance exists per clip id.
pub struct SoundboardEngine<B: PlaybackBackend = CpalBackend> {
    backend: Option<B>,
    status: BackendStatus,
    store: Arc<dyn BlobStore>,
    config: EngineConfig,
    slots: HashMap<ClipId, ClipSlot>,
    voices: HashMap<VoiceId, ClipId>,
    global_volume: f32,
    next_voice: u64,
    next_ticket: u64,
    events: Vec<PlaybackEvent>,
    loader_tx: Sender<LoaderEvent>,
    loader_rx: Receiver<LoaderEvent>,
}

impl SoundboardEngine<CpalBackend> {
    /// Opens the default output device. If that fails the engine still comes up, degraded:
    /// the failure is logged once and every `play` is a no-op.
    pub fn with_default_output(store: Arc<dyn BlobStore>, config: EngineConfig) -> Self {
        match CpalBackend::open(&config) {
            Ok(backend) => Self::new(backend, store, config),
            Err(err) => {
                log::error!("audio output unavailable, playback disabled: {err}");
                Self::without_backend(err.to_string(), store, config)
            }
        }
    }
}

impl<B: PlaybackBackend> SoundboardEngine<B> {
    pub fn new(mut backend: B, store: Arc<dyn BlobStore>, config: EngineConfig) -> Self {
        let global_volume = clamp_volume(config.audio.initial_volume);
        if let Err(err) = backend.set_master_gain(global_volume) {
            log::warn!("failed to set initial master gain: {err}");
        }
        Self::build(Some(backend), BackendStatus::Ready, store, config)
    }

    /// An engine with no output at all.
    pub fn without_backend(
        reason: impl Into<String>,
        store: Arc<dyn BlobStore>,
        config: EngineConfig,
    ) -> Self {
        Self::build(None, BackendStatus::Unavailable(reason.into()), store, config)
    }

    fn build(
        backend: Option<B>,
        status: BackendStatus,
        store: Arc<dyn BlobStore>,
        config: EngineConfig,
    ) -> Self {
        let (loader_tx, loader_rx) = std::sync::mpsc::channel();
        Self {
            backend,
            status,
            store,
            global_volume: clamp_volume(config.audio.initial_volume),
            config,
            slots: HashMap::new(),
            voices: HashMap::new(),
            next_voice: 1,
            next_ticket: 1,
            events: Vec::new(),
            loader_tx,
            loader_rx,
        }
    }

    /// Toggles playback of `clip`.
    ///
    /// A live instance is stopped (with the clip's fade setting). Otherwise the payload is
    /// loaded in the background and the voice starts from [`pump`](Self::pump). Clips without
    /// audio, and every call on a degraded engine, are ignored.
    pub fn play(&mut self, clip: &Clip) {
        let Some(key) = clip.audio_key.clone() else {
            log::debug!("clip {} has no audio, ignoring play", clip.id);
            return;
        };

        let Some(backend) = self.backend.as_ref() else {
            log::debug!("no audio output, ignoring play of {}", clip.id);
            return;
        };
        let format = backend.format();

        match self.slots.get_mut(&clip.id) {
            Some(ClipSlot::Loading(pending)) => {
                pending.cancelled = !pending.cancelled;
                log::debug!(
                    "play of {} while loading, cancelled = {}",
                    clip.id,
                    pending.cancelled
                );
                return;
            }
            Some(ClipSlot::Live(_)) => {
                let duration = self.config.fades.stop();
                self.stop(&clip.id, clip.fade, duration);
                return;
            }
            None => {}
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.slots.insert(
            clip.id.clone(),
            ClipSlot::Loading(PendingLoad {
                ticket,
                volume: clip.volume(),
                fade: clip.fade,
                looping: clip.looping,
                cancelled: false,
            }),
        );

        let id = clip.id.clone();
        let file_name = clip.file_name.clone();
        let store = Arc::clone(&self.store);
        let loader_tx = self.loader_tx.clone();

        log::debug!("loading {id} (ticket {ticket})");
        thread::spawn(move || {
            let result = load_clip_audio(
                store.as_ref(),
                &key,
                file_name.as_deref(),
                format.channels,
                format.sample_rate,
            );
            let _ = loader_tx.send(LoaderEvent { id, ticket, result });
        });
    }

    /// Stops `id`. Without `fade` the instance is torn down now; with it, the gain ramps from
    /// its current value to zero over `duration` and teardown happens on the tick that
    /// finishes the ramp. A clip that is still loading will not start.
    pub fn stop(&mut self, id: &ClipId, fade: bool, duration: Duration) {
        let stop_pending = matches!(
            self.slots.get(id),
            Some(ClipSlot::Live(instance)) if instance.stop_pending
        );

        match self.slots.get_mut(id) {
            None => {}
            Some(ClipSlot::Loading(pending)) => pending.cancelled = true,
            Some(ClipSlot::Live(_)) if !fade || stop_pending => self.teardown(id),
            Some(ClipSlot::Live(instance)) => {
                if let Some((_, ramp)) = instance.ramp.as_mut() {
                    ramp.cancel();
                }
                instance.ramp = Some((
                    FadeKind::Out,
                    GainRamp::new(
                        instance.gain,
                        0.0,
                        duration,
                        self.config.fades.steps_per_second,
                    ),
                ));
            }
        }
    }

    /// Fades out everything that is playing or loading.
    pub fn stop_all(&mut self) {
        let mut ids: Vec<ClipId> = self.slots.keys().cloned().collect();
        ids.sort();

        let duration = self.config.fades.stop_all();
        for id in &ids {
            self.stop(id, true, duration);
        }
    }

    /// Sets the master gain. Clip gains are unchanged.
    pub fn set_global_volume(&mut self, volume: f32) {
        if volume.is_nan() {
            return;
        }
        self.global_volume = clamp_volume(volume);

        if let Some(backend) = self.backend.as_mut() {
            if let Err(err) = backend.set_master_gain(self.global_volume) {
                log::warn!("failed to set master gain: {err}");
            }
        }
    }

    /// Changes a live instance's volume immediately. A fade-in in progress is cancelled; a
    /// fade-out keeps running.
    pub fn set_instance_volume(&mut self, id: &ClipId, volume: f32) {
        if volume.is_nan() {
            return;
        }
        let volume = clamp_volume(volume);

        let Some(ClipSlot::Live(instance)) = self.slots.get_mut(id) else {
            return;
        };
        instance.base_volume = volume;

        if instance.stop_pending || matches!(instance.ramp, Some((FadeKind::Out, _))) {
            return;
        }
        if let Some((_, ramp)) = instance.ramp.as_mut() {
            ramp.cancel();
        }
        instance.ramp = None;
        instance.gain = volume;

        if let Some(backend) = self.backend.as_mut() {
            if let Err(err) = backend.set_voice_gain(instance.voice, volume) {
                log::warn!("failed to set gain of {id}: {err}");
            }
        }
    }

    /// Advances every fade by `elapsed` and tears down finished fade-outs.
    pub fn tick(&mut self, elapsed: Duration) {
        self.retry_pending_stops();
        let mut finished = Vec::new();

        for (id, slot) in &mut self.slots {
            let ClipSlot::Live(instance) = slot else {
                continue;
            };
            let Some((kind, ramp)) = instance.ramp.as_mut() else {
                continue;
            };
            let kind = *kind;

            if let Some(gain) = ramp.advance(elapsed) {
                instance.gain = gain;
                if let Some(backend) = self.backend.as_mut() {
                    if let Err(err) = backend.set_voice_gain(instance.voice, gain) {
                        log::warn!("failed to set gain of {id}: {err}");
                    }
                }
            }

            if ramp.is_done() {
                match kind {
                    FadeKind::In => instance.ramp = None,
                    FadeKind::Out => finished.push(id.clone()),
                }
            }
        }

        finished.sort();
        for id in &finished {
            self.teardown(id);
        }
    }

    /// Commits finished loads and handles backend notifications. Returns every playing-state
    /// change since the previous call, in order.
    pub fn pump(&mut self) -> Vec<PlaybackEvent> {
        self.retry_pending_stops();
        while let Ok(event) = self.loader_rx.try_recv() {
            self.on_load_complete(event);
        }
        self.drain_backend();
        std::mem::take(&mut self.events)
    }

    /// Like [`pump`](Self::pump), but first waits up to `timeout` for a load to finish when
    /// one is in flight.
    pub fn pump_wait(&mut self, timeout: Duration) -> Vec<PlaybackEvent> {
        let loading = self
            .slots
            .values()
            .any(|slot| matches!(slot, ClipSlot::Loading(_)));

        if loading {
            match self.loader_rx.recv_timeout(timeout) {
                Ok(event) => self.on_load_complete(event),
                Err(RecvTimeoutError::Timeout) => log::debug!("no load finished in {timeout:?}"),
                Err(RecvTimeoutError::Disconnected) => {}
            }
        }
        self.pump()
    }

    pub fn state(&self, id: &ClipId) -> ClipState {
        match self.slots.get(id) {
            None => ClipState::Idle,
            Some(ClipSlot::Loading(_)) => ClipState::Loading,
            Some(ClipSlot::Live(instance)) if instance.stop_pending => ClipState::FadingOut,
            Some(ClipSlot::Live(instance)) => match instance.ramp {
                Some((FadeKind::Out, _)) => ClipState::FadingOut,
                _ => ClipState::Playing,
            },
        }
    }

    pub fn is_playing(&self, id: &ClipId) -> bool {
        matches!(self.slots.get(id), Some(ClipSlot::Live(_)))
    }

    /// Ids with a live instance, sorted.
    pub fn playing_ids(&self) -> Vec<ClipId> {
        let mut ids: Vec<ClipId> = self
            .slots
            .iter()
            .filter(|(_, slot)| matches!(slot, ClipSlot::Live(_)))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Current gain of a live instance.
    pub fn instance_volume(&self, id: &ClipId) -> Option<f32> {
        match self.slots.get(id) {
            Some(ClipSlot::Live(instance)) => Some(instance.gain),
            _ => None,
        }
    }

    /// Volume a live instance settles at when no fade is running.
    pub fn instance_base_volume(&self, id: &ClipId) -> Option<f32> {
        match self.slots.get(id) {
            Some(ClipSlot::Live(instance)) => Some(instance.base_volume),
            _ => None,
        }
    }

    pub fn global_volume(&self) -> f32 {
        self.global_volume
    }

    pub fn backend_status(&self) -> &BackendStatus {
        &self.status
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.backend.as_mut()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn on_load_complete(&mut self, event: LoaderEvent) {
        let LoaderEvent { id, ticket, result } = event;

        let current = matches!(
            self.slots.get(&id),
            Some(ClipSlot::Loading(pending)) if pending.ticket == ticket
        );
        if !current {
            log::debug!("dropping stale load of {id} (ticket {ticket})");
            return;
        }
        let Some(ClipSlot::Loading(pending)) = self.slots.remove(&id) else {
            return;
        };

        if pending.cancelled {
            log::debug!("load of {id} finished after it was toggled off");
            return;
        }

        let sample = match result {
            Ok(sample) => sample,
            Err(err) => {
                log::warn!("failed to load audio for {id}: {err}");
                self.events.push(PlaybackEvent::LoadFailed {
                    id,
                    error: err.to_string(),
                });
                return;
            }
        };

        let Some(backend) = self.backend.as_mut() else {
            return;
        };

        let voice = VoiceId(self.next_voice);
        self.next_voice += 1;

        let initial_gain = if pending.fade { 0.0 } else { pending.volume };
        if let Err(err) = backend.start_voice(voice, sample, initial_gain, pending.looping) {
            log::warn!("failed to start {id}: {err}");
            self.events.push(PlaybackEvent::LoadFailed {
                id,
                error: err.to_string(),
            });
            return;
        }

        let ramp = pending.fade.then(|| {
            (
                FadeKind::In,
                GainRamp::new(
                    0.0,
                    pending.volume,
                    self.config.fades.fade_in(),
                    self.config.fades.steps_per_second,
                ),
            )
        });

        log::debug!("started {id} on voice {}", voice.0);
        self.voices.insert(voice, id.clone());
        self.slots.insert(
            id.clone(),
            ClipSlot::Live(PlaybackInstance {
                voice,
                gain: initial_gain,
                base_volume: pending.volume,
                ramp,
                stop_pending: false,
            }),
        );
        self.events.push(PlaybackEvent::Started(id));
    }

    fn drain_backend(&mut self) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };

        while let Some(message) = backend.poll_message() {
            let voice = match message {
                AudioMessage::Pong => {
                    log::trace!("pong");
                    continue;
                }
                AudioMessage::VoiceEnded(voice) | AudioMessage::VoiceDropped(voice) => voice,
            };

            let Some(id) = self.voices.remove(&voice) else {
                continue;
            };
            let live = matches!(
                self.slots.get(&id),
                Some(ClipSlot::Live(instance)) if instance.voice == voice
            );
            if !live {
                continue;
            }

            if let Some(ClipSlot::Live(mut instance)) = self.slots.remove(&id) {
                if let Some((_, ramp)) = instance.ramp.as_mut() {
                    ramp.cancel();
                }
            }
            log::debug!("{id} ended");
            self.events.push(PlaybackEvent::Stopped(id));
        }
    }

    /// Halts a live instance's voice and removes it. If the backend refuses the stop, the
    /// instance stays live with its stop pending.
    fn teardown(&mut self, id: &ClipId) {
        let Some(ClipSlot::Live(instance)) = self.slots.get_mut(id) else {
            return;
        };

        if let Some((_, ramp)) = instance.ramp.as_mut() {
            ramp.cancel();
        }
        instance.ramp = None;

        if let Some(backend) = self.backend.as_mut() {
            if let Err(err) = backend.stop_voice(instance.voice) {
                if !instance.stop_pending {
                    log::warn!("failed to stop voice of {id}, will retry: {err}");
                }
                instance.stop_pending = true;
                return;
            }
        }

        let voice = instance.voice;
        self.slots.remove(id);
        self.voices.remove(&voice);

        log::debug!("stopped {id}");
        self.events.push(PlaybackEvent::Stopped(id.clone()));
    }

    fn retry_pending_stops(&mut self) {
        let mut pending: Vec<ClipId> = self
            .slots
            .iter()
            .filter(|(_, slot)| matches!(slot, ClipSlot::Live(instance) if instance.stop_pending))
            .map(|(id, _)| id.clone())
            .collect();
        pending.sort();

        for id in &pending {
            self.teardown(id);
        }
    }
}
