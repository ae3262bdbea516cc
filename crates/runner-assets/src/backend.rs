//! The backend cache boundary.
//!
//! Rendering and audio devices are external collaborators. The synthesizer
//! and the engine only see them through [`AssetBackend`]: a string-keyed cache
//! of textures and sounds plus fire-and-forget playback controls.
//!
//! [`HeadlessBackend`] is the in-memory implementation used by tests and the
//! headless demo. Its [`BackendFaults`] plan can switch off drawing
//! capabilities, fail uploads, reject stubs, remove the audio device or make
//! individual sounds fail on playback.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use image::RgbaImage;
use tracing::{debug, trace};

use crate::canvas::Capabilities;
use crate::key::{ResourceHandle, ResourceKey, ResourceKind, SoundId, TextureId};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported by a backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// The texture cache refused the upload.
    #[error("texture upload for '{key}' failed: {reason}")]
    TextureUpload { key: ResourceKey, reason: String },

    /// The sound cache refused the upload.
    #[error("sound upload for '{key}' failed: {reason}")]
    SoundUpload { key: ResourceKey, reason: String },

    /// There is no audio device at all.
    #[error("audio backend is unavailable")]
    AudioUnavailable,

    /// A sample buffer could not be allocated.
    #[error("could not create sound buffer: {0}")]
    BufferCreation(String),

    /// The cache refused to register a stand-in entry.
    #[error("stub registration for '{0}' was rejected")]
    StubRejected(ResourceKey),

    /// Playback was requested for a key the cache does not hold.
    #[error("no sound cached under '{0}'")]
    UnknownSound(ResourceKey),

    /// The device failed to start, stop, pause or resume a sound.
    #[error("playback of '{key}' failed: {reason}")]
    Playback { key: ResourceKey, reason: String },
}

// ---------------------------------------------------------------------------
// Sound data
// ---------------------------------------------------------------------------

/// Interleaved PCM samples.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundBuffer {
    pub channels: u16,
    pub sample_rate: u32,
    samples: Vec<f32>,
}

impl SoundBuffer {
    /// A buffer of `frames` frames of silence.
    pub fn silent(channels: u16, frames: usize, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
            samples: vec![0.0; frames * channels as usize],
        }
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// Playback length.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Raw interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

/// How a sound should be played.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayOptions {
    pub volume: f32,
    pub looping: bool,
}

impl PlayOptions {
    /// One-shot effect at full volume.
    pub const EFFECT: Self = Self {
        volume: 1.0,
        looping: false,
    };

    /// Looping track at `volume`.
    pub const fn looping(volume: f32) -> Self {
        Self {
            volume,
            looping: true,
        }
    }
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self::EFFECT
    }
}

// ---------------------------------------------------------------------------
// AssetBackend
// ---------------------------------------------------------------------------

/// String-keyed texture/sound cache plus playback controls.
pub trait AssetBackend {
    /// Which drawing primitive classes are available.
    fn capabilities(&self) -> Capabilities;

    /// Whether an audio device exists at all.
    fn audio_available(&self) -> bool;

    /// Upload pixels under `key`, replacing any previous entry.
    fn store_texture(&mut self, key: &ResourceKey, image: RgbaImage)
        -> Result<TextureId, BackendError>;

    /// Allocate a silent buffer through the audio device.
    fn create_sound_buffer(
        &mut self,
        channels: u16,
        frames: usize,
        sample_rate: u32,
    ) -> Result<SoundBuffer, BackendError>;

    /// Upload samples under `key`, replacing any previous entry.
    fn store_sound(&mut self, key: &ResourceKey, buffer: SoundBuffer)
        -> Result<SoundId, BackendError>;

    /// Register a payload-free stand-in under `key`. Playing a stub sound is
    /// a no-op; a stub texture renders as nothing.
    fn store_stub(&mut self, key: &ResourceKey, kind: ResourceKind) -> Result<(), BackendError>;

    /// Whether anything is cached under `key`.
    fn contains(&self, key: &ResourceKey) -> bool;

    fn play_sound(&mut self, key: &ResourceKey, options: PlayOptions) -> Result<(), BackendError>;
    fn stop_sound(&mut self, key: &ResourceKey) -> Result<(), BackendError>;
    fn pause_sound(&mut self, key: &ResourceKey) -> Result<(), BackendError>;
    fn resume_sound(&mut self, key: &ResourceKey) -> Result<(), BackendError>;
}

// ---------------------------------------------------------------------------
// HeadlessBackend
// ---------------------------------------------------------------------------

/// Fault plan for [`HeadlessBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct BackendFaults {
    /// Drawing capabilities reported to the synthesizer.
    pub capabilities: Capabilities,
    /// The first N texture or sound uploads of every key fail.
    pub failed_uploads_per_key: u32,
    /// Stub registration always fails.
    pub reject_stubs: bool,
    /// Whether an audio device exists.
    pub audio_available: bool,
    /// Keys whose playback requests fail.
    pub failing_sounds: BTreeSet<String>,
}

impl Default for BackendFaults {
    fn default() -> Self {
        Self {
            capabilities: Capabilities::FULL,
            failed_uploads_per_key: 0,
            reject_stubs: false,
            audio_available: true,
            failing_sounds: BTreeSet::new(),
        }
    }
}

/// What the headless cache holds for one key.
#[derive(Debug, Clone)]
enum CacheEntry {
    Texture {
        id: TextureId,
        image: RgbaImage,
        fingerprint: blake3::Hash,
    },
    Sound {
        id: SoundId,
        buffer: SoundBuffer,
    },
    Stub(ResourceKind),
}

/// Playback state of a started sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
}

/// One accepted or rejected play request.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRecord {
    pub key: ResourceKey,
    pub options: PlayOptions,
    pub succeeded: bool,
}

/// In-memory backend with fault injection.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    faults: BackendFaults,
    entries: BTreeMap<ResourceKey, CacheEntry>,
    upload_attempts: BTreeMap<ResourceKey, u32>,
    next_texture: u32,
    next_sound: u32,
    plays: Vec<PlayRecord>,
    playback: BTreeMap<ResourceKey, PlaybackState>,
}

impl HeadlessBackend {
    /// A backend with every capability and no faults.
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend following the given fault plan.
    pub fn with_faults(faults: BackendFaults) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }

    /// The active fault plan.
    pub fn faults(&self) -> &BackendFaults {
        &self.faults
    }

    /// Replace the fault plan. Upload attempt counters are kept.
    pub fn set_faults(&mut self, faults: BackendFaults) {
        self.faults = faults;
    }

    /// Pixels cached under `key`, if it is a real texture.
    pub fn texture(&self, key: &str) -> Option<&RgbaImage> {
        match self.entries.get(&ResourceKey::from(key)) {
            Some(CacheEntry::Texture { image, .. }) => Some(image),
            _ => None,
        }
    }

    /// Content digest of the texture cached under `key`.
    pub fn fingerprint(&self, key: &str) -> Option<blake3::Hash> {
        match self.entries.get(&ResourceKey::from(key)) {
            Some(CacheEntry::Texture { fingerprint, .. }) => Some(*fingerprint),
            _ => None,
        }
    }

    /// Samples cached under `key`, if it is a real sound.
    pub fn sound(&self, key: &str) -> Option<&SoundBuffer> {
        match self.entries.get(&ResourceKey::from(key)) {
            Some(CacheEntry::Sound { buffer, .. }) => Some(buffer),
            _ => None,
        }
    }

    /// Whether `key` holds a stand-in.
    pub fn is_stub(&self, key: &str) -> bool {
        self.stub_kind(key).is_some()
    }

    /// The kind a stand-in was registered with.
    pub fn stub_kind(&self, key: &str) -> Option<ResourceKind> {
        match self.entries.get(&ResourceKey::from(key)) {
            Some(CacheEntry::Stub(kind)) => Some(*kind),
            _ => None,
        }
    }

    /// Handle of whatever is cached under `key`.
    pub fn handle(&self, key: &str) -> Option<ResourceHandle> {
        self.entries
            .get(&ResourceKey::from(key))
            .map(|entry| match entry {
                CacheEntry::Texture { id, .. } => ResourceHandle::Texture(*id),
                CacheEntry::Sound { id, .. } => ResourceHandle::Sound(*id),
                CacheEntry::Stub(_) => ResourceHandle::Stub,
            })
    }

    /// Drop whatever is cached under `key`. Returns whether anything was there.
    pub fn evict(&mut self, key: &str) -> bool {
        let key = ResourceKey::from(key);
        self.playback.remove(&key);
        self.entries.remove(&key).is_some()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every play request in arrival order.
    pub fn play_log(&self) -> &[PlayRecord] {
        &self.plays
    }

    /// How many successful play requests targeted `key`.
    pub fn play_count(&self, key: &str) -> usize {
        self.plays
            .iter()
            .filter(|p| p.succeeded && p.key.as_str() == key)
            .count()
    }

    /// Current playback state of `key`, or `None` when stopped.
    pub fn playback_state(&self, key: &str) -> Option<PlaybackState> {
        self.playback.get(&ResourceKey::from(key)).copied()
    }

    /// Count an upload attempt and report whether the plan says it fails.
    fn upload_should_fail(&mut self, key: &ResourceKey) -> bool {
        let attempts = self.upload_attempts.entry(key.clone()).or_insert(0);
        *attempts += 1;
        *attempts <= self.faults.failed_uploads_per_key
    }

    fn playback_fault(&self, key: &ResourceKey, action: &str) -> Result<(), BackendError> {
        if self.faults.failing_sounds.contains(key.as_str()) {
            return Err(BackendError::Playback {
                key: key.clone(),
                reason: format!("injected {action} failure"),
            });
        }
        Ok(())
    }

    /// Resolve a playback target. `Ok(false)` means the key is a stub and the
    /// request is a no-op.
    fn playable(&self, key: &ResourceKey) -> Result<bool, BackendError> {
        match self.entries.get(key) {
            Some(CacheEntry::Sound { .. }) => Ok(true),
            Some(CacheEntry::Stub(_)) => Ok(false),
            _ => Err(BackendError::UnknownSound(key.clone())),
        }
    }
}

impl AssetBackend for HeadlessBackend {
    fn capabilities(&self) -> Capabilities {
        self.faults.capabilities
    }

    fn audio_available(&self) -> bool {
        self.faults.audio_available
    }

    fn store_texture(
        &mut self,
        key: &ResourceKey,
        image: RgbaImage,
    ) -> Result<TextureId, BackendError> {
        if self.upload_should_fail(key) {
            return Err(BackendError::TextureUpload {
                key: key.clone(),
                reason: "injected upload failure".into(),
            });
        }
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        let fingerprint = blake3::hash(image.as_raw());
        debug!(key = %key, id = id.0, width = image.width(), height = image.height(), "texture stored");
        self.entries.insert(
            key.clone(),
            CacheEntry::Texture {
                id,
                image,
                fingerprint,
            },
        );
        Ok(id)
    }

    fn create_sound_buffer(
        &mut self,
        channels: u16,
        frames: usize,
        sample_rate: u32,
    ) -> Result<SoundBuffer, BackendError> {
        if !self.faults.audio_available {
            return Err(BackendError::AudioUnavailable);
        }
        if channels == 0 || frames == 0 || sample_rate == 0 {
            return Err(BackendError::BufferCreation(format!(
                "{channels} channel(s), {frames} frame(s) at {sample_rate} Hz"
            )));
        }
        Ok(SoundBuffer::silent(channels, frames, sample_rate))
    }

    fn store_sound(
        &mut self,
        key: &ResourceKey,
        buffer: SoundBuffer,
    ) -> Result<SoundId, BackendError> {
        if !self.faults.audio_available {
            return Err(BackendError::AudioUnavailable);
        }
        if self.upload_should_fail(key) {
            return Err(BackendError::SoundUpload {
                key: key.clone(),
                reason: "injected upload failure".into(),
            });
        }
        let id = SoundId(self.next_sound);
        self.next_sound += 1;
        debug!(key = %key, id = id.0, frames = buffer.frames(), "sound stored");
        self.entries
            .insert(key.clone(), CacheEntry::Sound { id, buffer });
        Ok(id)
    }

    fn store_stub(&mut self, key: &ResourceKey, kind: ResourceKind) -> Result<(), BackendError> {
        if self.faults.reject_stubs {
            return Err(BackendError::StubRejected(key.clone()));
        }
        debug!(key = %key, "stub stored");
        self.entries.insert(key.clone(), CacheEntry::Stub(kind));
        Ok(())
    }

    fn contains(&self, key: &ResourceKey) -> bool {
        self.entries.contains_key(key)
    }

    fn play_sound(&mut self, key: &ResourceKey, options: PlayOptions) -> Result<(), BackendError> {
        let result = self
            .playable(key)
            .and_then(|real| self.playback_fault(key, "play").map(|()| real));
        self.plays.push(PlayRecord {
            key: key.clone(),
            options,
            succeeded: result.is_ok(),
        });
        if result? {
            trace!(key = %key, looping = options.looping, "sound playing");
            self.playback.insert(key.clone(), PlaybackState::Playing);
        }
        Ok(())
    }

    fn stop_sound(&mut self, key: &ResourceKey) -> Result<(), BackendError> {
        if !self.playable(key)? {
            return Ok(());
        }
        self.playback_fault(key, "stop")?;
        self.playback.remove(key);
        Ok(())
    }

    fn pause_sound(&mut self, key: &ResourceKey) -> Result<(), BackendError> {
        if !self.playable(key)? {
            return Ok(());
        }
        self.playback_fault(key, "pause")?;
        if let Some(state) = self.playback.get_mut(key) {
            *state = PlaybackState::Paused;
        }
        Ok(())
    }

    fn resume_sound(&mut self, key: &ResourceKey) -> Result<(), BackendError> {
        if !self.playable(key)? {
            return Ok(());
        }
        self.playback_fault(key, "resume")?;
        if let Some(state) = self.playback.get_mut(key) {
            *state = PlaybackState::Playing;
        }
        Ok(())
    }
}
