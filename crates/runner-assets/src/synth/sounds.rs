//! Silent placeholder clips.

use crate::backend::AssetBackend;
use crate::key::{ResourceHandle, ResourceKey, ResourceKind, ResourceRecord, ResourceSpec, Tier};

use super::{SynthesisFailure, SynthesisStrategy};

/// Sample rate of the full-length clip.
pub const PRIMARY_SAMPLE_RATE: u32 = 44_100;
/// 100 ms at 44.1 kHz.
pub const PRIMARY_FRAMES: usize = 4410;
/// Sample rate of the minimal clip.
pub const FALLBACK_SAMPLE_RATE: u32 = 22_050;

fn synthesize_silence(
    tier: Tier,
    frames: usize,
    sample_rate: u32,
    key: &ResourceKey,
    backend: &mut dyn AssetBackend,
) -> Result<ResourceRecord, SynthesisFailure> {
    let buffer = backend.create_sound_buffer(1, frames, sample_rate)?;
    let duration = buffer.duration();
    let id = backend.store_sound(key, buffer)?;
    Ok(ResourceRecord {
        key: key.clone(),
        kind: ResourceKind::Sound { duration },
        tier,
        handle: ResourceHandle::Sound(id),
    })
}

/// Mono 100 ms of silence at 44.1 kHz.
#[derive(Debug, Default)]
pub struct PrimarySound;

impl SynthesisStrategy for PrimarySound {
    fn tier(&self) -> Tier {
        Tier::Primary
    }

    fn applies_to(&self, spec: &ResourceSpec, backend: &dyn AssetBackend) -> bool {
        spec.kind.is_sound() && backend.audio_available()
    }

    fn synthesize(
        &self,
        key: &ResourceKey,
        _spec: &ResourceSpec,
        backend: &mut dyn AssetBackend,
    ) -> Result<ResourceRecord, SynthesisFailure> {
        synthesize_silence(Tier::Primary, PRIMARY_FRAMES, PRIMARY_SAMPLE_RATE, key, backend)
    }
}

/// A single silent frame at 22.05 kHz.
#[derive(Debug, Default)]
pub struct FallbackSound;

impl SynthesisStrategy for FallbackSound {
    fn tier(&self) -> Tier {
        Tier::Fallback
    }

    fn applies_to(&self, spec: &ResourceSpec, backend: &dyn AssetBackend) -> bool {
        spec.kind.is_sound() && backend.audio_available()
    }

    fn synthesize(
        &self,
        key: &ResourceKey,
        _spec: &ResourceSpec,
        backend: &mut dyn AssetBackend,
    ) -> Result<ResourceRecord, SynthesisFailure> {
        synthesize_silence(Tier::Fallback, 1, FALLBACK_SAMPLE_RATE, key, backend)
    }
}
