//! Tiered procedural synthesis.
//!
//! Each resource kind has an ordered chain of [`SynthesisStrategy`] values.
//! [`AssetSynthesizer::ensure`] walks the manifest and, for every key, tries
//! the strategies of its chain in order until one produces a record. A failing
//! tier is logged and the next one runs; one key's failures never stop the
//! others from being synthesized.
//!
//! Default chains:
//!
//! | kind    | chain                                                    |
//! |---------|----------------------------------------------------------|
//! | texture | Primary, Fallback, Emergency (load-bearing only), Dummy |
//! | sound   | Primary, Fallback, Dummy                                 |
//!
//! Sound strategies other than Dummy only apply when the backend reports an
//! audio device, so without one every sound goes straight to Dummy.

pub mod sounds;
pub mod textures;

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backend::{AssetBackend, BackendError};
use crate::canvas::{Canvas, CanvasError, Capabilities};
use crate::key::{ResourceHandle, ResourceKey, ResourceKind, ResourceRecord, ResourceSpec, Tier};
use crate::manifest::ResourceManifest;
use crate::registry::ResourceRegistry;

pub use sounds::{FallbackSound, PrimarySound};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why one tier could not produce a record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SynthesisFailure {
    /// Drawing failed.
    #[error("drawing failed: {0}")]
    Canvas(#[from] CanvasError),

    /// The backend refused a buffer, upload or stub.
    #[error("backend refused: {0}")]
    Backend(#[from] BackendError),

    /// No recipe exists for this key at this tier.
    #[error("no recipe for '{0}'")]
    NoRecipe(ResourceKey),

    /// The strategy was handed a spec of the wrong kind.
    #[error("strategy cannot produce {0:?}")]
    WrongKind(ResourceKind),
}

// ---------------------------------------------------------------------------
// SynthesisStrategy
// ---------------------------------------------------------------------------

/// One rung of a fallback chain.
pub trait SynthesisStrategy {
    /// Tier recorded when this strategy succeeds.
    fn tier(&self) -> Tier;

    /// Whether the strategy should be attempted for this spec at all.
    fn applies_to(&self, spec: &ResourceSpec, backend: &dyn AssetBackend) -> bool;

    /// Produce the resource and register it with the backend.
    fn synthesize(
        &self,
        key: &ResourceKey,
        spec: &ResourceSpec,
        backend: &mut dyn AssetBackend,
    ) -> Result<ResourceRecord, SynthesisFailure>;
}

fn texture_size(spec: &ResourceSpec) -> Result<(u32, u32), SynthesisFailure> {
    match spec.kind {
        ResourceKind::Texture { width, height } => Ok((width, height)),
        other => Err(SynthesisFailure::WrongKind(other)),
    }
}

fn upload(
    tier: Tier,
    key: &ResourceKey,
    spec: &ResourceSpec,
    canvas: Canvas,
    backend: &mut dyn AssetBackend,
) -> Result<ResourceRecord, SynthesisFailure> {
    let id = backend.store_texture(key, canvas.into_image())?;
    Ok(ResourceRecord {
        key: key.clone(),
        kind: spec.kind,
        tier,
        handle: ResourceHandle::Texture(id),
    })
}

/// Full-detail procedural drawing with whatever the backend supports.
#[derive(Debug, Default)]
pub struct PrimaryTexture;

impl SynthesisStrategy for PrimaryTexture {
    fn tier(&self) -> Tier {
        Tier::Primary
    }

    fn applies_to(&self, spec: &ResourceSpec, _backend: &dyn AssetBackend) -> bool {
        spec.kind.is_texture()
    }

    fn synthesize(
        &self,
        key: &ResourceKey,
        spec: &ResourceSpec,
        backend: &mut dyn AssetBackend,
    ) -> Result<ResourceRecord, SynthesisFailure> {
        let (w, h) = texture_size(spec)?;
        let mut canvas = Canvas::new(w, h, backend.capabilities())?;
        textures::draw_primary(key.as_str(), &mut canvas)?;
        upload(Tier::Primary, key, spec, canvas, backend)
    }
}

/// Flat fills only.
#[derive(Debug, Default)]
pub struct FallbackTexture;

impl SynthesisStrategy for FallbackTexture {
    fn tier(&self) -> Tier {
        Tier::Fallback
    }

    fn applies_to(&self, spec: &ResourceSpec, _backend: &dyn AssetBackend) -> bool {
        spec.kind.is_texture()
    }

    fn synthesize(
        &self,
        key: &ResourceKey,
        spec: &ResourceSpec,
        backend: &mut dyn AssetBackend,
    ) -> Result<ResourceRecord, SynthesisFailure> {
        let (w, h) = texture_size(spec)?;
        let mut canvas = Canvas::new(w, h, Capabilities::FLAT_ONLY)?;
        textures::draw_fallback(key.as_str(), &mut canvas)?;
        upload(Tier::Fallback, key, spec, canvas, backend)
    }
}

/// One colour at the exact size, for load-bearing textures.
#[derive(Debug, Default)]
pub struct EmergencyTexture;

impl SynthesisStrategy for EmergencyTexture {
    fn tier(&self) -> Tier {
        Tier::Emergency
    }

    fn applies_to(&self, spec: &ResourceSpec, _backend: &dyn AssetBackend) -> bool {
        spec.kind.is_texture() && spec.load_bearing
    }

    fn synthesize(
        &self,
        key: &ResourceKey,
        spec: &ResourceSpec,
        backend: &mut dyn AssetBackend,
    ) -> Result<ResourceRecord, SynthesisFailure> {
        let (w, h) = texture_size(spec)?;
        let mut canvas = Canvas::new(w, h, Capabilities::FLAT_ONLY)?;
        canvas
            .set_fill(textures::emergency_color(key.as_str()))
            .fill_rect(0, 0, w as i32, h as i32);
        upload(Tier::Emergency, key, spec, canvas, backend)
    }
}

/// Payload-free stand-in. Sounds are recorded with a zero duration so a later
/// play request is a no-op.
#[derive(Debug, Default)]
pub struct DummyResource;

impl SynthesisStrategy for DummyResource {
    fn tier(&self) -> Tier {
        Tier::Dummy
    }

    fn applies_to(&self, _spec: &ResourceSpec, _backend: &dyn AssetBackend) -> bool {
        true
    }

    fn synthesize(
        &self,
        key: &ResourceKey,
        spec: &ResourceSpec,
        backend: &mut dyn AssetBackend,
    ) -> Result<ResourceRecord, SynthesisFailure> {
        let kind = match spec.kind {
            ResourceKind::Sound { .. } => ResourceKind::Sound {
                duration: Duration::ZERO,
            },
            texture => texture,
        };
        backend.store_stub(key, kind)?;
        Ok(ResourceRecord {
            key: key.clone(),
            kind,
            tier: Tier::Dummy,
            handle: ResourceHandle::Stub,
        })
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A tier that failed for a key.
#[derive(Debug, Clone, PartialEq)]
pub struct TierFailure {
    pub key: ResourceKey,
    pub tier: Tier,
    pub error: SynthesisFailure,
}

/// What one `ensure` pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesisReport {
    /// Keys synthesized in this pass, with the tier reached.
    pub synthesized: Vec<(ResourceKey, Tier)>,
    /// Keys whose existing record was still backed by the cache.
    pub skipped: Vec<ResourceKey>,
    /// Every tier failure, in attempt order.
    pub failures: Vec<TierFailure>,
    /// Keys that exhausted their chain without a record.
    pub unresolved: Vec<ResourceKey>,
}

impl SynthesisReport {
    /// Tier reached by `key` in this pass.
    pub fn tier_of(&self, key: &str) -> Option<Tier> {
        self.synthesized
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, tier)| *tier)
    }

    /// How many keys landed on `tier`.
    pub fn count_at(&self, tier: Tier) -> usize {
        self.synthesized.iter().filter(|(_, t)| *t == tier).count()
    }

    /// `true` when every key of the pass has a record.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

// ---------------------------------------------------------------------------
// AssetSynthesizer
// ---------------------------------------------------------------------------

/// Runs the per-kind strategy chains over a manifest.
pub struct AssetSynthesizer {
    textures: Vec<Box<dyn SynthesisStrategy>>,
    sounds: Vec<Box<dyn SynthesisStrategy>>,
}

impl std::fmt::Debug for AssetSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tiers = |chain: &[Box<dyn SynthesisStrategy>]| {
            chain.iter().map(|s| s.tier()).collect::<Vec<_>>()
        };
        f.debug_struct("AssetSynthesizer")
            .field("textures", &tiers(&self.textures))
            .field("sounds", &tiers(&self.sounds))
            .finish()
    }
}

impl Default for AssetSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetSynthesizer {
    /// The default chains.
    pub fn new() -> Self {
        Self {
            textures: vec![
                Box::new(PrimaryTexture),
                Box::new(FallbackTexture),
                Box::new(EmergencyTexture),
                Box::new(DummyResource),
            ],
            sounds: vec![
                Box::new(PrimarySound),
                Box::new(FallbackSound),
                Box::new(DummyResource),
            ],
        }
    }

    /// Custom chains, tried in the order given.
    pub fn with_chains(
        textures: Vec<Box<dyn SynthesisStrategy>>,
        sounds: Vec<Box<dyn SynthesisStrategy>>,
    ) -> Self {
        Self { textures, sounds }
    }

    fn chain_for(&self, kind: &ResourceKind) -> &[Box<dyn SynthesisStrategy>] {
        match kind {
            ResourceKind::Texture { .. } => &self.textures,
            ResourceKind::Sound { .. } => &self.sounds,
        }
    }

    /// Make sure every manifest key has a record.
    ///
    /// Keys whose record exists and whose cache entry is still present are
    /// left alone. A stale record is dropped before the key is rebuilt, so a
    /// key that then exhausts its chain has no record at all.
    pub fn ensure(
        &self,
        manifest: &ResourceManifest,
        backend: &mut dyn AssetBackend,
        registry: &mut ResourceRegistry,
    ) -> SynthesisReport {
        let mut report = SynthesisReport::default();

        for (key, spec) in manifest.iter() {
            if registry.contains(key) {
                if backend.contains(key) {
                    debug!(key = %key, "record still backed, skipping");
                    report.skipped.push(key.clone());
                    continue;
                }
                debug!(key = %key, "cache entry gone, rebuilding");
                registry.remove(key.as_str());
            }

            match self.synthesize_key(key, spec, backend, &mut report.failures) {
                Some(record) => {
                    report.synthesized.push((key.clone(), record.tier));
                    registry.insert(record);
                }
                None => {
                    warn!(key = %key, "every synthesis tier failed");
                    report.unresolved.push(key.clone());
                }
            }
        }

        info!(
            synthesized = report.synthesized.len(),
            skipped = report.skipped.len(),
            failures = report.failures.len(),
            unresolved = report.unresolved.len(),
            "synthesis complete"
        );
        report
    }

    /// Attempt tiers in order and return the first record produced.
    fn synthesize_key(
        &self,
        key: &ResourceKey,
        spec: &ResourceSpec,
        backend: &mut dyn AssetBackend,
        failures: &mut Vec<TierFailure>,
    ) -> Option<ResourceRecord> {
        for strategy in self.chain_for(&spec.kind) {
            let tier = strategy.tier();
            if !strategy.applies_to(spec, backend) {
                debug!(key = %key, tier = %tier, "tier does not apply");
                continue;
            }
            match strategy.synthesize(key, spec, backend) {
                Ok(record) => {
                    debug!(key = %key, tier = %tier, "synthesized");
                    return Some(record);
                }
                Err(error) => {
                    warn!(key = %key, tier = %tier, error = %error, "synthesis tier failed, falling through");
                    failures.push(TierFailure {
                        key: key.clone(),
                        tier,
                        error,
                    });
                }
            }
        }
        None
    }
}
