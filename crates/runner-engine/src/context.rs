//! Shared game services.
//!
//! [`GameContext`] replaces global lookups: the scene machine receives it by
//! mutable reference every tick and hands out the pieces each scene needs.

use runner_assets::backend::AssetBackend;
use runner_assets::manifest::ResourceManifest;
use runner_assets::registry::ResourceRegistry;
use runner_assets::synth::AssetSynthesizer;

use crate::audio::AudioService;
use crate::config::GameConfig;
use crate::error::EngineError;
use crate::sdk::{NoSdk, PlatformSdk};

/// Everything that outlives a single scene.
pub struct GameContext<B: AssetBackend> {
    pub config: GameConfig,
    pub manifest: ResourceManifest,
    pub registry: ResourceRegistry,
    pub backend: B,
    pub synthesizer: AssetSynthesizer,
    pub audio: AudioService,
    pub sdk: Box<dyn PlatformSdk>,
}

impl<B: AssetBackend> GameContext<B> {
    /// Context with the standard manifest, default synthesizer chains and no
    /// platform SDK. The configuration is validated first.
    pub fn new(config: GameConfig, backend: B) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            manifest: ResourceManifest::standard(),
            registry: ResourceRegistry::new(),
            backend,
            synthesizer: AssetSynthesizer::new(),
            audio: AudioService::new(),
            sdk: Box::new(NoSdk),
        })
    }

    pub fn with_sdk(mut self, sdk: impl PlatformSdk + 'static) -> Self {
        self.sdk = Box::new(sdk);
        self
    }

    pub fn with_manifest(mut self, manifest: ResourceManifest) -> Self {
        self.manifest = manifest;
        self
    }

    /// Apply queued sound requests to the backend.
    pub fn pump_audio(&mut self) -> usize {
        self.audio.pump(&mut self.backend)
    }
}
