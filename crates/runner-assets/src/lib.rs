//! Runner Assets -- procedural textures and sounds with tiered fallback.
//!
//! The game ships no binary assets. Every texture and sound named by the
//! [`ResourceManifest`](manifest::ResourceManifest) is generated at start-up
//! and uploaded to a string-keyed backend cache. Generation degrades tier by
//! tier (Primary, Fallback, Emergency, Dummy) so that each key ends up with a
//! record even when the backend can barely draw and has no audio device.
//!
//! # Quick Start
//!
//! ```
//! use runner_assets::prelude::*;
//!
//! let manifest = ResourceManifest::standard();
//! let mut backend = HeadlessBackend::new();
//! let mut registry = ResourceRegistry::new();
//!
//! let report = AssetSynthesizer::new().ensure(&manifest, &mut backend, &mut registry);
//! assert!(report.is_complete());
//! assert!(registry.verify(&manifest).is_ok());
//! assert_eq!(registry.tier_of("player"), Some(Tier::Primary));
//! ```

#![deny(unsafe_code)]

pub mod backend;
pub mod canvas;
pub mod key;
pub mod manifest;
pub mod registry;
pub mod synth;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::backend::{
        AssetBackend, BackendError, BackendFaults, HeadlessBackend, PlayOptions, PlaybackState,
        SoundBuffer,
    };
    pub use crate::canvas::{rgb, Canvas, CanvasError, Capabilities, Color, ColorStop};
    pub use crate::key::{
        ResourceHandle, ResourceKey, ResourceKind, ResourceRecord, ResourceSpec, SoundId,
        TextureId, Tier,
    };
    pub use crate::manifest::{keys, ResourceManifest};
    pub use crate::registry::{MissingResources, ResourceRegistry};
    pub use crate::synth::{
        AssetSynthesizer, SynthesisFailure, SynthesisReport, SynthesisStrategy, TierFailure,
    };
}
