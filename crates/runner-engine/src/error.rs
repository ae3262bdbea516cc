//! Engine error taxonomy.
//!
//! None of these terminate the process. Most are logged and recovered where
//! they occur; [`EngineError::ResourceMissing`] and [`EngineError::SceneLoad`]
//! surface as the Recovery scene with a retry action.

use runner_assets::backend::BackendError;
use runner_assets::key::ResourceKey;
use runner_assets::registry::MissingResources;

use crate::config::ConfigError;
use crate::physics::PhysicsError;
use crate::scene::SceneId;

/// Errors produced by engine operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// A manifest key has no usable record when a scene needs it.
    #[error(transparent)]
    ResourceMissing(#[from] MissingResources),

    /// Body or collider creation failed.
    #[error("physics setup failed: {0}")]
    PhysicsSetup(#[from] PhysicsError),

    /// A scene's setup could not complete.
    #[error("scene {scene:?} failed to load: {reason}")]
    SceneLoad { scene: SceneId, reason: String },

    /// The audio backend rejected a request.
    #[error("sound '{key}' failed: {source}")]
    SoundPlayback {
        key: ResourceKey,
        #[source]
        source: BackendError,
    },

    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
