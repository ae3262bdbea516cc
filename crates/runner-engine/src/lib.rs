//! Runner engine -- scene flow, simulation and physics for the side-scroller.
//!
//! This crate builds on [`runner_assets`] for resources: Boot synthesizes the
//! whole manifest, and the Playing scene runs a [`SimulationLoop`] over a
//! rapier2d world with timer-driven spawning, collision effects and a
//! pausable difficulty ramp.
//!
//! [`SimulationLoop`]: simulation::SimulationLoop
//!
//! # Quick Start
//!
//! ```
//! use runner_engine::prelude::*;
//!
//! let ctx = GameContext::new(GameConfig::default(), HeadlessBackend::new()).unwrap();
//! let mut game = TickLoop::new(ctx, TickConfig::default());
//!
//! assert!(game.run_until(|m| m.active_id() == SceneId::MainMenu, 600));
//! assert!(game.start_game());
//! assert!(game.run_until(|m| m.active_id() == SceneId::Playing, 60));
//!
//! game.run_ticks(30);
//! assert!(game.machine().playing().unwrap().game_speed() > 300.0);
//! ```

#![deny(unsafe_code)]

pub mod audio;
pub mod collision;
pub mod config;
pub mod context;
pub mod entity;
pub mod error;
pub mod hud;
pub mod input;
pub mod physics;
pub mod run_state;
pub mod scene;
pub mod sdk;
pub mod simulation;
pub mod spawner;
pub mod tick;
pub mod timer;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the asset crate for convenience.
pub use runner_assets;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use runner_assets::prelude::*;

    pub use crate::audio::{AudioCmd, AudioHandle, AudioService};
    pub use crate::collision::{CollisionEffect, CollisionPolicy};
    pub use crate::config::{ConfigError, GameConfig};
    pub use crate::context::GameContext;
    pub use crate::entity::{EntityId, EntityKind};
    pub use crate::error::EngineError;
    pub use crate::hud::{PauseOverlay, ScoreDisplay};
    pub use crate::input::{Horizontal, InputFrame};
    pub use crate::physics::{
        BodyKind, ColliderFit, ColliderLayout, ColliderShape, CollisionPair, ContactKind,
        PhysicsBody, PhysicsError, PhysicsWorld, Position, Velocity,
    };
    pub use crate::run_state::{GameRunState, RunSnapshot};
    pub use crate::scene::{SceneId, SceneMachine, SceneRequest, SceneState, StartGate};
    pub use crate::sdk::{
        AdCompletion, AdKind, AdOutcome, AdScript, AdTicket, NoSdk, PlatformSdk, RecordingSdk,
        SdkCall, SdkError,
    };
    pub use crate::simulation::{SimulationLoop, TickOutcome};
    pub use crate::spawner::{EntitySpawner, SpawnClass, SpawnRequest};
    pub use crate::tick::{TickConfig, TickDiagnostics, TickLoop};
    pub use crate::timer::{TimerFired, TimerId, TimerQueue};
}
