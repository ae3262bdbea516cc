//! Per-run state and snapshots.
//!
//! A [`GameRunState`] is created fresh every time Playing is entered and is
//! only ever mutated by that run's simulation loop. [`RunSnapshot`] captures
//! everything that must survive a pause toggle and hashes it with BLAKE3.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, EntityKind};
use crate::physics::{Position, Velocity};
use crate::timer::TimerId;

/// Score, difficulty and pause flag of the current run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRunState {
    pub score: u32,
    /// Scroll speed in px/s. Never decreases during a run.
    pub game_speed: f32,
    pub paused: bool,
}

impl GameRunState {
    pub fn new(initial_speed: f32) -> Self {
        Self {
            score: 0,
            game_speed: initial_speed,
            paused: false,
        }
    }

    pub fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    /// Apply the per-tick difficulty ramp.
    pub fn ramp(&mut self, increment: f32) {
        self.game_speed += increment.max(0.0);
    }
}

/// Observable state of one scrolling entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Position,
    /// Spin in degrees (coins).
    pub angle: f32,
    pub alpha: f32,
}

/// Everything a pause toggle must leave untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run: GameRunState,
    pub player: Option<(Position, Velocity)>,
    pub entities: Vec<EntitySnapshot>,
    pub timers: Vec<(TimerId, Duration)>,
    /// Unpaused simulated time since the run began.
    pub elapsed: Duration,
}

impl RunSnapshot {
    /// BLAKE3 hex digest of the JSON encoding.
    pub fn hash(&self) -> String {
        let json_bytes =
            serde_json::to_vec(self).expect("RunSnapshot should always be JSON-serializable");
        blake3::hash(&json_bytes).to_hex().to_string()
    }
}
