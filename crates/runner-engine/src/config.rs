//! Game configuration.
//!
//! [`GameConfig::default`] reproduces the tuning the game shipped with. Every
//! section is `#[serde(default)]`, so a JSON document only needs the fields
//! it overrides:
//!
//! ```
//! use runner_engine::config::GameConfig;
//!
//! let config = GameConfig::from_json_str(r#"{ "seed": 7, "speed": { "initial": 250.0 } }"#).unwrap();
//! assert_eq!(config.seed, 7);
//! assert_eq!(config.speed.initial, 250.0);
//! assert_eq!(config.speed.increment_per_tick, 0.01);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors produced while loading or validating configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The document is not valid JSON for [`GameConfig`].
    #[error("config parse error: {0}")]
    Parse(String),

    /// A value is out of range.
    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 450.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Downward acceleration in px/s². The y axis points down.
    pub gravity_y: f32,
    /// Pixels per physics length unit, used to scale solver tolerances.
    pub length_unit: f32,
    /// Colliders with a larger half extent are rejected.
    pub max_collider_half_extent: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity_y: 400.0,
            length_unit: 32.0,
            max_collider_half_extent: 4096.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub start_x: f32,
    pub width: f32,
    pub height: f32,
    /// Horizontal speed while a direction is held.
    pub move_speed: f32,
    /// Upward speed applied by a jump.
    pub jump_speed: f32,
    /// Restitution against the ground and the world bounds.
    pub bounce: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            start_x: 100.0,
            width: 32.0,
            height: 48.0,
            move_speed: 160.0,
            jump_speed: 400.0,
            bounce: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    /// Scroll speed in px/s when a run starts.
    pub initial: f32,
    /// Added to the scroll speed after every unpaused tick.
    pub increment_per_tick: f32,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            initial: 300.0,
            increment_per_tick: 0.01,
        }
    }
}

/// Timer interval and Bernoulli gate for one spawn class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnerSettings {
    pub interval_ms: u64,
    pub probability: f64,
}

impl SpawnerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    pub platform: SpawnerSettings,
    pub coin: SpawnerSettings,
    pub obstacle: SpawnerSettings,
    /// Distance past the right edge where entities appear.
    pub offset_x: f32,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            platform: SpawnerSettings {
                interval_ms: 2000,
                probability: 0.7,
            },
            coin: SpawnerSettings {
                interval_ms: 3000,
                probability: 0.6,
            },
            obstacle: SpawnerSettings {
                interval_ms: 2500,
                probability: 0.4,
            },
            offset_x: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinConfig {
    /// Degrees of spin added per tick.
    pub spin_per_tick: f32,
    /// Half period of the alpha pulse.
    pub pulse_ms: u64,
    /// Alpha at the bottom of the pulse.
    pub min_alpha: f32,
}

impl Default for CoinConfig {
    fn default() -> Self {
        Self {
            spin_per_tick: 2.0,
            pulse_ms: 1000,
            min_alpha: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub coin_value: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { coin_value: 10 }
    }
}

/// Delays of the scene flow, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Simulated load time of the Loading scene.
    pub loading_ms: u64,
    /// Pause between a full loading bar and the main menu.
    pub menu_delay_ms: u64,
    /// Upper bound on how long an ad may hold up a start or restart.
    pub ad_safety_ms: u64,
    /// Delay between the start trigger and entering Playing.
    pub start_delay_ms: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            loading_ms: 1500,
            menu_delay_ms: 1000,
            ad_safety_ms: 2000,
            start_delay_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub music_volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { music_volume: 0.5 }
    }
}

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Complete game configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub viewport: ViewportConfig,
    pub physics: PhysicsConfig,
    pub player: PlayerConfig,
    pub speed: SpeedConfig,
    pub spawner: SpawnerConfig,
    pub coin: CoinConfig,
    pub scoring: ScoringConfig,
    pub flow: FlowConfig,
    pub audio: AudioConfig,
    /// Seed of the spawner's PRNG.
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportConfig::default(),
            physics: PhysicsConfig::default(),
            player: PlayerConfig::default(),
            speed: SpeedConfig::default(),
            spawner: SpawnerConfig::default(),
            coin: CoinConfig::default(),
            scoring: ScoringConfig::default(),
            flow: FlowConfig::default(),
            audio: AudioConfig::default(),
            seed: 0x5eed,
        }
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be positive and finite, got {value}"),
        })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be non-negative and finite, got {value}"),
        })
    }
}

fn unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must lie in [0, 1], got {value}"),
        })
    }
}

fn nonzero_ms(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value > 0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: "must be at least 1 ms".into(),
        })
    }
}

impl GameConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("viewport.width", self.viewport.width)?;
        positive("viewport.height", self.viewport.height)?;

        non_negative("physics.gravity_y", self.physics.gravity_y)?;
        positive("physics.length_unit", self.physics.length_unit)?;
        positive(
            "physics.max_collider_half_extent",
            self.physics.max_collider_half_extent,
        )?;

        positive("player.width", self.player.width)?;
        positive("player.height", self.player.height)?;
        non_negative("player.move_speed", self.player.move_speed)?;
        non_negative("player.jump_speed", self.player.jump_speed)?;
        non_negative("player.bounce", self.player.bounce)?;

        non_negative("speed.initial", self.speed.initial)?;
        non_negative("speed.increment_per_tick", self.speed.increment_per_tick)?;

        for (field, settings) in [
            ("spawner.platform", &self.spawner.platform),
            ("spawner.coin", &self.spawner.coin),
            ("spawner.obstacle", &self.spawner.obstacle),
        ] {
            nonzero_ms(field, settings.interval_ms)?;
            unit_interval(field, settings.probability)?;
        }
        non_negative("spawner.offset_x", self.spawner.offset_x)?;

        non_negative("coin.spin_per_tick", self.coin.spin_per_tick)?;
        nonzero_ms("coin.pulse_ms", self.coin.pulse_ms)?;
        unit_interval("coin.min_alpha", self.coin.min_alpha as f64)?;

        nonzero_ms("flow.ad_safety_ms", self.flow.ad_safety_ms)?;
        unit_interval("audio.music_volume", self.audio.music_volume as f64)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_tuning() {
        let config = GameConfig::default();
        assert_eq!((config.viewport.width, config.viewport.height), (800.0, 450.0));
        assert_eq!(config.physics.gravity_y, 400.0);
        assert_eq!(config.spawner.platform.probability, 0.7);
        assert_eq!(config.spawner.coin.interval_ms, 3000);
        assert_eq!(config.spawner.obstacle.interval(), Duration::from_millis(2500));
        assert_eq!(config.flow.ad_safety_ms, 2000);
        assert_eq!(config.audio.music_volume, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            GameConfig::from_json_str(r#"{"spawner": {"coin": {"interval_ms": 10, "probability": 1.0}}}"#)
                .unwrap();
        assert_eq!(config.spawner.coin.interval_ms, 10);
        assert_eq!(config.spawner.platform.interval_ms, 2000);
        assert_eq!(config.player.move_speed, 160.0);
    }

    #[test]
    fn probability_out_of_range_is_rejected() {
        let err = GameConfig::from_json_str(
            r#"{"spawner": {"obstacle": {"interval_ms": 2500, "probability": 1.5}}}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "spawner.obstacle",
                ..
            }
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            GameConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut config = GameConfig::default();
        config.speed.initial = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.viewport.width = 0.0;
        assert!(config.validate().is_err());
    }
}
