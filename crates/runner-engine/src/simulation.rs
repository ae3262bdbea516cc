//! The Playing scene's simulation.
//!
//! [`SimulationLoop::tick`] runs one frame in a fixed order:
//!
//! 1. Pause toggle. A paused loop stops here.
//! 2. Spawn timer events queued by the previous tick are turned into
//!    entities.
//! 3. Player input: horizontal velocity, and a jump if grounded.
//! 4. Scrolling entities move left by `game_speed * dt`, coins spin and
//!    pulse, and anything past the left edge is despawned.
//! 5. Physics step, then the player is clamped to the viewport.
//! 6. Collision effects: pickups, then at most one run-ending hit.
//! 7. Difficulty ramp, then timers advance.
//!
//! The loop owns its [`GameRunState`], entities and timers exclusively.
//! Dropping it (or calling [`teardown`](SimulationLoop::teardown)) discards
//! all of them.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use runner_assets::backend::PlayOptions;
use runner_assets::manifest::keys;

use crate::audio::AudioHandle;
use crate::collision::{CollisionEffect, CollisionPolicy};
use crate::config::GameConfig;
use crate::entity::{EntityAllocator, EntityId, EntityKind};
use crate::hud::{pause_button_label, PauseOverlay, ScoreDisplay};
use crate::input::{Horizontal, InputFrame};
use crate::physics::{
    BodyKind, ColliderFit, ColliderLayout, ColliderShape, PhysicsBody, PhysicsWorld, Position,
    Velocity,
};
use crate::run_state::{EntitySnapshot, GameRunState, RunSnapshot};
use crate::spawner::{EntitySpawner, SpawnClass, SpawnRequest};
use crate::timer::TimerQueue;

const GROUND_HEIGHT: f32 = 32.0;
const GROUND_TILE: f32 = 64.0;

/// Sprite size of a spawned class, which is also its collision size.
pub fn class_size(class: SpawnClass) -> (f32, f32) {
    match class {
        SpawnClass::Platform => (200.0, 32.0),
        SpawnClass::Coin => (32.0, 32.0),
        SpawnClass::Obstacle => (32.0, 32.0),
    }
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickOutcome {
    Running,
    Paused,
    /// The player hit an obstacle. Sticky: every later tick reports it too.
    RunEnded { final_score: u32 },
}

/// Game-side state of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SimEntity {
    pub kind: EntityKind,
    pub position: Position,
    pub width: f32,
    pub height: f32,
    pub angle: f32,
    pub alpha: f32,
    /// Unpaused time since spawn; drives the coin pulse.
    pub age: Duration,
    pub fit: ColliderFit,
}

/// One run of the game.
pub struct SimulationLoop {
    config: GameConfig,
    physics: PhysicsWorld,
    allocator: EntityAllocator,
    entities: BTreeMap<EntityId, SimEntity>,
    player: EntityId,
    run: GameRunState,
    timers: TimerQueue<SpawnClass>,
    spawner: EntitySpawner,
    policy: CollisionPolicy,
    audio: AudioHandle,
    score_display: ScoreDisplay,
    overlay: Option<PauseOverlay>,
    elapsed: Duration,
    ended: Option<u32>,
}

impl SimulationLoop {
    /// Build a fresh run: ground, player, armed spawn timers and music.
    /// Spawning is seeded from `config.seed`.
    pub fn new(config: &GameConfig, audio: AudioHandle) -> Self {
        Self::with_seed(config, audio, config.seed)
    }

    /// Like [`new`](Self::new), with an explicit spawner seed.
    pub fn with_seed(config: &GameConfig, audio: AudioHandle, seed: u64) -> Self {
        let viewport = &config.viewport;
        let mut physics = PhysicsWorld::from_config(&config.physics);
        let mut allocator = EntityAllocator::new();
        let mut entities = BTreeMap::new();

        let ground = allocator.allocate();
        let ground_pos = Position {
            x: viewport.width / 2.0,
            y: viewport.height - GROUND_HEIGHT / 2.0,
        };
        let ground_fit = physics.register_entity(
            ground,
            ground_pos,
            Velocity::default(),
            &PhysicsBody {
                kind: BodyKind::Fixed,
                layouts: vec![
                    ColliderLayout::single(ColliderShape::Box {
                        half_width: viewport.width / 2.0,
                        half_height: GROUND_HEIGHT / 2.0,
                    }),
                    ColliderLayout::tiles(viewport.width, GROUND_TILE, GROUND_HEIGHT / 2.0),
                ],
                restitution: 0.0,
                sensor: false,
            },
        );
        entities.insert(
            ground,
            SimEntity {
                kind: EntityKind::Ground,
                position: ground_pos,
                width: viewport.width,
                height: GROUND_HEIGHT,
                angle: 0.0,
                alpha: 1.0,
                age: Duration::ZERO,
                fit: ground_fit,
            },
        );

        let player_cfg = &config.player;
        let player = allocator.allocate();
        let player_pos = Position {
            x: player_cfg.start_x,
            y: viewport.height / 2.0,
        };
        let player_fit = physics.register_entity(
            player,
            player_pos,
            Velocity::default(),
            &PhysicsBody {
                kind: BodyKind::Dynamic,
                layouts: vec![
                    ColliderLayout::single(ColliderShape::Box {
                        half_width: player_cfg.width / 2.0,
                        half_height: player_cfg.height / 2.0,
                    }),
                    ColliderLayout::single(ColliderShape::Circle {
                        radius: player_cfg.width / 2.0,
                    }),
                ],
                restitution: player_cfg.bounce,
                sensor: false,
            },
        );
        entities.insert(
            player,
            SimEntity {
                kind: EntityKind::Player,
                position: player_pos,
                width: player_cfg.width,
                height: player_cfg.height,
                angle: 0.0,
                alpha: 1.0,
                age: Duration::ZERO,
                fit: player_fit,
            },
        );

        let mut timers = TimerQueue::new();
        let mut spawner = EntitySpawner::new(config.spawner.clone(), viewport, seed);
        spawner.arm(&mut timers);

        audio.play(keys::MUSIC, PlayOptions::looping(config.audio.music_volume));
        info!(seed, speed = config.speed.initial, "run started");

        Self {
            config: config.clone(),
            physics,
            allocator,
            entities,
            player,
            run: GameRunState::new(config.speed.initial),
            timers,
            spawner,
            policy: CollisionPolicy,
            audio,
            score_display: ScoreDisplay::new(),
            overlay: None,
            elapsed: Duration::ZERO,
            ended: None,
        }
    }

    /// Advance one frame.
    pub fn tick(&mut self, dt: Duration, input: &InputFrame) -> TickOutcome {
        if let Some(final_score) = self.ended {
            return TickOutcome::RunEnded { final_score };
        }
        if input.toggle_pause {
            self.toggle_pause();
        }
        if self.run.paused {
            return TickOutcome::Paused;
        }

        for fired in self.timers.drain() {
            if let Some(request) = self.spawner.on_fire(fired.event) {
                self.spawn(request);
            }
        }

        self.apply_input(input);
        self.scroll(dt);

        let pairs = self.physics.step(dt.as_secs_f32());
        self.clamp_player();
        self.sync_player();

        let effects = self.policy.resolve(&pairs, self.player, |id| {
            self.entities.get(&id).map(|e| e.kind)
        });
        for effect in effects {
            match effect {
                CollisionEffect::CollectCoin(coin) => self.collect(coin),
                CollisionEffect::EndRun { obstacle } => {
                    let final_score = self.run.score;
                    info!(%obstacle, final_score, "player hit obstacle");
                    self.audio.play(keys::HIT, PlayOptions::EFFECT);
                    self.audio.stop(keys::MUSIC);
                    self.timers.clear();
                    self.ended = Some(final_score);
                    return TickOutcome::RunEnded { final_score };
                }
            }
        }

        self.run.ramp(self.config.speed.increment_per_tick);
        self.timers.advance(dt);
        self.score_display.advance(dt);
        self.elapsed += dt;
        TickOutcome::Running
    }

    /// Flip the pause flag. Physics, spawn timers, the difficulty ramp and
    /// coin pulses freeze while paused; music pauses with them.
    pub fn toggle_pause(&mut self) {
        if self.ended.is_some() {
            return;
        }
        self.run.paused = !self.run.paused;
        if self.run.paused {
            self.timers.pause_all();
            self.audio.pause(keys::MUSIC);
            self.overlay = Some(PauseOverlay::default());
        } else {
            self.timers.resume_all();
            self.audio.resume(keys::MUSIC);
            self.overlay = None;
        }
        debug!(paused = self.run.paused, "pause toggled");
    }

    fn apply_input(&mut self, input: &InputFrame) {
        let Some(mut velocity) = self.physics.velocity(self.player) else {
            return;
        };
        let speed = self.config.player.move_speed;
        velocity.dx = match input.horizontal() {
            Horizontal::Left => -speed,
            Horizontal::Right => speed,
            Horizontal::Idle => 0.0,
        };
        if input.jump && self.physics.is_grounded(self.player) {
            velocity.dy = -self.config.player.jump_speed;
            self.audio.play(keys::JUMP, PlayOptions::EFFECT);
            trace!("jump");
        }
        if let Err(e) = self.physics.set_velocity(self.player, velocity) {
            warn!(error = %e, "player velocity not applied");
        }
    }

    fn scroll(&mut self, dt: Duration) {
        let shift = self.run.game_speed * dt.as_secs_f32();
        let coin = &self.config.coin;
        let mut gone = Vec::new();

        for (&id, entity) in self.entities.iter_mut() {
            if !entity.kind.scrolls() {
                continue;
            }
            entity.position.x -= shift;
            entity.age += dt;
            if entity.kind == EntityKind::Coin {
                entity.angle += coin.spin_per_tick;
                entity.alpha = pulse_alpha(entity.age, coin.pulse_ms, coin.min_alpha);
            }
            if entity.position.x < -entity.width / 2.0 {
                gone.push(id);
            } else if let Err(e) = self.physics.set_kinematic_target(id, entity.position) {
                warn!(entity = %id, error = %e, "kinematic target not applied");
            }
        }

        for id in gone {
            trace!(entity = %id, "scrolled off screen");
            self.despawn(id);
        }
    }

    fn clamp_player(&mut self) {
        let viewport = &self.config.viewport;
        let player = &self.config.player;
        let half = (player.width / 2.0, player.height / 2.0);
        if let Err(e) = self.physics.constrain_to_bounds(
            self.player,
            half,
            (viewport.width - half.0, viewport.height - half.1),
            player.bounce,
        ) {
            warn!(error = %e, "player bounds not applied");
        }
    }

    fn sync_player(&mut self) {
        if let (Some(position), Some(entity)) = (
            self.physics.position(self.player),
            self.entities.get_mut(&self.player),
        ) {
            entity.position = position;
        }
    }

    fn collect(&mut self, coin: EntityId) {
        // A coin already collected carries a stale id and is skipped.
        if !self.despawn(coin) {
            return;
        }
        self.run.add_score(self.config.scoring.coin_value);
        self.audio.play(keys::COLLECT, PlayOptions::EFFECT);
        self.score_display.set_score(self.run.score);
        debug!(%coin, score = self.run.score, "coin collected");
    }

    /// Create a spawned entity at the requested position.
    pub fn spawn(&mut self, request: SpawnRequest) -> EntityId {
        let (width, height) = class_size(request.class);
        let layouts = match request.class {
            SpawnClass::Coin => vec![
                ColliderLayout::single(ColliderShape::Circle { radius: width / 2.0 }),
                ColliderLayout::single(ColliderShape::Box {
                    half_width: width / 2.0,
                    half_height: height / 2.0,
                }),
            ],
            SpawnClass::Platform | SpawnClass::Obstacle => {
                vec![ColliderLayout::single(ColliderShape::Box {
                    half_width: width / 2.0,
                    half_height: height / 2.0,
                })]
            }
        };
        let position = Position {
            x: request.x,
            y: request.y,
        };

        let id = self.allocator.allocate();
        let fit = self.physics.register_entity(
            id,
            position,
            Velocity::default(),
            &PhysicsBody {
                kind: BodyKind::KinematicPosition,
                layouts,
                restitution: 0.0,
                sensor: request.class == SpawnClass::Coin,
            },
        );
        self.entities.insert(
            id,
            SimEntity {
                kind: request.class.kind(),
                position,
                width,
                height,
                angle: 0.0,
                alpha: 1.0,
                age: Duration::ZERO,
                fit,
            },
        );
        id
    }

    /// Remove a spawned entity. Returns `false` when it is already gone.
    fn despawn(&mut self, id: EntityId) -> bool {
        if !self.allocator.deallocate(id) {
            return false;
        }
        self.entities.remove(&id);
        self.physics.unregister_entity(id);
        true
    }

    /// Cancel timers and discard every entity.
    pub fn teardown(&mut self) {
        self.timers.clear();
        let ids: Vec<_> = self.entities.keys().copied().collect();
        for id in ids {
            self.allocator.deallocate(id);
            self.physics.unregister_entity(id);
        }
        self.entities.clear();
        self.overlay = None;
    }

    // -- accessors ----------------------------------------------------------

    pub fn run(&self) -> &GameRunState {
        &self.run
    }

    pub fn score(&self) -> u32 {
        self.run.score
    }

    pub fn game_speed(&self) -> f32 {
        self.run.game_speed
    }

    pub fn is_paused(&self) -> bool {
        self.run.paused
    }

    pub fn final_score(&self) -> Option<u32> {
        self.ended
    }

    pub fn player_id(&self) -> EntityId {
        self.player
    }

    pub fn player_position(&self) -> Option<Position> {
        self.physics.position(self.player)
    }

    pub fn is_player_grounded(&self) -> bool {
        self.physics.is_grounded(self.player)
    }

    pub fn entity(&self, id: EntityId) -> Option<&SimEntity> {
        self.entities.get(&id)
    }

    /// Live entities of one kind, in id order.
    pub fn entities_of(&self, kind: EntityKind) -> impl Iterator<Item = (EntityId, &SimEntity)> {
        self.entities
            .iter()
            .filter(move |(_, e)| e.kind == kind)
            .map(|(&id, e)| (id, e))
    }

    pub fn score_display(&self) -> &ScoreDisplay {
        &self.score_display
    }

    pub fn pause_overlay(&self) -> Option<&PauseOverlay> {
        self.overlay.as_ref()
    }

    pub fn pause_button_label(&self) -> &'static str {
        pause_button_label(self.run.paused)
    }

    pub fn timers(&self) -> &TimerQueue<SpawnClass> {
        &self.timers
    }

    pub fn spawner(&self) -> &EntitySpawner {
        &self.spawner
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            run: self.run.clone(),
            player: self
                .physics
                .position(self.player)
                .zip(self.physics.velocity(self.player)),
            entities: self
                .entities
                .iter()
                .filter(|(_, e)| e.kind.scrolls())
                .map(|(&id, e)| EntitySnapshot {
                    id,
                    kind: e.kind,
                    position: e.position,
                    angle: e.angle,
                    alpha: e.alpha,
                })
                .collect(),
            timers: self.timers.remaining_all(),
            elapsed: self.elapsed,
        }
    }
}

/// Alpha of a coin `age` into its pulse: 1.0 down to `min_alpha` over
/// `half_ms`, then back up, forever.
fn pulse_alpha(age: Duration, half_ms: u64, min_alpha: f32) -> f32 {
    let half = half_ms.max(1) as f32;
    let t = (age.as_millis() % (2 * half_ms.max(1) as u128)) as f32 / half;
    let phase = if t <= 1.0 { t } else { 2.0 - t };
    1.0 - (1.0 - min_alpha) * phase
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioService;

    const DT: Duration = Duration::from_micros(16_667);

    fn quiet_config() -> GameConfig {
        let mut config = GameConfig::default();
        config.spawner.platform.probability = 0.0;
        config.spawner.coin.probability = 0.0;
        config.spawner.obstacle.probability = 0.0;
        config
    }

    fn sim(config: &GameConfig) -> (SimulationLoop, AudioService) {
        let audio = AudioService::new();
        (SimulationLoop::new(config, audio.handle()), audio)
    }

    fn settle(sim: &mut SimulationLoop) {
        for _ in 0..180 {
            sim.tick(DT, &InputFrame::IDLE);
        }
    }

    #[test]
    fn new_run_has_player_ground_and_three_timers() {
        let (sim, audio) = sim(&GameConfig::default());
        assert_eq!(sim.score(), 0);
        assert_eq!(sim.game_speed(), 300.0);
        assert_eq!(sim.timers().len(), 3);
        assert_eq!(sim.entities_of(EntityKind::Ground).count(), 1);
        assert_eq!(audio.pending(), 1, "music queued");
    }

    #[test]
    fn player_lands_and_can_jump() {
        let (mut sim, audio) = sim(&quiet_config());
        settle(&mut sim);
        assert!(sim.is_player_grounded());
        audio.discard_pending();

        let y_before = sim.player_position().unwrap().y;
        sim.tick(DT, &InputFrame::jump());
        for _ in 0..5 {
            sim.tick(DT, &InputFrame::IDLE);
        }
        assert!(sim.player_position().unwrap().y < y_before - 10.0);
        assert_eq!(audio.pending(), 1, "jump sound queued");
    }

    #[test]
    fn airborne_jump_is_ignored() {
        let (mut sim, audio) = sim(&quiet_config());
        audio.discard_pending();
        sim.tick(DT, &InputFrame::jump());
        assert!(sim.physics().velocity(sim.player_id()).unwrap().dy >= 0.0);
        assert_eq!(audio.pending(), 0);
    }

    #[test]
    fn horizontal_input_sets_velocity() {
        let (mut sim, _audio) = sim(&quiet_config());
        let right = InputFrame {
            right: true,
            ..InputFrame::IDLE
        };
        sim.tick(DT, &right);
        assert_eq!(sim.physics().velocity(sim.player_id()).unwrap().dx, 160.0);
        sim.tick(DT, &InputFrame::IDLE);
        assert_eq!(sim.physics().velocity(sim.player_id()).unwrap().dx, 0.0);
    }

    #[test]
    fn coin_pickup_scores_once() {
        let (mut sim, _audio) = sim(&quiet_config());
        settle(&mut sim);
        let p = sim.player_position().unwrap();
        let coin = sim.spawn(SpawnRequest {
            class: SpawnClass::Coin,
            x: p.x,
            y: p.y,
        });

        assert_eq!(sim.tick(DT, &InputFrame::IDLE), TickOutcome::Running);
        assert_eq!(sim.score(), 10);
        assert!(sim.entity(coin).is_none());
        assert_eq!(sim.score_display().text(), "Score: 10");
        assert!(sim.score_display().is_pulsing());

        sim.collect(coin);
        assert_eq!(sim.score(), 10, "stale coin must not score again");
    }

    #[test]
    fn obstacle_ends_run_with_current_score() {
        let (mut sim, _audio) = sim(&quiet_config());
        settle(&mut sim);
        let p = sim.player_position().unwrap();
        sim.spawn(SpawnRequest {
            class: SpawnClass::Obstacle,
            x: p.x,
            y: p.y,
        });
        let outcome = sim.tick(DT, &InputFrame::IDLE);
        assert_eq!(outcome, TickOutcome::RunEnded { final_score: 0 });
        assert!(sim.timers().is_empty());
        assert_eq!(sim.tick(DT, &InputFrame::IDLE), outcome);
    }

    #[test]
    fn speed_ramps_every_unpaused_tick() {
        let (mut sim, _audio) = sim(&quiet_config());
        for _ in 0..100 {
            sim.tick(DT, &InputFrame::IDLE);
        }
        assert!((sim.game_speed() - 301.0).abs() < 1e-2);
    }

    #[test]
    fn paused_ticks_freeze_everything() {
        let (mut sim, _audio) = sim(&GameConfig::default());
        for _ in 0..30 {
            sim.tick(DT, &InputFrame::IDLE);
        }
        sim.toggle_pause();
        assert!(sim.pause_overlay().is_some());
        assert_eq!(sim.pause_button_label(), "RESUME");
        let frozen = sim.snapshot();
        for _ in 0..200 {
            assert_eq!(sim.tick(DT, &InputFrame::IDLE), TickOutcome::Paused);
        }
        assert_eq!(sim.snapshot(), frozen);
        assert_eq!(sim.snapshot().hash(), frozen.hash());
    }

    #[test]
    fn double_toggle_restores_state() {
        let (mut sim, _audio) = sim(&GameConfig::default());
        for _ in 0..90 {
            sim.tick(DT, &InputFrame::IDLE);
        }
        let before = sim.snapshot();
        sim.toggle_pause();
        sim.toggle_pause();
        assert_eq!(sim.snapshot().hash(), before.hash());
        assert!(sim.pause_overlay().is_none());
        assert_eq!(sim.pause_button_label(), "PAUSE");
    }

    #[test]
    fn entity_leaves_once_center_passes_half_width() {
        let (mut sim, _audio) = sim(&quiet_config());
        let obstacle = sim.spawn(SpawnRequest {
            class: SpawnClass::Obstacle,
            x: 900.0,
            y: 100.0,
        });
        let mut last_x = 900.0;
        loop {
            sim.tick(DT, &InputFrame::IDLE);
            match sim.entity(obstacle) {
                Some(e) => last_x = e.position.x,
                None => break,
            }
        }
        let step = sim.game_speed() * DT.as_secs_f32();
        assert!(last_x >= -16.0, "removed late: last seen at {last_x}");
        assert!(last_x - step < -16.0 + 1e-3, "removed early: last seen at {last_x}");
    }

    #[test]
    fn coins_spin_and_pulse() {
        let (mut sim, _audio) = sim(&quiet_config());
        let coin = sim.spawn(SpawnRequest {
            class: SpawnClass::Coin,
            x: 700.0,
            y: 100.0,
        });
        for _ in 0..30 {
            sim.tick(DT, &InputFrame::IDLE);
        }
        let e = sim.entity(coin).unwrap();
        assert_eq!(e.angle, 60.0);
        assert!(e.alpha < 1.0 && e.alpha > 0.7);
    }

    #[test]
    fn pulse_alpha_is_a_triangle_wave() {
        let ms = Duration::from_millis;
        assert_eq!(pulse_alpha(ms(0), 1000, 0.7), 1.0);
        assert!((pulse_alpha(ms(1000), 1000, 0.7) - 0.7).abs() < 1e-6);
        assert!((pulse_alpha(ms(1500), 1000, 0.7) - 0.85).abs() < 1e-6);
        assert_eq!(pulse_alpha(ms(2000), 1000, 0.7), 1.0);
    }

    #[test]
    fn teardown_discards_entities_and_timers() {
        let (mut sim, _audio) = sim(&GameConfig::default());
        sim.teardown();
        assert!(sim.timers().is_empty());
        assert_eq!(sim.entities_of(EntityKind::Player).count(), 0);
    }
}
