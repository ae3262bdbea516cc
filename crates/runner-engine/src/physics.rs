//! rapier2d integration for the runner.
//!
//! The [`PhysicsWorld`] owns a rapier2d simulation and maps each
//! [`EntityId`] to its rigid body and colliders. Coordinates are pixels with
//! the y axis pointing down, so gravity is positive y.
//!
//! Bodies come in three flavours:
//!
//! - **Dynamic**: the player, fully simulated.
//! - **KinematicPosition**: platforms, coins and obstacles. Game logic moves
//!   them every tick and gravity never touches them.
//! - **Fixed**: the ground.
//!
//! Every [`PhysicsBody`] lists its collider layouts from most to least
//! precise. Registration uses the first layout whose shapes are all valid. If
//! none is, the body is still created without colliders and the entity simply
//! stops colliding.
//!
//! # Determinism
//!
//! rapier2d is compiled with `enhanced-determinism`, and collision pairs are
//! sorted before they are handed out, so a fixed timestep plus a seeded
//! spawner reproduces the same run.

use std::collections::HashMap;

use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PhysicsConfig;
use crate::entity::EntityId;

// ---------------------------------------------------------------------------
// Body descriptors
// ---------------------------------------------------------------------------

/// Centre position in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// Linear velocity in px/s.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

/// How rapier treats a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Simulated by the solver (the player).
    Dynamic,
    /// Moved by game logic through target positions.
    KinematicPosition,
    /// Immovable (the ground).
    Fixed,
}

/// Collider primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    /// Axis-aligned box with half-extents.
    Box { half_width: f32, half_height: f32 },
    /// Circle with radius.
    Circle { radius: f32 },
}

impl ColliderShape {
    fn build(&self, max_half_extent: f32) -> Result<SharedShape, PhysicsError> {
        let extents: &[f32] = match self {
            ColliderShape::Box {
                half_width,
                half_height,
            } => &[*half_width, *half_height],
            ColliderShape::Circle { radius } => std::slice::from_ref(radius),
        };
        for &extent in extents {
            if !extent.is_finite() || extent <= 0.0 {
                return Err(PhysicsError::InvalidShape {
                    shape: *self,
                    reason: "extents must be positive and finite".into(),
                });
            }
            if extent > max_half_extent {
                return Err(PhysicsError::InvalidShape {
                    shape: *self,
                    reason: format!("extent {extent} exceeds the {max_half_extent} px limit"),
                });
            }
        }
        Ok(match *self {
            ColliderShape::Box {
                half_width,
                half_height,
            } => SharedShape::cuboid(half_width, half_height),
            ColliderShape::Circle { radius } => SharedShape::ball(radius),
        })
    }
}

/// One collider of a layout, offset from the body centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColliderPart {
    pub shape: ColliderShape,
    pub offset: (f32, f32),
}

/// A complete set of colliders for one body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColliderLayout {
    pub parts: Vec<ColliderPart>,
}

impl ColliderLayout {
    /// A single centred collider.
    pub fn single(shape: ColliderShape) -> Self {
        Self {
            parts: vec![ColliderPart {
                shape,
                offset: (0.0, 0.0),
            }],
        }
    }

    /// A row of `tile_width` wide boxes spanning `total_width`, centred on
    /// the body.
    pub fn tiles(total_width: f32, tile_width: f32, half_height: f32) -> Self {
        let count = (total_width / tile_width).ceil().max(1.0) as usize;
        let parts = (0..count)
            .map(|i| ColliderPart {
                shape: ColliderShape::Box {
                    half_width: tile_width / 2.0,
                    half_height,
                },
                offset: (
                    i as f32 * tile_width + tile_width / 2.0 - total_width / 2.0,
                    0.0,
                ),
            })
            .collect();
        Self { parts }
    }
}

/// Physics descriptor for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsBody {
    pub kind: BodyKind,
    /// Tried in order; the first valid one is used.
    pub layouts: Vec<ColliderLayout>,
    /// Coefficient of restitution.
    pub restitution: f32,
    /// Sensors report overlaps without blocking.
    pub sensor: bool,
}

/// Which layout registration ended up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColliderFit {
    /// Index into [`PhysicsBody::layouts`].
    Layout(usize),
    /// No layout fitted; the body has no colliders.
    Degraded,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while building bodies and colliders.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PhysicsError {
    /// A collider shape cannot be built.
    #[error("invalid collider shape {shape:?}: {reason}")]
    InvalidShape { shape: ColliderShape, reason: String },

    /// The entity has no body in this world.
    #[error("entity {0:?} has no physics body")]
    UnknownEntity(EntityId),
}

// ---------------------------------------------------------------------------
// CollisionPair
// ---------------------------------------------------------------------------

/// Whether a pair touched solidly or only overlapped a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactKind {
    Contact,
    Overlap,
}

/// A collision that started during the last step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionPair {
    pub entity_a: EntityId,
    pub entity_b: EntityId,
    pub kind: ContactKind,
}

impl CollisionPair {
    /// The other entity, if `entity` is part of the pair.
    pub fn other(&self, entity: EntityId) -> Option<EntityId> {
        if self.entity_a == entity {
            Some(self.entity_b)
        } else if self.entity_b == entity {
            Some(self.entity_a)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// rapier2d simulation state plus the entity/handle maps.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    max_half_extent: f32,
    entity_to_body: HashMap<u64, RigidBodyHandle>,
    entity_colliders: HashMap<u64, Vec<ColliderHandle>>,
    entity_fit: HashMap<u64, ColliderFit>,
    collider_to_entity: HashMap<ColliderHandle, u64>,
}

impl PhysicsWorld {
    /// World with the given gravity, one pixel per length unit and no shape
    /// size limit.
    pub fn new(gravity_x: f32, gravity_y: f32) -> Self {
        Self::with_params(gravity_x, gravity_y, 1.0, f32::MAX)
    }

    /// World configured from the game's physics section.
    pub fn from_config(config: &PhysicsConfig) -> Self {
        Self::with_params(
            0.0,
            config.gravity_y,
            config.length_unit,
            config.max_collider_half_extent,
        )
    }

    fn with_params(gravity_x: f32, gravity_y: f32, length_unit: f32, max_half_extent: f32) -> Self {
        let mut integration_params = IntegrationParameters::default();
        integration_params.length_unit = length_unit;
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![gravity_x, gravity_y],
            integration_params,
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            max_half_extent,
            entity_to_body: HashMap::new(),
            entity_colliders: HashMap::new(),
            entity_fit: HashMap::new(),
            collider_to_entity: HashMap::new(),
        }
    }

    /// Create the body and colliders for an entity.
    ///
    /// Registering an entity twice is a no-op that returns the first fit.
    pub fn register_entity(
        &mut self,
        entity_id: EntityId,
        position: Position,
        velocity: Velocity,
        body: &PhysicsBody,
    ) -> ColliderFit {
        let raw_id = entity_id.to_raw();
        if let Some(fit) = self.entity_fit.get(&raw_id) {
            return *fit;
        }

        let translation = vector![position.x, position.y];
        let rb = match body.kind {
            BodyKind::Dynamic => RigidBodyBuilder::dynamic()
                .translation(translation)
                .linvel(vector![velocity.dx, velocity.dy])
                .lock_rotations()
                .can_sleep(false)
                .build(),
            BodyKind::KinematicPosition => RigidBodyBuilder::kinematic_position_based()
                .translation(translation)
                .build(),
            BodyKind::Fixed => RigidBodyBuilder::fixed().translation(translation).build(),
        };
        let body_handle = self.rigid_body_set.insert(rb);
        self.entity_to_body.insert(raw_id, body_handle);

        let mut fit = ColliderFit::Degraded;
        for (index, layout) in body.layouts.iter().enumerate() {
            match self.build_layout(layout) {
                Ok(shapes) => {
                    let handles = shapes
                        .into_iter()
                        .map(|(shape, (ox, oy))| {
                            let collider = ColliderBuilder::new(shape)
                                .translation(vector![ox, oy])
                                .restitution(body.restitution)
                                .sensor(body.sensor)
                                .active_events(ActiveEvents::COLLISION_EVENTS)
                                .build();
                            let handle = self.collider_set.insert_with_parent(
                                collider,
                                body_handle,
                                &mut self.rigid_body_set,
                            );
                            self.collider_to_entity.insert(handle, raw_id);
                            handle
                        })
                        .collect();
                    self.entity_colliders.insert(raw_id, handles);
                    fit = ColliderFit::Layout(index);
                    break;
                }
                Err(e) => {
                    warn!(entity = %entity_id, layout = index, error = %e, "collider layout rejected");
                }
            }
        }

        if fit == ColliderFit::Degraded {
            warn!(entity = %entity_id, "no collider layout fits, body will not collide");
        } else {
            debug!(entity = %entity_id, ?fit, "physics body registered");
        }
        self.entity_fit.insert(raw_id, fit);
        fit
    }

    /// Validate every part before anything is inserted.
    fn build_layout(
        &self,
        layout: &ColliderLayout,
    ) -> Result<Vec<(SharedShape, (f32, f32))>, PhysicsError> {
        if layout.parts.is_empty() {
            return Err(PhysicsError::InvalidShape {
                shape: ColliderShape::Box {
                    half_width: 0.0,
                    half_height: 0.0,
                },
                reason: "layout has no parts".into(),
            });
        }
        layout
            .parts
            .iter()
            .map(|part| Ok((part.shape.build(self.max_half_extent)?, part.offset)))
            .collect()
    }

    /// Remove an entity's body and colliders. Unknown entities are ignored.
    pub fn unregister_entity(&mut self, entity_id: EntityId) {
        let raw_id = entity_id.to_raw();
        self.entity_fit.remove(&raw_id);
        if let Some(handles) = self.entity_colliders.remove(&raw_id) {
            for handle in handles {
                self.collider_to_entity.remove(&handle);
            }
        }
        if let Some(body_handle) = self.entity_to_body.remove(&raw_id) {
            self.rigid_body_set.remove(
                body_handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            );
        }
    }

    fn body(&self, entity_id: EntityId) -> Option<&RigidBody> {
        self.entity_to_body
            .get(&entity_id.to_raw())
            .and_then(|h| self.rigid_body_set.get(*h))
    }

    fn body_mut(&mut self, entity_id: EntityId) -> Result<&mut RigidBody, PhysicsError> {
        self.entity_to_body
            .get(&entity_id.to_raw())
            .and_then(|h| self.rigid_body_set.get_mut(*h))
            .ok_or(PhysicsError::UnknownEntity(entity_id))
    }

    /// Target position of a kinematic body for the next step.
    pub fn set_kinematic_target(
        &mut self,
        entity_id: EntityId,
        position: Position,
    ) -> Result<(), PhysicsError> {
        self.body_mut(entity_id)?
            .set_next_kinematic_translation(vector![position.x, position.y]);
        Ok(())
    }

    pub fn set_velocity(&mut self, entity_id: EntityId, velocity: Velocity) -> Result<(), PhysicsError> {
        self.body_mut(entity_id)?
            .set_linvel(vector![velocity.dx, velocity.dy], true);
        Ok(())
    }

    pub fn position(&self, entity_id: EntityId) -> Option<Position> {
        self.body(entity_id).map(|rb| {
            let t = rb.translation();
            Position { x: t.x, y: t.y }
        })
    }

    pub fn velocity(&self, entity_id: EntityId) -> Option<Velocity> {
        self.body(entity_id).map(|rb| {
            let v = rb.linvel();
            Velocity { dx: v.x, dy: v.y }
        })
    }

    /// Keep a body's centre inside `[min, max]`. A clamped axis loses its
    /// velocity, reflected and scaled by `bounce`. Returns whether anything
    /// was clamped.
    pub fn constrain_to_bounds(
        &mut self,
        entity_id: EntityId,
        min: (f32, f32),
        max: (f32, f32),
        bounce: f32,
    ) -> Result<bool, PhysicsError> {
        let rb = self.body_mut(entity_id)?;
        let mut t = *rb.translation();
        let mut v = *rb.linvel();
        let mut clamped = false;

        if t.x < min.0 || t.x > max.0 {
            t.x = t.x.clamp(min.0, max.0);
            v.x = -v.x * bounce;
            clamped = true;
        }
        if t.y < min.1 || t.y > max.1 {
            t.y = t.y.clamp(min.1, max.1);
            v.y = -v.y * bounce;
            clamped = true;
        }
        if clamped {
            rb.set_translation(t, true);
            rb.set_linvel(v, true);
        }
        Ok(clamped)
    }

    /// Step the simulation and return the collision pairs that started,
    /// sorted by entity id.
    pub fn step(&mut self, dt: f32) -> Vec<CollisionPair> {
        self.integration_params.dt = dt;

        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &event_handler,
        );

        let mut collisions = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            if let CollisionEvent::Started(h1, h2, flags) = event {
                let entity_a = self.collider_to_entity.get(&h1).copied();
                let entity_b = self.collider_to_entity.get(&h2).copied();
                if let (Some(a), Some(b)) = (entity_a, entity_b) {
                    let kind = if flags.contains(CollisionEventFlags::SENSOR) {
                        ContactKind::Overlap
                    } else {
                        ContactKind::Contact
                    };
                    collisions.push(CollisionPair {
                        entity_a: EntityId::from_raw(a.min(b)),
                        entity_b: EntityId::from_raw(a.max(b)),
                        kind,
                    });
                }
            }
        }

        // Tiles of one body may touch the same entity twice.
        collisions.sort_by_key(|c| {
            (
                c.entity_a.to_raw(),
                c.entity_b.to_raw(),
                c.kind == ContactKind::Contact,
            )
        });
        collisions.dedup();
        collisions
    }

    /// Whether the entity rests on something below it.
    ///
    /// Looks at active contact manifolds whose normal points down from the
    /// entity (positive y).
    pub fn is_grounded(&self, entity_id: EntityId) -> bool {
        let Some(handles) = self.entity_colliders.get(&entity_id.to_raw()) else {
            return false;
        };
        handles.iter().any(|&handle| {
            self.narrow_phase.contact_pairs_with(handle).any(|pair| {
                if !pair.has_any_active_contact {
                    return false;
                }
                // Manifold normals point from collider1 to collider2.
                let sign = if pair.collider1 == handle { 1.0 } else { -1.0 };
                pair.manifolds
                    .iter()
                    .any(|m| !m.points.is_empty() && m.data.normal.y * sign > 0.5)
            })
        })
    }

    pub fn has_entity(&self, entity_id: EntityId) -> bool {
        self.entity_to_body.contains_key(&entity_id.to_raw())
    }

    /// Layout chosen at registration.
    pub fn collider_fit(&self, entity_id: EntityId) -> Option<ColliderFit> {
        self.entity_fit.get(&entity_id.to_raw()).copied()
    }

    /// Number of colliders attached to an entity.
    pub fn collider_count(&self, entity_id: EntityId) -> usize {
        self.entity_colliders
            .get(&entity_id.to_raw())
            .map_or(0, Vec::len)
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn player_body() -> PhysicsBody {
        PhysicsBody {
            kind: BodyKind::Dynamic,
            layouts: vec![ColliderLayout::single(ColliderShape::Box {
                half_width: 16.0,
                half_height: 24.0,
            })],
            restitution: 0.2,
            sensor: false,
        }
    }

    fn kinematic(shape: ColliderShape, sensor: bool) -> PhysicsBody {
        PhysicsBody {
            kind: BodyKind::KinematicPosition,
            layouts: vec![ColliderLayout::single(shape)],
            restitution: 0.0,
            sensor,
        }
    }

    fn at(x: f32, y: f32) -> Position {
        Position { x, y }
    }

    // -- 1. registration ------------------------------------------------------

    #[test]
    fn register_is_idempotent_and_unregister_removes() {
        let mut pw = PhysicsWorld::new(0.0, 0.0);
        let eid = EntityId::new(0, 0);
        pw.register_entity(eid, at(0.0, 0.0), Velocity::default(), &player_body());
        pw.register_entity(eid, at(0.0, 0.0), Velocity::default(), &player_body());
        assert_eq!(pw.body_count(), 1);
        pw.unregister_entity(eid);
        assert!(!pw.has_entity(eid));
        assert_eq!(pw.body_count(), 0);
        pw.unregister_entity(eid);
    }

    #[test]
    fn invalid_layout_falls_back_to_next() {
        let mut pw = PhysicsWorld::new(0.0, 0.0);
        let eid = EntityId::new(0, 0);
        let body = PhysicsBody {
            kind: BodyKind::KinematicPosition,
            layouts: vec![
                ColliderLayout::single(ColliderShape::Circle { radius: 0.0 }),
                ColliderLayout::single(ColliderShape::Box {
                    half_width: 16.0,
                    half_height: 16.0,
                }),
            ],
            restitution: 0.0,
            sensor: true,
        };
        let fit = pw.register_entity(eid, at(0.0, 0.0), Velocity::default(), &body);
        assert_eq!(fit, ColliderFit::Layout(1));
        assert_eq!(pw.collider_count(eid), 1);
    }

    #[test]
    fn oversized_strip_falls_back_to_tiles() {
        let mut pw = PhysicsWorld::from_config(&PhysicsConfig {
            max_collider_half_extent: 100.0,
            ..PhysicsConfig::default()
        });
        let eid = EntityId::new(0, 0);
        let body = PhysicsBody {
            kind: BodyKind::Fixed,
            layouts: vec![
                ColliderLayout::single(ColliderShape::Box {
                    half_width: 400.0,
                    half_height: 16.0,
                }),
                ColliderLayout::tiles(800.0, 64.0, 16.0),
            ],
            restitution: 0.0,
            sensor: false,
        };
        assert_eq!(
            pw.register_entity(eid, at(400.0, 434.0), Velocity::default(), &body),
            ColliderFit::Layout(1)
        );
        assert_eq!(pw.collider_count(eid), 13);
    }

    #[test]
    fn no_valid_layout_degrades_without_colliders() {
        let mut pw = PhysicsWorld::new(0.0, 0.0);
        let eid = EntityId::new(0, 0);
        let body = kinematic(ColliderShape::Circle { radius: f32::NAN }, true);
        assert_eq!(
            pw.register_entity(eid, at(0.0, 0.0), Velocity::default(), &body),
            ColliderFit::Degraded
        );
        assert!(pw.has_entity(eid));
        assert_eq!(pw.collider_count(eid), 0);
    }

    #[test]
    fn tiles_cover_the_requested_width() {
        let layout = ColliderLayout::tiles(800.0, 64.0, 16.0);
        assert_eq!(layout.parts.len(), 13);
        assert_eq!(layout.parts[0].offset, (-368.0, 0.0));
    }

    // -- 2. stepping ----------------------------------------------------------

    #[test]
    fn player_falls_onto_ground_and_is_grounded() {
        let mut pw = PhysicsWorld::from_config(&PhysicsConfig::default());
        let player = EntityId::new(0, 0);
        let ground = EntityId::new(1, 0);
        pw.register_entity(player, at(100.0, 200.0), Velocity::default(), &player_body());
        pw.register_entity(
            ground,
            at(400.0, 434.0),
            Velocity::default(),
            &PhysicsBody {
                kind: BodyKind::Fixed,
                layouts: vec![ColliderLayout::single(ColliderShape::Box {
                    half_width: 400.0,
                    half_height: 16.0,
                })],
                restitution: 0.0,
                sensor: false,
            },
        );

        assert!(!pw.is_grounded(player));
        for _ in 0..240 {
            pw.step(DT);
        }
        let pos = pw.position(player).unwrap();
        assert!(
            (pos.y - 394.0).abs() < 2.0,
            "player should rest on the ground, got y={}",
            pos.y
        );
        assert!(pw.is_grounded(player), "resting player must be grounded");
    }

    #[test]
    fn sensor_overlap_is_reported_as_overlap() {
        let mut pw = PhysicsWorld::new(0.0, 0.0);
        let player = EntityId::new(0, 0);
        let coin = EntityId::new(1, 0);
        pw.register_entity(player, at(100.0, 200.0), Velocity::default(), &player_body());
        pw.register_entity(
            coin,
            at(100.0, 200.0),
            Velocity::default(),
            &kinematic(ColliderShape::Circle { radius: 16.0 }, true),
        );

        let pairs = pw.step(DT);
        assert_eq!(
            pairs,
            vec![CollisionPair {
                entity_a: player,
                entity_b: coin,
                kind: ContactKind::Overlap,
            }]
        );
        assert_eq!(pairs[0].other(player), Some(coin));
    }

    #[test]
    fn moving_obstacle_contacts_player() {
        let mut pw = PhysicsWorld::new(0.0, 0.0);
        let player = EntityId::new(0, 0);
        let obstacle = EntityId::new(1, 0);
        pw.register_entity(player, at(100.0, 200.0), Velocity::default(), &player_body());
        pw.register_entity(
            obstacle,
            at(200.0, 200.0),
            Velocity::default(),
            &kinematic(
                ColliderShape::Box {
                    half_width: 16.0,
                    half_height: 16.0,
                },
                false,
            ),
        );

        let mut contacts = Vec::new();
        for tick in 1..=60 {
            pw.set_kinematic_target(obstacle, at(200.0 - tick as f32 * 5.0, 200.0))
                .unwrap();
            contacts.extend(pw.step(DT));
        }
        assert!(
            contacts
                .iter()
                .any(|c| c.kind == ContactKind::Contact && c.other(player) == Some(obstacle)),
            "obstacle sweeping through the player must start a contact, got {contacts:?}"
        );
    }

    #[test]
    fn bounds_clamp_reflects_velocity() {
        let mut pw = PhysicsWorld::new(0.0, 0.0);
        let eid = EntityId::new(0, 0);
        pw.register_entity(
            eid,
            at(-10.0, 100.0),
            Velocity {
                dx: -100.0,
                dy: 0.0,
            },
            &player_body(),
        );
        let clamped = pw
            .constrain_to_bounds(eid, (16.0, 24.0), (784.0, 426.0), 0.2)
            .unwrap();
        assert!(clamped);
        assert_eq!(pw.position(eid).unwrap().x, 16.0);
        assert!((pw.velocity(eid).unwrap().dx - 20.0).abs() < 1e-4);
    }

    #[test]
    fn unknown_entity_errors() {
        let mut pw = PhysicsWorld::new(0.0, 0.0);
        let ghost = EntityId::new(9, 0);
        assert_eq!(
            pw.set_velocity(ghost, Velocity::default()),
            Err(PhysicsError::UnknownEntity(ghost))
        );
        assert!(!pw.is_grounded(ghost));
    }
}
