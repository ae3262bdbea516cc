//! Mapping of collision pairs to game effects.
//!
//! | pair                     | outcome                                    |
//! |--------------------------|--------------------------------------------|
//! | player / ground, platform| solver stops the player, no game effect    |
//! | player / coin            | overlap, [`CollisionEffect::CollectCoin`]  |
//! | player / obstacle        | contact, [`CollisionEffect::EndRun`]       |
//!
//! Pairs that do not involve the player are ignored.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::entity::{EntityId, EntityKind};
use crate::physics::CollisionPair;

/// What the simulation must do in response to a collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionEffect {
    CollectCoin(EntityId),
    EndRun { obstacle: EntityId },
}

/// Stateless resolver from pairs to effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionPolicy;

impl CollisionPolicy {
    /// Effects for one step's pairs.
    ///
    /// Pickups come first, each coin at most once, so coins touched in the
    /// same step as an obstacle still count. At most one `EndRun` is
    /// produced. `kind_of` returns `None` for entities that no longer exist.
    pub fn resolve(
        &self,
        pairs: &[CollisionPair],
        player: EntityId,
        kind_of: impl Fn(EntityId) -> Option<EntityKind>,
    ) -> Vec<CollisionEffect> {
        let mut effects = Vec::new();
        let mut end_run = None;

        for pair in pairs {
            let Some(other) = pair.other(player) else {
                continue;
            };
            match kind_of(other) {
                Some(kind) if kind.is_collectible() => {
                    let effect = CollisionEffect::CollectCoin(other);
                    if !effects.contains(&effect) {
                        effects.push(effect);
                    }
                }
                Some(kind) if kind.is_hazard() => {
                    end_run.get_or_insert(CollisionEffect::EndRun { obstacle: other });
                }
                Some(kind) => trace!(?kind, "blocking contact, no effect"),
                None => trace!(entity = %other, "collision with despawned entity ignored"),
            }
        }

        effects.extend(end_run);
        effects
    }
}
