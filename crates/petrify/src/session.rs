use std::collections::HashMap;

use engine::{Actor, ActorId, SimWorld};
use tracing::{info, warn};

use crate::orphan::{OrphanLedger, OrphanReason, OrphanRecord};
use crate::registry::TransformationRegistry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LifecycleState {
    #[default]
    Live,
    Transforming,
    Petrified,
    Detransforming,
}

/// Per-session lifecycle bookkeeping. Built at session start and passed to the controller.
#[derive(Debug, Default)]
pub struct PetrifySession {
    registry: TransformationRegistry,
    states: HashMap<ActorId, LifecycleState>,
    orphans: OrphanLedger,
}

impl PetrifySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derives membership and orphans after a restore. Actors carrying `condition`
    /// that are alive and out of the world are petrified; living, unspawned actors
    /// without it that a depetrify could not have put back are orphans.
    pub fn rebuild_from_world(&mut self, world: &SimWorld, condition: &str) {
        self.registry.clear();
        self.states.clear();
        self.orphans.clear();
        for actor in world.actors() {
            if actor.spawned() || actor.dead() {
                continue;
            }
            if actor.has_condition(condition) {
                self.registry.add(actor.id);
                self.states.insert(actor.id, LifecycleState::Petrified);
            } else if let Some(record) = derive_orphan(world, actor) {
                warn!(
                    actor = %record.actor,
                    reason = %record.reason,
                    retained_container = ?record.retained_container,
                    "orphan_rederived"
                );
                self.orphans.record(record);
            }
        }
        info!(
            petrified = self.registry.len(),
            orphans = self.orphans.len(),
            "session_rebuilt"
        );
    }

    pub fn teardown(&mut self) {
        info!(
            petrified = self.registry.len(),
            orphans = self.orphans.len(),
            "session_teardown"
        );
        self.registry.clear();
        self.states.clear();
        self.orphans.clear();
    }

    pub fn registry(&self) -> &TransformationRegistry {
        &self.registry
    }

    pub fn is_transformed(&self, actor: ActorId) -> bool {
        self.registry.contains(actor)
    }

    pub fn state(&self, actor: ActorId) -> LifecycleState {
        self.states.get(&actor).copied().unwrap_or_default()
    }

    pub fn orphans(&self) -> impl Iterator<Item = &OrphanRecord> {
        self.orphans.iter()
    }

    pub fn orphan(&self, actor: ActorId) -> Option<&OrphanRecord> {
        self.orphans.get(actor)
    }

    pub(crate) fn set_state(&mut self, actor: ActorId, state: LifecycleState) {
        if state == LifecycleState::Live {
            self.states.remove(&actor);
        } else {
            self.states.insert(actor, state);
        }
    }

    pub(crate) fn mark_petrified(&mut self, actor: ActorId) {
        self.registry.add(actor);
        self.set_state(actor, LifecycleState::Petrified);
    }

    pub(crate) fn mark_live(&mut self, actor: ActorId) {
        self.registry.remove(actor);
        self.set_state(actor, LifecycleState::Live);
    }

    pub(crate) fn orphans_mut(&mut self) -> &mut OrphanLedger {
        &mut self.orphans
    }
}

/// Classifies an unspawned, living actor whose condition is gone. A bound placeholder
/// still on a map means no cell near it was standable; one held off-map means the
/// container was carried away. Without a placeholder the actor is orphaned only when
/// its last position can no longer take it.
fn derive_orphan(world: &SimWorld, actor: &Actor) -> Option<OrphanRecord> {
    let bound = world
        .things()
        .find(|thing| thing.bound_actor() == Some(actor.id));
    if let Some(placeholder) = bound {
        let outer = placeholder.container().unwrap_or(placeholder.id);
        let outer_placement = world.thing(outer).and_then(|thing| thing.placement());
        let (reason, last_known) = match outer_placement {
            Some(placement) => (OrphanReason::NoStandableCell, Some(placement)),
            None => (OrphanReason::ContainerOffMap, actor.last_placement()),
        };
        return Some(OrphanRecord {
            actor: actor.id,
            reason,
            last_known,
            retained_container: Some(outer),
        });
    }

    let last = actor.last_placement()?;
    if world.is_standable(last.region, last.cell, None) {
        return None;
    }
    Some(OrphanRecord {
        actor: actor.id,
        reason: OrphanReason::NoFallbackPosition,
        last_known: Some(last),
        retained_container: None,
    })
}

#[cfg(test)]
mod tests {
    use engine::{Cell, DefDatabase, Placement, Rotation, Tilemap};

    use super::*;

    #[test]
    fn rebuild_registers_unspawned_actors_with_condition() {
        let mut world = SimWorld::new(DefDatabase::builtin().expect("defs"));
        let region = world.add_region("yard", Tilemap::open(4, 4).expect("tilemap"));
        let stone = world.create_actor("stone", None);
        let walking = world.create_actor("walking", None);
        let dead = world.create_actor("dead", None);
        for actor in [stone, walking, dead] {
            world.add_condition(actor, "petrified_full").expect("condition");
        }
        world
            .spawn_actor(walking, Placement::new(region, Cell::new(0, 0), Rotation::North))
            .expect("spawn");
        world.mark_dead(dead).expect("dead");

        let mut session = PetrifySession::new();
        session.rebuild_from_world(&world, "petrified_full");

        assert!(session.is_transformed(stone));
        assert_eq!(session.state(stone), LifecycleState::Petrified);
        assert!(!session.is_transformed(walking));
        assert!(!session.is_transformed(dead));
        assert_eq!(session.state(walking), LifecycleState::Live);
    }

    #[test]
    fn rebuild_rederives_orphans_without_a_way_back() {
        let mut world = SimWorld::new(DefDatabase::builtin().expect("defs"));
        let region = world.add_region("yard", Tilemap::open(4, 4).expect("tilemap"));
        let walled_in = world.create_actor("walled_in", None);
        let stepped_out = world.create_actor("stepped_out", None);
        let never_placed = world.create_actor("never_placed", None);
        world
            .spawn_actor(walled_in, Placement::new(region, Cell::new(2, 2), Rotation::North))
            .expect("spawn");
        world
            .spawn_actor(stepped_out, Placement::new(region, Cell::new(0, 0), Rotation::North))
            .expect("spawn");
        world.despawn_actor(walled_in).expect("despawn");
        world.despawn_actor(stepped_out).expect("despawn");
        world
            .region_mut(region)
            .expect("region")
            .tilemap
            .set_tile(Cell::new(2, 2), engine::BLOCKED_TILE_ID);

        let mut session = PetrifySession::new();
        session.rebuild_from_world(&world, "petrified_full");

        let record = session.orphan(walled_in).expect("orphan");
        assert_eq!(record.reason, OrphanReason::NoFallbackPosition);
        assert_eq!(record.last_known.map(|p| p.cell), Some(Cell::new(2, 2)));
        assert!(session.orphan(stepped_out).is_none());
        assert!(session.orphan(never_placed).is_none());
        assert_eq!(session.orphans().count(), 1);
    }

    #[test]
    fn teardown_clears_everything() {
        let mut session = PetrifySession::new();
        session.mark_petrified(ActorId(1));
        session.orphans_mut().record(OrphanRecord {
            actor: ActorId(2),
            reason: crate::orphan::OrphanReason::NoFallbackPosition,
            last_known: None,
            retained_container: None,
        });

        session.teardown();
        assert!(!session.is_transformed(ActorId(1)));
        assert_eq!(session.state(ActorId(1)), LifecycleState::Live);
        assert_eq!(session.orphans().count(), 0);
    }
}
