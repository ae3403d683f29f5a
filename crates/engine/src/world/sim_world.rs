use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::content::{DefDatabase, ThingDefId, ThingDefKind};

use super::actor::Actor;
use super::thing::{PlaceholderState, Thing, ThingKind, WrapperState};
use super::tilemap::Tilemap;
use super::types::{ActorId, Cell, FactionId, Placement, RegionId, ThingId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("unknown actor {0}")]
    UnknownActor(ActorId),
    #[error("unknown thing {0}")]
    UnknownThing(ThingId),
    #[error("unknown region {0}")]
    UnknownRegion(RegionId),
    #[error("unknown thing def {0:?}")]
    UnknownDef(ThingDefId),
    #[error("cell {cell} is outside the bounds of {region}")]
    CellOutOfBounds { region: RegionId, cell: Cell },
    #[error("{0} is already spawned")]
    ActorAlreadySpawned(ActorId),
    #[error("{0} is dead")]
    ActorDead(ActorId),
    #[error("{0} is already spawned")]
    ThingAlreadySpawned(ThingId),
    #[error("{thing} is held inside {container}")]
    ThingContained { thing: ThingId, container: ThingId },
    #[error("{0} is not a placeholder")]
    NotAPlaceholder(ThingId),
    #[error("{0:?} is not a wrapper def")]
    NotAWrapperDef(ThingDefId),
    #[error("{0} is not a wrapper")]
    NotAWrapper(ThingId),
    #[error("{0} holds nothing")]
    EmptyWrapper(ThingId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub id: RegionId,
    pub label: String,
    pub tilemap: Tilemap,
}

/// The host object graph: regions, actors and the things standing in for them.
#[derive(Debug, Default)]
pub struct SimWorld {
    pub(crate) defs: DefDatabase,
    pub(crate) regions: BTreeMap<RegionId, Region>,
    pub(crate) actors: BTreeMap<ActorId, Actor>,
    pub(crate) things: BTreeMap<ThingId, Thing>,
    pub(crate) next_region_id: u32,
    pub(crate) next_actor_id: u64,
    pub(crate) next_thing_id: u64,
    pub(crate) graphics_dirty: BTreeSet<ActorId>,
}

impl SimWorld {
    pub fn new(defs: DefDatabase) -> Self {
        Self {
            defs,
            ..Self::default()
        }
    }

    pub fn defs(&self) -> &DefDatabase {
        &self.defs
    }

    // --- regions ---

    pub fn add_region(&mut self, label: impl Into<String>, tilemap: Tilemap) -> RegionId {
        let id = RegionId(self.next_region_id);
        self.next_region_id = self.next_region_id.saturating_add(1);
        let label = label.into();
        info!(region = %id, label = %label, "region_added");
        self.regions.insert(
            id,
            Region {
                id,
                label,
                tilemap,
            },
        );
        id
    }

    /// Unloads a region. Things spawned on it are destroyed; actors keep their stale placement.
    pub fn remove_region(&mut self, id: RegionId) -> Option<Region> {
        let region = self.regions.remove(&id)?;
        let doomed = self
            .things
            .values()
            .filter(|thing| thing.placement.is_some_and(|p| p.region == id))
            .map(|thing| thing.id)
            .collect::<Vec<_>>();
        for thing_id in &doomed {
            if let Err(err) = self.destroy_thing(*thing_id) {
                warn!(region = %id, thing = %thing_id, error = %err, "region_thing_destroy_failed");
            }
        }
        for actor in self.actors.values_mut() {
            if actor.spawned && actor.last_placement.is_some_and(|p| p.region == id) {
                actor.spawned = false;
            }
        }
        info!(region = %id, destroyed_things = doomed.len(), "region_removed");
        Some(region)
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(&id)
    }

    pub fn region_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.regions.get_mut(&id)
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    /// True when the region is active and the cell lies inside it.
    pub fn placement_is_valid(&self, placement: Placement) -> bool {
        self.regions
            .get(&placement.region)
            .is_some_and(|region| region.tilemap.contains(placement.cell))
    }

    fn check_placement(&self, placement: Placement) -> Result<(), WorldError> {
        let region = self
            .regions
            .get(&placement.region)
            .ok_or(WorldError::UnknownRegion(placement.region))?;
        if !region.tilemap.contains(placement.cell) {
            return Err(WorldError::CellOutOfBounds {
                region: placement.region,
                cell: placement.cell,
            });
        }
        Ok(())
    }

    // --- actors ---

    pub fn create_actor(
        &mut self,
        label: impl Into<String>,
        faction: Option<FactionId>,
    ) -> ActorId {
        let id = ActorId(self.next_actor_id);
        self.next_actor_id = self.next_actor_id.saturating_add(1);
        self.actors.insert(id, Actor::new(id, label.into(), faction));
        id
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    fn actor_mut(&mut self, id: ActorId) -> Result<&mut Actor, WorldError> {
        self.actors.get_mut(&id).ok_or(WorldError::UnknownActor(id))
    }

    pub fn spawn_actor(&mut self, id: ActorId, placement: Placement) -> Result<(), WorldError> {
        self.check_placement(placement)?;
        let actor = self.actor_mut(id)?;
        if actor.dead {
            return Err(WorldError::ActorDead(id));
        }
        if actor.spawned {
            return Err(WorldError::ActorAlreadySpawned(id));
        }
        actor.spawned = true;
        actor.last_placement = Some(placement);
        actor.holder = None;
        self.graphics_dirty.insert(id);
        debug!(actor = %id, placement = %placement, "actor_spawned");
        Ok(())
    }

    /// Removes the actor from world space without destroying it. Returns false if it was not spawned.
    pub fn despawn_actor(&mut self, id: ActorId) -> Result<bool, WorldError> {
        let actor = self.actor_mut(id)?;
        if !actor.spawned {
            return Ok(false);
        }
        actor.spawned = false;
        debug!(actor = %id, "actor_despawned");
        Ok(true)
    }

    pub fn set_actor_holder(
        &mut self,
        id: ActorId,
        holder: Option<ThingId>,
    ) -> Result<(), WorldError> {
        if let Some(thing_id) = holder {
            if !self.things.contains_key(&thing_id) {
                return Err(WorldError::UnknownThing(thing_id));
            }
        }
        self.actor_mut(id)?.holder = holder;
        Ok(())
    }

    pub fn add_condition(&mut self, id: ActorId, condition: &str) -> Result<bool, WorldError> {
        Ok(self.actor_mut(id)?.conditions.insert(condition.to_string()))
    }

    pub fn remove_condition(&mut self, id: ActorId, condition: &str) -> Result<bool, WorldError> {
        Ok(self.actor_mut(id)?.conditions.remove(condition))
    }

    pub fn mark_dead(&mut self, id: ActorId) -> Result<(), WorldError> {
        let actor = self.actor_mut(id)?;
        actor.dead = true;
        actor.spawned = false;
        Ok(())
    }

    pub fn mark_graphics_dirty(&mut self, id: ActorId) {
        self.graphics_dirty.insert(id);
    }

    /// Drains actors whose presentation must be rebuilt.
    pub fn take_graphics_dirty(&mut self) -> Vec<ActorId> {
        std::mem::take(&mut self.graphics_dirty)
            .into_iter()
            .collect()
    }

    // --- things ---

    pub fn make_thing(&mut self, def: ThingDefId) -> Result<ThingId, WorldError> {
        let kind = match self.defs.thing_def(def).map(|d| d.kind) {
            Some(ThingDefKind::Placeholder) => ThingKind::Placeholder(PlaceholderState::default()),
            Some(ThingDefKind::Wrapper) => ThingKind::Wrapper(WrapperState::default()),
            None => return Err(WorldError::UnknownDef(def)),
        };
        let id = ThingId(self.next_thing_id);
        self.next_thing_id = self.next_thing_id.saturating_add(1);
        self.things.insert(
            id,
            Thing {
                id,
                def,
                faction: None,
                kind,
                placement: None,
                container: None,
            },
        );
        Ok(id)
    }

    pub fn thing(&self, id: ThingId) -> Option<&Thing> {
        self.things.get(&id)
    }

    pub fn thing_mut(&mut self, id: ThingId) -> Option<&mut Thing> {
        self.things.get_mut(&id)
    }

    pub fn things(&self) -> impl Iterator<Item = &Thing> {
        self.things.values()
    }

    pub fn thing_count(&self) -> usize {
        self.things.len()
    }

    pub fn spawned_things_in_region(&self, region: RegionId) -> impl Iterator<Item = &Thing> {
        self.things
            .values()
            .filter(move |thing| thing.placement.is_some_and(|p| p.region == region))
    }

    pub fn things_at(&self, region: RegionId, cell: Cell) -> impl Iterator<Item = &Thing> {
        self.spawned_things_in_region(region)
            .filter(move |thing| thing.placement.is_some_and(|p| p.cell == cell))
    }

    pub fn spawn_thing(&mut self, id: ThingId, placement: Placement) -> Result<(), WorldError> {
        self.check_placement(placement)?;
        let thing = self.things.get_mut(&id).ok_or(WorldError::UnknownThing(id))?;
        if let Some(container) = thing.container {
            return Err(WorldError::ThingContained {
                thing: id,
                container,
            });
        }
        if thing.placement.is_some() {
            return Err(WorldError::ThingAlreadySpawned(id));
        }
        thing.placement = Some(placement);
        debug!(thing = %id, placement = %placement, "thing_spawned");
        Ok(())
    }

    /// Takes a thing off-map (carried, stored, in transit). Returns false if it was not spawned.
    pub fn despawn_thing(&mut self, id: ThingId) -> Result<bool, WorldError> {
        let thing = self.things.get_mut(&id).ok_or(WorldError::UnknownThing(id))?;
        Ok(thing.placement.take().is_some())
    }

    pub fn relocate_thing(&mut self, id: ThingId, placement: Placement) -> Result<(), WorldError> {
        self.check_placement(placement)?;
        let thing = self.things.get_mut(&id).ok_or(WorldError::UnknownThing(id))?;
        if let Some(container) = thing.container {
            return Err(WorldError::ThingContained {
                thing: id,
                container,
            });
        }
        thing.placement = Some(placement);
        Ok(())
    }

    /// Destroys a thing and, for a wrapper, its contents. Returns every destroyed id.
    pub fn destroy_thing(&mut self, id: ThingId) -> Result<Vec<ThingId>, WorldError> {
        let thing = self.things.remove(&id).ok_or(WorldError::UnknownThing(id))?;
        let mut destroyed = vec![id];

        if let Some(container) = thing.container {
            if let Some(ThingKind::Wrapper(state)) =
                self.things.get_mut(&container).map(|c| &mut c.kind)
            {
                if state.inner == Some(id) {
                    state.inner = None;
                }
            }
        }
        if let ThingKind::Wrapper(state) = &thing.kind {
            if let Some(inner) = state.inner {
                if self.things.remove(&inner).is_some() {
                    destroyed.push(inner);
                }
            }
        }

        for actor in self.actors.values_mut() {
            if actor.holder.is_some_and(|holder| destroyed.contains(&holder)) {
                actor.holder = None;
            }
        }
        debug!(thing = %id, destroyed = destroyed.len(), "thing_destroyed");
        Ok(destroyed)
    }

    fn reparent_held_actors(&mut self, from: ThingId, to: ThingId) {
        for actor in self.actors.values_mut() {
            if actor.holder == Some(from) {
                actor.holder = Some(to);
            }
        }
    }

    /// Packs a placeholder into a new wrapper that takes over its placement.
    pub fn wrap_thing(
        &mut self,
        id: ThingId,
        wrapper_def: ThingDefId,
    ) -> Result<ThingId, WorldError> {
        let thing = self.things.get(&id).ok_or(WorldError::UnknownThing(id))?;
        if thing.as_placeholder().is_none() {
            return Err(WorldError::NotAPlaceholder(id));
        }
        if let Some(container) = thing.container {
            return Err(WorldError::ThingContained {
                thing: id,
                container,
            });
        }
        if self.defs.thing_def(wrapper_def).map(|d| d.kind) != Some(ThingDefKind::Wrapper) {
            return Err(WorldError::NotAWrapperDef(wrapper_def));
        }
        let placement = thing.placement;
        let faction = thing.faction;

        let wrapper_id = self.make_thing(wrapper_def)?;
        if let Some(wrapper) = self.things.get_mut(&wrapper_id) {
            wrapper.faction = faction;
            wrapper.placement = placement;
            wrapper.kind = ThingKind::Wrapper(WrapperState { inner: Some(id) });
        }
        if let Some(inner) = self.things.get_mut(&id) {
            inner.placement = None;
            inner.container = Some(wrapper_id);
        }
        self.reparent_held_actors(id, wrapper_id);
        debug!(thing = %id, wrapper = %wrapper_id, "thing_wrapped");
        Ok(wrapper_id)
    }

    /// Deploys a wrapper's contents where the wrapper is and discards the shell.
    pub fn unwrap_thing(&mut self, wrapper_id: ThingId) -> Result<ThingId, WorldError> {
        let wrapper = self
            .things
            .get(&wrapper_id)
            .ok_or(WorldError::UnknownThing(wrapper_id))?;
        let state = wrapper
            .as_wrapper()
            .ok_or(WorldError::NotAWrapper(wrapper_id))?;
        let inner_id = state.inner.ok_or(WorldError::EmptyWrapper(wrapper_id))?;
        let placement = wrapper.placement;

        if let Some(ThingKind::Wrapper(state)) =
            self.things.get_mut(&wrapper_id).map(|w| &mut w.kind)
        {
            state.inner = None;
        }
        if let Some(inner) = self.things.get_mut(&inner_id) {
            inner.container = None;
            inner.placement = placement;
        }
        self.reparent_held_actors(wrapper_id, inner_id);
        self.destroy_thing(wrapper_id)?;
        debug!(wrapper = %wrapper_id, thing = %inner_id, "thing_unwrapped");
        Ok(inner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::types::Rotation;

    fn world_with_region() -> (SimWorld, RegionId) {
        let mut world = SimWorld::new(DefDatabase::builtin().expect("defs"));
        let region = world.add_region("test", Tilemap::open(8, 8).expect("tilemap"));
        (world, region)
    }

    fn statue_def(world: &SimWorld) -> ThingDefId {
        world
            .defs()
            .thing_def_id_by_name("petrify.statue")
            .expect("statue")
    }

    fn packed_def(world: &SimWorld) -> ThingDefId {
        world
            .defs()
            .thing_def_id_by_name("petrify.statue_packed")
            .expect("packed")
    }

    #[test]
    fn despawn_actor_keeps_last_placement() {
        let (mut world, region) = world_with_region();
        let actor = world.create_actor("Ada", None);
        let placement = Placement::new(region, Cell::new(2, 3), Rotation::East);
        world.spawn_actor(actor, placement).expect("spawn");
        assert!(world.despawn_actor(actor).expect("despawn"));
        let actor = world.actor(actor).expect("actor");
        assert!(!actor.spawned());
        assert_eq!(actor.last_placement(), Some(placement));
        assert_eq!(actor.placement(), None);
    }

    #[test]
    fn spawn_actor_rejects_out_of_bounds_cell() {
        let (mut world, region) = world_with_region();
        let actor = world.create_actor("Ada", None);
        let err = world
            .spawn_actor(actor, Placement::new(region, Cell::new(9, 0), Rotation::North))
            .expect_err("out of bounds");
        assert!(matches!(err, WorldError::CellOutOfBounds { .. }));
        assert!(!world.actor(actor).expect("actor").spawned());
    }

    #[test]
    fn destroying_wrapper_destroys_inner_and_clears_holders() {
        let (mut world, region) = world_with_region();
        let actor = world.create_actor("Ada", None);
        let statue = world.make_thing(statue_def(&world)).expect("statue");
        world
            .spawn_thing(statue, Placement::new(region, Cell::new(1, 1), Rotation::North))
            .expect("spawn statue");
        let wrapper = world.wrap_thing(statue, packed_def(&world)).expect("wrap");
        world.set_actor_holder(actor, Some(wrapper)).expect("holder");

        let destroyed = world.destroy_thing(wrapper).expect("destroy");
        assert_eq!(destroyed, vec![wrapper, statue]);
        assert!(world.thing(statue).is_none());
        assert_eq!(world.actor(actor).expect("actor").holder(), None);
    }

    #[test]
    fn wrap_moves_placement_to_wrapper() {
        let (mut world, region) = world_with_region();
        let statue = world.make_thing(statue_def(&world)).expect("statue");
        let placement = Placement::new(region, Cell::new(4, 4), Rotation::South);
        world.spawn_thing(statue, placement).expect("spawn");

        let wrapper = world.wrap_thing(statue, packed_def(&world)).expect("wrap");
        assert_eq!(world.thing(wrapper).expect("wrapper").placement(), Some(placement));
        let inner = world.thing(statue).expect("inner");
        assert!(!inner.is_spawned());
        assert_eq!(inner.container(), Some(wrapper));
    }

    #[test]
    fn unwrap_redeploys_inner_at_wrapper_placement() {
        let (mut world, region) = world_with_region();
        let statue = world.make_thing(statue_def(&world)).expect("statue");
        world
            .spawn_thing(statue, Placement::new(region, Cell::new(0, 0), Rotation::North))
            .expect("spawn");
        let wrapper = world.wrap_thing(statue, packed_def(&world)).expect("wrap");
        let moved = Placement::new(region, Cell::new(5, 6), Rotation::North);
        world.relocate_thing(wrapper, moved).expect("relocate");

        let inner = world.unwrap_thing(wrapper).expect("unwrap");
        assert_eq!(inner, statue);
        assert!(world.thing(wrapper).is_none());
        let statue = world.thing(statue).expect("statue");
        assert_eq!(statue.placement(), Some(moved));
        assert_eq!(statue.container(), None);
    }

    #[test]
    fn wrapping_moves_held_actors_to_the_wrapper_and_back() {
        let (mut world, region) = world_with_region();
        let actor = world.create_actor("Ada", None);
        let statue = world.make_thing(statue_def(&world)).expect("statue");
        world
            .spawn_thing(statue, Placement::new(region, Cell::new(1, 1), Rotation::North))
            .expect("spawn");
        world.set_actor_holder(actor, Some(statue)).expect("holder");

        let wrapper = world.wrap_thing(statue, packed_def(&world)).expect("wrap");
        assert_eq!(world.actor(actor).expect("actor").holder(), Some(wrapper));

        world.unwrap_thing(wrapper).expect("unwrap");
        assert_eq!(world.actor(actor).expect("actor").holder(), Some(statue));
    }

    #[test]
    fn contained_thing_cannot_be_spawned_directly() {
        let (mut world, region) = world_with_region();
        let statue = world.make_thing(statue_def(&world)).expect("statue");
        world.wrap_thing(statue, packed_def(&world)).expect("wrap");
        let err = world
            .spawn_thing(statue, Placement::new(region, Cell::new(0, 0), Rotation::North))
            .expect_err("contained");
        assert!(matches!(err, WorldError::ThingContained { .. }));
    }

    #[test]
    fn remove_region_destroys_spawned_things_and_despawns_actors() {
        let (mut world, region) = world_with_region();
        let actor = world.create_actor("Ada", None);
        world
            .spawn_actor(actor, Placement::new(region, Cell::new(1, 1), Rotation::North))
            .expect("spawn actor");
        let statue = world.make_thing(statue_def(&world)).expect("statue");
        world
            .spawn_thing(statue, Placement::new(region, Cell::new(2, 2), Rotation::North))
            .expect("spawn statue");

        assert!(world.remove_region(region).is_some());
        assert!(world.thing(statue).is_none());
        let actor = world.actor(actor).expect("actor");
        assert!(!actor.spawned());
        assert!(!world.placement_is_valid(actor.last_placement().expect("last")));
    }

    #[test]
    fn remove_region_destroys_wrapped_statues_with_their_shell() {
        let (mut world, region) = world_with_region();
        let statue = world.make_thing(statue_def(&world)).expect("statue");
        world
            .spawn_thing(statue, Placement::new(region, Cell::new(3, 3), Rotation::North))
            .expect("spawn statue");
        let packed = packed_def(&world);
        let wrapper = world.wrap_thing(statue, packed).expect("wrap");

        assert!(world.remove_region(region).is_some());
        assert!(world.thing(wrapper).is_none());
        assert!(world.thing(statue).is_none());
        assert_eq!(world.thing_count(), 0);
    }

    #[test]
    fn conditions_report_changes() {
        let (mut world, _) = world_with_region();
        let actor = world.create_actor("Ada", None);
        assert!(world.add_condition(actor, "petrified_full").expect("add"));
        assert!(!world.add_condition(actor, "petrified_full").expect("re-add"));
        assert!(world.actor(actor).expect("actor").has_condition("petrified_full"));
        assert!(world.remove_condition(actor, "petrified_full").expect("remove"));
        assert!(!world.remove_condition(actor, "petrified_full").expect("re-remove"));
    }

    #[test]
    fn spawn_marks_graphics_dirty_once() {
        let (mut world, region) = world_with_region();
        let actor = world.create_actor("Ada", None);
        world
            .spawn_actor(actor, Placement::new(region, Cell::new(0, 0), Rotation::North))
            .expect("spawn");
        assert_eq!(world.take_graphics_dirty(), vec![actor]);
        assert!(world.take_graphics_dirty().is_empty());
    }
}
