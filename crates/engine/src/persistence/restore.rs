use tracing::{info, warn};

use crate::content::DefDatabase;
use crate::world::{
    Actor, ActorId, PlaceholderState, Region, SimWorld, Thing, ThingId, ThingKind, Tilemap,
    WrapperState,
};

use super::save::{validate_save_game, SaveError, SaveGame, SavedThingKind};

/// Cross-references that pointed at objects missing from the save and were cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub dropped_holders: Vec<(ActorId, ThingId)>,
    pub dropped_placeholder_actors: Vec<(ThingId, ActorId)>,
    pub dropped_wrapper_inners: Vec<(ThingId, ThingId)>,
    pub defs_hash_mismatch: bool,
}

impl RestoreReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_holders.is_empty()
            && self.dropped_placeholder_actors.is_empty()
            && self.dropped_wrapper_inners.is_empty()
    }
}

/// Rebuilds a world from a save. The save is validated first.
pub fn restore_world(
    save: &SaveGame,
    defs: DefDatabase,
) -> Result<(SimWorld, RestoreReport), SaveError> {
    validate_save_game(save, &defs)?;
    let mut report = RestoreReport::default();

    if save.defs_sha256 != defs.source_hash() {
        warn!(
            saved = %save.defs_sha256,
            current = %defs.source_hash(),
            "restore_defs_hash_mismatch"
        );
        report.defs_hash_mismatch = true;
    }

    let mut world = SimWorld::new(defs);
    world.next_region_id = save.next_region_id;
    world.next_actor_id = save.next_actor_id;
    world.next_thing_id = save.next_thing_id;

    for saved in &save.regions {
        let tilemap = Tilemap::new(saved.width, saved.height, saved.tiles.clone()).map_err(
            |error| SaveError::Validation {
                path: format!("regions[{}].tiles", saved.id.0),
                message: error.to_string(),
            },
        )?;
        world.regions.insert(
            saved.id,
            Region {
                id: saved.id,
                label: saved.label.clone(),
                tilemap,
            },
        );
    }

    for saved in &save.actors {
        let mut actor = Actor::new(saved.id, saved.label.clone(), saved.faction);
        actor.spawned = saved.spawned;
        actor.dead = saved.dead;
        actor.last_placement = saved.last_placement;
        actor.holder = saved.holder;
        actor.conditions = saved.conditions.iter().cloned().collect();
        world.actors.insert(saved.id, actor);
    }

    for saved in &save.things {
        let Some(def) = world.defs.thing_def_id_by_name(&saved.def_name) else {
            continue;
        };
        let kind = match &saved.kind {
            SavedThingKind::Placeholder { actor, appearance } => {
                ThingKind::Placeholder(PlaceholderState {
                    actor: *actor,
                    appearance: appearance.clone(),
                })
            }
            SavedThingKind::Wrapper { inner } => ThingKind::Wrapper(WrapperState { inner: *inner }),
        };
        world.things.insert(
            saved.id,
            Thing {
                id: saved.id,
                def,
                faction: saved.faction,
                kind,
                placement: saved.placement,
                container: None,
            },
        );
    }

    relink_containers(&mut world, &mut report);
    drop_dangling_actor_refs(&mut world, &mut report);

    info!(
        regions = world.regions.len(),
        actors = world.actors.len(),
        things = world.things.len(),
        clean = report.is_clean(),
        "world_restored"
    );
    Ok((world, report))
}

fn relink_containers(world: &mut SimWorld, report: &mut RestoreReport) {
    let links = world
        .things
        .values()
        .filter_map(|thing| {
            thing
                .as_wrapper()
                .and_then(WrapperState::inner)
                .map(|inner| (thing.id, inner))
        })
        .collect::<Vec<_>>();

    for (wrapper_id, inner_id) in links {
        if let Some(inner) = world.things.get_mut(&inner_id) {
            inner.container = Some(wrapper_id);
            continue;
        }
        warn!(wrapper = %wrapper_id, inner = %inner_id, "restore_dropped_wrapper_inner");
        report.dropped_wrapper_inners.push((wrapper_id, inner_id));
        if let Some(ThingKind::Wrapper(state)) =
            world.things.get_mut(&wrapper_id).map(|w| &mut w.kind)
        {
            state.inner = None;
        }
    }
}

fn drop_dangling_actor_refs(world: &mut SimWorld, report: &mut RestoreReport) {
    for actor in world.actors.values_mut() {
        let Some(holder) = actor.holder else {
            continue;
        };
        if !world.things.contains_key(&holder) {
            warn!(actor = %actor.id, holder = %holder, "restore_dropped_holder");
            report.dropped_holders.push((actor.id, holder));
            actor.holder = None;
        }
    }

    for thing in world.things.values_mut() {
        let thing_id = thing.id;
        let Some(state) = thing.as_placeholder_mut() else {
            continue;
        };
        let Some(actor) = state.actor else {
            continue;
        };
        if !world.actors.contains_key(&actor) {
            warn!(placeholder = %thing_id, actor = %actor, "restore_dropped_placeholder_actor");
            report.dropped_placeholder_actors.push((thing_id, actor));
            state.actor = None;
        }
    }
}
