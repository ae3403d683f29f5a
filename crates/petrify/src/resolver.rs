use engine::{ActorId, Placement, SimWorld, ThingId, ThingKind};
use tracing::{debug, warn};

/// Where an actor's placeholder currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedContainer {
    /// The placeholder itself is the outermost thing.
    Direct { placeholder: ThingId },
    /// The placeholder is packed inside a wrapper.
    Wrapped {
        wrapper: ThingId,
        placeholder: ThingId,
    },
    None,
}

impl ResolvedContainer {
    /// The thing to destroy or inspect for placement.
    pub fn outer(&self) -> Option<ThingId> {
        match *self {
            ResolvedContainer::Direct { placeholder } => Some(placeholder),
            ResolvedContainer::Wrapped { wrapper, .. } => Some(wrapper),
            ResolvedContainer::None => None,
        }
    }

    pub fn placeholder(&self) -> Option<ThingId> {
        match *self {
            ResolvedContainer::Direct { placeholder }
            | ResolvedContainer::Wrapped { placeholder, .. } => Some(placeholder),
            ResolvedContainer::None => None,
        }
    }

    pub fn is_found(&self) -> bool {
        !matches!(self, ResolvedContainer::None)
    }

    /// Placement of the outermost thing, `None` when it is held off-map.
    pub fn placement(&self, world: &SimWorld) -> Option<Placement> {
        self.outer()
            .and_then(|outer| world.thing(outer))
            .and_then(|thing| thing.placement())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub direct_hits: u64,
    pub wrapped_hits: u64,
    pub placeholder_scans: u64,
    pub wrapper_scans: u64,
    pub integrity_faults: u64,
}

/// Finds the placeholder bound to an actor.
///
/// Search order, first match wins:
/// 1. the actor's holder is a placeholder bound to it
/// 2. the actor's holder is a wrapper whose inner placeholder is bound to it
/// 3. every spawned placeholder across active regions
/// 4. every spawned wrapper across active regions
///
/// Steps 1 and 2 are constant time. The scans exist to recover from holder
/// references dropped by persistence or by the host moving things around.
#[derive(Debug, Clone, Default)]
pub struct AssociationResolver {
    stats: ResolverStats,
}

impl AssociationResolver {
    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = ResolverStats::default();
    }

    pub fn resolve(&mut self, world: &SimWorld, actor: ActorId) -> ResolvedContainer {
        let direct = self.resolve_direct(world, actor);
        if direct.is_found() {
            return direct;
        }
        let scanned = self.scan_placeholders(world, actor);
        if scanned.is_found() {
            return scanned;
        }
        self.scan_wrappers(world, actor)
    }

    /// Holder-based lookup only, no scans.
    pub fn resolve_direct(&mut self, world: &SimWorld, actor: ActorId) -> ResolvedContainer {
        let Some(holder) = world.actor(actor).and_then(|actor| actor.holder()) else {
            return ResolvedContainer::None;
        };
        let Some(thing) = world.thing(holder) else {
            return ResolvedContainer::None;
        };

        match &thing.kind {
            ThingKind::Placeholder(state) if state.actor == Some(actor) => {
                self.stats.direct_hits = self.stats.direct_hits.saturating_add(1);
                debug!(actor = %actor, placeholder = %holder, "resolve_direct_hit");
                match thing.container() {
                    Some(wrapper) => ResolvedContainer::Wrapped {
                        wrapper,
                        placeholder: holder,
                    },
                    None => ResolvedContainer::Direct {
                        placeholder: holder,
                    },
                }
            }
            ThingKind::Wrapper(state) => {
                let Some(inner) = state.inner() else {
                    return ResolvedContainer::None;
                };
                if world.thing(inner).and_then(|t| t.bound_actor()) != Some(actor) {
                    return ResolvedContainer::None;
                }
                self.stats.wrapped_hits = self.stats.wrapped_hits.saturating_add(1);
                debug!(actor = %actor, wrapper = %holder, placeholder = %inner, "resolve_wrapped_hit");
                ResolvedContainer::Wrapped {
                    wrapper: holder,
                    placeholder: inner,
                }
            }
            ThingKind::Placeholder(_) => ResolvedContainer::None,
        }
    }

    fn scan_placeholders(&mut self, world: &SimWorld, actor: ActorId) -> ResolvedContainer {
        self.stats.placeholder_scans = self.stats.placeholder_scans.saturating_add(1);
        let matches = world
            .regions()
            .flat_map(|region| world.spawned_things_in_region(region.id))
            .filter(|thing| thing.bound_actor() == Some(actor))
            .map(|thing| thing.id)
            .collect::<Vec<_>>();
        let Some(first) = self.first_match(actor, &matches, "placeholder") else {
            return ResolvedContainer::None;
        };
        debug!(actor = %actor, placeholder = %first, "resolve_scan_hit");
        ResolvedContainer::Direct { placeholder: first }
    }

    fn scan_wrappers(&mut self, world: &SimWorld, actor: ActorId) -> ResolvedContainer {
        self.stats.wrapper_scans = self.stats.wrapper_scans.saturating_add(1);
        let matches = world
            .regions()
            .flat_map(|region| world.spawned_things_in_region(region.id))
            .filter_map(|thing| {
                let inner = thing.as_wrapper()?.inner()?;
                (world.thing(inner)?.bound_actor() == Some(actor)).then_some((thing.id, inner))
            })
            .collect::<Vec<_>>();
        let wrappers = matches.iter().map(|(wrapper, _)| *wrapper).collect::<Vec<_>>();
        if self.first_match(actor, &wrappers, "wrapper").is_none() {
            return ResolvedContainer::None;
        }
        let (wrapper, placeholder) = matches[0];
        debug!(actor = %actor, wrapper = %wrapper, placeholder = %placeholder, "resolve_scan_hit");
        ResolvedContainer::Wrapped {
            wrapper,
            placeholder,
        }
    }

    fn first_match(&mut self, actor: ActorId, matches: &[ThingId], kind: &str) -> Option<ThingId> {
        if matches.len() > 1 {
            self.stats.integrity_faults = self.stats.integrity_faults.saturating_add(1);
            warn!(
                actor = %actor,
                kind,
                count = matches.len(),
                ?matches,
                "resolve_multiple_matches"
            );
        }
        matches.first().copied()
    }
}

/// The actor a placeholder, or the placeholder inside a wrapper, stands in for.
pub fn placeholder_subject(world: &SimWorld, thing: ThingId) -> Option<ActorId> {
    let thing = world.thing(thing)?;
    match &thing.kind {
        ThingKind::Placeholder(state) => state.actor,
        ThingKind::Wrapper(state) => world.thing(state.inner()?)?.bound_actor(),
    }
}

#[cfg(test)]
mod tests {
    use engine::{Cell, DefDatabase, Rotation, Tilemap};

    use super::*;

    struct Fixture {
        world: SimWorld,
        actor: ActorId,
        statue: ThingId,
        placement: Placement,
    }

    fn fixture() -> Fixture {
        let mut world = SimWorld::new(DefDatabase::builtin().expect("defs"));
        let region = world.add_region("yard", Tilemap::open(8, 8).expect("tilemap"));
        let actor = world.create_actor("Ada", None);
        let statue_def = world
            .defs()
            .thing_def_id_by_name("petrify.statue")
            .expect("statue def");
        let statue = world.make_thing(statue_def).expect("statue");
        world
            .thing_mut(statue)
            .and_then(|thing| thing.as_placeholder_mut())
            .expect("placeholder")
            .actor = Some(actor);
        let placement = Placement::new(region, Cell::new(2, 2), Rotation::South);
        world.spawn_thing(statue, placement).expect("spawn");
        Fixture {
            world,
            actor,
            statue,
            placement,
        }
    }

    fn wrap(world: &mut SimWorld, statue: ThingId) -> ThingId {
        let packed = world
            .defs()
            .thing_def_id_by_name("petrify.statue_packed")
            .expect("packed def");
        world.wrap_thing(statue, packed).expect("wrap")
    }

    #[test]
    fn direct_holder_resolves_without_scanning() {
        let mut fixture = fixture();
        fixture
            .world
            .set_actor_holder(fixture.actor, Some(fixture.statue))
            .expect("holder");
        let mut resolver = AssociationResolver::default();

        let resolved = resolver.resolve(&fixture.world, fixture.actor);
        assert_eq!(
            resolved,
            ResolvedContainer::Direct {
                placeholder: fixture.statue
            }
        );
        assert_eq!(resolved.placement(&fixture.world), Some(fixture.placement));
        let stats = resolver.stats();
        assert_eq!(stats.direct_hits, 1);
        assert_eq!(stats.placeholder_scans, 0);
        assert_eq!(stats.wrapper_scans, 0);
    }

    #[test]
    fn wrapper_holder_short_circuits_global_scan() {
        let mut fixture = fixture();
        let wrapper = wrap(&mut fixture.world, fixture.statue);
        fixture
            .world
            .set_actor_holder(fixture.actor, Some(wrapper))
            .expect("holder");
        let mut resolver = AssociationResolver::default();

        let resolved = resolver.resolve(&fixture.world, fixture.actor);
        assert_eq!(
            resolved,
            ResolvedContainer::Wrapped {
                wrapper,
                placeholder: fixture.statue
            }
        );
        let stats = resolver.stats();
        assert_eq!(stats.wrapped_hits, 1);
        assert_eq!(stats.placeholder_scans, 0);
        assert_eq!(stats.wrapper_scans, 0);
    }

    #[test]
    fn holder_pointing_at_wrapped_placeholder_reports_the_wrapper() {
        let mut fixture = fixture();
        let wrapper = wrap(&mut fixture.world, fixture.statue);
        fixture
            .world
            .set_actor_holder(fixture.actor, Some(fixture.statue))
            .expect("holder");
        let mut resolver = AssociationResolver::default();

        let resolved = resolver.resolve(&fixture.world, fixture.actor);
        assert_eq!(resolved.outer(), Some(wrapper));
        assert_eq!(resolved.placeholder(), Some(fixture.statue));
    }

    #[test]
    fn dropped_holder_falls_back_to_placeholder_scan() {
        let fixture = fixture();
        let mut resolver = AssociationResolver::default();

        let resolved = resolver.resolve(&fixture.world, fixture.actor);
        assert_eq!(
            resolved,
            ResolvedContainer::Direct {
                placeholder: fixture.statue
            }
        );
        assert_eq!(resolver.stats().placeholder_scans, 1);
        assert_eq!(resolver.stats().wrapper_scans, 0);
    }

    #[test]
    fn dropped_holder_falls_back_to_wrapper_scan() {
        let mut fixture = fixture();
        let wrapper = wrap(&mut fixture.world, fixture.statue);
        let mut resolver = AssociationResolver::default();

        let resolved = resolver.resolve(&fixture.world, fixture.actor);
        assert_eq!(
            resolved,
            ResolvedContainer::Wrapped {
                wrapper,
                placeholder: fixture.statue
            }
        );
        assert_eq!(resolver.stats().placeholder_scans, 1);
        assert_eq!(resolver.stats().wrapper_scans, 1);
    }

    #[test]
    fn off_map_wrapper_is_invisible_to_scans() {
        let mut fixture = fixture();
        let wrapper = wrap(&mut fixture.world, fixture.statue);
        fixture.world.despawn_thing(wrapper).expect("despawn");
        let mut resolver = AssociationResolver::default();

        assert_eq!(
            resolver.resolve(&fixture.world, fixture.actor),
            ResolvedContainer::None
        );
    }

    #[test]
    fn duplicate_bindings_count_as_integrity_fault() {
        let mut fixture = fixture();
        let statue_def = fixture
            .world
            .defs()
            .thing_def_id_by_name("petrify.statue")
            .expect("statue def");
        let second = fixture.world.make_thing(statue_def).expect("second");
        fixture
            .world
            .thing_mut(second)
            .and_then(|thing| thing.as_placeholder_mut())
            .expect("placeholder")
            .actor = Some(fixture.actor);
        fixture
            .world
            .spawn_thing(second, fixture.placement.with_cell(Cell::new(5, 5)))
            .expect("spawn second");
        let mut resolver = AssociationResolver::default();

        let resolved = resolver.resolve(&fixture.world, fixture.actor);
        assert_eq!(resolved.placeholder(), Some(fixture.statue));
        assert_eq!(resolver.stats().integrity_faults, 1);
    }

    #[test]
    fn subject_of_wrapper_is_inner_binding() {
        let mut fixture = fixture();
        let wrapper = wrap(&mut fixture.world, fixture.statue);
        assert_eq!(
            placeholder_subject(&fixture.world, wrapper),
            Some(fixture.actor)
        );
        assert_eq!(
            placeholder_subject(&fixture.world, fixture.statue),
            Some(fixture.actor)
        );
        assert_eq!(placeholder_subject(&fixture.world, ThingId(999)), None);
    }
}
