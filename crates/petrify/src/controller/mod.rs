use engine::{Actor, ActorId, AssetHandle, Placement, Rotation, SimWorld, Thing, ThingId};
use tracing::{debug, error, info, warn};

use crate::appearance::{AppearanceSynthesizer, DefaultAppearance, MetadataAppearanceStore};
use crate::config::PetrifyConfig;
use crate::error::PetrifyError;
use crate::events::{ConditionEvent, ConditionEventQueue};
use crate::factory::PlaceholderFactory;
use crate::orphan::{OrphanReason, OrphanRecord};
use crate::resolver::{placeholder_subject, AssociationResolver, ResolvedContainer, ResolverStats};
use crate::session::{LifecycleState, PetrifySession};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    UnknownActor,
    ActorDead,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Petrified { placeholder: ThingId },
    /// The actor was not in the world; it is registered with no placeholder.
    PetrifiedOffMap,
    AlreadyAssociated { container: ThingId },
    /// Placeholder setup failed and the actor was put back.
    RolledBack { reason: String },
    Restored { placement: Placement },
    RestoredAtFallback { placement: Placement },
    AlreadyLive,
    Orphaned(OrphanReason),
    Skipped(SkipReason),
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReport {
    pub event: ConditionEvent,
    pub outcome: TransitionOutcome,
}

/// Drives actors between the live world and placeholders.
///
/// Every transition runs to completion inside one call. Placeholders are never
/// cached: each operation re-resolves through [`AssociationResolver`].
pub struct LifecycleController {
    config: PetrifyConfig,
    factory: PlaceholderFactory,
    resolver: AssociationResolver,
    appearance: Box<dyn AppearanceSynthesizer>,
}

impl LifecycleController {
    pub fn new(config: PetrifyConfig) -> Self {
        let appearance: Box<dyn AppearanceSynthesizer> = match &config.appearance_dir {
            Some(dir) => Box::new(MetadataAppearanceStore::new(dir.clone())),
            None => Box::new(DefaultAppearance),
        };
        Self {
            config,
            factory: PlaceholderFactory,
            resolver: AssociationResolver::default(),
            appearance,
        }
    }

    pub fn with_appearance(mut self, appearance: Box<dyn AppearanceSynthesizer>) -> Self {
        self.appearance = appearance;
        self
    }

    pub fn config(&self) -> &PetrifyConfig {
        &self.config
    }

    pub fn resolver_stats(&self) -> ResolverStats {
        self.resolver.stats()
    }

    pub fn resolve(&mut self, world: &SimWorld, actor: ActorId) -> ResolvedContainer {
        self.resolver.resolve(world, actor)
    }

    /// Handles every event queued this tick, in order.
    pub fn process_tick(
        &mut self,
        world: &mut SimWorld,
        session: &mut PetrifySession,
        queue: &mut ConditionEventQueue,
    ) -> Vec<TransitionReport> {
        let events = queue.drain_current_tick();
        if !events.is_empty() {
            debug!(events = events.len(), "petrify_tick_started");
        }
        events
            .into_iter()
            .map(|event| self.handle_event(world, session, event))
            .collect()
    }

    /// Failure boundary: errors are logged against the actor and reported, never returned.
    pub fn handle_event(
        &mut self,
        world: &mut SimWorld,
        session: &mut PetrifySession,
        event: ConditionEvent,
    ) -> TransitionReport {
        let actor = event.actor();
        let result = match event {
            ConditionEvent::Added(_) => self.on_condition_added(world, session, actor),
            ConditionEvent::Removed(_) => self.on_condition_removed(world, session, actor),
        };
        let outcome = result.unwrap_or_else(|err| {
            error!(actor = %actor, ?event, error = %err, "transition_failed");
            match event {
                ConditionEvent::Added(_) if session.is_transformed(actor) => {
                    session.mark_petrified(actor)
                }
                _ => session.mark_live(actor),
            }
            TransitionOutcome::Failed {
                error: err.to_string(),
            }
        });
        TransitionReport { event, outcome }
    }

    fn on_condition_added(
        &mut self,
        world: &mut SimWorld,
        session: &mut PetrifySession,
        actor: ActorId,
    ) -> Result<TransitionOutcome, PetrifyError> {
        let Some(record) = world.actor(actor) else {
            warn!(actor = %actor, "petrify_skipped_unknown_actor");
            return Ok(TransitionOutcome::Skipped(SkipReason::UnknownActor));
        };
        if record.dead() {
            warn!(actor = %actor, "petrify_skipped_dead_actor");
            return Ok(TransitionOutcome::Skipped(SkipReason::ActorDead));
        }

        if let Some(container) = self.resolver.resolve_direct(world, actor).outer() {
            return self.reenter(world, session, actor, container);
        }
        if session.state(actor) == LifecycleState::Petrified || session.is_transformed(actor) {
            if let Some(container) = self.resolver.resolve(world, actor).outer() {
                return self.reenter(world, session, actor, container);
            }
            warn!(actor = %actor, "petrify_reentry_without_placeholder");
        }

        self.petrify(world, session, actor)
    }

    /// Existing association found: settle as petrified without a new placeholder.
    fn reenter(
        &mut self,
        world: &mut SimWorld,
        session: &mut PetrifySession,
        actor: ActorId,
        container: ThingId,
    ) -> Result<TransitionOutcome, PetrifyError> {
        world.despawn_actor(actor)?;
        if world.actor(actor).and_then(Actor::holder) != Some(container) {
            world.set_actor_holder(actor, Some(container))?;
        }
        session.mark_petrified(actor);
        warn!(actor = %actor, container = %container, "petrify_already_associated");
        Ok(TransitionOutcome::AlreadyAssociated { container })
    }

    fn petrify(
        &mut self,
        world: &mut SimWorld,
        session: &mut PetrifySession,
        actor: ActorId,
    ) -> Result<TransitionOutcome, PetrifyError> {
        let placement = world
            .actor(actor)
            .ok_or(PetrifyError::UnknownActor(actor))?
            .placement();
        session.set_state(actor, LifecycleState::Transforming);

        let Some(placement) = placement else {
            session.mark_petrified(actor);
            info!(actor = %actor, "petrify_off_map");
            return Ok(TransitionOutcome::PetrifiedOffMap);
        };

        world.despawn_actor(actor)?;
        let appearance = self.synthesize_appearance(world, actor);

        let placeholder = match self
            .factory
            .create(world, &self.config.placeholder_template)
        {
            Ok(placeholder) => placeholder,
            Err(err) => return Ok(self.roll_back(world, session, actor, placement, err.to_string())),
        };
        if let Err(err) = self.factory.configure_for_actor(world, placeholder, actor) {
            discard_placeholder(world, placeholder);
            return Ok(self.roll_back(world, session, actor, placement, err.to_string()));
        }
        if let Some(state) = world
            .thing_mut(placeholder)
            .and_then(Thing::as_placeholder_mut)
        {
            state.appearance = appearance;
        }
        if let Err(err) = world.spawn_thing(placeholder, placement) {
            discard_placeholder(world, placeholder);
            return Ok(self.roll_back(world, session, actor, placement, err.to_string()));
        }
        world.set_actor_holder(actor, Some(placeholder))?;

        session.mark_petrified(actor);
        info!(
            actor = %actor,
            placeholder = %placeholder,
            placement = %placement,
            "petrify_completed"
        );
        Ok(TransitionOutcome::Petrified { placeholder })
    }

    fn synthesize_appearance(&self, world: &SimWorld, actor: ActorId) -> Option<AssetHandle> {
        match self.appearance.synthesize(world, actor) {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(actor = %actor, error = %err, "appearance_synthesis_failed");
                None
            }
        }
    }

    /// Puts the actor back at its captured placement, or the nearest standable cell.
    fn roll_back(
        &mut self,
        world: &mut SimWorld,
        session: &mut PetrifySession,
        actor: ActorId,
        captured: Placement,
        reason: String,
    ) -> TransitionOutcome {
        error!(actor = %actor, placement = %captured, reason = %reason, "petrify_rolled_back");
        session.mark_live(actor);

        if world.spawn_actor(actor, captured).is_ok() {
            return TransitionOutcome::RolledBack { reason };
        }
        let nearby = world
            .find_standable_cell_near(
                captured.region,
                captured.cell,
                self.config.placement_radius,
                None,
            )
            .map(|cell| captured.with_cell(cell));
        if let Some(placement) = nearby {
            if world.spawn_actor(actor, placement).is_ok() {
                return TransitionOutcome::RolledBack { reason };
            }
        }
        record_orphan(
            session,
            OrphanRecord {
                actor,
                reason: OrphanReason::RollbackFailed,
                last_known: Some(captured),
                retained_container: None,
            },
        )
    }

    fn on_condition_removed(
        &mut self,
        world: &mut SimWorld,
        session: &mut PetrifySession,
        actor: ActorId,
    ) -> Result<TransitionOutcome, PetrifyError> {
        let Some(record) = world.actor(actor) else {
            session.mark_live(actor);
            warn!(actor = %actor, "depetrify_skipped_unknown_actor");
            return Ok(TransitionOutcome::Skipped(SkipReason::UnknownActor));
        };
        let (spawned, dead, last_known) =
            (record.spawned(), record.dead(), record.last_placement());
        if dead {
            session.mark_live(actor);
            warn!(actor = %actor, "depetrify_skipped_dead_actor");
            return Ok(TransitionOutcome::Skipped(SkipReason::ActorDead));
        }

        session.set_state(actor, LifecycleState::Detransforming);
        let resolved = self.resolver.resolve(world, actor);

        if spawned {
            if let Some(stale) = resolved.outer() {
                world.destroy_thing(stale)?;
                warn!(actor = %actor, container = %stale, "depetrify_stale_placeholder_destroyed");
            }
            session.mark_live(actor);
            return Ok(TransitionOutcome::AlreadyLive);
        }

        let outcome = match resolved {
            ResolvedContainer::Direct { placeholder } => {
                self.restore_from_container(world, session, actor, placeholder, true, last_known)
            }
            ResolvedContainer::Wrapped { wrapper, .. } => {
                self.restore_from_container(world, session, actor, wrapper, false, last_known)
            }
            ResolvedContainer::None => self.restore_at_fallback(world, session, actor, last_known),
        };
        session.mark_live(actor);
        Ok(outcome)
    }

    /// Plans the respawn cell before tearing the container down, so a failed
    /// search leaves the binding intact for remediation.
    fn restore_from_container(
        &mut self,
        world: &mut SimWorld,
        session: &mut PetrifySession,
        actor: ActorId,
        container: ThingId,
        keep_rotation: bool,
        last_known: Option<Placement>,
    ) -> TransitionOutcome {
        let Some(origin) = world.thing(container).and_then(Thing::placement) else {
            return record_orphan(
                session,
                OrphanRecord {
                    actor,
                    reason: OrphanReason::ContainerOffMap,
                    last_known,
                    retained_container: Some(container),
                },
            );
        };
        let Some(cell) = world.find_standable_cell_near(
            origin.region,
            origin.cell,
            self.config.placement_radius,
            Some(container),
        ) else {
            return record_orphan(
                session,
                OrphanRecord {
                    actor,
                    reason: OrphanReason::NoStandableCell,
                    last_known: Some(origin),
                    retained_container: Some(container),
                },
            );
        };

        if let Err(err) = world.destroy_thing(container) {
            warn!(actor = %actor, container = %container, error = %err, "depetrify_teardown_failed");
        }
        let rotation = if keep_rotation && cell == origin.cell {
            origin.rotation
        } else {
            Rotation::default()
        };
        let placement = Placement::new(origin.region, cell, rotation);
        match world.spawn_actor(actor, placement) {
            Ok(()) => {
                session.orphans_mut().resolve(actor);
                info!(actor = %actor, placement = %placement, "depetrify_completed");
                TransitionOutcome::Restored { placement }
            }
            Err(err) => {
                error!(actor = %actor, placement = %placement, error = %err, "depetrify_spawn_failed");
                record_orphan(
                    session,
                    OrphanRecord {
                        actor,
                        reason: OrphanReason::NoStandableCell,
                        last_known: Some(origin),
                        retained_container: None,
                    },
                )
            }
        }
    }

    fn restore_at_fallback(
        &mut self,
        world: &mut SimWorld,
        session: &mut PetrifySession,
        actor: ActorId,
        last_known: Option<Placement>,
    ) -> TransitionOutcome {
        let placement = last_known
            .filter(|last| world.placement_is_valid(*last))
            .and_then(|last| {
                world
                    .find_standable_cell_near(
                        last.region,
                        last.cell,
                        self.config.placement_radius,
                        None,
                    )
                    .map(|cell| Placement::new(last.region, cell, Rotation::default()))
            });
        let spawned = placement.filter(|placement| world.spawn_actor(actor, *placement).is_ok());

        match spawned {
            Some(placement) => {
                session.orphans_mut().resolve(actor);
                warn!(actor = %actor, placement = %placement, "depetrify_fallback_respawn");
                TransitionOutcome::RestoredAtFallback { placement }
            }
            None => record_orphan(
                session,
                OrphanRecord {
                    actor,
                    reason: OrphanReason::NoFallbackPosition,
                    last_known,
                    retained_container: None,
                },
            ),
        }
    }

    /// Manual recovery for an orphaned actor: tears down any placeholder still bound
    /// to it and respawns it on the nearest standable cell around `near`.
    pub fn remediate_orphan(
        &mut self,
        world: &mut SimWorld,
        session: &mut PetrifySession,
        actor: ActorId,
        near: Placement,
    ) -> Result<Placement, PetrifyError> {
        let retained = session
            .orphan(actor)
            .ok_or(PetrifyError::NotOrphaned(actor))?
            .retained_container;
        let record = world.actor(actor).ok_or(PetrifyError::UnknownActor(actor))?;
        if let Some(current) = record.placement() {
            session.orphans_mut().resolve(actor);
            session.mark_live(actor);
            return Ok(current);
        }

        let container = self.resolver.resolve(world, actor).outer().or_else(|| {
            retained.filter(|thing| placeholder_subject(world, *thing) == Some(actor))
        });
        let cell = world
            .find_standable_cell_near(near.region, near.cell, self.config.placement_radius, container)
            .ok_or(PetrifyError::NoStandableCell { actor, near })?;

        if let Some(container) = container {
            world.destroy_thing(container)?;
        }
        let placement = near.with_cell(cell);
        world.spawn_actor(actor, placement)?;
        session.orphans_mut().resolve(actor);
        session.mark_live(actor);
        info!(actor = %actor, placement = %placement, "orphan_remediated");
        Ok(placement)
    }
}

fn discard_placeholder(world: &mut SimWorld, placeholder: ThingId) {
    if let Err(err) = world.destroy_thing(placeholder) {
        warn!(placeholder = %placeholder, error = %err, "placeholder_discard_failed");
    }
}

fn record_orphan(session: &mut PetrifySession, record: OrphanRecord) -> TransitionOutcome {
    error!(
        actor = %record.actor,
        reason = %record.reason,
        last_known = ?record.last_known,
        retained_container = ?record.retained_container,
        "actor_orphaned"
    );
    let reason = record.reason;
    session.orphans_mut().record(record);
    TransitionOutcome::Orphaned(reason)
}
