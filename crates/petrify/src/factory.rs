use engine::{ActorId, SimWorld, ThingDefKind, ThingId, WorldError};
use tracing::debug;

use crate::error::FactoryError;

/// Builds placeholder things and binds them to an actor.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderFactory;

impl PlaceholderFactory {
    /// Instantiates an unbound, unspawned placeholder from a def name.
    pub fn create(&self, world: &mut SimWorld, template: &str) -> Result<ThingId, FactoryError> {
        let def = world
            .defs()
            .thing_def_id_by_name(template)
            .ok_or_else(|| FactoryError::UnknownTemplate(template.to_string()))?;
        let kind = world.defs().thing_def(def).map(|def| def.kind);
        if kind != Some(ThingDefKind::Placeholder) {
            return Err(FactoryError::NotAPlaceholderTemplate {
                template: template.to_string(),
                def,
            });
        }
        let placeholder = world.make_thing(def)?;
        debug!(placeholder = %placeholder, template, "placeholder_created");
        Ok(placeholder)
    }

    /// Binds the association and copies the actor's faction. Refuses spawned placeholders.
    pub fn configure_for_actor(
        &self,
        world: &mut SimWorld,
        placeholder: ThingId,
        actor: ActorId,
    ) -> Result<(), FactoryError> {
        let faction = world
            .actor(actor)
            .ok_or(WorldError::UnknownActor(actor))?
            .faction;
        let thing = world
            .thing_mut(placeholder)
            .ok_or(WorldError::UnknownThing(placeholder))?;
        if thing.is_spawned() {
            return Err(FactoryError::AlreadySpawned(placeholder));
        }
        let state = thing
            .as_placeholder_mut()
            .ok_or(FactoryError::NotAPlaceholder(placeholder))?;
        if let Some(bound) = state.actor.filter(|bound| *bound != actor) {
            return Err(FactoryError::AlreadyBound { placeholder, bound });
        }
        state.actor = Some(actor);
        thing.faction = faction;
        Ok(())
    }
}
