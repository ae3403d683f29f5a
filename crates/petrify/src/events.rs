use engine::{ActorId, SimWorld, WorldError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionEvent {
    Added(ActorId),
    Removed(ActorId),
}

impl ConditionEvent {
    pub fn actor(&self) -> ActorId {
        match *self {
            ConditionEvent::Added(actor) | ConditionEvent::Removed(actor) => actor,
        }
    }
}

/// Condition edges collected during a tick, drained by the controller.
#[derive(Debug, Default)]
pub struct ConditionEventQueue {
    events: Vec<ConditionEvent>,
}

impl ConditionEventQueue {
    pub fn enqueue(&mut self, event: ConditionEvent) {
        self.events.push(event);
    }

    /// Sets or clears `condition` on the actor and enqueues an event only when it changed.
    pub fn set_condition(
        &mut self,
        world: &mut SimWorld,
        actor: ActorId,
        condition: &str,
        active: bool,
    ) -> Result<bool, WorldError> {
        let changed = if active {
            world.add_condition(actor, condition)?
        } else {
            world.remove_condition(actor, condition)?
        };
        if changed {
            self.enqueue(if active {
                ConditionEvent::Added(actor)
            } else {
                ConditionEvent::Removed(actor)
            });
        }
        Ok(changed)
    }

    pub fn drain_current_tick(&mut self) -> Vec<ConditionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use engine::DefDatabase;

    use super::*;

    #[test]
    fn set_condition_is_edge_triggered() {
        let mut world = SimWorld::new(DefDatabase::builtin().expect("defs"));
        let actor = world.create_actor("Ada", None);
        let mut queue = ConditionEventQueue::default();

        assert!(queue
            .set_condition(&mut world, actor, "petrified_full", true)
            .expect("add"));
        assert!(!queue
            .set_condition(&mut world, actor, "petrified_full", true)
            .expect("re-add"));
        assert!(queue
            .set_condition(&mut world, actor, "petrified_full", false)
            .expect("remove"));

        assert_eq!(
            queue.drain_current_tick(),
            vec![ConditionEvent::Added(actor), ConditionEvent::Removed(actor)]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn set_condition_on_unknown_actor_fails_without_event() {
        let mut world = SimWorld::new(DefDatabase::builtin().expect("defs"));
        let mut queue = ConditionEventQueue::default();
        let err = queue
            .set_condition(&mut world, ActorId(42), "petrified_full", true)
            .expect_err("unknown");
        assert_eq!(err, WorldError::UnknownActor(ActorId(42)));
        assert_eq!(queue.len(), 0);
    }
}
