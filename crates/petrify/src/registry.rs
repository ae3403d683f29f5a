use std::collections::HashSet;

use engine::ActorId;

/// Actors currently petrified. Owned by the session, not process-wide.
#[derive(Debug, Clone, Default)]
pub struct TransformationRegistry {
    actors: HashSet<ActorId>,
}

impl TransformationRegistry {
    /// Returns false if the actor was already present.
    pub fn add(&mut self, actor: ActorId) -> bool {
        self.actors.insert(actor)
    }

    /// Returns false if the actor was absent.
    pub fn remove(&mut self, actor: ActorId) -> bool {
        self.actors.remove(&actor)
    }

    pub fn contains(&self, actor: ActorId) -> bool {
        self.actors.contains(&actor)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Sorted snapshot of the members.
    pub fn actors(&self) -> Vec<ActorId> {
        let mut actors = self.actors.iter().copied().collect::<Vec<_>>();
        actors.sort();
        actors
    }

    pub fn clear(&mut self) {
        self.actors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_remove_are_idempotent() {
        let mut registry = TransformationRegistry::default();
        assert!(registry.add(ActorId(3)));
        assert!(!registry.add(ActorId(3)));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(ActorId(3)));

        assert!(registry.remove(ActorId(3)));
        assert!(!registry.remove(ActorId(3)));
        assert!(!registry.contains(ActorId(3)));
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_sorted() {
        let mut registry = TransformationRegistry::default();
        registry.add(ActorId(9));
        registry.add(ActorId(1));
        registry.add(ActorId(4));
        assert_eq!(registry.actors(), vec![ActorId(1), ActorId(4), ActorId(9)]);
        registry.clear();
        assert!(registry.is_empty());
    }
}
