use std::collections::BTreeSet;

use super::types::{ActorId, FactionId, Placement, ThingId};

#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: ActorId,
    pub label: String,
    pub faction: Option<FactionId>,
    pub(crate) spawned: bool,
    pub(crate) dead: bool,
    pub(crate) last_placement: Option<Placement>,
    pub(crate) holder: Option<ThingId>,
    pub(crate) conditions: BTreeSet<String>,
}

impl Actor {
    pub(crate) fn new(id: ActorId, label: String, faction: Option<FactionId>) -> Self {
        Self {
            id,
            label,
            faction,
            spawned: false,
            dead: false,
            last_placement: None,
            holder: None,
            conditions: BTreeSet::new(),
        }
    }

    pub fn spawned(&self) -> bool {
        self.spawned
    }

    pub fn dead(&self) -> bool {
        self.dead
    }

    /// Current placement while spawned, otherwise where the actor was last in the world.
    pub fn last_placement(&self) -> Option<Placement> {
        self.last_placement
    }

    /// Current placement, only while spawned.
    pub fn placement(&self) -> Option<Placement> {
        if self.spawned {
            self.last_placement
        } else {
            None
        }
    }

    pub fn holder(&self) -> Option<ThingId> {
        self.holder
    }

    pub fn has_condition(&self, condition: &str) -> bool {
        self.conditions.contains(condition)
    }

    pub fn conditions(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().map(String::as_str)
    }
}
