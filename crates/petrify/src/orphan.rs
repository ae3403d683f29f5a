use std::collections::BTreeMap;
use std::fmt;

use engine::{ActorId, Placement, ThingId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanReason {
    /// A placeholder was found but nothing near it is standable. The placeholder is kept.
    NoStandableCell,
    /// The placeholder (or its wrapper) is held off-map.
    ContainerOffMap,
    /// No placeholder and the last known position is gone or blocked.
    NoFallbackPosition,
    /// Placeholder creation failed and the actor could not be put back.
    RollbackFailed,
}

impl fmt::Display for OrphanReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OrphanReason::NoStandableCell => "no_standable_cell",
            OrphanReason::ContainerOffMap => "container_off_map",
            OrphanReason::NoFallbackPosition => "no_fallback_position",
            OrphanReason::RollbackFailed => "rollback_failed",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanRecord {
    pub actor: ActorId,
    pub reason: OrphanReason,
    pub last_known: Option<Placement>,
    /// Placeholder or wrapper still carrying the binding, if one survived.
    pub retained_container: Option<ThingId>,
}

/// Actors left unspawned with no way back. Cleared only by remediation or teardown.
#[derive(Debug, Clone, Default)]
pub struct OrphanLedger {
    records: BTreeMap<ActorId, OrphanRecord>,
}

impl OrphanLedger {
    pub fn record(&mut self, record: OrphanRecord) {
        self.records.insert(record.actor, record);
    }

    pub fn get(&self, actor: ActorId) -> Option<&OrphanRecord> {
        self.records.get(&actor)
    }

    pub fn contains(&self, actor: ActorId) -> bool {
        self.records.contains_key(&actor)
    }

    pub fn resolve(&mut self, actor: ActorId) -> Option<OrphanRecord> {
        self.records.remove(&actor)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrphanRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
