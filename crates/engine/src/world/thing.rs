use crate::content::ThingDefId;

use super::types::{ActorId, AssetHandle, FactionId, Placement, ThingId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderState {
    /// Identity of the actor this placeholder stands in for.
    pub actor: Option<ActorId>,
    /// `None` renders with the def's default appearance.
    pub appearance: Option<AssetHandle>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrapperState {
    pub(crate) inner: Option<ThingId>,
}

impl WrapperState {
    pub fn inner(&self) -> Option<ThingId> {
        self.inner
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThingKind {
    Placeholder(PlaceholderState),
    Wrapper(WrapperState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thing {
    pub id: ThingId,
    pub def: ThingDefId,
    pub faction: Option<FactionId>,
    pub kind: ThingKind,
    pub(crate) placement: Option<Placement>,
    pub(crate) container: Option<ThingId>,
}

impl Thing {
    pub fn placement(&self) -> Option<Placement> {
        self.placement
    }

    pub fn is_spawned(&self) -> bool {
        self.placement.is_some()
    }

    /// Wrapper currently holding this thing, if any.
    pub fn container(&self) -> Option<ThingId> {
        self.container
    }

    pub fn as_placeholder(&self) -> Option<&PlaceholderState> {
        match &self.kind {
            ThingKind::Placeholder(state) => Some(state),
            ThingKind::Wrapper(_) => None,
        }
    }

    pub fn as_placeholder_mut(&mut self) -> Option<&mut PlaceholderState> {
        match &mut self.kind {
            ThingKind::Placeholder(state) => Some(state),
            ThingKind::Wrapper(_) => None,
        }
    }

    pub fn as_wrapper(&self) -> Option<&WrapperState> {
        match &self.kind {
            ThingKind::Wrapper(state) => Some(state),
            ThingKind::Placeholder(_) => None,
        }
    }

    pub fn bound_actor(&self) -> Option<ActorId> {
        self.as_placeholder().and_then(|state| state.actor)
    }
}
