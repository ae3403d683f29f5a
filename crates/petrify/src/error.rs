use std::io;
use std::path::PathBuf;

use engine::{ActorId, Placement, ThingDefId, ThingId, WorldError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("placeholder template '{0}' is not defined")]
    UnknownTemplate(String),
    #[error("template '{template}' ({def:?}) is not a placeholder def")]
    NotAPlaceholderTemplate { template: String, def: ThingDefId },
    #[error("{0} is not a placeholder")]
    NotAPlaceholder(ThingId),
    #[error("{0} is already spawned; bind the association before spawning")]
    AlreadySpawned(ThingId),
    #[error("{placeholder} is already bound to {bound}")]
    AlreadyBound { placeholder: ThingId, bound: ActorId },
    #[error(transparent)]
    World(#[from] WorldError),
}

#[derive(Debug, Error)]
pub enum AppearanceError {
    #[error("unknown actor {0}")]
    UnknownActor(ActorId),
    #[error("encode appearance record: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("write appearance '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum PetrifyError {
    #[error("unknown actor {0}")]
    UnknownActor(ActorId),
    #[error("{0} is not recorded as orphaned")]
    NotOrphaned(ActorId),
    #[error("no standable cell for {actor} near {near}")]
    NoStandableCell { actor: ActorId, near: Placement },
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    Factory(#[from] FactoryError),
}
