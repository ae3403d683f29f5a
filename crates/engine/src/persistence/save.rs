use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::content::{write_text_atomic, DefDatabase, ThingDefKind};
use crate::world::{
    ActorId, AssetHandle, FactionId, Placement, RegionId, SimWorld, ThingId, ThingKind,
};

pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("parse save json: {message}")]
    Parse { message: String },
    #[error("parse save json at {path}: {message}")]
    ParseAt { path: String, message: String },
    #[error("validation failed at {path}: {message}")]
    Validation { path: String, message: String },
    #[error("encode save json: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("read save '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("write save '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRegion {
    pub id: RegionId,
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub tiles: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedActor {
    pub id: ActorId,
    pub label: String,
    pub faction: Option<FactionId>,
    pub spawned: bool,
    #[serde(default)]
    pub dead: bool,
    pub last_placement: Option<Placement>,
    #[serde(default)]
    pub holder: Option<ThingId>,
    #[serde(default)]
    pub conditions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SavedThingKind {
    Placeholder {
        actor: Option<ActorId>,
        #[serde(default)]
        appearance: Option<AssetHandle>,
    },
    Wrapper {
        inner: Option<ThingId>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedThing {
    pub id: ThingId,
    pub def_name: String,
    pub faction: Option<FactionId>,
    pub placement: Option<Placement>,
    #[serde(flatten)]
    pub kind: SavedThingKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveGame {
    pub save_version: u32,
    pub defs_sha256: String,
    pub next_region_id: u32,
    pub next_actor_id: u64,
    pub next_thing_id: u64,
    pub regions: Vec<SavedRegion>,
    pub actors: Vec<SavedActor>,
    pub things: Vec<SavedThing>,
}

/// Snapshots the object graph. Containment is stored once, on the wrapper side.
pub fn save_world(world: &SimWorld) -> SaveGame {
    let regions = world
        .regions
        .values()
        .map(|region| SavedRegion {
            id: region.id,
            label: region.label.clone(),
            width: region.tilemap.width(),
            height: region.tilemap.height(),
            tiles: region.tilemap.tiles().to_vec(),
        })
        .collect();

    let actors = world
        .actors
        .values()
        .map(|actor| SavedActor {
            id: actor.id,
            label: actor.label.clone(),
            faction: actor.faction,
            spawned: actor.spawned,
            dead: actor.dead,
            last_placement: actor.last_placement,
            holder: actor.holder,
            conditions: actor.conditions.iter().cloned().collect(),
        })
        .collect();

    let things = world
        .things
        .values()
        .map(|thing| SavedThing {
            id: thing.id,
            def_name: world
                .defs
                .thing_def(thing.def)
                .map(|def| def.def_name.clone())
                .unwrap_or_default(),
            faction: thing.faction,
            placement: thing.placement,
            kind: match &thing.kind {
                ThingKind::Placeholder(state) => SavedThingKind::Placeholder {
                    actor: state.actor,
                    appearance: state.appearance.clone(),
                },
                ThingKind::Wrapper(state) => SavedThingKind::Wrapper { inner: state.inner },
            },
        })
        .collect();

    SaveGame {
        save_version: SAVE_VERSION,
        defs_sha256: world.defs.source_hash().to_string(),
        next_region_id: world.next_region_id,
        next_actor_id: world.next_actor_id,
        next_thing_id: world.next_thing_id,
        regions,
        actors,
        things,
    }
}

pub fn encode_save_game(save: &SaveGame) -> Result<String, SaveError> {
    serde_json::to_string_pretty(save).map_err(SaveError::Encode)
}

pub fn parse_save_game_json(raw: &str) -> Result<SaveGame, SaveError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, SaveGame>(&mut deserializer) {
        Ok(save) => Ok(save),
        Err(error) => {
            let path = error.path().to_string();
            let message = error.into_inner().to_string();
            if path.is_empty() || path == "." {
                Err(SaveError::Parse { message })
            } else {
                Err(SaveError::ParseAt { path, message })
            }
        }
    }
}

fn validation_err(path: &str, message: impl Into<String>) -> SaveError {
    SaveError::Validation {
        path: path.to_string(),
        message: message.into(),
    }
}

fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> SaveError {
    validation_err(path, format!("expected {expected}, got {actual}"))
}

/// Structural checks. Dangling cross-references are tolerated here and dropped on restore.
pub fn validate_save_game(save: &SaveGame, defs: &DefDatabase) -> Result<(), SaveError> {
    if save.save_version != SAVE_VERSION {
        return Err(expected_actual(
            "save_version",
            SAVE_VERSION,
            save.save_version,
        ));
    }

    let mut region_dims = HashMap::with_capacity(save.regions.len());
    for (index, region) in save.regions.iter().enumerate() {
        if region_dims
            .insert(region.id, (region.width, region.height))
            .is_some()
        {
            return Err(validation_err(
                &format!("regions[{index}].id"),
                format!("duplicate region id {}", region.id.0),
            ));
        }
        if region.id.0 >= save.next_region_id {
            return Err(expected_actual(
                "next_region_id",
                format!("> {}", region.id.0),
                save.next_region_id,
            ));
        }
        let expected = region.width as usize * region.height as usize;
        if region.width == 0 || region.height == 0 || region.tiles.len() != expected {
            return Err(expected_actual(
                &format!("regions[{index}].tiles"),
                format!("{expected} tiles for {}x{}", region.width, region.height),
                region.tiles.len(),
            ));
        }
    }

    let placement_ok = |placement: &Placement| {
        region_dims.get(&placement.region).is_some_and(|(w, h)| {
            placement.cell.x >= 0
                && placement.cell.y >= 0
                && (placement.cell.x as u32) < *w
                && (placement.cell.y as u32) < *h
        })
    };

    let mut known_actors = HashMap::with_capacity(save.actors.len());
    for (index, actor) in save.actors.iter().enumerate() {
        if let Some(first_index) = known_actors.insert(actor.id, index) {
            return Err(validation_err(
                &format!("actors[{index}].id"),
                format!(
                    "duplicate actor id {} (first seen at actors[{first_index}].id)",
                    actor.id.0
                ),
            ));
        }
        if actor.id.0 >= save.next_actor_id {
            return Err(expected_actual(
                "next_actor_id",
                format!("> {}", actor.id.0),
                save.next_actor_id,
            ));
        }
        if actor.spawned {
            match &actor.last_placement {
                Some(placement) if placement_ok(placement) => {}
                _ => {
                    return Err(validation_err(
                        &format!("actors[{index}].last_placement"),
                        "spawned actor must be placed on a saved region",
                    ))
                }
            }
            if actor.dead {
                return Err(validation_err(
                    &format!("actors[{index}].spawned"),
                    "dead actor cannot be spawned",
                ));
            }
        }
    }

    let mut known_things: BTreeMap<ThingId, usize> = BTreeMap::new();
    let mut inner_owner: HashMap<ThingId, usize> = HashMap::new();
    for (index, thing) in save.things.iter().enumerate() {
        if let Some(first_index) = known_things.insert(thing.id, index) {
            return Err(validation_err(
                &format!("things[{index}].id"),
                format!(
                    "duplicate thing id {} (first seen at things[{first_index}].id)",
                    thing.id.0
                ),
            ));
        }
        if thing.id.0 >= save.next_thing_id {
            return Err(expected_actual(
                "next_thing_id",
                format!("> {}", thing.id.0),
                save.next_thing_id,
            ));
        }
        let def_path = format!("things[{index}].def_name");
        let Some(def_id) = defs.thing_def_id_by_name(&thing.def_name) else {
            return Err(validation_err(
                &def_path,
                format!("unknown thing def '{}'", thing.def_name),
            ));
        };
        let def_kind = defs.thing_def(def_id).map(|def| def.kind);
        let saved_kind = match thing.kind {
            SavedThingKind::Placeholder { .. } => ThingDefKind::Placeholder,
            SavedThingKind::Wrapper { .. } => ThingDefKind::Wrapper,
        };
        if def_kind != Some(saved_kind) {
            return Err(expected_actual(
                &format!("things[{index}].kind"),
                format!("{def_kind:?}"),
                format!("{saved_kind:?}"),
            ));
        }
        if let Some(placement) = &thing.placement {
            if !placement_ok(placement) {
                return Err(validation_err(
                    &format!("things[{index}].placement"),
                    "thing must be placed on a saved region",
                ));
            }
        }
        if let SavedThingKind::Wrapper { inner: Some(inner) } = thing.kind {
            if let Some(first_index) = inner_owner.insert(inner, index) {
                return Err(validation_err(
                    &format!("things[{index}].inner"),
                    format!(
                        "thing {} already held by things[{first_index}]",
                        inner.0
                    ),
                ));
            }
        }
    }

    for (inner, owner_index) in &inner_owner {
        let Some(inner_index) = known_things.get(inner) else {
            continue;
        };
        let inner_thing = &save.things[*inner_index];
        if !matches!(inner_thing.kind, SavedThingKind::Placeholder { .. }) {
            return Err(validation_err(
                &format!("things[{owner_index}].inner"),
                "wrapper may only hold a placeholder",
            ));
        }
        if inner_thing.placement.is_some() {
            return Err(validation_err(
                &format!("things[{inner_index}].placement"),
                "wrapped thing cannot be placed",
            ));
        }
    }

    Ok(())
}

pub fn write_save(path: &Path, world: &SimWorld) -> Result<(), SaveError> {
    let save = save_world(world);
    let json = encode_save_game(&save)?;
    write_text_atomic(path, &json).map_err(|source| SaveError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        path = %path.display(),
        actors = save.actors.len(),
        things = save.things.len(),
        "save_written"
    );
    Ok(())
}

pub fn read_save(path: &Path, defs: &DefDatabase) -> Result<SaveGame, SaveError> {
    let raw = fs::read_to_string(path).map_err(|source| SaveError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let save = parse_save_game_json(&raw)?;
    validate_save_game(&save, defs)?;
    Ok(save)
}
