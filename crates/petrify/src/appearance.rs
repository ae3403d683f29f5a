use std::path::{Path, PathBuf};

use engine::content::{sha256_hex, sha256_hex_parts, write_bytes_atomic};
use engine::{ActorId, AssetHandle, FactionId, Placement, SimWorld};
use serde::Serialize;
use tracing::debug;

use crate::error::AppearanceError;

/// Produces the look of a placeholder for an actor. Best effort: callers log and continue on error.
pub trait AppearanceSynthesizer {
    fn synthesize(&self, world: &SimWorld, actor: ActorId) -> Result<AssetHandle, AppearanceError>;
}

/// Content-addressed handle from the actor's id and label. Writes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAppearance;

impl AppearanceSynthesizer for DefaultAppearance {
    fn synthesize(&self, world: &SimWorld, actor: ActorId) -> Result<AssetHandle, AppearanceError> {
        let record = world
            .actor(actor)
            .ok_or(AppearanceError::UnknownActor(actor))?;
        let id = actor.0.to_string();
        let digest = sha256_hex_parts([id.as_bytes(), record.label.as_bytes()]);
        Ok(AssetHandle(format!("appearance/default/{}", &digest[..16])))
    }
}

#[derive(Debug, Serialize)]
struct AppearanceRecord<'a> {
    actor: ActorId,
    label: &'a str,
    faction: Option<FactionId>,
    placement: Option<Placement>,
}

/// Writes a JSON appearance record per actor and hands out a hash-stamped handle.
#[derive(Debug, Clone)]
pub struct MetadataAppearanceStore {
    dir: PathBuf,
}

impl MetadataAppearanceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl AppearanceSynthesizer for MetadataAppearanceStore {
    fn synthesize(&self, world: &SimWorld, actor: ActorId) -> Result<AssetHandle, AppearanceError> {
        let source = world
            .actor(actor)
            .ok_or(AppearanceError::UnknownActor(actor))?;
        let record = AppearanceRecord {
            actor,
            label: &source.label,
            faction: source.faction,
            placement: source.last_placement(),
        };
        let json = serde_json::to_vec_pretty(&record).map_err(AppearanceError::Encode)?;
        let file_name = format!("{}_{}.json", sanitize_file_stem(&source.label), actor.0);
        let path = self.dir.join(&file_name);
        write_bytes_atomic(&path, &json).map_err(|source| AppearanceError::Write {
            path: path.clone(),
            source,
        })?;
        let digest = sha256_hex(&json);
        debug!(actor = %actor, path = %path.display(), "appearance_written");
        Ok(AssetHandle(format!("appearance/{file_name}#{digest}")))
    }
}

fn sanitize_file_stem(label: &str) -> String {
    let stem = label
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>();
    if stem.is_empty() {
        "actor".to_string()
    } else {
        stem
    }
}
