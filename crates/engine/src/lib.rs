pub mod content;
mod paths;
pub mod persistence;
pub mod world;

pub use content::{
    compile_thing_defs, compile_thing_defs_file, DefCompileError, DefDatabase, DefErrorCode,
    SourceLocation, ThingDef, ThingDefId, ThingDefKind,
};
pub use paths::{resolve_app_paths, AppPaths, PathsError, ROOT_ENV_VAR};
pub use persistence::{
    read_save, restore_world, save_world, write_save, RestoreReport, SaveError, SaveGame,
};
pub use world::{
    Actor, ActorId, AssetHandle, Cell, FactionId, Placement, PlaceholderState, Region, RegionId,
    Rotation, SimWorld, Thing, ThingId, ThingKind, Tilemap, TilemapError, WorldError,
    WrapperState, BLOCKED_TILE_ID,
};
