mod restore;
mod save;

pub use restore::{restore_world, RestoreReport};
pub use save::{
    encode_save_game, parse_save_game_json, read_save, save_world, validate_save_game,
    write_save, SaveError, SaveGame, SavedActor, SavedRegion, SavedThing, SavedThingKind,
    SAVE_VERSION,
};
