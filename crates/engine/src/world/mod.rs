mod actor;
mod placement;
mod sim_world;
mod thing;
mod tilemap;
mod types;

pub use actor::Actor;
pub use sim_world::{Region, SimWorld, WorldError};
pub use thing::{PlaceholderState, Thing, ThingKind, WrapperState};
pub use tilemap::{Tilemap, TilemapError, BLOCKED_TILE_ID};
pub use types::{ActorId, AssetHandle, Cell, FactionId, Placement, RegionId, Rotation, ThingId};
