use super::sim_world::SimWorld;
use super::types::{Cell, RegionId, ThingId};

impl SimWorld {
    /// A cell an actor may be placed on: inside an active region, on walkable terrain
    /// and not occupied by a spawned thing whose def blocks standing.
    pub fn is_standable(&self, region: RegionId, cell: Cell, ignoring: Option<ThingId>) -> bool {
        let Some(active) = self.regions.get(&region) else {
            return false;
        };
        if !active.tilemap.is_walkable(cell) {
            return false;
        }
        !self.things_at(region, cell).any(|thing| {
            Some(thing.id) != ignoring
                && self
                    .defs
                    .thing_def(thing.def)
                    .is_some_and(|def| def.blocks_standing)
        })
    }

    /// Nearest standable cell within Chebyshev `radius` of `center`.
    ///
    /// Candidates are ordered by squared Euclidean distance, then `y`, then `x`, so the
    /// result is deterministic. `center` itself wins whenever it is standable.
    pub fn find_standable_cell_near(
        &self,
        region: RegionId,
        center: Cell,
        radius: u32,
        ignoring: Option<ThingId>,
    ) -> Option<Cell> {
        let tilemap = &self.regions.get(&region)?.tilemap;
        let radius = i64::from(radius);
        let mut best: Option<(u64, i32, i32)> = None;

        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let x = i64::from(center.x) + dx;
                let y = i64::from(center.y) + dy;
                let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) else {
                    continue;
                };
                let cell = Cell::new(x, y);
                if !tilemap.contains(cell) || !self.is_standable(region, cell, ignoring) {
                    continue;
                }
                let key = (center.distance_sq(cell), y, x);
                if best.map_or(true, |current| key < current) {
                    best = Some(key);
                }
            }
        }

        best.map(|(_, y, x)| Cell::new(x, y))
    }
}
