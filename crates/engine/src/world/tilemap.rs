use thiserror::Error;

use super::types::Cell;

pub const BLOCKED_TILE_ID: u16 = 2;

/// Tilemap origin convention:
/// - cell `(0, 0)` is the bottom-left tile.
/// - tiles are stored row-major, bottom row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tilemap {
    width: u32,
    height: u32,
    tiles: Vec<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TilemapError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("tilemap dimensions must be non-zero, got {width}x{height}")]
    Empty { width: u32, height: u32 },
}

impl Tilemap {
    pub fn new(width: u32, height: u32, tiles: Vec<u16>) -> Result<Self, TilemapError> {
        if width == 0 || height == 0 {
            return Err(TilemapError::Empty { width, height });
        }
        let expected = width as usize * height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(TilemapError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    pub fn open(width: u32, height: u32) -> Result<Self, TilemapError> {
        Self::new(width, height, vec![0; width as usize * height as usize])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tiles(&self) -> &[u16] {
        &self.tiles
    }

    pub fn index_of(&self, cell: Cell) -> Option<usize> {
        if cell.x < 0 || cell.y < 0 {
            return None;
        }
        let (x, y) = (cell.x as u32, cell.y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.index_of(cell).is_some()
    }

    pub fn tile_at(&self, cell: Cell) -> Option<u16> {
        self.index_of(cell)
            .and_then(|index| self.tiles.get(index).copied())
    }

    pub fn set_tile(&mut self, cell: Cell, tile_id: u16) -> bool {
        let Some(index) = self.index_of(cell) else {
            return false;
        };
        self.tiles[index] = tile_id;
        true
    }

    pub fn is_walkable(&self, cell: Cell) -> bool {
        self.tile_at(cell)
            .is_some_and(|tile_id| tile_id != BLOCKED_TILE_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_tile_count_mismatch() {
        let err = Tilemap::new(3, 2, vec![0; 5]).expect_err("mismatch");
        assert_eq!(
            err,
            TilemapError::TileCountMismatch {
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn new_rejects_empty_dimensions() {
        assert!(matches!(
            Tilemap::new(0, 4, Vec::new()),
            Err(TilemapError::Empty { .. })
        ));
    }

    #[test]
    fn out_of_bounds_cells_are_not_walkable() {
        let map = Tilemap::open(4, 4).expect("tilemap");
        assert!(map.is_walkable(Cell::new(3, 3)));
        assert!(!map.is_walkable(Cell::new(4, 0)));
        assert!(!map.is_walkable(Cell::new(-1, 0)));
    }

    #[test]
    fn blocked_tile_is_not_walkable() {
        let mut map = Tilemap::open(2, 2).expect("tilemap");
        assert!(map.set_tile(Cell::new(1, 0), BLOCKED_TILE_ID));
        assert!(!map.is_walkable(Cell::new(1, 0)));
        assert_eq!(map.tile_at(Cell::new(1, 0)), Some(BLOCKED_TILE_ID));
    }
}
