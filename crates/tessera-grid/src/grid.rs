//! Grid dimensions and directions.

use serde::{Deserialize, Serialize};

use crate::TileId;

/// Dimensions of a round's tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDims {
    /// Tiles per row.
    pub cols: usize,
    /// Tiles per column.
    pub rows: usize,
}

impl GridDims {
    /// Create grid dimensions.
    pub const fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows }
    }

    /// Total number of tiles.
    pub const fn tile_count(&self) -> usize {
        self.cols * self.rows
    }

    /// Total number of true adjacencies in the solved puzzle.
    ///
    /// Each row contributes `cols - 1` horizontal links, each column
    /// `rows - 1` vertical links: `2*c*r - c - r` in total.
    pub const fn total_links(&self) -> usize {
        2 * self.cols * self.rows - self.cols - self.rows
    }

    /// Whether a tile id lies on this grid.
    pub const fn contains(&self, tile: TileId) -> bool {
        tile < self.tile_count()
    }

    /// The row of a tile.
    pub const fn row(&self, tile: TileId) -> usize {
        tile / self.cols
    }

    /// The column of a tile.
    pub const fn col(&self, tile: TileId) -> usize {
        tile % self.cols
    }

    /// The neighbor of a tile in a given direction, if it exists.
    pub fn neighbor(&self, tile: TileId, dir: Direction) -> Option<TileId> {
        match dir {
            Direction::Up => (tile >= self.cols).then(|| tile - self.cols),
            Direction::Right => (self.col(tile) + 1 < self.cols).then(|| tile + 1),
            Direction::Down => (self.row(tile) + 1 < self.rows).then(|| tile + self.cols),
            Direction::Left => (self.col(tile) > 0).then(|| tile - 1),
        }
    }
}

/// One of the four adjacency directions of a tile.
///
/// The numeric order (up, right, down, left) is the wire order of hint
/// arrays and is relied on by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// All four directions in wire order.
    pub const ALL: [Self; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    /// Position within hint arrays.
    pub const fn index(&self) -> usize {
        match self {
            Self::Up => 0,
            Self::Right => 1,
            Self::Down => 2,
            Self::Left => 3,
        }
    }

    /// The mirrored direction seen from the neighbor.
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Right => Self::Left,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_count_small_grids() {
        assert_eq!(GridDims::new(2, 2).total_links(), 4);
        assert_eq!(GridDims::new(3, 3).total_links(), 12);
        assert_eq!(GridDims::new(4, 3).total_links(), 17);
    }

    #[test]
    fn row_major_indexing() {
        let dims = GridDims::new(3, 2);
        assert_eq!(dims.row(4), 1);
        assert_eq!(dims.col(4), 1);
        assert!(dims.contains(5));
        assert!(!dims.contains(6));
    }

    #[test]
    fn neighbors_respect_borders() {
        let dims = GridDims::new(2, 2);
        // Top-left corner has only right and down neighbors.
        assert_eq!(dims.neighbor(0, Direction::Up), None);
        assert_eq!(dims.neighbor(0, Direction::Left), None);
        assert_eq!(dims.neighbor(0, Direction::Right), Some(1));
        assert_eq!(dims.neighbor(0, Direction::Down), Some(2));
        // Row wrap is not adjacency.
        assert_eq!(dims.neighbor(1, Direction::Right), None);
    }

    #[test]
    fn opposite_is_involution() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
        }
    }
}
