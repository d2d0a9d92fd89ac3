//! Tessera Tile Grid
//!
//! Geometry of the puzzle board: a rectangular grid of square tiles,
//! identified by row-major indices. Tiles are adjacent along four
//! directions, and every candidate adjacency is an [`EdgeKey`] - an
//! ordered pair of tile ids plus an orientation.
//!
//! # Conventions
//!
//! - Tile ids run `0..cols*rows`, row-major.
//! - An edge is directional by construction: `x` is always the earlier
//!   tile (left of a horizontal edge, above a vertical one).
//! - A grid of `c` columns and `r` rows has `2*c*r - c - r` true links.

mod edge;
mod grid;

pub use edge::{EdgeKey, Orientation, ParseEdgeError};
pub use grid::{Direction, GridDims};

/// Tile index within a round's grid, row-major.
pub type TileId = usize;

/// Number of adjacency directions per tile.
pub const DIRECTIONS_PER_TILE: usize = 4;
