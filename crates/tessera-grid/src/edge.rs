//! Candidate adjacency keys.
//!
//! The wire form is what the board client sends: `"3R-L4"` is the
//! horizontal edge between tiles 3 and 4 (3's right side against 4's
//! left), `"0B-T2"` the vertical edge between 0 and 2 (0's bottom
//! against 2's top).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Direction, GridDims, TileId};

/// Orientation of a candidate adjacency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Orientation {
    /// Left-right adjacency, wire tag `L-R`.
    #[serde(rename = "L-R")]
    Horizontal,
    /// Top-bottom adjacency, wire tag `T-B`.
    #[serde(rename = "T-B")]
    Vertical,
}

/// A candidate adjacency between two tiles.
///
/// Directional by construction: `x` is the earlier tile, so a horizontal
/// edge occupies `x`'s right slot and `y`'s left slot, a vertical edge
/// `x`'s bottom slot and `y`'s top slot.
///
/// Serializes as its wire string so edge keys can key JSON maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub x: TileId,
    pub y: TileId,
    pub orientation: Orientation,
}

impl Serialize for EdgeKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EdgeKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Failure to parse a wire-form edge key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid edge key: {0}")]
pub struct ParseEdgeError(pub String);

impl EdgeKey {
    /// Create an edge key.
    pub const fn new(x: TileId, y: TileId, orientation: Orientation) -> Self {
        Self { x, y, orientation }
    }

    /// Shorthand for a horizontal edge.
    pub const fn horizontal(x: TileId, y: TileId) -> Self {
        Self::new(x, y, Orientation::Horizontal)
    }

    /// Shorthand for a vertical edge.
    pub const fn vertical(x: TileId, y: TileId) -> Self {
        Self::new(x, y, Orientation::Vertical)
    }

    /// Whether this edge is a true adjacency on the given grid.
    ///
    /// Horizontal: `y` directly follows `x` without wrapping to the next
    /// row. Vertical: `y` is exactly one row below `x`.
    pub const fn is_correct(&self, dims: GridDims) -> bool {
        match self.orientation {
            Orientation::Horizontal => self.x + 1 == self.y && self.y % dims.cols != 0,
            Orientation::Vertical => self.x + dims.cols == self.y,
        }
    }

    /// Whether both endpoints lie on the grid.
    pub const fn on_grid(&self, dims: GridDims) -> bool {
        dims.contains(self.x) && dims.contains(self.y)
    }

    /// The directional slots this edge occupies: `(x's direction, y's
    /// direction)`. Always a mirrored pair.
    pub const fn slots(&self) -> (Direction, Direction) {
        match self.orientation {
            Orientation::Horizontal => (Direction::Right, Direction::Left),
            Orientation::Vertical => (Direction::Down, Direction::Up),
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.orientation {
            Orientation::Horizontal => write!(f, "{}R-L{}", self.x, self.y),
            Orientation::Vertical => write!(f, "{}B-T{}", self.x, self.y),
        }
    }
}

impl FromStr for EdgeKey {
    type Err = ParseEdgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseEdgeError(s.to_string());
        let (head, tail) = s.split_once('-').ok_or_else(err)?;

        let orientation = match (head.as_bytes().last(), tail.as_bytes().first()) {
            (Some(b'R'), Some(b'L')) => Orientation::Horizontal,
            (Some(b'B'), Some(b'T')) => Orientation::Vertical,
            _ => return Err(err()),
        };
        let x = head[..head.len() - 1].parse().map_err(|_| err())?;
        let y = tail[1..].parse().map_err(|_| err())?;

        Ok(Self { x, y, orientation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_roundtrip() {
        for key in [
            EdgeKey::horizontal(3, 4),
            EdgeKey::vertical(0, 2),
            EdgeKey::horizontal(17, 3),
        ] {
            let parsed: EdgeKey = key.to_string().parse().unwrap();
            assert_eq!(parsed, key);
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", "3-4", "3R-T4", "R-L4", "3R-L", "aR-Lb", "3RL4"] {
            assert!(bad.parse::<EdgeKey>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn correctness_on_2x2() {
        let dims = GridDims::new(2, 2);
        assert!(EdgeKey::horizontal(0, 1).is_correct(dims));
        assert!(EdgeKey::vertical(0, 2).is_correct(dims));
        assert!(EdgeKey::vertical(1, 3).is_correct(dims));
        // Wrapping from end-of-row to the next row is not adjacency.
        assert!(!EdgeKey::horizontal(1, 2).is_correct(dims));
        assert!(!EdgeKey::horizontal(0, 2).is_correct(dims));
        assert!(!EdgeKey::vertical(0, 3).is_correct(dims));
    }

    #[test]
    fn slots_are_mirrored() {
        let (xs, ys) = EdgeKey::horizontal(0, 1).slots();
        assert_eq!(xs, Direction::Right);
        assert_eq!(ys, Direction::Left);
        assert_eq!(xs.opposite(), ys);

        let (xs, ys) = EdgeKey::vertical(0, 2).slots();
        assert_eq!(xs, Direction::Down);
        assert_eq!(ys, Direction::Up);
        assert_eq!(xs.opposite(), ys);
    }
}
