//! Typed vote payloads.

use serde::{Deserialize, Serialize};
use tessera_grid::{EdgeKey, GridDims, Orientation, TileId};

use crate::PlayerId;

/// One edge delta of a player's vote batch.
///
/// `size > 0` asserts the adjacency exists, `size <= 0` denies it.
/// `hinted` marks a delta made while following a hint; `from` names the
/// player whose earlier vote produced that hint, when known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteEdge {
    pub x: TileId,
    pub y: TileId,
    #[serde(rename = "tag")]
    pub orientation: Orientation,
    pub size: f64,
    #[serde(default)]
    pub hinted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<PlayerId>,
}

impl VoteEdge {
    /// The ledger key this delta addresses.
    pub const fn key(&self) -> EdgeKey {
        EdgeKey::new(self.x, self.y, self.orientation)
    }

    /// Whether both endpoints lie on the grid and the size is a number.
    pub fn validate(&self, dims: GridDims) -> bool {
        self.key().on_grid(dims) && self.size.is_finite()
    }
}
