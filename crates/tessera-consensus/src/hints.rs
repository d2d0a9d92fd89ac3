//! The per-tile, per-direction hint index.
//!
//! Derived state, rebuilt from the [`Ledger`] every vote cycle. Each
//! tile has four directional slots holding candidate neighbors; the
//! strongest candidate per slot becomes the sure hint, and slots whose
//! top candidates are too close to call are demoted to "unsure."
//!
//! The confidence cached per candidate is support-scaled: the edge's
//! confidence multiplied by its supporter count, so an edge backed by
//! three players at 0.6 outranks a lone player at 1.0.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tessera_grid::{Direction, EdgeKey, TileId, DIRECTIONS_PER_TILE};

use crate::{ConsensusParams, Edge, Ledger};

/// Sure hints: per tile, per direction, the believed neighbor.
pub type HintGrid = Vec<[Option<TileId>; DIRECTIONS_PER_TILE]>;

/// A candidate neighbor cached in a directional slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Support-scaled confidence: edge confidence × supporter count.
    pub confidence: f64,
    /// The edge's aggregate supporting weight.
    pub weight: f64,
    /// Snapshot of the backing edge at index time.
    pub edge: Edge,
}

/// One direction of one tile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionSlot {
    /// Candidate neighbors, keyed by neighbor tile id.
    pub candidates: BTreeMap<TileId, Candidate>,
    /// Maximum cached confidence across `candidates`, 0 if empty.
    pub max_confidence: f64,
}

/// A contested tile boundary: the slot's top candidates were within the
/// epsilon band of each other, so no sure hint is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsureHint {
    /// The tile whose slots are contested.
    pub index: TileId,
    /// Near-tied candidate neighbors, per direction.
    pub around_tiles: [Vec<TileId>; DIRECTIONS_PER_TILE],
    /// Largest single contested weight.
    pub max_weight: f64,
    /// Total contested weight; the unsure list is ranked by this.
    pub weight_sum: f64,
}

impl UnsureHint {
    fn new(index: TileId) -> Self {
        Self {
            index,
            around_tiles: Default::default(),
            max_weight: 0.0,
            weight_sum: 0.0,
        }
    }

    fn record(&mut self, neighbor: TileId, dir: Direction, weight: f64) {
        // Three decimals, matching the ledger's wire precision.
        let fixed = (weight * 1000.0).round() / 1000.0;
        self.around_tiles[dir.index()].push(neighbor);
        if fixed > self.max_weight {
            self.max_weight = fixed;
        }
        self.weight_sum += fixed;
    }
}

/// The live hint state of one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintIndex {
    nodes: Vec<[DirectionSlot; DIRECTIONS_PER_TILE]>,
    hints: HintGrid,
    unsure: Vec<UnsureHint>,
}

impl HintIndex {
    /// Create an empty index for a grid of `tile_count` tiles.
    pub fn new(tile_count: usize) -> Self {
        Self {
            nodes: (0..tile_count).map(|_| Default::default()).collect(),
            hints: vec![[None; DIRECTIONS_PER_TILE]; tile_count],
            unsure: Vec::new(),
        }
    }

    /// Build a fresh index from a full ledger.
    pub fn rebuild(tile_count: usize, ledger: &Ledger, params: &ConsensusParams) -> Self {
        let mut index = Self::new(tile_count);
        index.refresh(ledger, params);
        index
    }

    /// Number of tiles covered.
    pub fn tile_count(&self) -> usize {
        self.nodes.len()
    }

    /// The sure hints, post unsure demotion.
    pub fn sure_hints(&self) -> &HintGrid {
        &self.hints
    }

    /// Contested slots, ranked by descending contested weight.
    pub fn unsure_hints(&self) -> &[UnsureHint] {
        &self.unsure
    }

    /// A directional slot's cached candidate, if indexed.
    pub fn candidate(&self, tile: TileId, dir: Direction, neighbor: TileId) -> Option<&Candidate> {
        self.nodes.get(tile)?.get(dir.index())?.candidates.get(&neighbor)
    }

    /// A directional slot's current maximum cached confidence.
    pub fn max_confidence(&self, tile: TileId, dir: Direction) -> f64 {
        self.nodes[tile][dir.index()].max_confidence
    }

    /// Re-apply every ledger edge, then recompute sure and unsure hints.
    pub fn refresh(&mut self, ledger: &Ledger, params: &ConsensusParams) {
        for edge in ledger.edges.values() {
            self.apply_edge(edge, params);
        }
        self.generate_hints();
        self.check_unsure_hints(params);
    }

    /// Index or de-index one edge at both endpoints.
    ///
    /// An edge enters the index when it clears both thresholds; an edge
    /// that was indexed and no longer clears them is removed from both
    /// mirrored slots. Coordinates off the grid are ignored.
    pub fn apply_edge(&mut self, edge: &Edge, params: &ConsensusParams) {
        let EdgeKey { x, y, .. } = edge.key;
        if x >= self.nodes.len() || y >= self.nodes.len() {
            return;
        }

        let supporter_count = edge.supporters.len();
        let meets = edge.confidence >= params.min_confidence
            && supporter_count >= params.min_supporters;
        let (dx, dy) = edge.key.slots();

        if !meets {
            if self.nodes[x][dx.index()].candidates.remove(&y).is_some() {
                self.nodes[y][dy.index()].candidates.remove(&x);
            }
            return;
        }

        let scaled = edge.confidence * supporter_count as f64;
        let candidate = Candidate {
            confidence: scaled,
            weight: edge.weight,
            edge: edge.clone(),
        };
        self.nodes[x][dx.index()].candidates.insert(y, candidate.clone());
        self.nodes[y][dy.index()].candidates.insert(x, candidate);
    }

    /// Select the strongest candidate per slot.
    ///
    /// Strictly-greater comparison, so ties keep the first candidate in
    /// iteration order (ascending neighbor id).
    fn generate_hints(&mut self) {
        for (tile, slots) in self.nodes.iter_mut().enumerate() {
            for dir in Direction::ALL {
                let slot = &mut slots[dir.index()];
                let mut max = 0.0;
                let mut hint = None;
                for (&neighbor, candidate) in &slot.candidates {
                    if candidate.confidence > max {
                        max = candidate.confidence;
                        hint = Some(neighbor);
                    }
                }
                slot.max_confidence = max;
                self.hints[tile][dir.index()] = hint;
            }
        }
    }

    /// Demote slots whose rivals sit inside the epsilon band.
    ///
    /// Every near-tied candidate, the demoted sure hint included, is
    /// recorded with its weight; the resulting list is sorted stably by
    /// descending total contested weight.
    fn check_unsure_hints(&mut self, params: &ConsensusParams) {
        let mut contested: BTreeMap<TileId, UnsureHint> = BTreeMap::new();

        for (tile, slots) in self.nodes.iter().enumerate() {
            for dir in Direction::ALL {
                let slot = &slots[dir.index()];
                let Some(hinted) = self.hints[tile][dir.index()] else {
                    continue;
                };
                let band = slot.max_confidence * (1.0 - params.unsure_epsilon);
                let mut unsure = false;
                for (&neighbor, candidate) in &slot.candidates {
                    if neighbor != hinted && candidate.confidence >= band {
                        unsure = true;
                        contested
                            .entry(tile)
                            .or_insert_with(|| UnsureHint::new(tile))
                            .record(neighbor, dir, candidate.weight);
                    }
                }
                if unsure {
                    let weight = slot.candidates[&hinted].weight;
                    contested
                        .entry(tile)
                        .or_insert_with(|| UnsureHint::new(tile))
                        .record(hinted, dir, weight);
                    self.hints[tile][dir.index()] = None;
                }
            }
        }

        let mut unsure: Vec<UnsureHint> = contested.into_values().collect();
        unsure.sort_by(|a, b| b.weight_sum.total_cmp(&a.weight_sum));
        self.unsure = unsure;
    }
}
