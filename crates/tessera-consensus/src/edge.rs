//! The per-round edge ledger.
//!
//! One [`Edge`] per candidate adjacency ever voted on, holding the
//! current supporting and opposing contributions per player. Edges are
//! never deleted; an edge whose support collapses merely drops out of
//! the hint index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tessera_grid::EdgeKey;

use crate::{ConsensusParams, PlayerId};

/// A candidate adjacency with its accumulated evidence.
///
/// Invariant: a player appears in at most one of `supporters` and
/// `opposers` at any time. Voting for then against an edge moves the
/// player's entry across, never duplicates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub key: EdgeKey,
    /// Supporting contributions, non-negative.
    pub supporters: BTreeMap<PlayerId, f64>,
    /// Opposing contributions, non-negative.
    pub opposers: BTreeMap<PlayerId, f64>,
    /// Normalized support fraction, in [0, 1].
    pub confidence: f64,
    /// Aggregate supporting weight.
    pub weight: f64,
}

impl Edge {
    /// Total opposing weight.
    pub fn oppose_weight(&self) -> f64 {
        self.opposers.values().sum()
    }

    /// Recompute `weight` and `confidence` from the contribution maps.
    ///
    /// When both sides are zero the division is skipped and confidence
    /// keeps its previous value.
    pub fn recompute(&mut self) {
        let wp: f64 = self.supporters.values().sum();
        let wn: f64 = self.opposers.values().sum();
        self.weight = wp;
        if wp + wn != 0.0 {
            self.confidence = wp / (wp + wn);
        }
    }
}

/// Outcome of applying one vote, fed to the scoring rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoteOutcome {
    /// The player's prior stance as a signed size proxy: the stored
    /// supporting weight if they supported, the negated opposing weight
    /// if they opposed, 0 if they had no entry.
    pub prior_size: f64,
    /// Whether this vote created the edge.
    pub created: bool,
}

/// All edges of one round, keyed by edge key.
///
/// `BTreeMap`-backed throughout so iteration order, and therefore
/// replayed arithmetic, is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    pub edges: BTreeMap<EdgeKey, Edge>,
}

/// A supporting contribution: the proposal magnitude, damped when the
/// player was following a hint, scaled by how much of the puzzle the
/// proposal spans.
fn support_contribution(size: f64, hinted: bool, tile_count: usize, params: &ConsensusParams) -> f64 {
    let decay = if hinted { params.hint_decay } else { 1.0 };
    size * decay * (size / tile_count as f64)
}

/// An opposing contribution. `size` is non-positive on this path, so the
/// squared sign cancels and the stored weight is non-negative.
fn oppose_contribution(size: f64, tile_count: usize) -> f64 {
    size * (size / tile_count as f64)
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of materialized edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the ledger has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Look up an edge.
    pub fn get(&self, key: &EdgeKey) -> Option<&Edge> {
        self.edges.get(key)
    }

    /// Apply one player's signed proposal for one edge.
    ///
    /// `size > 0` supports the edge's existence, `size <= 0` opposes it.
    /// The player's prior entry is moved out of whichever side it
    /// occupied; the returned [`VoteOutcome`] carries the prior stance
    /// for scoring.
    ///
    /// A never-before-seen edge is created with confidence exactly 1
    /// regardless of the vote's sign - including for a lone opposer.
    /// Longstanding behavior the scoreboard depends on; do not change
    /// without a product decision.
    pub fn apply_vote(
        &mut self,
        key: EdgeKey,
        player: &str,
        size: f64,
        hinted: bool,
        tile_count: usize,
        params: &ConsensusParams,
    ) -> VoteOutcome {
        match self.edges.get_mut(&key) {
            Some(edge) => {
                let prior_size = if let Some(w) = edge.supporters.get(player) {
                    *w
                } else if let Some(w) = edge.opposers.get(player) {
                    -*w
                } else {
                    0.0
                };

                if size > 0.0 {
                    edge.opposers.remove(player);
                    edge.supporters.insert(
                        player.to_string(),
                        support_contribution(size, hinted, tile_count, params),
                    );
                } else {
                    edge.supporters.remove(player);
                    edge.opposers
                        .insert(player.to_string(), oppose_contribution(size, tile_count));
                }

                VoteOutcome {
                    prior_size,
                    created: false,
                }
            }
            None => {
                let mut supporters = BTreeMap::new();
                let mut opposers = BTreeMap::new();
                let mut weight = 0.0;
                if size > 0.0 {
                    let w = support_contribution(size, hinted, tile_count, params);
                    supporters.insert(player.to_string(), w);
                    weight += w;
                } else {
                    opposers.insert(player.to_string(), oppose_contribution(size, tile_count));
                }
                self.edges.insert(
                    key,
                    Edge {
                        key,
                        supporters,
                        opposers,
                        confidence: 1.0,
                        weight,
                    },
                );
                VoteOutcome {
                    prior_size: 0.0,
                    created: true,
                }
            }
        }
    }

    /// Recompute weight and confidence for every edge.
    ///
    /// Run once per vote batch, after all of the batch's deltas landed.
    pub fn recompute_all(&mut self) {
        for edge in self.edges.values_mut() {
            edge.recompute();
        }
    }
}
