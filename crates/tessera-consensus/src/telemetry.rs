//! Round-progress telemetry.
//!
//! Computed once per vote cycle and appended to durable storage for
//! downstream analytics. The engine never reads these back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tessera_grid::{Direction, EdgeKey, GridDims};

use crate::{HintGrid, Ledger};

/// Compressed per-edge stats for a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeBrief {
    /// Supporting weight, two decimals.
    pub wp: f64,
    /// Opposing weight, two decimals.
    pub wn: f64,
    /// Supporter count.
    pub s_len: usize,
    /// Opposer count.
    pub o_len: usize,
}

/// One telemetry snapshot ("center of gravity" of the round).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Links a solved puzzle of these dimensions has.
    pub total_links: usize,
    /// Edges materialized in the ledger.
    pub complete_links: usize,
    /// Materialized edges that are geometrically correct.
    pub correct_links: usize,
    /// Sure hints that point at the geometrically correct neighbor.
    pub correct_hints: usize,
    /// Per-edge brief stats, keyed by wire edge key.
    pub edges: BTreeMap<EdgeKey, EdgeBrief>,
}

fn two_decimals(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl ProgressSnapshot {
    /// Compute a snapshot from the current ledger and sure hints.
    pub fn compute(ledger: &Ledger, hints: &HintGrid, dims: GridDims) -> Self {
        let correct_links = ledger
            .edges
            .values()
            .filter(|e| e.key.is_correct(dims))
            .count();

        let edges = ledger
            .edges
            .values()
            .map(|edge| {
                let wp = edge.weight;
                // Opposing weight falls out of the confidence ratio when
                // it is nonzero; otherwise sum the opposers directly.
                let wn = if edge.confidence > 0.0 {
                    wp / edge.confidence - wp
                } else {
                    edge.oppose_weight()
                };
                (
                    edge.key,
                    EdgeBrief {
                        wp: two_decimals(wp),
                        wn: two_decimals(wn),
                        s_len: edge.supporters.len(),
                        o_len: edge.opposers.len(),
                    },
                )
            })
            .collect();

        let mut correct_hints = 0;
        for (tile, slots) in hints.iter().enumerate() {
            for dir in Direction::ALL {
                if let Some(neighbor) = dims.neighbor(tile, dir) {
                    if slots[dir.index()] == Some(neighbor) {
                        correct_hints += 1;
                    }
                }
            }
        }

        Self {
            total_links: dims.total_links(),
            complete_links: ledger.len(),
            correct_links,
            correct_hints,
            edges,
        }
    }
}
