//! Stored record shapes.
//!
//! The action, telemetry, and merge-audit records are append-only and
//! immutable; the engine writes them and never reads them back (the
//! list accessors exist for analytics and tests).

use serde::{Deserialize, Serialize};
use tessera_consensus::{HintGrid, PlayerId, ProgressSnapshot, VoteEdge};
use tessera_grid::{EdgeKey, GridDims};

use crate::RoundId;

/// Durable per-round metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundMeta {
    pub round_id: RoundId,
    pub dims: GridDims,
    /// Players who joined this round.
    pub players: Vec<PlayerId>,
    /// How many players have completed the puzzle. Scoring stops once
    /// this is nonzero.
    pub solved_players: u32,
}

impl RoundMeta {
    /// Create metadata for a fresh round.
    pub fn new(round_id: RoundId, dims: GridDims) -> Self {
        Self {
            round_id,
            dims,
            players: Vec::new(),
            solved_players: 0,
        }
    }

    /// Whether the round is flagged solved.
    pub fn is_solved(&self) -> bool {
        self.solved_players > 0
    }
}

/// One player action, as received: the audit trail of the round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub round_id: RoundId,
    pub time_ms: u64,
    pub player: PlayerId,
    /// Whether the batch was made while following hints.
    pub hinted: bool,
    pub edges: Vec<VoteEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

/// One telemetry snapshot, written once per vote cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub round_id: RoundId,
    pub time_ms: u64,
    #[serde(flatten)]
    pub progress: ProgressSnapshot,
}

/// Audit record of one solver merge: the solver's edge list paired with
/// the live hints at merge time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeAuditRecord {
    pub round_id: RoundId,
    pub time_ms: u64,
    pub solver_edges: Vec<EdgeKey>,
    pub hints: HintGrid,
}
