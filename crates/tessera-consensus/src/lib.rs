//! Tessera Consensus Core
//!
//! Fuses many players' independent, noisy link proposals into one shared
//! belief about which tiles are adjacent, and turns that belief back into
//! per-tile hints.
//!
//! # Pipeline
//!
//! 1. A vote lands in the [`Ledger`]: the player's contribution moves to
//!    the supporting or opposing side of the edge and the edge's
//!    confidence is recomputed.
//! 2. The [`HintIndex`] is refreshed from the ledger: every edge clearing
//!    the confidence and supporter-count thresholds is indexed at both
//!    endpoints' mirrored directional slots.
//! 3. Per slot, the strongest candidate becomes the sure hint; slots
//!    whose top candidates sit inside the epsilon band are demoted to
//!    "unsure" and ranked by contested weight.
//!
//! All arithmetic is pure and map iteration is ordered, so replaying an
//! identical vote sequence reproduces the ledger bit for bit.

mod contribution;
mod edge;
mod hints;
mod merge;
mod params;
mod scoring;
mod telemetry;
mod vote;

pub use contribution::hint_contributions;
pub use edge::{Edge, Ledger, VoteOutcome};
pub use hints::{Candidate, DirectionSlot, HintGrid, HintIndex, UnsureHint};
pub use merge::merge_solver_edges;
pub use params::ConsensusParams;
pub use scoring::{classify_vote, ScoreEvent};
pub use telemetry::{EdgeBrief, ProgressSnapshot};
pub use vote::VoteEdge;

/// Player identifier, as carried by the transport layer.
pub type PlayerId = String;
