//! Scoring rules.
//!
//! A vote is scored against the ledger state *before* it landed: only a
//! sign crossing of the player's stance triggers an event, so repeating
//! the same vote scores nothing. Solved rounds never score.

use tessera_grid::{EdgeKey, GridDims};

use crate::ConsensusParams;

/// The five mutually exclusive score events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreEvent {
    CreateCorrectLink,
    RemoveCorrectLink,
    CreateWrongLink,
    RemoveWrongLink,
    /// Removing a wrong link the consensus had hinted - the one hinted
    /// action that earns points.
    RemoveHintedWrongLink,
}

impl ScoreEvent {
    /// Stable identifier used for per-event leaderboard counters.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CreateCorrectLink => "create_correct_link",
            Self::RemoveCorrectLink => "remove_correct_link",
            Self::CreateWrongLink => "create_wrong_link",
            Self::RemoveWrongLink => "remove_wrong_link",
            Self::RemoveHintedWrongLink => "remove_hinted_wrong_link",
        }
    }

    /// Score delta for this event.
    pub const fn score(&self, params: &ConsensusParams) -> i64 {
        match self {
            Self::CreateCorrectLink => params.create_correct_link_score,
            Self::RemoveCorrectLink => params.remove_correct_link_score,
            Self::CreateWrongLink => params.create_wrong_link_score,
            Self::RemoveWrongLink => params.remove_wrong_link_score,
            Self::RemoveHintedWrongLink => params.remove_hinted_wrong_link_score,
        }
    }
}

/// Classify one vote into at most one score event.
///
/// `prior_size` is the player's stance before the vote, as returned by
/// [`crate::Ledger::apply_vote`]: positive if they supported, negative
/// if they opposed, zero if absent.
pub fn classify_vote(
    solved: bool,
    key: EdgeKey,
    dims: GridDims,
    size: f64,
    prior_size: f64,
    hinted: bool,
) -> Option<ScoreEvent> {
    if solved {
        return None;
    }
    let correct = key.is_correct(dims);

    if !hinted && correct && size > 0.0 && prior_size <= 0.0 {
        Some(ScoreEvent::CreateCorrectLink)
    } else if !hinted && correct && size < 0.0 && prior_size >= 0.0 {
        Some(ScoreEvent::RemoveCorrectLink)
    } else if !hinted && !correct && size > 0.0 && prior_size <= 0.0 {
        Some(ScoreEvent::CreateWrongLink)
    } else if !hinted && !correct && size < 0.0 && prior_size >= 0.0 {
        Some(ScoreEvent::RemoveWrongLink)
    } else if hinted && !correct && size < 0.0 && prior_size >= 0.0 {
        Some(ScoreEvent::RemoveHintedWrongLink)
    } else {
        None
    }
}
