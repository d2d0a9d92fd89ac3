//! Process-wide consensus tunables.
//!
//! These are deployment knobs, not per-round state: every round served by
//! a node shares one set of parameters.

use serde::{Deserialize, Serialize};

/// Tunable policy for the consensus and scoring arithmetic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Damping applied to a supporting contribution made while following
    /// a hint. Hint-followers echo the consensus rather than adding
    /// independent evidence, so their support counts for less.
    pub hint_decay: f64,

    /// Minimum edge confidence for the edge to enter the hint index.
    pub min_confidence: f64,

    /// Minimum number of distinct supporters for the edge to enter the
    /// hint index.
    pub min_supporters: usize,

    /// Tie band for unsure-hint detection: a rival candidate within
    /// `max_confidence * (1 - unsure_epsilon)` demotes the sure hint.
    pub unsure_epsilon: f64,

    /// Score awarded for creating a geometrically correct link.
    pub create_correct_link_score: i64,
    /// Score for removing a correct link.
    pub remove_correct_link_score: i64,
    /// Score for creating a wrong link.
    pub create_wrong_link_score: i64,
    /// Score for removing a wrong link.
    pub remove_wrong_link_score: i64,
    /// Score for removing a wrong link that the consensus had hinted -
    /// the one hinted action that earns points, since it corrects a bad
    /// hint.
    pub remove_hinted_wrong_link_score: i64,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            hint_decay: 0.9,
            min_confidence: 0.5,
            min_supporters: 1,
            unsure_epsilon: 0.05,
            create_correct_link_score: 2,
            remove_correct_link_score: -2,
            create_wrong_link_score: -1,
            remove_wrong_link_score: 1,
            remove_hinted_wrong_link_score: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let p = ConsensusParams::default();
        assert!(p.hint_decay > 0.0 && p.hint_decay <= 1.0);
        assert!(p.min_confidence >= 0.0 && p.min_confidence <= 1.0);
        assert!(p.min_supporters >= 1);
        assert!(p.unsure_epsilon > 0.0 && p.unsure_epsilon < 1.0);
    }
}
