//! Per-player contribution shares.
//!
//! Rewards the players whose votes actually back the current sure
//! hints: for every hinted slot each supporter of the backing edge
//! earns their fraction of the edge's weight, normalized over the hint
//! count so the shares sum to 1.

use std::collections::BTreeMap;

use tessera_grid::Direction;

use crate::{HintIndex, PlayerId};

fn five_decimals(v: f64) -> f64 {
    (v * 100_000.0).round() / 100_000.0
}

/// Split one unit of credit among the supporters of the hinted edges.
///
/// Shares are rounded to five decimals and the rounding residual is
/// folded into the last player in iteration order, so the map sums to
/// exactly 1. No sure hints yields an empty map.
pub fn hint_contributions(index: &HintIndex) -> BTreeMap<PlayerId, f64> {
    let mut shares: BTreeMap<PlayerId, f64> = BTreeMap::new();
    let mut hint_count = 0usize;

    for tile in 0..index.tile_count() {
        for dir in Direction::ALL {
            let Some(neighbor) = index.sure_hints()[tile][dir.index()] else {
                continue;
            };
            let Some(candidate) = index.candidate(tile, dir, neighbor) else {
                continue;
            };
            let edge = &candidate.edge;
            if edge.weight <= 0.0 {
                continue;
            }
            hint_count += 1;
            for (player, weight) in &edge.supporters {
                *shares.entry(player.clone()).or_insert(0.0) += weight / edge.weight;
            }
        }
    }

    if hint_count == 0 {
        return shares;
    }

    let mut sum = 0.0;
    let mut last: Option<PlayerId> = None;
    for (player, share) in shares.iter_mut() {
        *share = five_decimals(*share / hint_count as f64);
        sum += *share;
        last = Some(player.clone());
    }
    if let Some(last) = last {
        *shares.get_mut(&last).unwrap() += 1.0 - sum;
    }

    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConsensusParams, HintIndex, Ledger};
    use tessera_grid::EdgeKey;

    #[test]
    fn empty_index_yields_no_shares() {
        let index = HintIndex::new(4);
        assert!(hint_contributions(&index).is_empty());
    }

    #[test]
    fn shares_sum_to_one() {
        let params = ConsensusParams::default();
        let mut ledger = Ledger::new();
        ledger.apply_vote(EdgeKey::horizontal(0, 1), "alice", 3.0, false, 4, &params);
        ledger.apply_vote(EdgeKey::horizontal(0, 1), "bob", 2.0, false, 4, &params);
        ledger.apply_vote(EdgeKey::vertical(0, 2), "carol", 2.0, false, 4, &params);
        ledger.recompute_all();

        let index = HintIndex::rebuild(4, &ledger, &params);
        let shares = hint_contributions(&index);

        let sum: f64 = shares.values().sum();
        assert!((sum - 1.0).abs() < 1e-12, "shares sum to {sum}");
        assert!(shares["alice"] > shares["bob"]);
        assert!(shares.contains_key("carol"));
    }

    #[test]
    fn sole_supporter_takes_everything() {
        let params = ConsensusParams::default();
        let mut ledger = Ledger::new();
        ledger.apply_vote(EdgeKey::horizontal(0, 1), "alice", 3.0, false, 4, &params);
        ledger.recompute_all();

        let index = HintIndex::rebuild(4, &ledger, &params);
        let shares = hint_contributions(&index);
        assert_eq!(shares.len(), 1);
        assert_eq!(shares["alice"], 1.0);
    }
}
