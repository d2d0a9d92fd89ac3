//! External-solver merge.
//!
//! An external solver periodically produces a higher-confidence edge
//! list. Merging it against the live hints yields a *view*: an edge is
//! confirmed only where the solver and the consensus already agree at
//! both endpoints, everything else stays blank. The ledger is never
//! touched.

use tessera_grid::EdgeKey;

use crate::HintGrid;

/// Intersect a solver edge list with the live sure hints.
///
/// The result has the same shape as `hints`, starts all-`None`, and
/// confirms an edge at both endpoints only when both mirrored hint
/// slots already name each other.
pub fn merge_solver_edges(solver_edges: &[EdgeKey], hints: &HintGrid) -> HintGrid {
    let mut merged: HintGrid = vec![[None; 4]; hints.len()];

    for key in solver_edges {
        let (x, y) = (key.x, key.y);
        if x >= hints.len() || y >= hints.len() {
            continue;
        }
        let (dx, dy) = key.slots();
        if hints[x][dx.index()] == Some(y) && hints[y][dy.index()] == Some(x) {
            merged[x][dx.index()] = Some(y);
            merged[y][dy.index()] = Some(x);
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_grid::Direction;

    fn hints_2x2() -> HintGrid {
        let mut hints: HintGrid = vec![[None; 4]; 4];
        hints[0][Direction::Right.index()] = Some(1);
        hints[1][Direction::Left.index()] = Some(0);
        hints[0][Direction::Down.index()] = Some(2);
        // Tile 2 does not reciprocate: 2's Up slot is empty.
        hints
    }

    #[test]
    fn confirms_only_symmetric_agreement() {
        let hints = hints_2x2();
        let merged = merge_solver_edges(
            &[EdgeKey::horizontal(0, 1), EdgeKey::vertical(0, 2)],
            &hints,
        );

        assert_eq!(merged[0][Direction::Right.index()], Some(1));
        assert_eq!(merged[1][Direction::Left.index()], Some(0));
        // One-sided agreement is not confirmed.
        assert_eq!(merged[0][Direction::Down.index()], None);
        assert_eq!(merged[2][Direction::Up.index()], None);
    }

    #[test]
    fn empty_solver_list_yields_blank_view() {
        let hints = hints_2x2();
        let merged = merge_solver_edges(&[], &hints);
        assert!(merged.iter().all(|slots| slots.iter().all(Option::is_none)));
    }

    #[test]
    fn merge_does_not_touch_live_hints() {
        let hints = hints_2x2();
        let before = hints.clone();
        let _ = merge_solver_edges(&[EdgeKey::horizontal(0, 1)], &hints);
        assert_eq!(hints, before);
    }

    #[test]
    fn out_of_range_solver_edges_are_skipped() {
        let hints = hints_2x2();
        let merged = merge_solver_edges(&[EdgeKey::horizontal(7, 8)], &hints);
        assert!(merged.iter().all(|slots| slots.iter().all(Option::is_none)));
    }
}
