//! The round service: every message the transport accepts lands here.
//!
//! Vote processing and hint generation for one round run under that
//! round's cache lock, covering the full read-ledger → apply-votes →
//! recompute → rebuild-index → write-ledger cycle. The rebuilt index is
//! staged and only committed to the cache once the ledger write
//! succeeded, so a storage failure leaves the in-memory state exactly
//! as it was.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tessera_consensus::{
    classify_vote, hint_contributions, merge_solver_edges, ConsensusParams, HintGrid, HintIndex,
    PlayerId, ProgressSnapshot, UnsureHint, VoteEdge,
};
use tessera_grid::EdgeKey;
use tessera_store::{
    ActionRecord, MergeAuditRecord, PeerEdges, RoundId, RoundMeta, SnapshotRecord, Storage,
};
use tracing::{debug, warn};

use crate::cache::{RoundCache, RoundState};
use crate::error::{Error, Result};

/// One player's vote batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteMessage {
    pub round_id: RoundId,
    pub player: PlayerId,
    /// Whether the batch was made while following hints.
    #[serde(default)]
    pub hinted: bool,
    pub edges: Vec<VoteEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

/// Hints returned to a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintsResponse {
    pub sure: HintGrid,
    pub unsure: Vec<UnsureHint>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The shared round service.
pub struct RoundService {
    storage: Arc<Storage>,
    cache: RoundCache,
    params: ConsensusParams,
}

impl RoundService {
    /// Create a service over opened storage.
    pub fn new(storage: Arc<Storage>, params: ConsensusParams) -> Self {
        Self {
            storage,
            cache: RoundCache::new(),
            params,
        }
    }

    /// The consensus parameters in force.
    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    /// Shared storage handle.
    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    fn require_round(&self, round_id: RoundId) -> Result<RoundMeta> {
        self.storage
            .get_round(round_id)?
            .ok_or_else(|| Error::NotFound(format!("round {round_id}")))
    }

    /// Process one vote batch.
    ///
    /// The session guard rejects players who never joined the round.
    /// Malformed edge deltas are dropped individually; the rest of the
    /// batch proceeds.
    pub async fn process_vote(&self, msg: VoteMessage) -> Result<()> {
        let meta = self.require_round(msg.round_id)?;
        if !meta.players.iter().any(|p| p == &msg.player) {
            return Err(Error::Forbidden(format!(
                "{} has not joined round {}",
                msg.player, msg.round_id
            )));
        }

        let dims = meta.dims;
        let solved = meta.is_solved();
        let time_ms = now_ms();

        // The audit trail is fire-and-forget: a failed append is logged
        // but does not hold up the cycle.
        if let Err(e) = self.storage.append_action(&ActionRecord {
            round_id: msg.round_id,
            time_ms,
            player: msg.player.clone(),
            hinted: msg.hinted,
            edges: msg.edges.clone(),
            log: msg.log.clone(),
        }) {
            warn!(round = msg.round_id, "failed to append action: {e}");
        }
        self.storage.add_participant(msg.round_id, &msg.player)?;

        let slot = self.cache.slot(msg.round_id).await;
        let mut guard = slot.lock().await;

        let mut ledger = self.storage.get_ledger(msg.round_id)?;

        for delta in &msg.edges {
            if !delta.validate(dims) {
                warn!(
                    round = msg.round_id,
                    player = %msg.player,
                    "rejecting malformed edge delta ({}, {})",
                    delta.x,
                    delta.y
                );
                continue;
            }
            let key = delta.key();

            self.track_peer_sets(msg.round_id, &msg.player, delta, key)?;

            let outcome = ledger.apply_vote(
                key,
                &msg.player,
                delta.size,
                delta.hinted,
                dims.tile_count(),
                &self.params,
            );

            if let Some(event) =
                classify_vote(solved, key, dims, delta.size, outcome.prior_size, delta.hinted)
            {
                self.storage
                    .incr_event(msg.round_id, event.kind(), &msg.player)?;
                self.storage
                    .incr_score(msg.round_id, &msg.player, event.score(&self.params))?;
                debug!(round = msg.round_id, player = %msg.player, event = event.kind(), "scored");
            }
        }

        ledger.recompute_all();

        // Stage the rebuilt index; commit only after the ledger landed.
        let index = HintIndex::rebuild(dims.tile_count(), &ledger, &self.params);

        if let Err(e) = self.storage.append_snapshot(&SnapshotRecord {
            round_id: msg.round_id,
            time_ms,
            progress: ProgressSnapshot::compute(&ledger, index.sure_hints(), dims),
        }) {
            warn!(round = msg.round_id, "failed to append snapshot: {e}");
        }

        self.storage.put_ledger(msg.round_id, &ledger)?;
        *guard = Some(RoundState { index });

        Ok(())
    }

    /// Maintain the per-player support/oppose edge sets and credit a
    /// hint's source player the first time another player follows (or
    /// abandons) it.
    fn track_peer_sets(
        &self,
        round_id: RoundId,
        player: &str,
        delta: &VoteEdge,
        key: EdgeKey,
    ) -> Result<()> {
        let credited_source = delta
            .from
            .as_deref()
            .filter(|from| delta.hinted && *from != player);

        if delta.size > 0.0 {
            let newly = self.storage.support_edge(round_id, player, key)?;
            if newly {
                if let Some(from) = credited_source {
                    self.storage.incr_hint_sup(round_id, from)?;
                }
            }
        } else {
            let was_supporting = self.storage.oppose_edge(round_id, player, key)?;
            if was_supporting {
                if let Some(from) = credited_source {
                    self.storage.incr_hint_opp(round_id, from)?;
                }
            }
        }
        Ok(())
    }

    /// Current hints for a round, building the index from the durable
    /// ledger on a cold cache. When a solver edge list is stored, the
    /// sure hints are the merged view and a merge-audit record is
    /// appended.
    pub async fn hints(&self, round_id: RoundId) -> Result<HintsResponse> {
        let meta = self.require_round(round_id)?;

        let slot = self.cache.slot(round_id).await;
        let mut guard = slot.lock().await;
        let state = match guard.as_mut() {
            Some(state) => state,
            None => {
                let ledger = self.storage.get_ledger(round_id)?;
                let index = HintIndex::rebuild(meta.dims.tile_count(), &ledger, &self.params);
                guard.insert(RoundState { index })
            }
        };

        let unsure = state.index.unsure_hints().to_vec();
        let sure = match self.storage.get_solver_edges(round_id)? {
            Some(solver_edges) => {
                let merged = merge_solver_edges(&solver_edges, state.index.sure_hints());
                if let Err(e) = self.storage.append_merge_audit(&MergeAuditRecord {
                    round_id,
                    time_ms: now_ms(),
                    solver_edges,
                    hints: state.index.sure_hints().clone(),
                }) {
                    warn!(round = round_id, "failed to append merge audit: {e}");
                }
                merged
            }
            None => state.index.sure_hints().clone(),
        };

        Ok(HintsResponse { sure, unsure })
    }

    /// Peer hint data from two sampled participants, the requester
    /// excluded. Fewer than two participants yields an empty list.
    pub async fn peer_hints(&self, round_id: RoundId, requester: &str) -> Result<Vec<PeerEdges>> {
        self.require_round(round_id)?;

        let players = self.storage.sample_participants(round_id, 2)?;
        if players.len() < 2 {
            return Ok(Vec::new());
        }

        let mut peers = Vec::new();
        for player in players {
            if player == requester {
                continue;
            }
            peers.push(self.storage.peer_edges(round_id, &player)?);
        }
        Ok(peers)
    }

    /// Store the solver's edge list for later merging into hint views.
    pub async fn solver_merge(&self, round_id: RoundId, edges: Vec<EdgeKey>) -> Result<()> {
        self.require_round(round_id)?;
        self.storage.put_solver_edges(round_id, &edges)?;
        Ok(())
    }

    /// Apply a vote batch to the solver-side ledger. Same arithmetic as
    /// the live ledger, but no scoring, no hint index, no session guard.
    pub async fn solver_vote(&self, msg: VoteMessage) -> Result<()> {
        let meta = self.require_round(msg.round_id)?;
        let dims = meta.dims;

        let slot = self.cache.slot(msg.round_id).await;
        let _guard = slot.lock().await;

        let mut ledger = self.storage.get_solver_ledger(msg.round_id)?;
        for delta in &msg.edges {
            if !delta.validate(dims) {
                continue;
            }
            ledger.apply_vote(
                delta.key(),
                &msg.player,
                delta.size,
                delta.hinted,
                dims.tile_count(),
                &self.params,
            );
        }
        ledger.recompute_all();
        self.storage.put_solver_ledger(msg.round_id, &ledger)?;
        Ok(())
    }

    /// Per-player contribution shares over the current sure hints.
    pub async fn contributions(
        &self,
        round_id: RoundId,
    ) -> Result<std::collections::BTreeMap<PlayerId, f64>> {
        let meta = self.require_round(round_id)?;

        let slot = self.cache.slot(round_id).await;
        let mut guard = slot.lock().await;
        let state = match guard.as_mut() {
            Some(state) => state,
            None => {
                let ledger = self.storage.get_ledger(round_id)?;
                let index = HintIndex::rebuild(meta.dims.tile_count(), &ledger, &self.params);
                guard.insert(RoundState { index })
            }
        };

        Ok(hint_contributions(&state.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tessera_grid::{Direction, GridDims, Orientation};

    fn service() -> (tempfile::TempDir, Arc<RoundService>) {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::open(dir.path()).unwrap());
        let service = Arc::new(RoundService::new(storage, ConsensusParams::default()));
        (dir, service)
    }

    fn seed_round(service: &RoundService, round_id: RoundId, players: &[&str]) {
        service
            .storage()
            .put_round(&RoundMeta::new(round_id, GridDims::new(2, 2)))
            .unwrap();
        for p in players {
            service.storage().join_round(round_id, p).unwrap();
        }
    }

    fn vote(round_id: RoundId, player: &str, x: usize, y: usize, size: f64) -> VoteMessage {
        VoteMessage {
            round_id,
            player: player.into(),
            hinted: false,
            edges: vec![VoteEdge {
                x,
                y,
                orientation: Orientation::Horizontal,
                size,
                hinted: false,
                from: None,
            }],
            log: None,
        }
    }

    #[tokio::test]
    async fn vote_then_hints_round_trip() {
        let (_dir, service) = service();
        seed_round(&service, 1, &["alice"]);

        service.process_vote(vote(1, "alice", 0, 1, 3.0)).await.unwrap();

        let hints = service.hints(1).await.unwrap();
        assert_eq!(hints.sure[0][Direction::Right.index()], Some(1));
        assert_eq!(hints.sure[1][Direction::Left.index()], Some(0));
        assert!(hints.unsure.is_empty());
    }

    #[tokio::test]
    async fn vote_requires_joined_player() {
        let (_dir, service) = service();
        seed_round(&service, 1, &["alice"]);

        let err = service.process_vote(vote(1, "mallory", 0, 1, 3.0)).await;
        assert!(matches!(err, Err(Error::Forbidden(_))));
    }

    #[tokio::test]
    async fn unknown_round_is_reported_not_created() {
        let (_dir, service) = service();

        assert!(matches!(
            service.process_vote(vote(9, "alice", 0, 1, 3.0)).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(service.hints(9).await, Err(Error::NotFound(_))));
        assert!(service.storage().get_round(9).unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_deltas_are_skipped_but_batch_continues() {
        let (_dir, service) = service();
        seed_round(&service, 1, &["alice"]);

        let mut msg = vote(1, "alice", 0, 1, 3.0);
        msg.edges.insert(
            0,
            VoteEdge {
                x: 0,
                y: 42, // off the 2x2 grid
                orientation: Orientation::Horizontal,
                size: 2.0,
                hinted: false,
                from: None,
            },
        );
        service.process_vote(msg).await.unwrap();

        let hints = service.hints(1).await.unwrap();
        assert_eq!(hints.sure[0][Direction::Right.index()], Some(1));
        let ledger = service.storage().get_ledger(1).unwrap();
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn scoring_awards_first_correct_create_once() {
        let (_dir, service) = service();
        seed_round(&service, 1, &["alice"]);

        service.process_vote(vote(1, "alice", 0, 1, 3.0)).await.unwrap();
        service.process_vote(vote(1, "alice", 0, 1, 3.0)).await.unwrap();

        let expected = service.params().create_correct_link_score;
        assert_eq!(service.storage().get_score(1, "alice").unwrap(), expected);
        assert_eq!(
            service.storage().leaderboard(1).unwrap(),
            vec![("alice".to_string(), expected)]
        );
    }

    #[tokio::test]
    async fn solved_round_stops_scoring() {
        let (_dir, service) = service();
        seed_round(&service, 1, &["alice"]);
        service.storage().incr_solved(1).unwrap();

        service.process_vote(vote(1, "alice", 0, 1, 3.0)).await.unwrap();
        assert_eq!(service.storage().get_score(1, "alice").unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_votes_both_land() {
        let (_dir, service) = service();
        seed_round(&service, 1, &["alice", "bob"]);

        let a = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.process_vote(vote(1, "alice", 0, 1, 3.0)).await })
        };
        let b = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.process_vote(vote(1, "bob", 2, 3, 2.0)).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let ledger = service.storage().get_ledger(1).unwrap();
        assert_eq!(ledger.len(), 2, "a vote was lost");
        assert!(ledger.get(&EdgeKey::horizontal(0, 1)).is_some());
        assert!(ledger.get(&EdgeKey::horizontal(2, 3)).is_some());
    }

    #[tokio::test]
    async fn solver_merge_filters_hints_without_touching_ledger() {
        let (_dir, service) = service();
        seed_round(&service, 1, &["alice"]);

        service.process_vote(vote(1, "alice", 0, 1, 3.0)).await.unwrap();
        let ledger_before = service.storage().get_ledger(1).unwrap();

        // Solver confirms the hinted edge.
        service
            .solver_merge(1, vec![EdgeKey::horizontal(0, 1)])
            .await
            .unwrap();
        let hints = service.hints(1).await.unwrap();
        assert_eq!(hints.sure[0][Direction::Right.index()], Some(1));

        // An empty solver list blanks the merged view entirely.
        service.solver_merge(1, vec![]).await.unwrap();
        let hints = service.hints(1).await.unwrap();
        assert!(hints.sure.iter().all(|s| s.iter().all(Option::is_none)));

        assert_eq!(service.storage().get_ledger(1).unwrap(), ledger_before);
        assert!(!service.storage().list_merge_audits(1).unwrap().is_empty());
    }

    #[tokio::test]
    async fn peer_hints_need_two_participants() {
        let (_dir, service) = service();
        seed_round(&service, 1, &["alice", "bob", "carol"]);

        service.process_vote(vote(1, "alice", 0, 1, 3.0)).await.unwrap();
        assert!(service.peer_hints(1, "bob").await.unwrap().is_empty());

        service.process_vote(vote(1, "bob", 2, 3, 2.0)).await.unwrap();
        let peers = service.peer_hints(1, "carol").await.unwrap();
        assert_eq!(peers.len(), 2);
        for peer in &peers {
            assert_ne!(peer.player, "carol");
            assert_eq!(peer.edges.len(), 1);
        }
    }

    #[tokio::test]
    async fn hint_source_credited_once_per_follower() {
        let (_dir, service) = service();
        seed_round(&service, 1, &["alice", "bob"]);

        let mut msg = vote(1, "bob", 0, 1, 3.0);
        msg.edges[0].hinted = true;
        msg.edges[0].from = Some("alice".into());
        service.process_vote(msg.clone()).await.unwrap();
        // Repeat vote: membership did not transition, no extra credit.
        service.process_vote(msg).await.unwrap();

        let peer = service.storage().peer_edges(1, "alice").unwrap();
        assert_eq!(peer.hint_sup, 1);

        // Bob abandons the hinted edge: alice is debited once.
        let mut msg = vote(1, "bob", 0, 1, -3.0);
        msg.edges[0].hinted = true;
        msg.edges[0].from = Some("alice".into());
        service.process_vote(msg.clone()).await.unwrap();
        service.process_vote(msg).await.unwrap();

        let peer = service.storage().peer_edges(1, "alice").unwrap();
        assert_eq!(peer.hint_opp, 1);
    }

    #[tokio::test]
    async fn cold_cache_rebuilds_from_durable_ledger() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::open(dir.path()).unwrap());

        {
            let service = Arc::new(RoundService::new(
                Arc::clone(&storage),
                ConsensusParams::default(),
            ));
            seed_round(&service, 1, &["alice"]);
            service.process_vote(vote(1, "alice", 0, 1, 3.0)).await.unwrap();
        }

        // Fresh service over the same storage: no warm cache.
        let service = RoundService::new(storage, ConsensusParams::default());
        let hints = service.hints(1).await.unwrap();
        assert_eq!(hints.sure[0][Direction::Right.index()], Some(1));
    }

    #[tokio::test]
    async fn solver_vote_feeds_separate_ledger() {
        let (_dir, service) = service();
        seed_round(&service, 1, &["alice"]);

        service.solver_vote(vote(1, "solver", 0, 1, 3.0)).await.unwrap();

        assert!(service.storage().get_ledger(1).unwrap().is_empty());
        let ga = service.storage().get_solver_ledger(1).unwrap();
        assert_eq!(ga.len(), 1);
        // No scoring on the solver path.
        assert_eq!(service.storage().get_score(1, "solver").unwrap(), 0);
    }
}
