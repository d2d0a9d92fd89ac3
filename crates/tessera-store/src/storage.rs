//! Persistent storage using RocksDB.

use std::path::Path;
use std::sync::Mutex;

use rand::seq::SliceRandom;
use rocksdb::{Options, DB};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tessera_consensus::{Ledger, PlayerId};
use tessera_grid::EdgeKey;

use crate::error::Result;
use crate::records::{ActionRecord, MergeAuditRecord, RoundMeta, SnapshotRecord};
use crate::RoundId;

/// A sampled peer's hint data: their hint-flip credits and the edges
/// they currently support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerEdges {
    pub player: PlayerId,
    /// Supports this player's hints triggered in other players.
    pub hint_sup: i64,
    /// Opposes this player's hints triggered in other players.
    pub hint_opp: i64,
    pub edges: Vec<EdgeKey>,
}

/// Storage backend for round data.
///
/// Counter updates are read-modify-write serialized by an internal
/// mutex; everything else relies on RocksDB's own write atomicity.
pub struct Storage {
    db: DB,
    counter_lock: Mutex<()>,
}

impl Storage {
    /// Open or create storage at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self {
            db,
            counter_lock: Mutex::new(()),
        })
    }

    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.db.put(key.as_bytes(), bytes)?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.db.get(key.as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn list_json<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>> {
        let mut out = Vec::new();
        let iter = self.db.prefix_iterator(prefix.as_bytes());
        for item in iter {
            let (key, value) = item?;
            if key.starts_with(prefix.as_bytes()) {
                out.push(serde_json::from_slice(&value)?);
            } else {
                break;
            }
        }
        Ok(out)
    }

    /// Keys under a prefix, with the prefix stripped.
    fn list_suffixes(&self, prefix: &str) -> Result<Vec<String>> {
        let mut out = Vec::new();
        let iter = self.db.prefix_iterator(prefix.as_bytes());
        for item in iter {
            let (key, _) = item?;
            if key.starts_with(prefix.as_bytes()) {
                let key_str = String::from_utf8_lossy(&key);
                if let Some(suffix) = key_str.strip_prefix(prefix) {
                    out.push(suffix.to_string());
                }
            } else {
                break;
            }
        }
        Ok(out)
    }

    /// Atomically add to a counter, returning the new value.
    fn incr_counter(&self, key: &str, delta: i64) -> Result<i64> {
        let _guard = self.counter_lock.lock().expect("counter lock poisoned");
        let current: i64 = self.get_json(key)?.unwrap_or(0);
        let next = current + delta;
        self.put_json(key, &next)?;
        Ok(next)
    }

    fn read_counter(&self, key: &str) -> Result<i64> {
        Ok(self.get_json(key)?.unwrap_or(0))
    }

    // --- Rounds ---

    /// Store round metadata.
    pub fn put_round(&self, meta: &RoundMeta) -> Result<()> {
        self.put_json(&format!("round:{}", meta.round_id), meta)
    }

    /// Get round metadata.
    pub fn get_round(&self, round_id: RoundId) -> Result<Option<RoundMeta>> {
        self.get_json(&format!("round:{round_id}"))
    }

    /// Add a player to a round. Returns false if the round is unknown.
    pub fn join_round(&self, round_id: RoundId, player: &str) -> Result<bool> {
        let Some(mut meta) = self.get_round(round_id)? else {
            return Ok(false);
        };
        if !meta.players.iter().any(|p| p == player) {
            meta.players.push(player.to_string());
            self.put_round(&meta)?;
        }
        Ok(true)
    }

    /// Whether a player has joined a round.
    pub fn has_joined(&self, round_id: RoundId, player: &str) -> Result<bool> {
        Ok(self
            .get_round(round_id)?
            .is_some_and(|meta| meta.players.iter().any(|p| p == player)))
    }

    /// Flag one more player as having solved the round.
    pub fn incr_solved(&self, round_id: RoundId) -> Result<()> {
        let _guard = self.counter_lock.lock().expect("counter lock poisoned");
        if let Some(mut meta) = self.get_round(round_id)? {
            meta.solved_players += 1;
            self.put_round(&meta)?;
        }
        Ok(())
    }

    // --- Ledger blobs ---

    /// Load a round's edge ledger; an absent blob is an empty ledger.
    pub fn get_ledger(&self, round_id: RoundId) -> Result<Ledger> {
        Ok(self
            .get_json(&format!("round:{round_id}:edges"))?
            .unwrap_or_default())
    }

    /// Persist a round's edge ledger.
    pub fn put_ledger(&self, round_id: RoundId, ledger: &Ledger) -> Result<()> {
        self.put_json(&format!("round:{round_id}:edges"), ledger)
    }

    /// Load the solver-side ledger.
    pub fn get_solver_ledger(&self, round_id: RoundId) -> Result<Ledger> {
        Ok(self
            .get_json(&format!("round:{round_id}:edges:ga"))?
            .unwrap_or_default())
    }

    /// Persist the solver-side ledger.
    pub fn put_solver_ledger(&self, round_id: RoundId, ledger: &Ledger) -> Result<()> {
        self.put_json(&format!("round:{round_id}:edges:ga"), ledger)
    }

    /// Store the latest solver edge list for a round.
    pub fn put_solver_edges(&self, round_id: RoundId, edges: &[EdgeKey]) -> Result<()> {
        self.put_json(&format!("round:{round_id}:ga"), &edges)
    }

    /// The latest solver edge list, if any was uploaded.
    pub fn get_solver_edges(&self, round_id: RoundId) -> Result<Option<Vec<EdgeKey>>> {
        self.get_json(&format!("round:{round_id}:ga"))
    }

    // --- Append-only records ---

    fn next_seq(&self, round_id: RoundId) -> Result<u64> {
        Ok(self.incr_counter(&format!("seq:{round_id}"), 1)? as u64)
    }

    /// Append an action record.
    pub fn append_action(&self, record: &ActionRecord) -> Result<()> {
        let seq = self.next_seq(record.round_id)?;
        self.put_json(&format!("action:{}:{seq:020}", record.round_id), record)
    }

    /// Append a telemetry snapshot.
    pub fn append_snapshot(&self, record: &SnapshotRecord) -> Result<()> {
        let seq = self.next_seq(record.round_id)?;
        self.put_json(&format!("cog:{}:{seq:020}", record.round_id), record)
    }

    /// Append a solver-merge audit record.
    pub fn append_merge_audit(&self, record: &MergeAuditRecord) -> Result<()> {
        let seq = self.next_seq(record.round_id)?;
        self.put_json(&format!("diff:{}:{seq:020}", record.round_id), record)
    }

    /// All action records of a round, in append order.
    pub fn list_actions(&self, round_id: RoundId) -> Result<Vec<ActionRecord>> {
        self.list_json(&format!("action:{round_id}:"))
    }

    /// All telemetry snapshots of a round, in append order.
    pub fn list_snapshots(&self, round_id: RoundId) -> Result<Vec<SnapshotRecord>> {
        self.list_json(&format!("cog:{round_id}:"))
    }

    /// All merge-audit records of a round, in append order.
    pub fn list_merge_audits(&self, round_id: RoundId) -> Result<Vec<MergeAuditRecord>> {
        self.list_json(&format!("diff:{round_id}:"))
    }

    // --- Leaderboard counters ---

    /// Add to a player's overall round score, returning the new total.
    pub fn incr_score(&self, round_id: RoundId, player: &str, delta: i64) -> Result<i64> {
        self.incr_counter(&format!("score:{round_id}:{player}"), delta)
    }

    /// Count one score event of a given kind for a player.
    pub fn incr_event(&self, round_id: RoundId, kind: &str, player: &str) -> Result<i64> {
        self.incr_counter(&format!("scoreev:{round_id}:{kind}:{player}"), 1)
    }

    /// A player's overall round score.
    pub fn get_score(&self, round_id: RoundId, player: &str) -> Result<i64> {
        self.read_counter(&format!("score:{round_id}:{player}"))
    }

    /// The round leaderboard, descending by score.
    pub fn leaderboard(&self, round_id: RoundId) -> Result<Vec<(PlayerId, i64)>> {
        let prefix = format!("score:{round_id}:");
        let mut board = Vec::new();
        for player in self.list_suffixes(&prefix)? {
            let score = self.read_counter(&format!("{prefix}{player}"))?;
            board.push((player, score));
        }
        board.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(board)
    }

    // --- Distributed hint exchange ---

    /// Register a player as a round participant.
    pub fn add_participant(&self, round_id: RoundId, player: &str) -> Result<()> {
        self.db
            .put(format!("peer:{round_id}:{player}").as_bytes(), b"1")?;
        Ok(())
    }

    /// Sample up to `n` distinct participants of a round.
    pub fn sample_participants(&self, round_id: RoundId, n: usize) -> Result<Vec<PlayerId>> {
        let members = self.list_suffixes(&format!("peer:{round_id}:"))?;
        let mut rng = rand::thread_rng();
        Ok(members.choose_multiple(&mut rng, n).cloned().collect())
    }

    /// Move an edge into a player's supported set (and out of the
    /// opposed set). Returns true when the edge was newly supported.
    pub fn support_edge(&self, round_id: RoundId, player: &str, edge: EdgeKey) -> Result<bool> {
        let sup = format!("sup:{round_id}:{player}:{edge}");
        let opp = format!("opp:{round_id}:{player}:{edge}");
        let added = self.db.get(sup.as_bytes())?.is_none();
        self.db.put(sup.as_bytes(), b"1")?;
        self.db.delete(opp.as_bytes())?;
        Ok(added)
    }

    /// Move an edge into a player's opposed set (and out of the
    /// supported set). Returns true when the edge had been supported.
    pub fn oppose_edge(&self, round_id: RoundId, player: &str, edge: EdgeKey) -> Result<bool> {
        let sup = format!("sup:{round_id}:{player}:{edge}");
        let opp = format!("opp:{round_id}:{player}:{edge}");
        let removed = self.db.get(sup.as_bytes())?.is_some();
        self.db.delete(sup.as_bytes())?;
        self.db.put(opp.as_bytes(), b"1")?;
        Ok(removed)
    }

    /// The edges a player currently supports.
    pub fn supported_edges(&self, round_id: RoundId, player: &str) -> Result<Vec<EdgeKey>> {
        let mut edges = Vec::new();
        for suffix in self.list_suffixes(&format!("sup:{round_id}:{player}:"))? {
            if let Ok(key) = suffix.parse() {
                edges.push(key);
            }
        }
        Ok(edges)
    }

    /// Credit a hint provider: another player's first support of one of
    /// their hinted edges.
    pub fn incr_hint_sup(&self, round_id: RoundId, player: &str) -> Result<i64> {
        self.incr_counter(&format!("hintsup:{round_id}:{player}"), 1)
    }

    /// Debit a hint provider: another player's first withdrawal of one
    /// of their hinted edges.
    pub fn incr_hint_opp(&self, round_id: RoundId, player: &str) -> Result<i64> {
        self.incr_counter(&format!("hintopp:{round_id}:{player}"), 1)
    }

    /// A sampled peer's hint data.
    pub fn peer_edges(&self, round_id: RoundId, player: &str) -> Result<PeerEdges> {
        Ok(PeerEdges {
            player: player.to_string(),
            hint_sup: self.read_counter(&format!("hintsup:{round_id}:{player}"))?,
            hint_opp: self.read_counter(&format!("hintopp:{round_id}:{player}"))?,
            edges: self.supported_edges(round_id, player)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tessera_consensus::ConsensusParams;
    use tessera_grid::GridDims;

    fn open() -> (tempfile::TempDir, Storage) {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        (dir, storage)
    }

    #[test]
    fn round_meta_roundtrip() {
        let (_dir, storage) = open();
        let meta = RoundMeta::new(7, GridDims::new(3, 3));
        storage.put_round(&meta).unwrap();
        assert_eq!(storage.get_round(7).unwrap().unwrap(), meta);
        assert!(storage.get_round(8).unwrap().is_none());
    }

    #[test]
    fn join_round_is_idempotent() {
        let (_dir, storage) = open();
        storage.put_round(&RoundMeta::new(1, GridDims::new(2, 2))).unwrap();

        assert!(storage.join_round(1, "alice").unwrap());
        assert!(storage.join_round(1, "alice").unwrap());
        assert_eq!(storage.get_round(1).unwrap().unwrap().players, vec!["alice"]);

        assert!(storage.has_joined(1, "alice").unwrap());
        assert!(!storage.has_joined(1, "bob").unwrap());
        // Unknown round: no implicit creation.
        assert!(!storage.join_round(99, "alice").unwrap());
    }

    #[test]
    fn ledger_blob_roundtrip() {
        let (_dir, storage) = open();
        let params = ConsensusParams::default();
        let mut ledger = Ledger::new();
        ledger.apply_vote(EdgeKey::horizontal(0, 1), "alice", 3.0, false, 4, &params);
        ledger.recompute_all();

        storage.put_ledger(4, &ledger).unwrap();
        assert_eq!(storage.get_ledger(4).unwrap(), ledger);
        // Cold round reads as empty.
        assert!(storage.get_ledger(5).unwrap().is_empty());
    }

    #[test]
    fn actions_append_in_order() {
        let (_dir, storage) = open();
        for i in 0..3u64 {
            storage
                .append_action(&ActionRecord {
                    round_id: 1,
                    time_ms: 1000 + i,
                    player: "alice".into(),
                    hinted: false,
                    edges: vec![],
                    log: None,
                })
                .unwrap();
        }
        let actions = storage.list_actions(1).unwrap();
        assert_eq!(actions.len(), 3);
        assert!(actions.windows(2).all(|w| w[0].time_ms < w[1].time_ms));
        assert!(storage.list_actions(2).unwrap().is_empty());
    }

    #[test]
    fn leaderboard_sorts_descending() {
        let (_dir, storage) = open();
        storage.incr_score(1, "alice", 2).unwrap();
        storage.incr_score(1, "bob", 5).unwrap();
        storage.incr_score(1, "alice", 1).unwrap();
        storage.incr_event(1, "create_correct_link", "alice").unwrap();

        assert_eq!(
            storage.leaderboard(1).unwrap(),
            vec![("bob".to_string(), 5), ("alice".to_string(), 3)]
        );
        assert_eq!(storage.get_score(1, "alice").unwrap(), 3);
    }

    #[test]
    fn edge_sets_are_mutually_exclusive() {
        let (_dir, storage) = open();
        let key = EdgeKey::horizontal(0, 1);

        assert!(storage.support_edge(1, "alice", key).unwrap());
        // Re-supporting is not a new membership.
        assert!(!storage.support_edge(1, "alice", key).unwrap());
        assert_eq!(storage.supported_edges(1, "alice").unwrap(), vec![key]);

        // Opposing removes the support entry.
        assert!(storage.oppose_edge(1, "alice", key).unwrap());
        assert!(storage.supported_edges(1, "alice").unwrap().is_empty());
        // Opposing again: nothing left to remove.
        assert!(!storage.oppose_edge(1, "alice", key).unwrap());
    }

    #[test]
    fn participant_sampling_excludes_nobody_but_caps_count() {
        let (_dir, storage) = open();
        for p in ["alice", "bob", "carol"] {
            storage.add_participant(1, p).unwrap();
        }
        let sample = storage.sample_participants(1, 2).unwrap();
        assert_eq!(sample.len(), 2);
        assert_ne!(sample[0], sample[1]);

        // Asking for more than exist returns everyone.
        assert_eq!(storage.sample_participants(1, 5).unwrap().len(), 3);
        assert!(storage.sample_participants(2, 2).unwrap().is_empty());
    }

    #[test]
    fn peer_edges_snapshot() {
        let (_dir, storage) = open();
        let key = EdgeKey::vertical(0, 2);
        storage.support_edge(1, "bob", key).unwrap();
        storage.incr_hint_sup(1, "bob").unwrap();
        storage.incr_hint_sup(1, "bob").unwrap();
        storage.incr_hint_opp(1, "bob").unwrap();

        let peer = storage.peer_edges(1, "bob").unwrap();
        assert_eq!(peer.hint_sup, 2);
        assert_eq!(peer.hint_opp, 1);
        assert_eq!(peer.edges, vec![key]);
    }

    #[test]
    fn solver_edges_roundtrip() {
        let (_dir, storage) = open();
        assert!(storage.get_solver_edges(1).unwrap().is_none());
        let edges = vec![EdgeKey::horizontal(0, 1), EdgeKey::vertical(1, 3)];
        storage.put_solver_edges(1, &edges).unwrap();
        assert_eq!(storage.get_solver_edges(1).unwrap().unwrap(), edges);
    }
}
