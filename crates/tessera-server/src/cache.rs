//! Process-wide round state cache.
//!
//! One entry per round, created on first access and never evicted: a
//! round's live hint index lasts for the process lifetime. Each entry
//! carries its own async mutex - the per-round critical section that
//! serializes the read-ledger → apply-votes → rebuild-index →
//! write-ledger cycle. Without it, concurrent votes on the same round
//! race on the durable read-modify-write and silently lose updates.

use std::collections::HashMap;
use std::sync::Arc;

use tessera_consensus::HintIndex;
use tessera_store::RoundId;
use tokio::sync::{Mutex, RwLock};

/// Live in-memory state of one round.
#[derive(Debug)]
pub struct RoundState {
    /// The hint index, rebuilt each vote cycle.
    pub index: HintIndex,
}

/// A cache slot: `None` until the round's index is first built from the
/// durable ledger.
pub type RoundSlot = Arc<Mutex<Option<RoundState>>>;

/// The process-wide cache of round slots.
#[derive(Debug, Default)]
pub struct RoundCache {
    rounds: RwLock<HashMap<RoundId, RoundSlot>>,
}

impl RoundCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for a round, created empty on first access.
    ///
    /// Callers lock the returned slot for the whole vote or hint cycle.
    pub async fn slot(&self, round_id: RoundId) -> RoundSlot {
        if let Some(slot) = self.rounds.read().await.get(&round_id) {
            return Arc::clone(slot);
        }
        let mut rounds = self.rounds.write().await;
        Arc::clone(rounds.entry(round_id).or_default())
    }

    /// Number of rounds with live state.
    pub async fn len(&self) -> usize {
        self.rounds.read().await.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.rounds.read().await.is_empty()
    }
}
