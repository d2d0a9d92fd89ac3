//! Tessera Durable Storage
//!
//! RocksDB-backed persistence for rounds: metadata, the edge-ledger
//! blob, append-only action/telemetry/audit records, leaderboard
//! counters, and the per-player edge sets behind the distributed hint
//! exchange.
//!
//! Keys are string-prefixed (`round:`, `action:`, `score:`, ...) with
//! serde_json values, so the keyspace stays greppable from the RocksDB
//! tooling.

mod error;
mod records;
mod storage;

pub use error::{Error, Result};
pub use records::{ActionRecord, MergeAuditRecord, RoundMeta, SnapshotRecord};
pub use storage::{PeerEdges, Storage};

/// Round identifier, the unit of ledger/index/cache partitioning.
pub type RoundId = u64;
