//! Tessera - collaborative puzzle consensus node.
//!
//! A multiplayer node that turns individual tile-adjacency votes into a
//! shared consensus: votes accumulate into a weighted edge ledger, the
//! ledger drives a per-tile hint index, and hints flow back to players
//! over WebSocket alongside scoring and peer comparison.
//!
//! # Architecture
//!
//! - **Service**: the round service, one vote/hint cycle per message
//! - **Cache**: per-round in-memory hint index behind a round lock
//! - **API**: HTTP endpoints for round lifecycle and read-side views
//! - **WS**: WebSocket transport for vote and hint traffic
//!
//! # Example
//!
//! ```no_run
//! use tessera_server::{NodeConfig, TesseraNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NodeConfig::default();
//!     let node = TesseraNode::new(config).await?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod node;
pub mod service;
pub mod ws;

pub use cache::{RoundCache, RoundState};
pub use config::NodeConfig;
pub use error::{Error, Result};
pub use node::TesseraNode;
pub use service::{HintsResponse, RoundService, VoteMessage};
pub use ws::{ClientMessage, ServerMessage};
