//! Node configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use tessera_consensus::ConsensusParams;

/// Configuration for a Tessera node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Data directory for storage
    pub data_dir: PathBuf,

    /// HTTP/WebSocket listen address
    pub listen_addr: SocketAddr,

    /// Consensus policy shared by every round this node serves
    pub params: ConsensusParams,
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl NodeConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let data_dir = PathBuf::from(
            std::env::var("TESSERA_DATA_DIR").unwrap_or_else(|_| "./tessera-data".to_string()),
        );

        let listen_addr = std::env::var("TESSERA_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .expect("Invalid TESSERA_LISTEN_ADDR");

        let defaults = ConsensusParams::default();
        let params = ConsensusParams {
            hint_decay: env_parse("TESSERA_HINT_DECAY", defaults.hint_decay),
            min_confidence: env_parse("TESSERA_MIN_CONFIDENCE", defaults.min_confidence),
            min_supporters: env_parse("TESSERA_MIN_SUPPORTERS", defaults.min_supporters),
            unsure_epsilon: env_parse("TESSERA_UNSURE_EPSILON", defaults.unsure_epsilon),
            ..defaults
        };

        Self {
            data_dir,
            listen_addr,
            params,
        }
    }
}
