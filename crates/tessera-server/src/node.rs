//! Tessera node - the main application entry point.
//!
//! Architecture:
//! - Single daemon process with shared RocksDB storage
//! - HTTP API for round lifecycle and read-side views
//! - WebSocket endpoint for vote/hint traffic

use std::sync::Arc;

use tessera_consensus::ConsensusParams;
use tessera_store::Storage;

use crate::api;
use crate::config::NodeConfig;
use crate::error::Result;
use crate::service::RoundService;

/// A running tessera node.
pub struct TesseraNode {
    service: Arc<RoundService>,
    config: NodeConfig,
}

impl TesseraNode {
    /// Create a new node.
    pub async fn new(config: NodeConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let storage = Arc::new(Storage::open(&config.data_dir)?);
        let service = Arc::new(RoundService::new(storage, config.params));

        Ok(Self { service, config })
    }

    /// The shared round service (for tests and embedding).
    pub fn service(&self) -> Arc<RoundService> {
        Arc::clone(&self.service)
    }

    /// The consensus parameters the node was configured with.
    pub fn params(&self) -> &ConsensusParams {
        self.service.params()
    }

    /// Run the node until the listener fails.
    pub async fn run(self) -> Result<()> {
        tracing::info!("Tessera node starting");
        tracing::info!("  API: http://{}", self.config.listen_addr);
        tracing::info!("  Data: {:?}", self.config.data_dir);

        let app = api::build_router(self.service);

        let listener = tokio::net::TcpListener::bind(self.config.listen_addr).await?;
        tracing::info!("HTTP server listening on {}", self.config.listen_addr);

        axum::serve(listener, app).await?;

        Ok(())
    }
}
