//! Tessera node binary.

use tessera_server::{NodeConfig, TesseraNode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tessera=info,tessera_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Tessera Node");

    let config = NodeConfig::default();

    let node = TesseraNode::new(config).await?;
    node.run().await?;

    Ok(())
}
