//! VOD points node binary
//!
//! Credits Twitch VODs to users and serves the submission API.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vodpoints_node::{NodeConfig, VodNode};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vodpoints_node=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting VOD points node");

    let config = NodeConfig::from_env()?;

    let node = VodNode::new(config)?;
    node.run().await?;

    Ok(())
}
