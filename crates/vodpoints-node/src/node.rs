//! VOD points node - the main application entry point.
//!
//! Architecture:
//! - Single daemon process owning one ledger
//! - HTTP API for submissions and standings
//! - Unix admin socket for local read-only queries (vodpoints-admin CLI)

use crate::admin_socket::AdminSocket;
use crate::api;
use crate::config::{LedgerBackend, NodeConfig};
use crate::error::Result;
use crate::ledger::{JsonFileLedger, Ledger, MemoryLedger};
use crate::provider::{TwitchProvider, VideoMetadataProvider};
use crate::workflow::SubmissionWorkflow;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state for the node - one ledger and workflow shared by all components.
pub struct NodeState {
    pub workflow: SubmissionWorkflow,
}

impl NodeState {
    pub fn new(workflow: SubmissionWorkflow) -> Self {
        Self { workflow }
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        self.workflow.ledger()
    }
}

/// A VOD points node instance.
pub struct VodNode {
    state: Arc<NodeState>,
    config: NodeConfig,
}

impl VodNode {
    /// Create a node with the configured ledger and the Twitch provider.
    pub fn new(config: NodeConfig) -> Result<Self> {
        let provider = Arc::new(TwitchProvider::new(config.twitch.clone()));
        Self::with_provider(config, provider)
    }

    /// Create a node with a custom metadata provider.
    pub fn with_provider(
        config: NodeConfig,
        provider: Arc<dyn VideoMetadataProvider>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let ledger = open_ledger(&config)?;
        let state = Arc::new(NodeState::new(SubmissionWorkflow::new(ledger, provider)));
        Ok(Self { state, config })
    }

    /// Get the shared state (for API handlers).
    pub fn state(&self) -> Arc<NodeState> {
        Arc::clone(&self.state)
    }

    /// Run the node (starts HTTP server and admin socket).
    pub async fn run(self) -> Result<()> {
        tracing::info!("VOD points node starting");
        tracing::info!("  API: http://{}", self.config.api_addr);
        tracing::info!("  Admin: {:?}", self.config.admin_socket);
        tracing::info!("  Ledger: {} at {:?}", self.config.ledger_backend, self.config.ledger_path);

        let admin_socket = AdminSocket::new(
            Arc::clone(self.state.ledger()),
            self.config.admin_socket.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = admin_socket.run().await {
                tracing::error!("Admin socket error: {}", e);
            }
        });

        let app = api::build_router(self.state()).layer(TraceLayer::new_for_http());

        let listener = tokio::net::TcpListener::bind(self.config.api_addr).await?;
        tracing::info!("HTTP server listening on {}", self.config.api_addr);

        axum::serve(listener, app).await?;

        Ok(())
    }
}

fn open_ledger(config: &NodeConfig) -> Result<Arc<dyn Ledger>> {
    let ledger: Arc<dyn Ledger> = match config.ledger_backend {
        LedgerBackend::Json => Arc::new(JsonFileLedger::open(&config.ledger_path)?),
        LedgerBackend::Memory => Arc::new(MemoryLedger::new()),
        #[cfg(feature = "rocksdb")]
        LedgerBackend::RocksDb => Arc::new(crate::ledger::RocksLedger::open(&config.ledger_path)?),
    };
    Ok(ledger)
}
