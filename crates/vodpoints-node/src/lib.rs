//! VOD Points Node
//!
//! Credits submitted Twitch VODs to users. Each (user, VOD) pair counts at
//! most once; points accumulate in a durable per-user ledger.
//!
//! # Architecture
//!
//! - **Ledger**: per-user points and counted VOD ids (JSON file, memory, RocksDB)
//! - **Provider**: video metadata lookup (Twitch Helix)
//! - **Workflow**: validate → duplicate check → lookup → score → commit
//! - **API**: HTTP endpoints for submissions and standings
//! - **Admin Socket**: Unix socket for local queries (vodpoints-admin CLI)
//!
//! Scoring itself lives in `vodpoints-scoring`.
//!
//! # Example
//!
//! ```no_run
//! use vodpoints_node::{NodeConfig, VodNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NodeConfig::from_env()?;
//!     let node = VodNode::new(config)?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod admin_socket;
pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod node;
pub mod provider;
pub mod workflow;

pub use config::{LedgerBackend, NodeConfig};
pub use error::{Error, Result};
pub use ledger::{JsonFileLedger, LeaderboardEntry, Ledger, LedgerState, MemoryLedger, UserRecord};
pub use node::{NodeState, VodNode};
pub use provider::{
    ProviderError, StaticProvider, TwitchConfig, TwitchProvider, VideoMetadata,
    VideoMetadataProvider,
};
pub use workflow::{
    SubmissionError, SubmissionErrorKind, SubmissionReceipt, SubmissionRequest, SubmissionStage,
    SubmissionWorkflow,
};
