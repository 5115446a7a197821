//! Node configuration from environment variables.

use crate::error::{Error, Result};
use crate::provider::TwitchConfig;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Where the ledger lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    /// Single JSON file (`data.json`)
    Json,
    /// Process memory only
    Memory,
    /// RocksDB, one key per user
    #[cfg(feature = "rocksdb")]
    RocksDb,
}

impl FromStr for LedgerBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "file" => Ok(LedgerBackend::Json),
            "memory" => Ok(LedgerBackend::Memory),
            #[cfg(feature = "rocksdb")]
            "rocksdb" | "rocks" => Ok(LedgerBackend::RocksDb),
            other => Err(Error::Config(format!("unknown ledger backend '{}'", other))),
        }
    }
}

impl fmt::Display for LedgerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerBackend::Json => write!(f, "json"),
            LedgerBackend::Memory => write!(f, "memory"),
            #[cfg(feature = "rocksdb")]
            LedgerBackend::RocksDb => write!(f, "rocksdb"),
        }
    }
}

/// Configuration for a VOD points node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Data directory for the ledger and admin socket
    pub data_dir: PathBuf,

    /// Ledger backend
    pub ledger_backend: LedgerBackend,

    /// Ledger file (json) or database directory (rocksdb)
    pub ledger_path: PathBuf,

    /// HTTP API listen address
    pub api_addr: SocketAddr,

    /// Admin socket path (for vodpoints-admin CLI)
    pub admin_socket: PathBuf,

    /// Twitch Helix credentials and endpoints
    pub twitch: TwitchConfig,
}

impl NodeConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any variable source.
    pub fn from_lookup<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = PathBuf::from(
            var("VODPOINTS_DATA_DIR").unwrap_or_else(|| "./vodpoints-data".to_string()),
        );

        let ledger_backend = match var("VODPOINTS_LEDGER_BACKEND") {
            Some(raw) => raw.parse()?,
            None => LedgerBackend::Json,
        };

        let ledger_path = var("VODPOINTS_LEDGER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| match ledger_backend {
                #[cfg(feature = "rocksdb")]
                LedgerBackend::RocksDb => data_dir.join("ledger.db"),
                _ => data_dir.join("data.json"),
            });

        let api_addr_raw = var("VODPOINTS_API_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let api_addr = api_addr_raw
            .parse()
            .map_err(|_| Error::Config(format!("invalid VODPOINTS_API_ADDR '{}'", api_addr_raw)))?;

        let admin_socket = var("VODPOINTS_ADMIN_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("admin.sock"));

        let mut twitch = TwitchConfig::new(
            required(&var, "TWITCH_CLIENT_ID")?,
            required(&var, "TWITCH_CLIENT_SECRET")?,
        );
        if let Some(url) = var("TWITCH_API_URL") {
            twitch.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = var("TWITCH_AUTH_URL") {
            twitch.auth_url = url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = var("TWITCH_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .map_err(|_| Error::Config(format!("invalid TWITCH_TIMEOUT_SECS '{}'", raw)))?;
            twitch.request_timeout = Duration::from_secs(secs);
        }

        Ok(Self {
            data_dir,
            ledger_backend,
            ledger_path,
            api_addr,
            admin_socket,
            twitch,
        })
    }
}

fn required<F>(var: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::Config(format!("{} is not set", key)))
}
