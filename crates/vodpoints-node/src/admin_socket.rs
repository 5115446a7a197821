//! Unix socket server for admin commands.
//!
//! Provides a local IPC interface for inspecting the ledger. Read-only:
//! points only ever change through the submission workflow.

use crate::error::Result;
use crate::ledger::{LeaderboardEntry, Ledger};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

const DEFAULT_TOP: usize = 10;

/// Admin command sent over the socket.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AdminCommand {
    /// A user's points and counted VODs
    GetUser { user_id: String },
    /// Top users by points
    Leaderboard { limit: Option<usize> },
    /// Whether a VOD was already counted for a user
    HasSubmitted { user_id: String, video_id: String },
    /// Ping (health check)
    Ping,
}

/// Response from admin command.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdminResponse {
    User {
        user_id: String,
        points: u64,
        vods: Vec<String>,
    },
    Leaderboard {
        entries: Vec<LeaderboardEntry>,
    },
    Bool {
        value: bool,
    },
    Error {
        error: String,
    },
    Pong,
}

/// Admin socket server.
pub struct AdminSocket {
    ledger: Arc<dyn Ledger>,
    socket_path: PathBuf,
}

impl AdminSocket {
    /// Create a new admin socket server.
    pub fn new(ledger: Arc<dyn Ledger>, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            ledger,
            socket_path: socket_path.into(),
        }
    }

    /// Run the admin socket server.
    pub async fn run(&self) -> Result<()> {
        // Remove stale socket file from a previous run
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!("Admin socket listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let ledger = Arc::clone(&self.ledger);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, ledger).await {
                            tracing::error!("Admin connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept admin connection: {}", e);
                }
            }
        }
    }

    /// Get the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

async fn handle_connection(stream: UnixStream, ledger: Arc<dyn Ledger>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let response = match serde_json::from_str::<AdminCommand>(&line) {
            Ok(cmd) => execute_command(cmd, ledger.as_ref()),
            Err(e) => AdminResponse::Error {
                error: format!("Invalid command: {}", e),
            },
        };

        let response_json = serde_json::to_string(&response)? + "\n";
        writer.write_all(response_json.as_bytes()).await?;
        line.clear();
    }

    Ok(())
}

fn execute_command(cmd: AdminCommand, ledger: &dyn Ledger) -> AdminResponse {
    match cmd {
        AdminCommand::GetUser { user_id } => match ledger.user(&user_id) {
            Ok(Some(user)) => AdminResponse::User {
                user_id,
                points: user.points,
                vods: user.vods,
            },
            Ok(None) => AdminResponse::Error {
                error: format!("Unknown user: {}", user_id),
            },
            Err(e) => AdminResponse::Error {
                error: e.to_string(),
            },
        },

        AdminCommand::Leaderboard { limit } => {
            match ledger.leaderboard(limit.unwrap_or(DEFAULT_TOP)) {
                Ok(entries) => AdminResponse::Leaderboard { entries },
                Err(e) => AdminResponse::Error {
                    error: e.to_string(),
                },
            }
        }

        AdminCommand::HasSubmitted { user_id, video_id } => {
            match ledger.has_submitted(&user_id, &video_id) {
                Ok(value) => AdminResponse::Bool { value },
                Err(e) => AdminResponse::Error {
                    error: e.to_string(),
                },
            }
        }

        AdminCommand::Ping => AdminResponse::Pong,
    }
}

/// Default socket path.
pub fn default_socket_path() -> PathBuf {
    let data_dir =
        std::env::var("VODPOINTS_DATA_DIR").unwrap_or_else(|_| "./vodpoints-data".to_string());
    PathBuf::from(data_dir).join("admin.sock")
}
