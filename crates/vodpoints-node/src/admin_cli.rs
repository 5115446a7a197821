//! vodpoints-admin CLI tool
//!
//! Inspects the ledger of a running node.
//!
//! Usage:
//!   vodpoints-admin user <user_id>
//!   vodpoints-admin top [n]
//!   vodpoints-admin has-vod <user_id> <video_id>
//!   vodpoints-admin ping

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use vodpoints_node::admin_socket::{default_socket_path, AdminCommand, AdminResponse};

fn print_usage() {
    eprintln!("vodpoints-admin - Inspect VOD points on a running node");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  vodpoints-admin user <user_id>                Show a user's points and VODs");
    eprintln!("  vodpoints-admin top [n]                       Show the top n users (default 10)");
    eprintln!("  vodpoints-admin has-vod <user_id> <video_id>  Check if a VOD was counted");
    eprintln!("  vodpoints-admin ping                          Check if the node is running");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  VODPOINTS_SOCKET  Path to admin socket (default: ./vodpoints-data/admin.sock)");
}

fn get_socket_path() -> PathBuf {
    std::env::var("VODPOINTS_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_socket_path())
}

fn send_command(cmd: &AdminCommand) -> Result<AdminResponse, String> {
    let socket_path = get_socket_path();

    let mut stream = UnixStream::connect(&socket_path).map_err(|e| {
        format!(
            "Failed to connect to vodpoints-node at {:?}: {}\n\
             Is the vodpoints-node running?",
            socket_path, e
        )
    })?;

    // Send command
    let cmd_json = serde_json::to_string(cmd).map_err(|e| e.to_string())?;
    writeln!(stream, "{}", cmd_json).map_err(|e| e.to_string())?;

    // Read response
    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .map_err(|e| e.to_string())?;

    serde_json::from_str(&response_line).map_err(|e| format!("Invalid response: {}", e))
}

fn require(args: &[String], index: usize, what: &str, command: &str) -> String {
    match args.get(index) {
        Some(value) => value.clone(),
        None => {
            eprintln!("Error: {} requires a {} argument", command, what);
            std::process::exit(1);
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let cmd = match args[1].as_str() {
        "user" => AdminCommand::GetUser {
            user_id: require(&args, 2, "user_id", "user"),
        },
        "top" => {
            let limit = match args.get(2).map(|n| n.parse::<usize>()) {
                None => None,
                Some(Ok(n)) => Some(n),
                Some(Err(_)) => {
                    eprintln!("Error: top expects a number");
                    std::process::exit(1);
                }
            };
            AdminCommand::Leaderboard { limit }
        }
        "has-vod" => AdminCommand::HasSubmitted {
            user_id: require(&args, 2, "user_id", "has-vod"),
            video_id: require(&args, 3, "video_id", "has-vod"),
        },
        "ping" => AdminCommand::Ping,
        "-h" | "--help" | "help" => {
            print_usage();
            std::process::exit(0);
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
    };

    match send_command(&cmd) {
        Ok(response) => match response {
            AdminResponse::User {
                user_id,
                points,
                vods,
            } => {
                println!("{}: {} points", user_id, points);
                if vods.is_empty() {
                    println!("(no VODs)");
                } else {
                    for vod in vods {
                        println!("  {}", vod);
                    }
                }
            }
            AdminResponse::Leaderboard { entries } => {
                if entries.is_empty() {
                    println!("(none)");
                } else {
                    for (rank, entry) in entries.iter().enumerate() {
                        println!(
                            "{:>3}. {}  {} points  ({} VODs)",
                            rank + 1,
                            entry.user_id,
                            entry.points,
                            entry.vod_count
                        );
                    }
                }
            }
            AdminResponse::Bool { value } => {
                println!("{}", value);
                if !value {
                    std::process::exit(1);
                }
            }
            AdminResponse::Error { error } => {
                eprintln!("Error: {}", error);
                std::process::exit(1);
            }
            AdminResponse::Pong => {
                println!("pong - vodpoints-node is running");
            }
        },
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
