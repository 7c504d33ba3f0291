//! Network configuration, read from the environment
//!
//! Every field has a default, so `NetConfig::from_env()` always succeeds; the binary
//! then overrides individual fields from its command line.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;

use crate::types::{DEFAULT_PORT, MAX_PLAYERS};

const DEFAULT_BIND_HOST: &str = "0.0.0.0";
const DEFAULT_DIAL_HOST: &str = "127.0.0.1";

/// Replication layer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetConfig {
    /// Host to bind (listening peer) or dial (connecting peer); None picks the role default.
    pub host: Option<String>,
    pub port: u16,
    /// Total players in the match, host included (2 or 3).
    pub players: u8,
    /// Largest payload accepted in one frame.
    pub max_frame: usize,
    /// Upper bound on one blocking send from the tick loop.
    pub send_timeout: Duration,
    /// Capacity of the bounded inbox between the reader task and the tick loop.
    pub inbox_capacity: usize,
    pub log_path: Option<String>,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_PORT,
            players: 2,
            max_frame: 64 * 1024,
            send_timeout: Duration::from_millis(250),
            inbox_capacity: 64,
            log_path: None,
        }
    }
}

impl NetConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();

        let host = env::var("VERSUS_TETRIS_HOST")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let port = env::var("VERSUS_TETRIS_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let players = env::var("VERSUS_TETRIS_PLAYERS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.players);

        let max_frame = env::var("VERSUS_TETRIS_MAX_FRAME")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_frame);

        let send_timeout = env::var("VERSUS_TETRIS_SEND_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.send_timeout);

        let inbox_capacity = env::var("VERSUS_TETRIS_INBOX")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.inbox_capacity);

        let log_path = env::var("VERSUS_TETRIS_LOG_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .and_then(|s| if s.is_empty() { None } else { Some(s) });

        Self {
            host,
            port,
            players,
            max_frame,
            send_timeout,
            inbox_capacity,
            log_path,
        }
        .normalized()
    }

    /// Clamp fields into their usable ranges
    pub fn normalized(mut self) -> Self {
        self.players = self.players.clamp(2, MAX_PLAYERS);
        self.max_frame = self.max_frame.max(1);
        self.inbox_capacity = self.inbox_capacity.max(1);
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_players(mut self, players: u8) -> Self {
        self.players = players.clamp(2, MAX_PLAYERS);
        self
    }

    /// Number of guests the listening peer waits for
    pub fn guests(&self) -> u8 {
        self.players.saturating_sub(1)
    }

    /// Address the listening peer binds
    pub fn bind_addr(&self) -> String {
        let host = self.host.as_deref().unwrap_or(DEFAULT_BIND_HOST);
        format!("{}:{}", host, self.port)
    }

    /// Address the connecting peer dials
    pub fn dial_addr(&self) -> String {
        let host = self.host.as_deref().unwrap_or(DEFAULT_DIAL_HOST);
        format!("{}:{}", host, self.port)
    }
}

/// Build the runtime that hosts reader and accept tasks
///
/// One worker is enough: it only moves bytes between sockets and inboxes, while all
/// game state stays on the caller's tick thread.
pub fn build_runtime() -> std::io::Result<Arc<Runtime>> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("versus-tetris-net")
        .enable_all()
        .build()?;
    Ok(Arc::new(rt))
}
