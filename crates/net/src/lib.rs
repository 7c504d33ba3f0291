//! Replication layer - moving engine snapshots between peers
//!
//! Peers form a star: the host listens and every guest dials it. Each connection is
//! wrapped in a [`ReplicationChannel`], a transport-agnostic pipe that carries
//! length-prefixed [`PeerMessage`] frames in order and reports itself broken on the
//! first fault.
//!
//! # Wire Format
//!
//! ```text
//! +----------------+---------------------------------------------+
//! | u32 length, BE | JSON payload, tagged by "type"              |
//! +----------------+---------------------------------------------+
//! ```
//!
//! - `assign_id` (host to guest, once): `{"type":"assign_id","seat":1}`
//! - `state_snapshot` (both ways, at most once per tick): board color ids, active
//!   piece placement, next piece, score, lines, flags, and the garbage rows sent
//!
//! # Threads
//!
//! Reader and accept tasks run on a small tokio runtime ([`build_runtime`]). The game
//! loop never awaits: it drains inboxes with [`ReplicationChannel::receive_all`] and
//! writes with [`ReplicationChannel::send`], which blocks for at most the configured
//! send timeout.
//!
//! # Configuration
//!
//! See [`NetConfig::from_env`]:
//!
//! - `VERSUS_TETRIS_HOST`: bind/dial host
//! - `VERSUS_TETRIS_PORT`: TCP port (default: 5555)
//! - `VERSUS_TETRIS_PLAYERS`: 2 or 3 (default: 2)
//! - `VERSUS_TETRIS_MAX_FRAME`: largest accepted payload in bytes (default: 65536)
//! - `VERSUS_TETRIS_SEND_TIMEOUT_MS`: send bound (default: 250)
//! - `VERSUS_TETRIS_INBOX`: inbox capacity (default: 64)
//! - `VERSUS_TETRIS_LOG_PATH`: optional log file

pub mod channel;
pub mod config;
pub mod error;
pub mod protocol;
pub mod rendezvous;

pub use versus_tetris_core as core;
pub use versus_tetris_types as types;

pub use channel::ReplicationChannel;
pub use config::{build_runtime, NetConfig};
pub use error::{NetError, Result};
pub use protocol::{
    decode_payload, encode_frame, read_frame, PeerMessage, PeerSnapshot, PiecePlacement, WireKind,
    FRAME_HEADER_LEN,
};
pub use rendezvous::{PeerConnection, Rendezvous, Role};
