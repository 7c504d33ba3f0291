//! Match session layer - ready/countdown lifecycle, peer mirrors and the per-tick glue
//!
//! - [`state`]: the session state machine shared by convention between peers
//! - [`mirror`]: read-only copies of remote engines
//! - [`controller`]: [`MatchController`], which runs one tick of a networked match and
//!   produces a [`MatchView`] for rendering

pub mod controller;
pub mod mirror;
pub mod state;

pub use versus_tetris_core as core;
pub use versus_tetris_net as net;
pub use versus_tetris_types as types;

pub use controller::{BoardView, MatchConfig, MatchController, MatchView};
pub use mirror::PeerMirror;
pub use state::{Outcome, SessionEvent, SessionMachine, SessionState};
