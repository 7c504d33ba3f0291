//! Versus Tetris (workspace facade crate).
//!
//! Re-exports the workspace crates under one path,
//! `versus_tetris::{core,input,net,session,term,types}`, for the binary, the
//! integration tests and the benches.

pub use versus_tetris_core as core;
pub use versus_tetris_input as input;
pub use versus_tetris_net as net;
pub use versus_tetris_session as session;
pub use versus_tetris_term as term;
pub use versus_tetris_types as types;
