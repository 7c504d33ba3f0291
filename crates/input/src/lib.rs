//! Terminal input (controller-facing).
//!
//! Maps `crossterm` key events into [`crate::types::GameAction`] operator commands.
//! Every key press is one discrete command; there is no auto-repeat handling beyond
//! what the terminal itself sends.

pub mod map;

pub use versus_tetris_types as types;

pub use map::{handle_key_event, should_quit};
