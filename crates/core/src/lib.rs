//! Core game logic - pure, deterministic, and testable
//!
//! This crate contains the rules of one player's game: the board, the tetromino
//! rotation tables, seeded piece generation, the line score and garbage tables, and the
//! [`LocalEngine`] that ties them together. It has **zero dependencies** on UI,
//! networking, or I/O, so every peer can run an engine on its own tick loop and only
//! exchange [`EngineSnapshot`]s.
//!
//! # Module Structure
//!
//! - [`board`]: 10x20 grid with line clearing and garbage injection
//! - [`engine`]: the local engine (gravity, commands, locking, garbage counters)
//! - [`pieces`]: tetromino rotation tables and placement validity
//! - [`rng`]: seeded LCG and the next-piece queue
//! - [`scoring`]: line clear points and the garbage attack table
//! - [`snapshot`]: externally visible engine state
//!
//! # Rules
//!
//! - Pieces are drawn uniformly at random with one piece of preview
//! - Rotation is a table lookup with no wall kicks; a rotation that does not fit is rolled back
//! - A piece locks when gravity or a soft drop cannot move it further down; hard drop locks at once
//! - Clearing 2/3/4 lines at once sends 1/2/4 garbage rows to every opponent
//! - A spawn that does not fit, or garbage that pushes the stack past the top, ends the game
//!
//! # Example
//!
//! ```
//! use versus_tetris_core::LocalEngine;
//! use versus_tetris_types::GameAction;
//!
//! let mut engine = LocalEngine::new(12345);
//! engine.start();
//!
//! engine.apply_action(GameAction::MoveRight);
//! engine.apply_action(GameAction::Rotate);
//! engine.apply_action(GameAction::HardDrop);
//!
//! assert!(!engine.board().is_empty());
//! assert!(engine.active().is_some());
//! ```

pub use versus_tetris_types as types;

pub mod board;
pub mod engine;
pub mod pieces;
pub mod rng;
pub mod scoring;
pub mod snapshot;

pub use board::Board;
pub use engine::{LocalEngine, LockEvent};
pub use pieces::{get_shape, is_valid, rotation_count, spawn_position, Piece, PieceShape};
pub use rng::{PieceQueue, SimpleRng};
pub use scoring::{garbage_for_lines, line_clear_score};
pub use snapshot::EngineSnapshot;
