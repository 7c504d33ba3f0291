//! Terminal match renderer.
//!
//! Renders a [`session::MatchView`] into a simple framebuffer and flushes it to the
//! terminal with crossterm. It avoids widget/layout libraries so the board aspect
//! ratio (2 columns per cell) and redraw cost stay under direct control.

pub mod fb;
pub mod game_view;
pub mod renderer;

pub use versus_tetris_core as core;
pub use versus_tetris_session as session;
pub use versus_tetris_types as types;

pub use fb::{tile_color, CellStyle, FrameBuffer, Glyph, Rgb};
pub use game_view::{MatchScreen, Viewport};
pub use renderer::{encode_diff_into, encode_full_into, TerminalRenderer};
