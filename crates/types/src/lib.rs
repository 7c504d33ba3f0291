//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the workspace.
//! All types are pure data structures with no external dependencies, making them
//! usable in any context (engine logic, session control, wire protocol, rendering).
//!
//! # Board Dimensions
//!
//! Standard Tetris playfield dimensions:
//!
//! - **Width**: 10 columns (indexed 0-9)
//! - **Height**: 20 rows (indexed 0-19, row 0 at the top)
//! - **Spawn position**: top-center, computed per shape from its first rotation state
//!
//! # Timing Constants
//!
//! Timing values are in milliseconds:
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TICK_MS` | 16 | Fixed timestep interval (~60 FPS) |
//! | `GRAVITY_MS` | 500 | Gravity interval (one row per half second) |
//! | `COUNTDOWN_STEP_MS` | 1000 | One countdown decrement per second |
//! | `COUNTDOWN_FROM` | 3 | Countdown start value |
//!
//! # Cell Color Ids
//!
//! Boards travel over the wire as a flat list of color ids:
//!
//! | Id | Meaning |
//! |----|---------|
//! | 0 | empty |
//! | 1..=7 | I, O, T, S, Z, J, L |
//! | 8 | garbage |
//!
//! # Examples
//!
//! ```
//! use versus_tetris_types::{PieceKind, Tile, BOARD_HEIGHT, BOARD_WIDTH};
//!
//! assert_eq!(PieceKind::T.as_str(), "t");
//!
//! assert_eq!(Tile::Piece(PieceKind::I).color_id(), 1);
//! assert_eq!(Tile::from_color_id(8), Some(Tile::Garbage));
//!
//! assert_eq!(BOARD_WIDTH, 10);
//! assert_eq!(BOARD_HEIGHT, 20);
//! ```

/// Board width in cells (10 columns)
pub const BOARD_WIDTH: u8 = 10;

/// Board height in cells (20 rows)
pub const BOARD_HEIGHT: u8 = 20;

/// Number of cells in a board snapshot
pub const BOARD_CELLS: usize = BOARD_WIDTH as usize * BOARD_HEIGHT as usize;

/// Fixed timestep interval in milliseconds (16ms ≈ 60 FPS)
pub const TICK_MS: u32 = 16;

/// Gravity interval: the active piece falls one row this often
pub const GRAVITY_MS: u32 = 500;

/// Countdown start value once every seat is ready
pub const COUNTDOWN_FROM: u8 = 3;

/// Countdown decrement cadence
pub const COUNTDOWN_STEP_MS: u32 = 1000;

/// Default TCP port for the host
pub const DEFAULT_PORT: u16 = 5555;

/// Largest number of seats in a match (host + two guests)
pub const MAX_PLAYERS: u8 = 3;

/// Points per cleared row; a clear is worth the same per row however many rows go at once
pub const POINTS_PER_LINE: u32 = 100;

/// Line clear scoring table, `POINTS_PER_LINE` for each row cleared together
pub const LINE_SCORES: [u32; 5] = [
    0,
    POINTS_PER_LINE,
    2 * POINTS_PER_LINE,
    3 * POINTS_PER_LINE,
    4 * POINTS_PER_LINE,
];

/// Garbage rows sent to opponents for N simultaneous line clears
pub const GARBAGE_TABLE: [u8; 5] = [0, 0, 1, 2, 4];

/// Color id used for injected garbage rows
pub const GARBAGE_COLOR_ID: u8 = 8;


/// The seven tetromino piece kinds
///
/// Each piece has a distinct shape and color:
/// - **I**: Cyan, horizontal bar
/// - **O**: Yellow, 2x2 square
/// - **T**: Magenta, T-shaped
/// - **S**: Green, S-shaped
/// - **Z**: Red, Z-shaped (mirror of S)
/// - **J**: Blue, J-shaped
/// - **L**: Orange, L-shaped (mirror of J)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl PieceKind {
    /// All kinds, in color id order
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    /// Convert to lowercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceKind::I => "i",
            PieceKind::O => "o",
            PieceKind::T => "t",
            PieceKind::S => "s",
            PieceKind::Z => "z",
            PieceKind::J => "j",
            PieceKind::L => "l",
        }
    }

    /// Index into [`PieceKind::ALL`]
    pub fn index(&self) -> usize {
        match self {
            PieceKind::I => 0,
            PieceKind::O => 1,
            PieceKind::T => 2,
            PieceKind::S => 3,
            PieceKind::Z => 4,
            PieceKind::J => 5,
            PieceKind::L => 6,
        }
    }
}

/// What a filled cell holds: a locked piece color or a garbage block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tile {
    Piece(PieceKind),
    Garbage,
}

impl Tile {
    /// Wire color id (1..=8, see the module table)
    pub fn color_id(&self) -> u8 {
        match self {
            Tile::Piece(kind) => kind.index() as u8 + 1,
            Tile::Garbage => GARBAGE_COLOR_ID,
        }
    }

    /// Inverse of [`Tile::color_id`]; `None` for 0 and unknown ids
    pub fn from_color_id(id: u8) -> Option<Self> {
        match id {
            1..=7 => Some(Tile::Piece(PieceKind::ALL[(id - 1) as usize])),
            GARBAGE_COLOR_ID => Some(Tile::Garbage),
            _ => None,
        }
    }
}

/// A cell on the game board
///
/// - `None`: Empty cell
/// - `Some(Tile)`: Occupied cell
pub type Cell = Option<Tile>;

/// Color id for a cell (0 when empty)
pub fn cell_color_id(cell: Cell) -> u8 {
    cell.map(|t| t.color_id()).unwrap_or(0)
}

/// Seat a peer occupies in a match: host = 0, guests = 1 and 2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeatId(u8);

impl SeatId {
    pub const HOST: SeatId = SeatId(0);

    /// Returns `None` for ids outside `0..MAX_PLAYERS`
    pub fn new(id: u8) -> Option<Self> {
        if id < MAX_PLAYERS {
            Some(Self(id))
        } else {
            None
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn is_host(&self) -> bool {
        self.0 == 0
    }

    /// Display label for the seat
    pub fn label(&self) -> &'static str {
        match self.0 {
            0 => "HOST",
            1 => "GUEST 1",
            _ => "GUEST 2",
        }
    }
}

/// Operator commands consumed by the match controller
///
/// These come from local keyboard polling; the remote peer never sends commands,
/// only snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameAction {
    /// Move piece one cell left
    MoveLeft,
    /// Move piece one cell right
    MoveRight,
    /// Move piece one cell down; locks when blocked
    SoftDrop,
    /// Drop piece to the lowest valid position and lock
    HardDrop,
    /// Advance to the next rotation state
    Rotate,
    /// Flip the local ready flag (only before the countdown)
    ToggleReady,
    /// Leave the match
    Quit,
}
