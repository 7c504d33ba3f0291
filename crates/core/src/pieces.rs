//! Pieces module - tetromino shapes and fixed rotation tables
//!
//! Every shape is stored as a precomputed list of rotation states, each state a set of
//! four cell offsets normalized to the top-left of its bounding box. Rotating is a table
//! lookup on the rotation index; there are no wall kicks, so a rotation that does not
//! fit is rolled back by the caller.

use crate::board::Board;
use crate::types::{PieceKind, BOARD_HEIGHT, BOARD_WIDTH};

/// Offset of a single mino relative to piece origin
pub type MinoOffset = (i8, i8);

/// Shape of a piece - 4 mino offsets from piece origin
pub type PieceShape = [MinoOffset; 4];

const I_STATES: [PieceShape; 2] = [
    [(0, 0), (1, 0), (2, 0), (3, 0)],
    [(0, 0), (0, 1), (0, 2), (0, 3)],
];

const O_STATES: [PieceShape; 1] = [[(0, 0), (1, 0), (0, 1), (1, 1)]];

const T_STATES: [PieceShape; 4] = [
    [(1, 0), (0, 1), (1, 1), (2, 1)],
    [(1, 0), (0, 1), (1, 1), (1, 2)],
    [(0, 0), (1, 0), (2, 0), (1, 1)],
    [(0, 0), (0, 1), (1, 1), (0, 2)],
];

const S_STATES: [PieceShape; 2] = [
    [(1, 0), (2, 0), (0, 1), (1, 1)],
    [(0, 0), (0, 1), (1, 1), (1, 2)],
];

const Z_STATES: [PieceShape; 2] = [
    [(0, 0), (1, 0), (1, 1), (2, 1)],
    [(1, 0), (0, 1), (1, 1), (0, 2)],
];

const J_STATES: [PieceShape; 4] = [
    [(0, 0), (0, 1), (1, 1), (2, 1)],
    [(1, 0), (1, 1), (0, 2), (1, 2)],
    [(0, 0), (1, 0), (2, 0), (2, 1)],
    [(0, 0), (1, 0), (0, 1), (0, 2)],
];

const L_STATES: [PieceShape; 4] = [
    [(2, 0), (0, 1), (1, 1), (2, 1)],
    [(0, 0), (1, 0), (1, 1), (1, 2)],
    [(0, 0), (1, 0), (2, 0), (0, 1)],
    [(0, 0), (0, 1), (0, 2), (1, 2)],
];

/// The rotation table for a piece kind, in counter-clockwise order
pub fn rotation_states(kind: PieceKind) -> &'static [PieceShape] {
    match kind {
        PieceKind::I => &I_STATES,
        PieceKind::O => &O_STATES,
        PieceKind::T => &T_STATES,
        PieceKind::S => &S_STATES,
        PieceKind::Z => &Z_STATES,
        PieceKind::J => &J_STATES,
        PieceKind::L => &L_STATES,
    }
}

/// Number of distinct rotation states for a kind
pub fn rotation_count(kind: PieceKind) -> u8 {
    rotation_states(kind).len() as u8
}

/// Get the shape for a piece kind and rotation index (wrapped into range)
pub fn get_shape(kind: PieceKind, rotation: u8) -> PieceShape {
    let states = rotation_states(kind);
    states[rotation as usize % states.len()]
}

/// Width of a shape's bounding box
fn shape_width(shape: &PieceShape) -> i8 {
    shape.iter().map(|&(dx, _)| dx).max().unwrap_or(0) + 1
}

/// Spawn anchor for a kind: top row, horizontally centered
pub fn spawn_position(kind: PieceKind) -> (i8, i8) {
    let width = shape_width(&get_shape(kind, 0));
    (BOARD_WIDTH as i8 / 2 - width / 2, 0)
}

/// Active falling piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub rotation: u8,
    pub x: i8,
    pub y: i8,
}

impl Piece {
    /// Create a new piece at its spawn position
    pub fn spawn(kind: PieceKind) -> Self {
        let (x, y) = spawn_position(kind);
        Self {
            kind,
            rotation: 0,
            x,
            y,
        }
    }

    /// Get the shape (mino offsets) for current rotation
    pub fn shape(&self) -> PieceShape {
        get_shape(self.kind, self.rotation)
    }

    /// Absolute board coordinates of the four minos
    pub fn cells(&self) -> impl Iterator<Item = (i8, i8)> {
        let (x, y) = (self.x, self.y);
        self.shape()
            .into_iter()
            .map(move |(dx, dy)| (x.saturating_add(dx), y.saturating_add(dy)))
    }

    /// Advance to the next state in the rotation table
    ///
    /// This does not check the board; callers validate and roll back.
    pub fn rotate(&mut self) {
        self.rotation = (self.rotation + 1) % rotation_count(self.kind);
    }

    /// Copy of this piece translated by (dx, dy)
    pub fn moved(&self, dx: i8, dy: i8) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            ..*self
        }
    }

    /// Check whether this placement is legal on `board`
    ///
    /// Every mino must lie within the horizontal bounds and above the floor, and must
    /// not overlap a filled cell. Minos above the top row (y < 0) are exempt from the
    /// overlap check so pieces may sit partially above the visible board.
    pub fn is_valid(&self, board: &Board) -> bool {
        self.cells().all(|(x, y)| {
            if x < 0 || x >= BOARD_WIDTH as i8 || y >= BOARD_HEIGHT as i8 {
                return false;
            }
            y < 0 || board.is_free(x, y)
        })
    }
}

/// Free-function form of [`Piece::is_valid`]
pub fn is_valid(piece: &Piece, board: &Board) -> bool {
    piece.is_valid(board)
}
