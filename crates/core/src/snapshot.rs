use crate::board::Board;
use crate::pieces::Piece;
use crate::types::PieceKind;

/// Externally visible state of one engine at one tick
///
/// This is what gets replicated to peers and what a peer mirror holds; it carries no
/// timers or RNG state, so applying it elsewhere can never advance gameplay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSnapshot {
    pub board: Board,
    pub active: Option<Piece>,
    pub next: PieceKind,
    pub score: u32,
    pub lines: u32,
    pub started: bool,
    pub game_over: bool,
}

impl EngineSnapshot {
    /// Board with the active piece drawn in, for presentation
    pub fn composed_board(&self) -> Board {
        let mut board = self.board.clone();
        if let Some(piece) = self.active {
            board.lock_shape(
                &piece.shape(),
                piece.x,
                piece.y,
                crate::types::Tile::Piece(piece.kind),
            );
        }
        board
    }
}

impl Default for EngineSnapshot {
    fn default() -> Self {
        Self {
            board: Board::new(),
            active: None,
            next: PieceKind::I,
            score: 0,
            lines: 0,
            started: false,
            game_over: false,
        }
    }
}
