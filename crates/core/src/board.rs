//! Board module - manages the game grid
//!
//! The board is a 10x20 grid where each cell is empty or holds a [`Tile`].
//! Uses a flat array for better cache locality and zero-allocation.
//! Coordinates: (x, y) where x ranges 0..9 (left to right), y ranges 0..19 (top to bottom).

use arrayvec::ArrayVec;

use crate::pieces::PieceShape;
use crate::rng::SimpleRng;
use crate::types::{cell_color_id, Cell, Tile, BOARD_CELLS, BOARD_HEIGHT, BOARD_WIDTH};

/// The game board - 10 columns x 20 rows using flat array storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// Flat array of cells, row-major order (y * WIDTH + x)
    cells: [Cell; BOARD_CELLS],
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Self {
            cells: [None; BOARD_CELLS],
        }
    }

    /// Calculate flat index from (x, y) coordinates
    #[inline(always)]
    fn index(x: i8, y: i8) -> Option<usize> {
        if x < 0 || x >= BOARD_WIDTH as i8 || y < 0 || y >= BOARD_HEIGHT as i8 {
            return None;
        }
        Some((y as usize) * (BOARD_WIDTH as usize) + (x as usize))
    }

    pub fn width(&self) -> u8 {
        BOARD_WIDTH
    }

    pub fn height(&self) -> u8 {
        BOARD_HEIGHT
    }

    /// Get cell at position (x, y)
    /// Returns None if out of bounds
    pub fn get(&self, x: i8, y: i8) -> Option<Cell> {
        Self::index(x, y).map(|idx| self.cells[idx])
    }

    /// Set cell at position (x, y)
    /// Returns false if out of bounds
    pub fn set(&mut self, x: i8, y: i8, cell: Cell) -> bool {
        match Self::index(x, y) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    /// Check if position is within bounds and empty
    pub fn is_free(&self, x: i8, y: i8) -> bool {
        matches!(self.get(x, y), Some(None))
    }

    /// Check if position is within bounds and filled
    pub fn is_occupied(&self, x: i8, y: i8) -> bool {
        matches!(self.get(x, y), Some(Some(_)))
    }

    fn row(&self, y: usize) -> &[Cell] {
        let start = y * BOARD_WIDTH as usize;
        &self.cells[start..start + BOARD_WIDTH as usize]
    }

    /// Check if a row is completely filled
    pub fn is_row_full(&self, y: usize) -> bool {
        if y >= BOARD_HEIGHT as usize {
            return false;
        }
        self.row(y).iter().all(|cell| cell.is_some())
    }

    /// Check if a row has no filled cells
    pub fn is_row_empty(&self, y: usize) -> bool {
        if y >= BOARD_HEIGHT as usize {
            return true;
        }
        self.row(y).iter().all(|cell| cell.is_none())
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|cell| cell.is_none())
    }

    /// Number of rows from the bottom up to and including the highest filled row
    pub fn stack_height(&self) -> u8 {
        (0..BOARD_HEIGHT as usize)
            .find(|&y| !self.is_row_empty(y))
            .map(|y| BOARD_HEIGHT - y as u8)
            .unwrap_or(0)
    }

    /// Clear all full rows and return the row indices that were cleared (sorted bottom to top)
    ///
    /// Every full row is identified before anything moves, so the result does not depend
    /// on the order rows are visited. Uses a two-pointer pass with zero allocation.
    pub fn clear_full_rows(&mut self) -> ArrayVec<usize, { BOARD_HEIGHT as usize }> {
        let mut cleared_rows = ArrayVec::new();
        let width = BOARD_WIDTH as usize;
        let mut write_y = BOARD_HEIGHT as usize;

        for read_y in (0..BOARD_HEIGHT as usize).rev() {
            if self.is_row_full(read_y) {
                cleared_rows.push(read_y);
            } else {
                write_y -= 1;
                if write_y != read_y {
                    let src_start = read_y * width;
                    let dst_start = write_y * width;
                    self.cells
                        .copy_within(src_start..src_start + width, dst_start);
                }
            }
        }

        // The vacated rows at the top become empty.
        for cell in &mut self.cells[..write_y * width] {
            *cell = None;
        }

        cleared_rows
    }

    /// Remove full rows and return how many were cleared
    pub fn clear_full_lines(&mut self) -> usize {
        self.clear_full_rows().len()
    }

    /// Copy a shape's cells into the board at `(x, y)`
    ///
    /// Cells above the visible board (y < 0) cannot be stored; they are dropped and the
    /// call returns false so the caller can treat it as a lock-out. Cells below or beside
    /// the board are never addressed because callers only lock validated pieces.
    pub fn lock_shape(&mut self, shape: &PieceShape, x: i8, y: i8, tile: Tile) -> bool {
        let mut fully_visible = true;
        for &(dx, dy) in shape {
            let py = y.saturating_add(dy);
            if py < 0 {
                fully_visible = false;
                continue;
            }
            self.set(x.saturating_add(dx), py, Some(tile));
        }
        fully_visible
    }

    /// Push the stack up by `rows` and fill the bottom with garbage rows
    ///
    /// Each garbage row is fully occupied except one hole column drawn from `rng`.
    /// Returns true when an occupied cell was pushed above row 0 (overflow); the shift
    /// still happens so the board shows the overflowing state.
    pub fn inject_garbage(&mut self, rows: usize, rng: &mut SimpleRng) -> bool {
        let rows = rows.min(BOARD_HEIGHT as usize);
        if rows == 0 {
            return false;
        }

        let width = BOARD_WIDTH as usize;
        let overflow = (0..rows).any(|y| !self.is_row_empty(y));

        self.cells.copy_within(rows * width.., 0);

        let first_garbage_row = BOARD_HEIGHT as usize - rows;
        for y in first_garbage_row..BOARD_HEIGHT as usize {
            let hole = rng.next_range(BOARD_WIDTH as u32) as usize;
            let start = y * width;
            for (x, cell) in self.cells[start..start + width].iter_mut().enumerate() {
                *cell = if x == hole { None } else { Some(Tile::Garbage) };
            }
        }

        overflow
    }

    /// Get a reference to the internal cells array
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Flat H·W color ids, row-major
    pub fn color_ids(&self) -> Vec<u8> {
        self.cells.iter().map(|c| cell_color_id(*c)).collect()
    }

    /// Rebuild a board from a flat color id snapshot
    ///
    /// Returns None if the length is not H·W or an id is unknown.
    pub fn from_color_ids(ids: &[u8]) -> Option<Self> {
        if ids.len() != BOARD_CELLS {
            return None;
        }
        let mut board = Self::new();
        for (cell, &id) in board.cells.iter_mut().zip(ids) {
            *cell = match id {
                0 => None,
                _ => Some(Tile::from_color_id(id)?),
            };
        }
        Some(board)
    }

    /// Clear the entire board
    pub fn clear(&mut self) {
        self.cells.fill(None);
    }

    /// Fill row `y` completely except the given columns
    ///
    /// Convenience for building test fixtures and benches.
    pub fn fill_row_except(&mut self, y: i8, holes: &[i8], tile: Tile) {
        for x in 0..BOARD_WIDTH as i8 {
            if !holes.contains(&x) {
                self.set(x, y, Some(tile));
            }
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PieceKind;

    #[test]
    fn test_board_index_calculation() {
        assert_eq!(Board::index(0, 0), Some(0));
        assert_eq!(Board::index(9, 0), Some(9));
        assert_eq!(Board::index(0, 1), Some(10));
        assert_eq!(Board::index(9, 19), Some(199));
        assert_eq!(Board::index(-1, 0), None);
        assert_eq!(Board::index(10, 0), None);
        assert_eq!(Board::index(0, 20), None);
    }

    #[test]
    fn test_clear_full_rows_compacts_non_adjacent_rows() {
        let mut board = Board::new();
        let t = Tile::Piece(PieceKind::T);
        board.fill_row_except(19, &[], t);
        board.set(4, 18, Some(Tile::Piece(PieceKind::I)));
        board.fill_row_except(17, &[], t);
        board.set(2, 16, Some(Tile::Piece(PieceKind::O)));

        let cleared = board.clear_full_rows();
        assert_eq!(cleared.as_slice(), &[19, 17]);

        // Survivors keep their relative order and sink to the bottom.
        assert_eq!(board.get(4, 19), Some(Some(Tile::Piece(PieceKind::I))));
        assert_eq!(board.get(2, 18), Some(Some(Tile::Piece(PieceKind::O))));
        assert_eq!(board.stack_height(), 2);
    }

    #[test]
    fn test_inject_garbage_shifts_stack_up() {
        let mut board = Board::new();
        board.set(0, 19, Some(Tile::Piece(PieceKind::L)));
        let mut rng = SimpleRng::new(7);

        assert!(!board.inject_garbage(2, &mut rng));
        assert_eq!(board.get(0, 17), Some(Some(Tile::Piece(PieceKind::L))));
        for y in [18usize, 19] {
            let holes = (0..BOARD_WIDTH as i8)
                .filter(|&x| board.get(x, y as i8) == Some(None))
                .count();
            assert_eq!(holes, 1, "row {y} should have exactly one hole");
        }
    }

    #[test]
    fn test_inject_garbage_overflow() {
        let mut board = Board::new();
        board.set(5, 0, Some(Tile::Piece(PieceKind::T)));
        let mut rng = SimpleRng::new(1);
        assert!(board.inject_garbage(1, &mut rng));
    }

    #[test]
    fn test_color_id_roundtrip_rejects_bad_input() {
        let mut board = Board::new();
        board.set(3, 4, Some(Tile::Garbage));
        let ids = board.color_ids();
        assert_eq!(Board::from_color_ids(&ids), Some(board));

        assert!(Board::from_color_ids(&ids[..10]).is_none());
        let mut bad = ids.clone();
        bad[0] = 42;
        assert!(Board::from_color_ids(&bad).is_none());
    }
}
