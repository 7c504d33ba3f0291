//! Local engine module - one player's board, falling piece and garbage counters
//!
//! The engine is driven from a single tick loop: `tick` advances gravity and applies
//! any pending garbage, `apply_action` handles operator commands. Nothing in here does
//! I/O; attacks leave through `take_outgoing_garbage` and arrive through
//! `add_pending_garbage`.

use crate::board::Board;
use crate::pieces::Piece;
use crate::rng::{PieceQueue, SimpleRng};
use crate::scoring::{garbage_for_lines, line_clear_score};
use crate::snapshot::EngineSnapshot;
use crate::types::{GameAction, PieceKind, Tile, GRAVITY_MS};

/// Garbage holes use their own stream so attacks do not perturb the piece sequence.
const GARBAGE_SEED_MIX: u32 = 0x9E37_79B9;

/// What happened when a piece locked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockEvent {
    pub kind: PieceKind,
    pub lines_cleared: u8,
    pub garbage_sent: u8,
}

/// Complete state of one player's game
#[derive(Debug, Clone)]
pub struct LocalEngine {
    board: Board,
    active: Option<Piece>,
    queue: PieceQueue,
    garbage_rng: SimpleRng,
    score: u32,
    lines: u32,
    /// Rows received from opponents, applied at the start of the next tick.
    pending_garbage: u32,
    /// Rows owed to opponents, drained by the controller once per tick.
    outgoing_garbage: u32,
    gravity_ms: u32,
    gravity_timer_ms: u32,
    started: bool,
    game_over: bool,
    last_lock: Option<LockEvent>,
}

impl LocalEngine {
    /// Create a new engine with the given RNG seed
    pub fn new(seed: u32) -> Self {
        Self::with_gravity(seed, GRAVITY_MS)
    }

    /// Create a new engine with a custom gravity interval
    pub fn with_gravity(seed: u32, gravity_ms: u32) -> Self {
        Self {
            board: Board::new(),
            active: None,
            queue: PieceQueue::new(seed),
            garbage_rng: SimpleRng::new(seed ^ GARBAGE_SEED_MIX),
            score: 0,
            lines: 0,
            pending_garbage: 0,
            outgoing_garbage: 0,
            gravity_ms: gravity_ms.max(1),
            gravity_timer_ms: 0,
            started: false,
            game_over: false,
            last_lock: None,
        }
    }

    /// Start the game and spawn the first piece
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.spawn_piece();
    }

    /// Replace this engine with a fresh one using the same seed and gravity
    pub fn restart(&mut self) {
        *self = Self::with_gravity(self.queue.seed(), self.gravity_ms);
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn game_over(&self) -> bool {
        self.game_over
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn next_piece(&self) -> PieceKind {
        self.queue.peek()
    }

    pub fn active(&self) -> Option<Piece> {
        self.active
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn seed(&self) -> u32 {
        self.queue.seed()
    }

    pub fn gravity_ms(&self) -> u32 {
        self.gravity_ms
    }

    pub fn pending_garbage(&self) -> u32 {
        self.pending_garbage
    }

    pub fn outgoing_garbage(&self) -> u32 {
        self.outgoing_garbage
    }

    #[cfg(test)]
    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    #[cfg(test)]
    pub(crate) fn set_active(&mut self, piece: Piece) {
        self.active = Some(piece);
    }

    /// Queue garbage rows received from an opponent
    ///
    /// Rows are only added to the board at the start of the next `tick`, never while
    /// a command is being applied.
    pub fn add_pending_garbage(&mut self, rows: u32) {
        if rows == 0 || self.game_over {
            return;
        }
        self.pending_garbage = self.pending_garbage.saturating_add(rows);
    }

    /// Drain the garbage owed to opponents since the last call
    pub fn take_outgoing_garbage(&mut self) -> u32 {
        std::mem::take(&mut self.outgoing_garbage)
    }

    /// Last lock event (consumed by observers)
    pub fn take_last_lock(&mut self) -> Option<LockEvent> {
        self.last_lock.take()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            board: self.board.clone(),
            active: self.active,
            next: self.queue.peek(),
            score: self.score,
            lines: self.lines,
            started: self.started,
            game_over: self.game_over,
        }
    }

    /// Spawn the next piece from the queue
    ///
    /// A spawn that is not valid on the current board ends the game for good.
    fn spawn_piece(&mut self) -> bool {
        let piece = Piece::spawn(self.queue.draw());
        self.gravity_timer_ms = 0;

        if !piece.is_valid(&self.board) {
            self.active = None;
            self.game_over = true;
            return false;
        }

        self.active = Some(piece);
        true
    }

    /// Try to move the active piece; a rejected move leaves it untouched
    pub(crate) fn try_move(&mut self, dx: i8, dy: i8) -> bool {
        let Some(active) = self.active else {
            return false;
        };

        let moved = active.moved(dx, dy);
        if moved.is_valid(&self.board) {
            self.active = Some(moved);
            true
        } else {
            false
        }
    }

    /// Rotate the active piece, rolling back to the previous state if it does not fit
    pub(crate) fn try_rotate(&mut self) -> bool {
        let Some(mut active) = self.active else {
            return false;
        };

        let previous = active.rotation;
        active.rotate();
        if active.rotation == previous || !active.is_valid(&self.board) {
            return false;
        }

        self.active = Some(active);
        true
    }

    /// Drop the active piece as far as it goes and lock it
    ///
    /// Returns the number of rows dropped.
    pub(crate) fn hard_drop(&mut self) -> u32 {
        if self.active.is_none() {
            return 0;
        }

        let mut drop_distance: u32 = 0;
        while self.try_move(0, 1) {
            drop_distance += 1;
        }

        self.lock_piece();
        drop_distance
    }

    /// Move down one row, locking the piece when it cannot move
    pub(crate) fn soft_drop(&mut self) -> bool {
        if self.active.is_none() {
            return false;
        }
        if self.try_move(0, 1) {
            self.gravity_timer_ms = 0;
        } else {
            self.lock_piece();
        }
        true
    }

    /// Lock the current piece, clear lines, queue the attack and spawn the next piece
    pub fn lock_piece(&mut self) {
        let Some(piece) = self.active.take() else {
            return;
        };

        let fully_visible =
            self.board
                .lock_shape(&piece.shape(), piece.x, piece.y, Tile::Piece(piece.kind));

        let cleared = self.board.clear_full_lines();
        let garbage = garbage_for_lines(cleared);
        self.score = self.score.saturating_add(line_clear_score(cleared));
        self.lines = self.lines.saturating_add(cleared as u32);
        self.outgoing_garbage = self.outgoing_garbage.saturating_add(garbage as u32);
        self.last_lock = Some(LockEvent {
            kind: piece.kind,
            lines_cleared: cleared as u8,
            garbage_sent: garbage,
        });

        // Locking above the visible board is a top-out even if the spawn area is clear.
        if !fully_visible && cleared == 0 {
            self.game_over = true;
            return;
        }

        self.spawn_piece();
    }

    /// Add queued garbage rows to the board
    ///
    /// Overflow ends the game. If the rising stack now overlaps the falling piece, the
    /// piece is lifted by at most the number of injected rows; failing that also ends it.
    fn apply_pending_garbage(&mut self) -> bool {
        let rows = std::mem::take(&mut self.pending_garbage);
        if rows == 0 {
            return false;
        }

        let rows = rows.min(self.board.height() as u32) as usize;
        if self.board.inject_garbage(rows, &mut self.garbage_rng) {
            self.game_over = true;
            self.active = None;
            return true;
        }

        if let Some(active) = self.active {
            if !active.is_valid(&self.board) {
                let lifted = (1..=rows as i8)
                    .map(|dy| active.moved(0, -dy))
                    .find(|p| p.is_valid(&self.board));
                match lifted {
                    Some(piece) => self.active = Some(piece),
                    None => {
                        self.game_over = true;
                        self.active = None;
                    }
                }
            }
        }

        true
    }

    /// Main game tick - apply pending garbage, then gravity
    ///
    /// Returns true if the board or the active piece changed.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        if self.game_over || !self.started {
            return false;
        }

        let mut changed = self.apply_pending_garbage();
        if self.game_over || self.active.is_none() {
            return changed;
        }

        self.gravity_timer_ms = self.gravity_timer_ms.saturating_add(elapsed_ms);
        if self.gravity_timer_ms >= self.gravity_ms {
            self.gravity_timer_ms = 0;
            if !self.try_move(0, 1) {
                self.lock_piece();
            }
            changed = true;
        }

        changed
    }

    /// Apply a game action
    ///
    /// Returns true if the action changed the engine. Session commands (ready, quit)
    /// are not engine actions and always return false.
    pub fn apply_action(&mut self, action: GameAction) -> bool {
        if self.game_over || !self.started {
            return false;
        }

        match action {
            GameAction::MoveLeft => self.try_move(-1, 0),
            GameAction::MoveRight => self.try_move(1, 0),
            GameAction::SoftDrop => self.soft_drop(),
            GameAction::HardDrop => {
                if self.active.is_none() {
                    return false;
                }
                self.hard_drop();
                true
            }
            GameAction::Rotate => self.try_rotate(),
            GameAction::ToggleReady | GameAction::Quit => false,
        }
    }
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BOARD_HEIGHT, BOARD_WIDTH};

    fn started_with(kind: PieceKind) -> LocalEngine {
        let mut engine = LocalEngine::new(12345);
        engine.start();
        engine.set_active(Piece::spawn(kind));
        engine
    }

    #[test]
    fn test_new_engine() {
        let engine = LocalEngine::new(12345);
        assert!(!engine.started());
        assert!(!engine.game_over());
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.lines(), 0);
        assert!(engine.active().is_none());
        assert!(engine.board().is_empty());
    }

    #[test]
    fn test_start_spawns_first_piece() {
        let mut engine = LocalEngine::new(12345);
        engine.start();
        let active = engine.active().expect("active piece after start");
        assert_eq!(active.y, 0);
        assert_eq!(active.rotation, 0);
    }

    #[test]
    fn test_actions_ignored_before_start() {
        let mut engine = LocalEngine::new(1);
        assert!(!engine.apply_action(GameAction::MoveLeft));
        assert!(!engine.apply_action(GameAction::HardDrop));
        assert!(!engine.tick(10_000));
    }

    #[test]
    fn test_hard_drop_i_lands_on_bottom_row() {
        let mut engine = started_with(PieceKind::I);
        assert!(engine.apply_action(GameAction::HardDrop));

        let bottom = BOARD_HEIGHT as i8 - 1;
        for x in 0..BOARD_WIDTH as i8 {
            let expected = (3..7).contains(&x);
            assert_eq!(engine.board().is_occupied(x, bottom), expected, "column {x}");
        }
        assert_eq!(engine.lines(), 0);
        assert_eq!(engine.take_outgoing_garbage(), 0);
    }

    #[test]
    fn test_lock_clears_single_line() {
        let mut engine = started_with(PieceKind::I);
        let bottom = BOARD_HEIGHT as i8 - 1;
        engine
            .board_mut()
            .fill_row_except(bottom, &[3, 4, 5, 6], Tile::Garbage);

        engine.apply_action(GameAction::HardDrop);

        assert_eq!(engine.lines(), 1);
        assert_eq!(engine.score(), 100);
        assert!(engine.board().is_empty());
        let event = engine.take_last_lock().expect("lock event");
        assert_eq!(event.lines_cleared, 1);
        assert_eq!(event.garbage_sent, 0);
    }

    #[test]
    fn test_tetris_queues_four_garbage_rows() {
        let mut engine = started_with(PieceKind::I);
        engine.set_active(Piece {
            kind: PieceKind::I,
            rotation: 1,
            x: 0,
            y: 0,
        });
        for y in 16..BOARD_HEIGHT as i8 {
            engine.board_mut().fill_row_except(y, &[0], Tile::Garbage);
        }

        engine.apply_action(GameAction::HardDrop);

        assert_eq!(engine.lines(), 4);
        assert_eq!(engine.score(), 400);
        assert_eq!(engine.take_outgoing_garbage(), 4);
        assert_eq!(engine.take_outgoing_garbage(), 0);
    }

    #[test]
    fn test_rotation_rollback_keeps_previous_index() {
        let mut engine = started_with(PieceKind::I);
        // Vertical I against the floor cannot fit and must roll back.
        let bottom = BOARD_HEIGHT as i8 - 1;
        engine.set_active(Piece {
            kind: PieceKind::I,
            rotation: 0,
            x: 3,
            y: bottom,
        });

        assert!(!engine.apply_action(GameAction::Rotate));
        assert_eq!(engine.active().map(|p| p.rotation), Some(0));
    }

    #[test]
    fn test_o_piece_rotate_is_rejected() {
        let mut engine = started_with(PieceKind::O);
        assert!(!engine.apply_action(GameAction::Rotate));
    }

    #[test]
    fn test_failed_move_leaves_state_unchanged() {
        let mut engine = started_with(PieceKind::I);
        for _ in 0..10 {
            engine.apply_action(GameAction::MoveLeft);
        }
        let before = engine.active();
        assert!(!engine.apply_action(GameAction::MoveLeft));
        assert_eq!(engine.active(), before);
        assert_eq!(before.map(|p| p.x), Some(0));
    }

    #[test]
    fn test_gravity_moves_piece_once_per_interval() {
        let mut engine = started_with(PieceKind::T);
        assert!(!engine.tick(GRAVITY_MS - 1));
        assert_eq!(engine.active().map(|p| p.y), Some(0));
        assert!(engine.tick(1));
        assert_eq!(engine.active().map(|p| p.y), Some(1));
    }

    #[test]
    fn test_soft_drop_locks_when_blocked() {
        let mut engine = started_with(PieceKind::O);
        let rows = BOARD_HEIGHT as i8 - 2;
        for _ in 0..rows {
            assert!(engine.apply_action(GameAction::SoftDrop));
        }
        assert!(engine.board().is_empty());
        assert!(engine.apply_action(GameAction::SoftDrop));
        assert!(engine.board().is_occupied(4, BOARD_HEIGHT as i8 - 1));
    }

    #[test]
    fn test_pending_garbage_applies_on_tick() {
        let mut engine = started_with(PieceKind::T);
        engine.add_pending_garbage(4);
        assert_eq!(engine.pending_garbage(), 4);
        assert!(engine.board().is_empty());

        engine.tick(0);

        assert_eq!(engine.pending_garbage(), 0);
        assert_eq!(engine.board().stack_height(), 4);
        for y in 16..BOARD_HEIGHT as usize {
            let holes = (0..BOARD_WIDTH as i8)
                .filter(|&x| engine.board().is_free(x, y as i8))
                .count();
            assert_eq!(holes, 1);
        }
    }

    #[test]
    fn test_garbage_lifts_overlapping_piece() {
        let mut engine = started_with(PieceKind::O);
        let bottom = BOARD_HEIGHT as i8 - 2;
        engine.set_active(Piece {
            kind: PieceKind::O,
            rotation: 0,
            x: 4,
            y: bottom,
        });
        engine.add_pending_garbage(2);
        engine.tick(0);

        assert!(!engine.game_over());
        let active = engine.active().expect("piece survives");
        assert!(active.is_valid(engine.board()));
        assert!(active.y < bottom);
    }

    #[test]
    fn test_garbage_overflow_is_game_over() {
        let mut engine = started_with(PieceKind::T);
        engine.board_mut().set(0, 0, Some(Tile::Garbage));
        engine.add_pending_garbage(1);
        engine.tick(0);

        assert!(engine.game_over());
        assert!(!engine.apply_action(GameAction::MoveLeft));
        assert!(!engine.tick(GRAVITY_MS));
    }

    #[test]
    fn test_blocked_spawn_sets_game_over_permanently() {
        let mut engine = started_with(PieceKind::O);
        for y in 2..BOARD_HEIGHT as i8 {
            engine.board_mut().fill_row_except(y, &[0], Tile::Garbage);
        }

        // The O locks in rows 0-1 over columns 4-5, where every spawn needs a cell.
        engine.apply_action(GameAction::HardDrop);
        assert!(engine.game_over());
        assert!(engine.active().is_none());
        engine.add_pending_garbage(3);
        assert_eq!(engine.pending_garbage(), 0);
    }

    #[test]
    fn test_restart_replaces_engine_with_same_seed() {
        let mut engine = LocalEngine::new(777);
        engine.start();
        let first = engine.active().map(|p| p.kind);
        engine.apply_action(GameAction::HardDrop);
        engine.restart();

        assert!(!engine.started());
        assert!(engine.board().is_empty());
        assert_eq!(engine.score(), 0);
        engine.start();
        assert_eq!(engine.active().map(|p| p.kind), first);
    }

    #[test]
    fn test_snapshot_reflects_engine() {
        let mut engine = started_with(PieceKind::L);
        engine.apply_action(GameAction::MoveRight);
        let snap = engine.snapshot();
        assert_eq!(&snap.board, engine.board());
        assert_eq!(snap.active, engine.active());
        assert_eq!(snap.next, engine.next_piece());
        assert!(snap.started);
        assert!(!snap.game_over);
    }
}
