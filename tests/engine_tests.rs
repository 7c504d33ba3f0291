//! Local engine tests through the public API

use versus_tetris::core::{garbage_for_lines, line_clear_score, LocalEngine, PieceQueue};
use versus_tetris::types::{GameAction, PieceKind, Tile, BOARD_HEIGHT, BOARD_WIDTH, GRAVITY_MS};

/// A started engine whose first piece is `kind`
fn started_with_first(kind: PieceKind) -> LocalEngine {
    for seed in 1..10_000 {
        let mut engine = LocalEngine::new(seed);
        engine.start();
        if engine.active().map(|p| p.kind) == Some(kind) {
            return engine;
        }
    }
    panic!("no seed spawns {:?} first", kind);
}

#[test]
fn test_engine_lifecycle() {
    let mut engine = LocalEngine::new(12345);
    assert!(!engine.started());
    assert!(!engine.apply_action(GameAction::HardDrop));
    assert!(!engine.tick(GRAVITY_MS));

    engine.start();
    assert!(engine.started());
    assert!(engine.active().is_some());
    assert!(!engine.game_over());
}

#[test]
fn test_i_piece_hard_drop_lands_on_floor() {
    let mut engine = started_with_first(PieceKind::I);
    let piece = engine.active().unwrap();
    assert_eq!((piece.x, piece.y, piece.rotation), (3, 0, 0));

    assert!(engine.apply_action(GameAction::HardDrop));

    let bottom = BOARD_HEIGHT as i8 - 1;
    for x in 0..BOARD_WIDTH as i8 {
        let expected = if (3..=6).contains(&x) {
            Some(Tile::Piece(PieceKind::I))
        } else {
            None
        };
        assert_eq!(engine.board().get(x, bottom), Some(expected), "column {}", x);
    }
    assert_eq!(engine.lines(), 0);
    assert_eq!(engine.score(), 0);
    assert_eq!(engine.take_outgoing_garbage(), 0);

    let event = engine.take_last_lock().unwrap();
    assert_eq!(event.kind, PieceKind::I);
    assert_eq!(event.lines_cleared, 0);
    assert!(engine.active().is_some(), "next piece spawned");
}

#[test]
fn test_gravity_moves_one_row_per_interval() {
    let mut engine = LocalEngine::with_gravity(99, 200);
    engine.start();
    let y0 = engine.active().unwrap().y;

    assert!(!engine.tick(150));
    assert_eq!(engine.active().unwrap().y, y0);
    assert!(engine.tick(50));
    assert_eq!(engine.active().unwrap().y, y0 + 1);
}

#[test]
fn test_soft_drop_moves_then_locks() {
    let mut engine = LocalEngine::new(5);
    engine.start();
    let y0 = engine.active().unwrap().y;

    assert!(engine.apply_action(GameAction::SoftDrop));
    assert_eq!(engine.active().unwrap().y, y0 + 1);

    let mut locked = None;
    for _ in 0..BOARD_HEIGHT {
        assert!(engine.apply_action(GameAction::SoftDrop));
        locked = engine.take_last_lock();
        if locked.is_some() {
            break;
        }
    }
    assert!(locked.is_some(), "soft drop on the floor locks the piece");
    assert!(!engine.board().is_empty());
}

#[test]
fn test_moves_blocked_by_walls() {
    let mut engine = LocalEngine::new(3);
    engine.start();
    for _ in 0..BOARD_WIDTH {
        engine.apply_action(GameAction::MoveLeft);
    }
    let min_x = engine.active().unwrap().cells().map(|(x, _)| x).min();
    assert_eq!(min_x, Some(0));
    assert!(!engine.apply_action(GameAction::MoveLeft));
}

#[test]
fn test_o_piece_does_not_rotate() {
    let mut engine = started_with_first(PieceKind::O);
    assert!(!engine.apply_action(GameAction::Rotate));
    assert_eq!(engine.active().unwrap().rotation, 0);
}

#[test]
fn test_session_actions_are_not_engine_actions() {
    let mut engine = LocalEngine::new(3);
    engine.start();
    assert!(!engine.apply_action(GameAction::ToggleReady));
    assert!(!engine.apply_action(GameAction::Quit));
}

#[test]
fn test_pending_garbage_applied_on_next_tick() {
    let mut engine = LocalEngine::new(11);
    engine.start();
    engine.add_pending_garbage(3);
    assert_eq!(engine.pending_garbage(), 3);

    assert!(engine.tick(0));
    assert_eq!(engine.pending_garbage(), 0);
    for y in 17..BOARD_HEIGHT as i8 {
        let holes = (0..BOARD_WIDTH as i8)
            .filter(|&x| engine.board().get(x, y) == Some(None))
            .count();
        assert_eq!(holes, 1);
    }
    assert!(!engine.game_over());
}

#[test]
fn test_zero_garbage_is_ignored() {
    let mut engine = LocalEngine::new(11);
    engine.add_pending_garbage(0);
    assert_eq!(engine.pending_garbage(), 0);
}

#[test]
fn test_stacking_in_the_middle_eventually_tops_out() {
    let mut engine = LocalEngine::new(2024);
    engine.start();
    let mut drops = 0;
    while !engine.game_over() && drops < 500 {
        engine.apply_action(GameAction::HardDrop);
        drops += 1;
    }
    assert!(engine.game_over());
    assert!(engine.active().is_none());
    assert_eq!(engine.lines(), 0);

    // A finished engine stays frozen.
    let board = engine.board().clone();
    assert!(!engine.apply_action(GameAction::MoveLeft));
    assert!(!engine.tick(GRAVITY_MS * 4));
    engine.add_pending_garbage(2);
    assert_eq!(engine.pending_garbage(), 0);
    assert_eq!(engine.board(), &board);
}

#[test]
fn test_restart_replaces_the_whole_engine() {
    let mut engine = LocalEngine::with_gravity(77, 300);
    engine.start();
    engine.apply_action(GameAction::HardDrop);
    engine.add_pending_garbage(2);

    engine.restart();
    assert!(!engine.started());
    assert!(engine.board().is_empty());
    assert_eq!(engine.score(), 0);
    assert_eq!(engine.pending_garbage(), 0);
    assert_eq!(engine.seed(), 77);
    assert_eq!(engine.gravity_ms(), 300);
}

#[test]
fn test_same_seed_same_pieces() {
    let mut a = PieceQueue::new(31337);
    let mut b = PieceQueue::new(31337);
    for _ in 0..100 {
        assert_eq!(a.draw(), b.draw());
    }
}

#[test]
fn test_snapshot_reflects_engine() {
    let mut engine = LocalEngine::new(8);
    engine.start();
    let snapshot = engine.snapshot();
    assert!(snapshot.started);
    assert!(!snapshot.game_over);
    assert_eq!(snapshot.active, engine.active());
    assert_eq!(snapshot.next, engine.next_piece());

    let composed = snapshot.composed_board();
    for (x, y) in engine.active().unwrap().cells() {
        assert!(composed.is_occupied(x, y));
    }
    assert!(snapshot.board.is_empty());
}

#[test]
fn test_score_and_garbage_tables() {
    assert_eq!(
        (0..=4).map(line_clear_score).collect::<Vec<_>>(),
        vec![0, 100, 200, 300, 400]
    );
    assert_eq!(
        (0..=4).map(garbage_for_lines).collect::<Vec<_>>(),
        vec![0, 0, 1, 2, 4]
    );
}
