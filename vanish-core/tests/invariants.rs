//! Randomized game sweeps
//!
//! Plays many seeded games (random moves, advisor moves, and attempts on
//! occupied cells) and checks after every call that:
//! - at most six cells are occupied and the board matches the history
//! - evictions remove the oldest active placement
//! - the turn passes only after successful non-winning moves
//! - wins go to the mover along one of the eight lines
//! - an unfinished game always has an empty cell

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use vanish_core::{Board, GameState, Mark, MoveAdvisor, MoveError, Placement, Pos, WINDOW};

const GAMES: u64 = 500;
const MAX_CALLS: usize = 120;

/// Board contents rebuilt from the history alone.
fn board_from_history(game: &GameState) -> Board {
    let mut board = Board::new();
    for placement in game.history().iter() {
        board.set(placement.pos, Some(placement.mark));
    }
    board
}

fn check_consistent(game: &GameState) {
    assert!(game.board().occupied() <= WINDOW);
    assert_eq!(game.history().len(), game.board().occupied());
    assert_eq!(*game.board(), board_from_history(game));
    assert_eq!(game.is_finished(), game.winning_line().is_some());
    assert_eq!(game.is_finished(), game.winner().is_some());
    if !game.is_finished() {
        assert!(!game.empty_positions().is_empty());
    }
}

/// Pick a cell: mostly advisor or random empty cells, sometimes an occupied one.
fn choose(game: &GameState, rng: &mut StdRng, advisor: &mut MoveAdvisor<StdRng>) -> Pos {
    match rng.random_range(0..10) {
        0..=3 => advisor
            .recommend(game, game.turn())
            .expect("board always has an empty cell"),
        4 => Pos::from_index(rng.random_range(0..9)).unwrap(),
        _ => {
            let empty = game.empty_positions();
            empty[rng.random_range(0..empty.len())]
        }
    }
}

#[test]
fn test_random_games_keep_invariants() {
    let mut wins = 0;

    for seed in 0..GAMES {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut advisor = MoveAdvisor::new(StdRng::seed_from_u64(seed ^ 0xA5A5));
        let mut game = GameState::new();

        for _ in 0..MAX_CALLS {
            check_consistent(&game);
            if game.is_finished() {
                break;
            }

            let pos = choose(&game, &mut rng, &mut advisor);
            let before = game.clone();
            let mover = game.turn();
            let oldest = game.history().oldest();
            let was_full = game.history().is_full();

            match game.apply_move(pos) {
                Ok(outcome) => {
                    assert_eq!(outcome.placed, Placement { pos, mark: mover });
                    assert_eq!(game.cell(pos), Some(mover));

                    if was_full {
                        assert_eq!(outcome.evicted, oldest);
                        let evicted = outcome.evicted.unwrap();
                        assert_eq!(game.cell(evicted.pos), None);
                    } else {
                        assert_eq!(outcome.evicted, None);
                    }

                    match outcome.win {
                        Some(win) => {
                            wins += 1;
                            assert_eq!(win.mark, mover);
                            assert_eq!(game.winner(), Some(mover));
                            assert_eq!(game.turn(), mover);
                            assert!(Board::WIN_LINES.contains(&win.line));
                            for p in win.line {
                                assert_eq!(game.cell(p), Some(mover));
                            }
                        }
                        None => assert_eq!(game.turn(), mover.opponent()),
                    }
                }
                Err(MoveError::Occupied { pos: taken }) => {
                    assert_eq!(taken, pos);
                    assert_eq!(game, before);
                }
                Err(err) => panic!("unexpected error {err} in seed {seed}"),
            }
        }
    }

    assert!(wins > 0, "no game produced a winner");
}

#[test]
fn test_queries_are_idempotent() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut game = GameState::new();

    for _ in 0..20 {
        if game.is_finished() {
            game.reset();
        }
        let empty = game.empty_positions();
        let cells: Vec<Option<Mark>> = Pos::all().map(|p| game.cell(p)).collect();
        let snapshot = game.clone();

        assert_eq!(game.empty_positions(), empty);
        assert_eq!(Pos::all().map(|p| game.cell(p)).collect::<Vec<_>>(), cells);
        assert_eq!(game, snapshot);

        let pos = empty[rng.random_range(0..empty.len())];
        game.apply_move(pos).unwrap();
    }
}

#[test]
fn test_trial_copies_leave_original_untouched() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut advisor = MoveAdvisor::new(StdRng::seed_from_u64(8));
    let mut game = GameState::new();

    for _ in 0..40 {
        if game.is_finished() {
            break;
        }
        let before = game.clone();
        let advice = advisor.advise(&game, game.turn()).unwrap();
        advisor.advise(&game, game.turn().opponent());
        assert_eq!(game, before);

        let pos = if rng.random_bool(0.5) {
            advice.pos
        } else {
            let empty = game.empty_positions();
            empty[rng.random_range(0..empty.len())]
        };
        game.apply_move(pos).unwrap();
    }
}
