//! Self-play between two move pickers.

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use vanish_core::{AdviceKind, GameState, Mark, MoveAdvisor, Pos};

/// How one side picks its moves.
#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
pub enum Strategy {
    /// Win, block, otherwise random.
    Advisor,
    /// Uniformly random empty cell.
    Random,
}

/// Summary of one finished (or abandoned) game.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GameRecord {
    /// Successful placements made.
    pub moves: usize,
    /// `None` when the move cap was hit first.
    pub winner: Option<Mark>,
    /// Placements removed by the vanishing rule.
    pub evictions: usize,
    /// Advisor moves by rule: win, block, random.
    pub advice: [u64; 3],
    /// Board after every move, when requested.
    pub transcript: Vec<String>,
}

/// Plays games between two strategies with a shared, seeded random source.
pub struct Arena {
    strategies: [Strategy; 2],
    max_moves: usize,
    rng: StdRng,
    advisor: MoveAdvisor<StdRng>,
}

impl Arena {
    pub fn new(first: Strategy, second: Strategy, max_moves: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let advisor = MoveAdvisor::new(StdRng::seed_from_u64(rng.random()));
        Self {
            strategies: [first, second],
            max_moves,
            rng,
            advisor,
        }
    }

    fn strategy(&self, mark: Mark) -> Strategy {
        match mark {
            Mark::First => self.strategies[0],
            Mark::Second => self.strategies[1],
        }
    }

    /// Pick a cell for the side to move.
    fn pick(&mut self, game: &GameState, record: &mut GameRecord) -> Option<Pos> {
        let mark = game.turn();
        match self.strategy(mark) {
            Strategy::Advisor => {
                let advice = self.advisor.advise(game, mark)?;
                let slot = match advice.kind {
                    AdviceKind::Win => 0,
                    AdviceKind::Block => 1,
                    AdviceKind::Random => 2,
                };
                record.advice[slot] += 1;
                Some(advice.pos)
            }
            Strategy::Random => {
                let empty = game.empty_positions();
                if empty.is_empty() {
                    return None;
                }
                Some(empty[self.rng.random_range(0..empty.len())])
            }
        }
    }

    /// Play one game from the empty board until somebody wins or the
    /// move cap is reached.
    pub fn play_game(&mut self, transcript: bool) -> GameRecord {
        let mut game = GameState::new();
        let mut record = GameRecord::default();

        while !game.is_finished() && record.moves < self.max_moves {
            let Some(pos) = self.pick(&game, &mut record) else {
                break;
            };
            let outcome = match game.apply_move(pos) {
                Ok(outcome) => outcome,
                Err(err) => {
                    // Pickers only choose empty cells of an unfinished game.
                    debug!(%pos, %err, "picked an unplayable cell");
                    break;
                }
            };

            record.moves += 1;
            if outcome.evicted.is_some() {
                record.evictions += 1;
            }
            if transcript {
                record.transcript.push(game.to_string());
            }
        }

        record.winner = game.winner();
        record
    }
}
