//! One-ply heuristic opponent.
//!
//! Strategy, in priority order:
//! 1. Take a cell that wins immediately.
//! 2. Take a cell the opponent would win with.
//! 3. Pick an empty cell at random.
//!
//! Every candidate is tried on a copy of the game, so the vanishing rule
//! is taken into account: a line that needs the mark about to vanish is
//! not a threat.

use derive_more::Display;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{GameState, Mark, Pos};

/// Which rule picked the move.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Display, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceKind {
    #[display("win")]
    Win,
    #[display("block")]
    Block,
    #[display("random")]
    Random,
}

/// A recommended cell and the rule that chose it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct Advice {
    pub pos: Pos,
    pub kind: AdviceKind,
}

/// Heuristic move picker. Holds nothing but its random source, so the
/// random fallback can be seeded in tests.
#[derive(Debug, Clone)]
pub struct MoveAdvisor<R> {
    rng: R,
}

impl<R: Rng> MoveAdvisor<R> {
    pub fn new(rng: R) -> Self {
        MoveAdvisor { rng }
    }

    /// Pick a cell for `mark`, with the reason. `None` only when the
    /// board has no empty cell.
    #[instrument(level = "debug", skip(self, state), fields(mark = %mark))]
    pub fn advise(&mut self, state: &GameState, mark: Mark) -> Option<Advice> {
        if let Some(pos) = winning_move(state, mark) {
            debug!(%pos, "winning move");
            return Some(Advice {
                pos,
                kind: AdviceKind::Win,
            });
        }

        if let Some(pos) = winning_move(state, mark.opponent()) {
            debug!(%pos, "blocking move");
            return Some(Advice {
                pos,
                kind: AdviceKind::Block,
            });
        }

        let empty = state.empty_positions();
        if empty.is_empty() {
            return None;
        }
        let pos = empty[self.rng.random_range(0..empty.len())];
        debug!(%pos, "random move");
        Some(Advice {
            pos,
            kind: AdviceKind::Random,
        })
    }

    /// Pick a cell for `mark`.
    pub fn recommend(&mut self, state: &GameState, mark: Mark) -> Option<Pos> {
        self.advise(state, mark).map(|advice| advice.pos)
    }
}

/// First empty cell (row-major) where `mark` would win by playing now.
///
/// The real state is only read; each candidate is played on a copy with
/// the turn handed to `mark`.
pub fn winning_move(state: &GameState, mark: Mark) -> Option<Pos> {
    state.empty_positions().into_iter().find(|&pos| {
        let mut trial = state.duplicate();
        trial.force_turn(mark);
        trial
            .apply_move(pos)
            .is_ok_and(|outcome| outcome.win.is_some_and(|win| win.mark == mark))
    })
}
