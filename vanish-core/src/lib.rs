//! Vanishing tic-tac-toe game logic with a bit-packed board.
//!
//! # Rules
//!
//! Classic 3x3 tic-tac-toe, except that only the six most recent
//! placements (counted across both players) stay on the board. The
//! seventh placement removes the oldest one before the board is checked
//! for a winner, so the board never fills up and there is no draw.
//!
//! # Board Encoding (32-bit)
//!
//! ```text
//! Bits 0-17:  Board state (9 cells × 2 bits per cell)
//! Bits 18-31: Unused (zero)
//!
//! Each cell (2 bits): 0 = empty, 1 = First (X), 2 = Second (O)
//!
//! Cell indices (row-major order, index = y * 3 + x):
//!   (0,0)=0  (1,0)=1  (2,0)=2
//!   (0,1)=3  (1,1)=4  (2,1)=5
//!   (0,2)=6  (1,2)=7  (2,2)=8
//! ```

mod advisor;
#[cfg(feature = "wasm")]
pub mod wasm;

use std::fmt;

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

pub use advisor::{winning_move, Advice, AdviceKind, MoveAdvisor};

/// Number of placements that stay on the board at once.
pub const WINDOW: usize = 6;

/// The symbol a side plays with.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Display, Serialize, Deserialize)]
#[repr(u8)]
pub enum Mark {
    /// Moves first, shown as `X`.
    #[display("X")]
    #[serde(rename = "X")]
    First = 1,
    /// Moves second, shown as `O`.
    #[display("O")]
    #[serde(rename = "O")]
    Second = 2,
}

impl Mark {
    /// Get the opposing mark.
    #[inline]
    pub fn opponent(self) -> Mark {
        match self {
            Mark::First => Mark::Second,
            Mark::Second => Mark::First,
        }
    }

    /// Convert from cell bits (1 or 2) to Mark.
    #[inline]
    pub fn from_bits(bits: u8) -> Option<Mark> {
        match bits {
            1 => Some(Mark::First),
            2 => Some(Mark::Second),
            _ => None,
        }
    }

    /// Single-character symbol (`X` or `O`).
    #[inline]
    pub fn symbol(self) -> char {
        match self {
            Mark::First => 'X',
            Mark::Second => 'O',
        }
    }
}

/// Position on the 3x3 board.
///
/// Stored as the row-major cell index, so a `Pos` is always in range.
/// Serialized as `[x, y]`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(try_from = "[u8; 2]", into = "[u8; 2]")]
pub struct Pos(u8);

impl Pos {
    /// Create a position from column `x` and row `y` (0-2 each).
    #[inline]
    pub fn new(x: u8, y: u8) -> Option<Pos> {
        (x < 3 && y < 3).then(|| Pos::at(x, y))
    }

    /// Unchecked constructor for the line table.
    const fn at(x: u8, y: u8) -> Pos {
        Pos(y * 3 + x)
    }

    /// Create a position from a row-major cell index (0-8).
    #[inline]
    pub fn from_index(index: usize) -> Option<Pos> {
        (index < 9).then_some(Pos(index as u8))
    }

    /// Row-major cell index (0-8).
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Column (0-2).
    #[inline]
    pub fn x(self) -> u8 {
        self.0 % 3
    }

    /// Row (0-2).
    #[inline]
    pub fn y(self) -> u8 {
        self.0 / 3
    }

    /// Iterate over all 9 positions, y outer and x inner.
    pub fn all() -> impl Iterator<Item = Pos> {
        (0..9).map(Pos)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x(), self.y())
    }
}

impl TryFrom<[u8; 2]> for Pos {
    type Error = MoveError;

    fn try_from([x, y]: [u8; 2]) -> Result<Self, Self::Error> {
        Pos::new(x, y).ok_or(MoveError::OutOfBounds {
            x: x.into(),
            y: y.into(),
        })
    }
}

impl From<Pos> for [u8; 2] {
    fn from(pos: Pos) -> Self {
        [pos.x(), pos.y()]
    }
}

/// Reasons a move is refused. The game state is never touched when one is returned.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, Error)]
pub enum MoveError {
    /// Somebody already won.
    #[display("game is already over")]
    GameOver,
    /// The target cell holds a mark.
    #[display("cell {pos} is already occupied")]
    Occupied { pos: Pos },
    /// Raw coordinates outside the board.
    #[display("position ({x}, {y}) is outside the 3x3 board")]
    OutOfBounds { x: i64, y: i64 },
}

/// Compact board contents - fits in a single u32.
///
/// See module documentation for encoding details.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Board(u32);

impl Board {
    /// Bits per cell.
    const CELL_BITS: u32 = 2;
    /// Mask for a single cell (0b11).
    const CELL_MASK: u32 = 0b11;

    /// The 8 winning lines in detection order: 3 rows, 3 columns, 2 diagonals.
    pub const WIN_LINES: [[Pos; 3]; 8] = [
        [Pos::at(0, 0), Pos::at(1, 0), Pos::at(2, 0)], // Row 0
        [Pos::at(0, 1), Pos::at(1, 1), Pos::at(2, 1)], // Row 1
        [Pos::at(0, 2), Pos::at(1, 2), Pos::at(2, 2)], // Row 2
        [Pos::at(0, 0), Pos::at(0, 1), Pos::at(0, 2)], // Col 0
        [Pos::at(1, 0), Pos::at(1, 1), Pos::at(1, 2)], // Col 1
        [Pos::at(2, 0), Pos::at(2, 1), Pos::at(2, 2)], // Col 2
        [Pos::at(0, 0), Pos::at(1, 1), Pos::at(2, 2)], // Main diagonal
        [Pos::at(2, 0), Pos::at(1, 1), Pos::at(0, 2)], // Anti-diagonal
    ];

    /// Create an empty board.
    #[inline]
    pub fn new() -> Board {
        Board(0)
    }

    /// Get the mark at a position, if any.
    #[inline]
    pub fn get(&self, pos: Pos) -> Option<Mark> {
        let bits = (self.0 >> (pos.0 as u32 * Self::CELL_BITS)) & Self::CELL_MASK;
        Mark::from_bits(bits as u8)
    }

    /// Write or clear a cell.
    #[inline]
    pub fn set(&mut self, pos: Pos, mark: Option<Mark>) {
        let shift = pos.0 as u32 * Self::CELL_BITS;
        let value = mark.map_or(0, |m| m as u32);
        self.0 = (self.0 & !(Self::CELL_MASK << shift)) | (value << shift);
    }

    /// Check if a cell is empty.
    #[inline]
    pub fn is_empty(&self, pos: Pos) -> bool {
        self.get(pos).is_none()
    }

    /// Number of occupied cells.
    pub fn occupied(&self) -> usize {
        Pos::all().filter(|&pos| !self.is_empty(pos)).count()
    }

    /// All empty positions in row-major order.
    pub fn empty_positions(&self) -> Vec<Pos> {
        Pos::all().filter(|&pos| self.is_empty(pos)).collect()
    }

    /// First line (in `WIN_LINES` order) held entirely by one mark.
    pub fn winning_line(&self) -> Option<(Mark, [Pos; 3])> {
        Self::WIN_LINES.iter().find_map(|&line| {
            let [a, b, c] = line;
            let mark = self.get(a)?;
            (self.get(b) == Some(mark) && self.get(c) == Some(mark)).then_some((mark, line))
        })
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..3 {
            for x in 0..3 {
                let symbol = self.get(Pos::at(x, y)).map_or('.', Mark::symbol);
                if x > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{symbol}")?;
            }
            if y < 2 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// One mark placed on the board.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub pos: Pos,
    pub mark: Mark,
}

impl Placement {
    /// Filler for unused history slots.
    const VACANT: Placement = Placement {
        pos: Pos(0),
        mark: Mark::First,
    };
}

/// Active placements, oldest first, bounded by [`WINDOW`].
///
/// Fixed-size storage so cloning a game never shares anything with the
/// original.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct History {
    records: [Placement; WINDOW],
    len: usize,
}

impl History {
    /// Create an empty history.
    pub const fn new() -> Self {
        History {
            records: [Placement::VACANT; WINDOW],
            len: 0,
        }
    }

    /// Record a placement. When the window is already full the oldest
    /// placement is dropped and returned.
    pub fn push(&mut self, placement: Placement) -> Option<Placement> {
        if self.len < WINDOW {
            self.records[self.len] = placement;
            self.len += 1;
            return None;
        }
        let oldest = self.records[0];
        self.records.copy_within(1.., 0);
        self.records[WINDOW - 1] = placement;
        Some(oldest)
    }

    /// Oldest active placement.
    #[inline]
    pub fn oldest(&self) -> Option<Placement> {
        self.as_slice().first().copied()
    }

    /// Number of active placements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if no placement is active.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if the next push will evict.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == WINDOW
    }

    /// Active placements as a slice, oldest first.
    #[inline]
    pub fn as_slice(&self) -> &[Placement] {
        &self.records[..self.len]
    }

    /// Iterate over active placements, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = Placement> + '_ {
        self.as_slice().iter().copied()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

/// A completed line.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct Win {
    pub mark: Mark,
    pub line: [Pos; 3],
}

/// What a successful move did.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MoveOutcome {
    /// The mark that was placed.
    pub placed: Placement,
    /// The oldest placement, removed because the window overflowed.
    pub evicted: Option<Placement>,
    /// Set when this move ended the game.
    pub win: Option<Win>,
}

/// Full game state: board, vanishing window, turn and result.
///
/// The board always holds exactly the placements in the history. The
/// game is finished exactly when a winning line has been recorded.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GameState {
    board: Board,
    history: History,
    turn: Mark,
    outcome: Option<Win>,
}

impl GameState {
    /// Create a new game with `First` to move.
    pub fn new() -> Self {
        GameState {
            board: Board::new(),
            history: History::new(),
            turn: Mark::First,
            outcome: None,
        }
    }

    /// Place the current player's mark at `pos`.
    ///
    /// A seventh active placement evicts the oldest one before the win
    /// check, so a line relying on the evicted mark does not count.
    #[instrument(level = "debug", skip(self), fields(pos = %pos, mark = %self.turn))]
    pub fn apply_move(&mut self, pos: Pos) -> Result<MoveOutcome, MoveError> {
        if self.outcome.is_some() {
            return Err(MoveError::GameOver);
        }
        if !self.board.is_empty(pos) {
            return Err(MoveError::Occupied { pos });
        }

        let mover = self.turn;
        let placed = Placement { pos, mark: mover };
        self.board.set(pos, Some(mover));

        let evicted = self.history.push(placed);
        if let Some(old) = evicted {
            self.board.set(old.pos, None);
            debug!(pos = %old.pos, mark = %old.mark, "oldest placement vanished");
        }

        let win = self.board.winning_line().map(|(mark, line)| {
            if mark != mover {
                warn!(%mark, %mover, "completed line does not belong to the mover");
            }
            Win { mark, line }
        });

        match win {
            Some(win) => {
                debug!(mark = %win.mark, "line completed");
                self.outcome = Some(win);
            }
            None => self.turn = mover.opponent(),
        }

        Ok(MoveOutcome {
            placed,
            evicted,
            win,
        })
    }

    /// Same as [`apply_move`](Self::apply_move) for raw coordinates.
    /// Out-of-range coordinates are rejected, never clamped.
    pub fn apply_move_xy(&mut self, x: i64, y: i64) -> Result<MoveOutcome, MoveError> {
        let pos = u8::try_from(x)
            .ok()
            .zip(u8::try_from(y).ok())
            .and_then(|(x, y)| Pos::new(x, y))
            .ok_or(MoveError::OutOfBounds { x, y })?;
        self.apply_move(pos)
    }

    /// Mark at a position, if any.
    #[inline]
    pub fn cell(&self, pos: Pos) -> Option<Mark> {
        self.board.get(pos)
    }

    /// Empty positions in row-major order (y outer, x inner).
    pub fn empty_positions(&self) -> Vec<Pos> {
        self.board.empty_positions()
    }

    /// Independent copy for trial moves.
    pub fn duplicate(&self) -> GameState {
        self.clone()
    }

    /// Back to an empty board with `First` to move.
    pub fn reset(&mut self) {
        *self = GameState::new();
    }

    /// Mark that moves next, or the winner once the game is over.
    #[inline]
    pub fn turn(&self) -> Mark {
        self.turn
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    #[inline]
    pub fn winner(&self) -> Option<Mark> {
        self.outcome.map(|win| win.mark)
    }

    #[inline]
    pub fn winning_line(&self) -> Option<[Pos; 3]> {
        self.outcome.map(|win| win.line)
    }

    #[inline]
    pub fn outcome(&self) -> Option<Win> {
        self.outcome
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Placement the next successful move will remove.
    pub fn next_to_vanish(&self) -> Option<Placement> {
        if self.history.is_full() {
            self.history.oldest()
        } else {
            None
        }
    }

    /// Hand the move to `mark` without placing anything. Only used on
    /// trial copies by the advisor.
    pub(crate) fn force_turn(&mut self, mark: Mark) {
        self.turn = mark;
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.board)?;
        match self.outcome {
            Some(win) => write!(f, "{} wins", win.mark),
            None => write!(f, "{} to move", self.turn),
        }
    }
}
