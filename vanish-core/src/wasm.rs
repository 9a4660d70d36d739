//! WASM bindings for vanish-core
//!
//! Provides a JavaScript-friendly API for the browser frontend. The page
//! supplies the advisor seed as a plain number
//! (e.g. `Math.floor(Math.random() * 2 ** 32)`), so nothing here needs OS
//! entropy. Absent values come back as `null`, never `undefined`.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::{GameState, Mark, MoveAdvisor, Pos};

/// WASM-friendly wrapper around a game and its advisor
#[wasm_bindgen]
pub struct WasmGame {
    inner: GameState,
    advisor: MoveAdvisor<StdRng>,
}

#[wasm_bindgen]
impl WasmGame {
    /// Create a new game; `seed` drives the advisor's random fallback
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u32) -> WasmGame {
        WasmGame {
            inner: GameState::new(),
            advisor: MoveAdvisor::new(advisor_rng(seed)),
        }
    }

    /// Apply a move for the side to play.
    /// Returns `{ success, vanished: {x, y} | null }`
    #[wasm_bindgen(js_name = applyMove)]
    pub fn apply_move(&mut self, x: u8, y: u8) -> JsValue {
        let result = match self.inner.apply_move_xy(x.into(), y.into()) {
            Ok(outcome) => MoveResult {
                success: true,
                vanished: outcome.evicted.map(|p| Cell::from(p.pos)),
            },
            Err(_) => MoveResult {
                success: false,
                vanished: None,
            },
        };
        to_js(&result)
    }

    /// Mark at a cell: "X", "O", or null for empty / out of range
    #[wasm_bindgen(js_name = getCell)]
    pub fn get_cell(&self, x: u8, y: u8) -> JsValue {
        mark_js(mark_at(&self.inner, x, y))
    }

    /// Empty cells as `[{x, y}, ...]`, row by row
    #[wasm_bindgen(js_name = emptyCells)]
    pub fn empty_cells(&self) -> JsValue {
        let cells: Vec<Cell> = self.inner.empty_positions().into_iter().map(Cell::from).collect();
        to_js(&cells)
    }

    /// Side to move ("X" or "O")
    #[wasm_bindgen(js_name = currentPlayer)]
    pub fn current_player(&self) -> String {
        self.inner.turn().to_string()
    }

    #[wasm_bindgen(js_name = isGameOver)]
    pub fn is_game_over(&self) -> bool {
        self.inner.is_finished()
    }

    /// Winner ("X" or "O"), null while the game is on
    pub fn winner(&self) -> JsValue {
        mark_js(self.inner.winner())
    }

    /// Winning line as `[{x, y}, {x, y}, {x, y}]`, or null
    #[wasm_bindgen(js_name = winningLine)]
    pub fn winning_line(&self) -> JsValue {
        let line = self
            .inner
            .winning_line()
            .map(|line| line.map(Cell::from));
        to_js(&line)
    }

    /// Cell that will vanish on the next move, or null
    #[wasm_bindgen(js_name = nextToVanish)]
    pub fn next_to_vanish(&self) -> JsValue {
        to_js(&self.inner.next_to_vanish().map(|p| Cell::from(p.pos)))
    }

    /// Advisor's pick for `player` ("X" or "O"), or null.
    /// Does not play the move.
    #[wasm_bindgen(js_name = aiMove)]
    pub fn ai_move(&mut self, player: &str) -> JsValue {
        let mark = match player {
            "X" => Mark::First,
            "O" => Mark::Second,
            _ => return JsValue::NULL,
        };
        let pos = self.advisor.recommend(&self.inner, mark);
        to_js(&pos.map(Cell::from))
    }

    /// Back to an empty board with X to move
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Independent copy of the game (the advisor's random stream is copied too)
    #[wasm_bindgen(js_name = clone)]
    pub fn clone_game(&self) -> WasmGame {
        WasmGame {
            inner: self.inner.duplicate(),
            advisor: self.advisor.clone(),
        }
    }
}

fn advisor_rng(seed: u32) -> StdRng {
    StdRng::seed_from_u64(seed.into())
}

fn mark_at(game: &GameState, x: u8, y: u8) -> Option<Mark> {
    Pos::new(x, y).and_then(|pos| game.cell(pos))
}

fn mark_js(mark: Option<Mark>) -> JsValue {
    match mark {
        Some(mark) => JsValue::from_str(&mark.to_string()),
        None => JsValue::NULL,
    }
}

// json_compatible maps `None` to null rather than undefined.
fn to_js<T: Serialize>(value: &T) -> JsValue {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap_or(JsValue::NULL)
}

/// Serializable cell coordinate for JavaScript
#[derive(Serialize)]
struct Cell {
    x: u8,
    y: u8,
}

impl From<Pos> for Cell {
    fn from(pos: Pos) -> Self {
        Cell { x: pos.x(), y: pos.y() }
    }
}

/// Serializable move result for JavaScript
#[derive(Serialize)]
struct MoveResult {
    success: bool,
    vanished: Option<Cell>,
}
