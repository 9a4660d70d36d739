//! Vanishing Tic-Tac-Toe Web API
//!
//! Serves a single game session over JSON for a browser frontend. The
//! human plays whichever side they like through `/move`; the frontend
//! asks the advisor to play the other side through `/advisor/move`,
//! choosing its own pacing between the two calls.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

use vanish_core::{Advice, AdviceKind, GameState, Mark, MoveAdvisor, MoveError, MoveOutcome, Pos};

// =============================================================================
// Configuration
// =============================================================================

/// Vanishing tic-tac-toe HTTP server
#[derive(Parser, Debug)]
#[command(name = "vanish-api", version, about, long_about = None)]
struct Config {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    /// Seed for the advisor's random fallback (OS entropy when omitted)
    #[arg(long)]
    seed: Option<u64>,
}

// =============================================================================
// Session State
// =============================================================================

/// The one game this server hosts
struct GameSession {
    game: GameState,
    advisor: MoveAdvisor<StdRng>,
}

impl GameSession {
    fn new(rng: StdRng) -> Self {
        Self {
            game: GameState::new(),
            advisor: MoveAdvisor::new(rng),
        }
    }
}

/// Shared application state
struct AppStateInner {
    session: Mutex<GameSession>,
}

type AppState = Arc<AppStateInner>;

// =============================================================================
// JSON Models
// =============================================================================

#[derive(Serialize)]
struct PlacementModel {
    x: u8,
    y: u8,
    player: Mark,
}

#[derive(Serialize)]
struct GameStateModel {
    /// `board[y][x]`
    board: Vec<Vec<Option<Mark>>>,
    current_player: Mark,
    result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    winning_line: Option<Vec<Pos>>,
    /// Active placements, oldest first
    history: Vec<PlacementModel>,
    next_to_vanish: Option<Pos>,
}

#[derive(Deserialize)]
struct MoveRequest {
    x: i64,
    y: i64,
}

#[derive(Serialize)]
struct MoveResponse {
    state: GameStateModel,
    placed: Pos,
    vanished: Option<Pos>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<AdviceKind>,
}

#[derive(Serialize)]
struct HintModel {
    x: u8,
    y: u8,
    reason: AdviceKind,
}

#[derive(Serialize)]
struct HealthModel {
    status: String,
}

#[derive(Serialize)]
struct ErrorModel {
    detail: String,
}

type ApiError = (StatusCode, Json<ErrorModel>);

// =============================================================================
// Conversion Functions
// =============================================================================

/// Convert GameState to JSON-serializable GameStateModel
fn game_to_model(game: &GameState) -> GameStateModel {
    let board = (0..3)
        .map(|y| {
            (0..3)
                .map(|x| Pos::new(x, y).and_then(|pos| game.cell(pos)))
                .collect()
        })
        .collect();

    let outcome = game.outcome();
    let result = match outcome.map(|win| win.mark) {
        Some(Mark::First) => "x_wins",
        Some(Mark::Second) => "o_wins",
        None => "ongoing",
    };

    let history = game
        .history()
        .iter()
        .map(|p| PlacementModel {
            x: p.pos.x(),
            y: p.pos.y(),
            player: p.mark,
        })
        .collect();

    GameStateModel {
        board,
        current_player: game.turn(),
        result: result.to_string(),
        winning_line: outcome.map(|win| win.line.to_vec()),
        history,
        next_to_vanish: game.next_to_vanish().map(|p| p.pos),
    }
}

fn move_response(game: &GameState, outcome: MoveOutcome, reason: Option<AdviceKind>) -> MoveResponse {
    MoveResponse {
        state: game_to_model(game),
        placed: outcome.placed.pos,
        vanished: outcome.evicted.map(|p| p.pos),
        reason,
    }
}

fn bad_request(detail: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorModel {
            detail: detail.into(),
        }),
    )
}

impl From<MoveError> for ErrorModel {
    fn from(err: MoveError) -> Self {
        ErrorModel {
            detail: err.to_string(),
        }
    }
}

fn move_error(err: MoveError) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(err.into()))
}

// =============================================================================
// Handlers
// =============================================================================

async fn get_game(State(state): State<AppState>) -> Json<GameStateModel> {
    let session = state.session.lock().await;
    Json(game_to_model(&session.game))
}

#[instrument(skip(state, req), fields(x = req.x, y = req.y))]
async fn make_move(
    State(state): State<AppState>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, ApiError> {
    let mut session = state.session.lock().await;
    let outcome = session
        .game
        .apply_move_xy(req.x, req.y)
        .map_err(move_error)?;

    if let Some(win) = outcome.win {
        info!(winner = %win.mark, "game over");
    }
    Ok(Json(move_response(&session.game, outcome, None)))
}

/// Let the advisor play the side to move
#[instrument(skip(state))]
async fn advisor_move(State(state): State<AppState>) -> Result<Json<MoveResponse>, ApiError> {
    let mut session = state.session.lock().await;
    if session.game.is_finished() {
        return Err(move_error(MoveError::GameOver));
    }

    let GameSession { game, advisor } = &mut *session;
    let Advice { pos, kind } = advisor
        .advise(game, game.turn())
        .ok_or_else(|| bad_request("No empty cell to play"))?;

    let outcome = game.apply_move(pos).map_err(|err| {
        warn!(%pos, %err, "advisor suggested an unplayable cell");
        move_error(err)
    })?;
    info!(%pos, reason = %kind, "advisor moved");
    if let Some(win) = outcome.win {
        info!(winner = %win.mark, "game over");
    }

    Ok(Json(move_response(game, outcome, Some(kind))))
}

/// Suggest a move for the side to play without playing it.
/// Works on a copy of the advisor, so the next `/advisor/move` plays the hinted cell.
async fn advisor_hint(State(state): State<AppState>) -> Json<Option<HintModel>> {
    let session = state.session.lock().await;
    let game = &session.game;
    let hint = if game.is_finished() {
        None
    } else {
        let mut advisor = session.advisor.clone();
        advisor.advise(game, game.turn()).map(|advice| HintModel {
            x: advice.pos.x(),
            y: advice.pos.y(),
            reason: advice.kind,
        })
    };
    Json(hint)
}

async fn reset_game(State(state): State<AppState>) -> Json<GameStateModel> {
    let mut session = state.session.lock().await;
    session.game.reset();
    info!("game reset");
    Json(game_to_model(&session.game))
}

async fn health() -> Json<HealthModel> {
    Json(HealthModel {
        status: "ok".to_string(),
    })
}

// =============================================================================
// Main
// =============================================================================

fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/game", get(get_game))
        .route("/move", post(make_move))
        .route("/advisor/move", post(advisor_move))
        .route("/advisor/hint", get(advisor_hint))
        .route("/reset", post(reset_game))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let state: AppState = Arc::new(AppStateInner {
        session: Mutex::new(GameSession::new(rng)),
    });

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "vanishing tic-tac-toe API listening");

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> Router {
        app(Arc::new(AppStateInner {
            session: Mutex::new(GameSession::new(StdRng::seed_from_u64(1))),
        }))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn play(app: &Router, x: i64, y: i64) -> (StatusCode, Value) {
        call(app, "POST", "/move", Some(json!({ "x": x, "y": y }))).await
    }

    #[tokio::test]
    async fn test_initial_game() {
        let app = test_app();
        let (status, body) = call(&app, "GET", "/game", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current_player"], "X");
        assert_eq!(body["result"], "ongoing");
        assert_eq!(body["board"], json!([[null, null, null], [null, null, null], [null, null, null]]));
        assert!(body.get("winning_line").is_none());
        assert_eq!(body["next_to_vanish"], Value::Null);
    }

    #[tokio::test]
    async fn test_move_updates_board() {
        let app = test_app();
        let (status, body) = play(&app, 2, 0).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["placed"], json!([2, 0]));
        assert_eq!(body["vanished"], Value::Null);
        assert_eq!(body["state"]["board"][0][2], "X");
        assert_eq!(body["state"]["current_player"], "O");
    }

    #[tokio::test]
    async fn test_occupied_and_out_of_bounds_rejected() {
        let app = test_app();
        play(&app, 1, 1).await;

        let (status, body) = play(&app, 1, 1).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "cell (1, 1) is already occupied");

        let (status, body) = play(&app, 3, 0).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "position (3, 0) is outside the 3x3 board");

        let (status, body) = play(&app, -1, 0).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "position (-1, 0) is outside the 3x3 board");

        let (status, body) = play(&app, 300, 0).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "position (300, 0) is outside the 3x3 board");

        let (_, body) = call(&app, "GET", "/game", None).await;
        assert_eq!(body["current_player"], "O");
        assert_eq!(body["history"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_seventh_move_reports_vanished_cell() {
        let app = test_app();
        for (x, y) in [(0, 0), (1, 0), (2, 0), (1, 1), (0, 1), (2, 1)] {
            play(&app, x, y).await;
        }
        let (_, body) = call(&app, "GET", "/game", None).await;
        assert_eq!(body["next_to_vanish"], json!([0, 0]));

        let (status, body) = play(&app, 1, 2).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["vanished"], json!([0, 0]));
        assert_eq!(body["state"]["board"][0][0], Value::Null);
        assert_eq!(body["state"]["history"][0], json!({ "x": 1, "y": 0, "player": "O" }));
    }

    #[tokio::test]
    async fn test_win_and_game_over() {
        let app = test_app();
        for (x, y) in [(0, 0), (1, 0), (1, 1), (2, 0)] {
            play(&app, x, y).await;
        }
        let (_, body) = play(&app, 2, 2).await;
        assert_eq!(body["state"]["result"], "x_wins");
        assert_eq!(body["state"]["winning_line"], json!([[0, 0], [1, 1], [2, 2]]));

        let (status, body) = play(&app, 0, 2).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "game is already over");

        let (status, _) = call(&app, "POST", "/advisor/move", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_advisor_blocks() {
        let app = test_app();
        play(&app, 0, 0).await;
        play(&app, 1, 1).await;
        play(&app, 1, 0).await;

        let (_, hint) = call(&app, "GET", "/advisor/hint", None).await;
        assert_eq!(hint, json!({ "x": 2, "y": 0, "reason": "block" }));

        let (status, body) = call(&app, "POST", "/advisor/move", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["placed"], json!([2, 0]));
        assert_eq!(body["reason"], "block");
        assert_eq!(body["state"]["board"][0][2], "O");
        assert_eq!(body["state"]["current_player"], "X");
    }

    #[tokio::test]
    async fn test_random_hint_matches_advisor_move() {
        let app = test_app();
        // Empty board: nothing to win or block, so the pick is random.
        let (_, first) = call(&app, "GET", "/advisor/hint", None).await;
        let (_, second) = call(&app, "GET", "/advisor/hint", None).await;
        assert_eq!(first["reason"], "random");
        assert_eq!(first, second);

        let (status, body) = call(&app, "POST", "/advisor/move", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reason"], "random");
        assert_eq!(body["placed"], json!([first["x"], first["y"]]));
    }

    #[tokio::test]
    async fn test_reset() {
        let app = test_app();
        play(&app, 0, 0).await;
        let (status, body) = call(&app, "POST", "/reset", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current_player"], "X");
        assert_eq!(body["history"], json!([]));
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
