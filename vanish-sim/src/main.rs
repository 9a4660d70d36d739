//! Vanishing Tic-Tac-Toe Self-Play Simulator
//!
//! Pits the advisor against itself or a random player and reports how
//! games end under the vanishing rule.

mod selfplay;
mod stats;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::selfplay::{Arena, Strategy};
use crate::stats::SimStats;

/// Self-play simulator for the vanishing tic-tac-toe advisor
#[derive(Parser, Debug)]
#[command(name = "vanish-sim", version, about, long_about = None)]
struct Cli {
    /// Number of games to play
    #[arg(short, long, default_value_t = 10_000)]
    games: u64,

    /// Seed for every random choice (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Strategy for X
    #[arg(long, value_enum, default_value_t = Strategy::Advisor)]
    first: Strategy,

    /// Strategy for O
    #[arg(long, value_enum, default_value_t = Strategy::Advisor)]
    second: Strategy,

    /// Placements after which a game counts as unfinished
    #[arg(long, default_value_t = 200)]
    max_moves: usize,

    /// Seconds between progress logs
    #[arg(long, default_value_t = 5)]
    log_interval: u64,

    /// Print the board after every move of the first game
    #[arg(long)]
    transcript: bool,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let seed = cli.seed.unwrap_or_else(rand::random);
    println!("Vanishing Tic-Tac-Toe Simulator");
    println!("===============================");
    println!("X: {:?}  O: {:?}", cli.first, cli.second);
    println!("Games: {}  Move cap: {}  Seed: {}", cli.games, cli.max_moves, seed);
    println!();

    // Set up SIGINT handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to install Ctrl-C handler")?;

    let mut arena = Arena::new(cli.first, cli.second, cli.max_moves, seed);
    let mut stats = SimStats::new();
    let start = Instant::now();

    for i in 0..cli.games {
        if !running.load(Ordering::SeqCst) {
            warn!(played = stats.games, "interrupted");
            break;
        }

        let show = cli.transcript && i == 0;
        let record = arena.play_game(show);
        if show {
            for (n, board) in record.transcript.iter().enumerate() {
                println!("Move {}:\n{}\n", n + 1, board);
            }
        }
        stats.record_game(&record);

        if stats.should_log(cli.log_interval) {
            stats.log_progress(cli.games);
        }
    }

    info!(elapsed = ?start.elapsed(), "simulation finished");

    println!("\n===============================");
    stats.print_summary();
    Ok(())
}
