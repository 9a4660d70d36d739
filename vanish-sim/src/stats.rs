//! Simulation statistics tracking.

use std::time::Instant;

use tracing::info;
use vanish_core::Mark;

use crate::selfplay::GameRecord;

/// Statistics collected across self-play games.
#[derive(Debug, Default)]
pub struct SimStats {
    /// Games played to completion or to the move cap
    pub games: u64,

    /// Breakdown of outcomes
    pub first_wins: u64,
    pub second_wins: u64,
    /// Games that hit the move cap without a winner
    pub unfinished: u64,

    /// Placements across all games
    pub total_moves: u64,

    /// Placements removed by the vanishing rule
    pub evictions: u64,

    /// Longest game, in placements
    pub longest_game: u64,

    /// Advisor moves by rule: win, block, random
    pub advice: [u64; 3],

    /// For rate calculation
    start_time: Option<Instant>,
    last_log_time: Option<Instant>,
    last_log_games: u64,
}

impl SimStats {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            last_log_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Fold one game into the totals
    pub fn record_game(&mut self, record: &GameRecord) {
        self.games += 1;
        match record.winner {
            Some(Mark::First) => self.first_wins += 1,
            Some(Mark::Second) => self.second_wins += 1,
            None => self.unfinished += 1,
        }
        self.total_moves += record.moves as u64;
        self.evictions += record.evictions as u64;
        self.longest_game = self.longest_game.max(record.moves as u64);
        for (total, count) in self.advice.iter_mut().zip(record.advice) {
            *total += count;
        }
    }

    /// Mean placements per game
    pub fn average_length(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.total_moves as f64 / self.games as f64
        }
    }

    /// Share of games won by `mark`, in percent
    pub fn win_rate(&self, mark: Mark) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        let wins = match mark {
            Mark::First => self.first_wins,
            Mark::Second => self.second_wins,
        };
        100.0 * wins as f64 / self.games as f64
    }

    /// Get current games per second
    pub fn games_per_sec(&self) -> f64 {
        if let Some(start) = self.start_time {
            let elapsed = start.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                return self.games as f64 / elapsed;
            }
        }
        0.0
    }

    /// Check if we should log progress
    pub fn should_log(&self, interval_secs: u64) -> bool {
        if let Some(last) = self.last_log_time {
            last.elapsed().as_secs() >= interval_secs
        } else {
            true
        }
    }

    /// Log progress and reset log timer
    pub fn log_progress(&mut self, target_games: u64) {
        let now = Instant::now();

        // Rate since last log
        let rate = match self.last_log_time {
            Some(last) => {
                let elapsed = last.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    (self.games - self.last_log_games) as f64 / elapsed
                } else {
                    0.0
                }
            }
            None => self.games_per_sec(),
        };

        info!(
            games = self.games,
            target = target_games,
            rate = %format!("{rate:.0}/s"),
            x_wins = self.first_wins,
            o_wins = self.second_wins,
            unfinished = self.unfinished,
            "progress"
        );

        self.last_log_time = Some(now);
        self.last_log_games = self.games;
    }

    /// Print final summary
    pub fn print_summary(&self) {
        println!("Games played: {}", self.games);
        println!(
            "  - X wins: {} ({:.1}%)",
            self.first_wins,
            self.win_rate(Mark::First)
        );
        println!(
            "  - O wins: {} ({:.1}%)",
            self.second_wins,
            self.win_rate(Mark::Second)
        );
        println!("  - Unfinished (move cap): {}", self.unfinished);
        println!("Average game length: {:.2} moves", self.average_length());
        println!("Longest game: {} moves", self.longest_game);
        println!("Vanished pieces: {}", self.evictions);
        println!(
            "Advisor moves: win={} block={} random={}",
            self.advice[0], self.advice[1], self.advice[2]
        );

        if let Some(start) = self.start_time {
            let elapsed = start.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                println!("Average rate: {:.0} games/sec", self.games as f64 / elapsed);
            }
        }
    }
}
