//! Hidden Difficulty Derivation
//!
//! Computes a player's effective win streak from their session history
//! and maps it to the card flip-back duration and the score multiplier.
//! Both values are snapshotted onto the session at start and never
//! recomputed during play.

use crate::game::session::MatchStatus;

/// Base flip-back duration in seconds.
pub const BASE_FLIP_DURATION: f64 = 0.6;

/// Added flip-back seconds per effective win beyond the first.
pub const FLIP_DURATION_STEP: f64 = 0.12;

/// Effective wins beyond this count no longer increase the duration.
pub const FLIP_DURATION_WIN_CAP: u32 = 10;

/// Consecutive losses that reset the effective win count.
const LOSS_STREAK_RESET: u32 = 5;

/// Count a player's effective wins from their terminal history.
///
/// `history` holds the outcomes of the player's Win/Lose sessions on
/// one level, ordered newest-first. Scanning newest to oldest, the
/// first run of 5 consecutive losses acts as a reset point: only wins
/// strictly newer than that run count. Without such a run, every win
/// in the history counts.
pub fn effective_wins(history: &[MatchStatus]) -> u32 {
    let mut loss_run = 0u32;
    let mut reset_end = None;

    for (i, status) in history.iter().enumerate() {
        match status {
            MatchStatus::Lose => loss_run += 1,
            _ => loss_run = 0,
        }
        if loss_run >= LOSS_STREAK_RESET {
            // i is the oldest loss of the run; the run occupies
            // i-4..=i, so only entries before i-4 are newer than it.
            reset_end = Some(i + 1 - LOSS_STREAK_RESET as usize);
            break;
        }
    }

    let newer = match reset_end {
        Some(end) => &history[..end],
        None => history,
    };
    newer.iter().filter(|s| **s == MatchStatus::Win).count() as u32
}

/// Map effective wins to the card flip-back duration in seconds.
///
/// 0 or 1 wins stay at the base duration; from 2 wins each additional
/// win adds a step, capped at 10 wins.
pub fn flip_duration(wins: u32) -> f64 {
    if wins <= 1 {
        return BASE_FLIP_DURATION;
    }
    let capped = wins.min(FLIP_DURATION_WIN_CAP);
    BASE_FLIP_DURATION + (capped - 1) as f64 * FLIP_DURATION_STEP
}

/// Reward/penalty multiplier for the session.
///
/// Doubles both rewards and penalties once the player enters the game
/// with more than one effective win. Fixed for the session's lifetime.
pub fn score_multiplier(wins: u32) -> u32 {
    if wins > 1 {
        2
    } else {
        1
    }
}
