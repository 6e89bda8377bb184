use chrono::{DateTime, Utc};
use rand::Rng;
use std::cmp::Ordering;
use uuid::Uuid;

use super::{GuessError, GuessValidator, Scorer};
use crate::models::{GameSession, GuessResult, Setting};

/// Outcome of applying one guess
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuessReport {
    pub result: GuessResult,
    /// True when this guess ended the game (won or out of attempts)
    pub finished: bool,
}

/// Create a fresh session for `user_id` from a level's settings.
///
/// The level configuration is copied onto the session so later admin edits
/// do not change the rules of a game already in progress.
pub fn new_session<R: Rng + ?Sized>(
    user_id: i64,
    setting: &Setting,
    rng: &mut R,
    now: DateTime<Utc>,
) -> GameSession {
    let secret_number = rng.random_range(setting.range_low..=setting.range_high);

    GameSession {
        id: Uuid::new_v4(),
        user_id,
        level: setting.level,
        secret_number,
        range_min: setting.range_low,
        range_max: setting.range_high,
        max_attempts: setting.max_attempts,
        points_per_attempt: setting.points_per_attempt,
        score_multiplier: setting.score_multiplier,
        attempts_left: setting.max_attempts,
        current_range_low: setting.range_low,
        current_range_high: setting.range_high,
        completed: false,
        won: false,
        score: 0,
        created_at: now,
        end_time: None,
    }
}

/// Apply a guess to an in-progress game.
///
/// Every accepted guess costs one attempt. A wrong guess clamps the active
/// range to exclude the wrong side of the guess; the range only ever
/// shrinks and always contains the secret.
pub fn apply_guess(
    game: &mut GameSession,
    guess: i32,
    now: DateTime<Utc>,
) -> Result<GuessReport, GuessError> {
    GuessValidator::validate(game, guess)?;

    game.attempts_left -= 1;

    let result = match guess.cmp(&game.secret_number) {
        Ordering::Equal => GuessResult::Correct,
        Ordering::Greater => GuessResult::TooHigh,
        Ordering::Less => GuessResult::TooLow,
    };

    match result {
        GuessResult::Correct => {
            game.completed = true;
            game.won = true;
            game.score = Scorer::for_session(game);
            game.end_time = Some(now);
        }
        GuessResult::TooHigh => {
            game.current_range_high = game.current_range_high.min(guess.saturating_sub(1));
        }
        GuessResult::TooLow => {
            game.current_range_low = game.current_range_low.max(guess.saturating_add(1));
        }
    }

    if !game.completed && game.attempts_left <= 0 {
        game.attempts_left = 0;
        game.completed = true;
        game.won = false;
        game.score = 0;
        game.end_time = Some(now);
    }

    debug_assert!(GuessValidator::is_consistent(game));

    Ok(GuessReport {
        result,
        finished: game.completed,
    })
}
