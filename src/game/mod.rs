// Number-guessing rules: level defaults, scoring, guess validation and the
// per-session state transitions.

pub mod scorer;
pub mod session;
pub mod validator;

pub use scorer::Scorer;
pub use session::{apply_guess, new_session};
pub use validator::{GuessError, GuessValidator};

use crate::models::Level;

/// Built-in configuration for a level, used to seed the settings table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelDefaults {
    pub range_low: i32,
    pub range_high: i32,
    pub max_attempts: i32,
    pub points_per_attempt: i32,
    pub score_multiplier: f64,
}

pub fn default_settings(level: Level) -> LevelDefaults {
    match level {
        Level::Easy => LevelDefaults {
            range_low: 1,
            range_high: 10,
            max_attempts: 5,
            points_per_attempt: 10,
            score_multiplier: 1.0,
        },
        Level::Medium => LevelDefaults {
            range_low: 1,
            range_high: 50,
            max_attempts: 7,
            points_per_attempt: 15,
            score_multiplier: 2.0,
        },
        Level::Hard => LevelDefaults {
            range_low: 1,
            range_high: 100,
            max_attempts: 10,
            points_per_attempt: 20,
            score_multiplier: 3.0,
        },
    }
}
