use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Difficulty tier. Also used to tag words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum Level {
    Easy,
    Medium,
    Hard,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Easy, Level::Medium, Level::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Easy => "easy",
            Level::Medium => "medium",
            Level::Hard => "hard",
        }
    }

    /// Legacy numeric difficulty codes (1 = easy .. 3 = hard)
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Level::Easy),
            2 => Some(Level::Medium),
            3 => Some(Level::Hard),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown level '{0}'")]
pub struct UnknownLevel(pub String);

impl FromStr for Level {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Level::Easy),
            "medium" => Ok(Level::Medium),
            "hard" => Ok(Level::Hard),
            other => other
                .parse::<i32>()
                .ok()
                .and_then(Level::from_code)
                .ok_or_else(|| UnknownLevel(s.to_string())),
        }
    }
}

/// Classification of a single guess
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum GuessResult {
    TooHigh,
    TooLow,
    Correct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    InProgress,
    Won,
    Lost,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GameSession {
    pub id: Uuid,
    pub user_id: i64,
    pub level: Level,
    pub secret_number: i32,
    /// Full range of the level when the game started
    pub range_min: i32,
    pub range_max: i32,
    pub max_attempts: i32,
    pub points_per_attempt: i32,
    pub score_multiplier: f64,
    pub attempts_left: i32,
    pub current_range_low: i32,
    pub current_range_high: i32,
    pub completed: bool,
    pub won: bool,
    pub score: i32,
    pub created_at: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl GameSession {
    pub fn status(&self) -> GameStatus {
        match (self.completed, self.won) {
            (false, _) => GameStatus::InProgress,
            (true, true) => GameStatus::Won,
            (true, false) => GameStatus::Lost,
        }
    }

    pub fn attempts_used(&self) -> i32 {
        self.max_attempts - self.attempts_left
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Guess {
    pub id: i64,
    pub game_id: Uuid,
    pub guess_value: i32,
    pub result: GuessResult,
    pub created_at: DateTime<Utc>,
}

/// Player-facing view of a session. The secret is only revealed once the
/// game is over.
#[derive(Debug, Clone, Serialize)]
pub struct GameView {
    pub id: Uuid,
    pub level: Level,
    pub status: GameStatus,
    pub attempts_left: i32,
    pub max_attempts: i32,
    pub range_low: i32,
    pub range_high: i32,
    pub score: i32,
    pub score_multiplier: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_number: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl From<&GameSession> for GameView {
    fn from(game: &GameSession) -> Self {
        Self {
            id: game.id,
            level: game.level,
            status: game.status(),
            attempts_left: game.attempts_left,
            max_attempts: game.max_attempts,
            range_low: game.current_range_low,
            range_high: game.current_range_high,
            score: game.score,
            score_multiplier: game.score_multiplier,
            secret_number: game.completed.then_some(game.secret_number),
            created_at: game.created_at,
            end_time: game.end_time,
        }
    }
}

/// Leaderboard row for a single finished game
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GameScoreEntry {
    pub game_id: Uuid,
    pub username: String,
    pub level: Level,
    pub score: i32,
    pub end_time: Option<DateTime<Utc>>,
}

/// Leaderboard row for a player's best result
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlayerScoreEntry {
    pub username: String,
    pub best_score: i32,
    pub games_won: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!("easy".parse::<Level>(), Ok(Level::Easy));
        assert_eq!(" Hard ".parse::<Level>(), Ok(Level::Hard));
        assert_eq!("2".parse::<Level>(), Ok(Level::Medium));
        assert!("legendary".parse::<Level>().is_err());
        assert!("4".parse::<Level>().is_err());
    }

    #[test]
    fn test_level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Level::Medium).unwrap(), "\"medium\"");
        assert_eq!(Level::Hard.to_string(), "hard");
    }

    #[test]
    fn test_guess_result_serialization() {
        assert_eq!(
            serde_json::to_string(&GuessResult::TooHigh).unwrap(),
            "\"too_high\""
        );
    }
}
