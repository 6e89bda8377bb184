use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub is_admin: bool,
    pub is_active: bool,
    pub games_played: i32,
    pub games_won: i32,
    pub best_score: i32,
    /// Bumped on logout; tokens carrying an older version are rejected
    #[serde(skip_serializing, default)]
    pub token_version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserStats {
    pub total_games: i32,
    pub games_won: i32,
    pub win_percentage: f64,
    pub best_score: i32,
}

impl User {
    pub fn win_percentage(&self) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            (self.games_won as f64 / self.games_played as f64) * 100.0
        }
    }

    pub fn to_stats(&self) -> UserStats {
        UserStats {
            total_games: self.games_played,
            games_won: self.games_won,
            win_percentage: self.win_percentage(),
            best_score: self.best_score,
        }
    }
}
