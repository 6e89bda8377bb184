use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Level;

pub const DEFAULT_WORD_ATTEMPTS: i32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Word {
    pub id: i64,
    pub text: String,
    pub difficulty: Level,
    pub max_attempts: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
