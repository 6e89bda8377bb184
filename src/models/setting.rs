use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Level;

/// Per-level game configuration, editable from the admin panel
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Setting {
    pub id: i64,
    pub level: Level,
    pub range_low: i32,
    pub range_high: i32,
    pub max_attempts: i32,
    pub points_per_attempt: i32,
    pub score_multiplier: f64,
    pub is_active: bool,
}
