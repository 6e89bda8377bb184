use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Feedback {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub message: String,
    /// Set when the author was logged in
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub is_resolved: bool,
}
