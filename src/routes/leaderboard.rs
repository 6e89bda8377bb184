use axum::{extract::State, Json};
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc};

use crate::{
    db::queries,
    error::AppError,
    models::{GameScoreEntry, Level, PlayerScoreEntry},
    AppState,
};

pub const LEADERBOARD_LIMIT: i64 = 10;

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub top_players: Vec<PlayerScoreEntry>,
    pub recent_winners: Vec<GameScoreEntry>,
    /// Keyed by level name
    pub level_leaders: BTreeMap<&'static str, Vec<GameScoreEntry>>,
}

pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let top_players = queries::top_players(&state.db, LEADERBOARD_LIMIT).await?;
    let recent_winners = queries::recent_winners(&state.db, LEADERBOARD_LIMIT).await?;

    let mut level_leaders = BTreeMap::new();
    for level in Level::ALL {
        let leaders = queries::level_leaders(&state.db, level, LEADERBOARD_LIMIT).await?;
        level_leaders.insert(level.as_str(), leaders);
    }

    Ok(Json(LeaderboardResponse {
        top_players,
        recent_winners,
        level_leaders,
    }))
}
