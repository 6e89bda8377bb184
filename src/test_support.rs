// Shared fixtures for database-backed tests.

use chrono::Utc;
use rand::{rngs::StdRng, SeedableRng};
use sqlx::SqlitePool;
use std::{sync::Arc, time::Duration};

use crate::{
    config::Config,
    db::{self, queries, RetryPolicy},
    game,
    models::{GameSession, Setting},
    AppState,
};

/// A fresh in-memory database with migrations applied and level settings
/// seeded. A single connection keeps every query on the same database.
pub async fn test_pool() -> SqlitePool {
    let pool = db::create_pool("sqlite::memory:", 1, Duration::from_secs(1))
        .await
        .expect("in-memory database should open");
    db::migrate(&pool).await.expect("migrations should apply");
    queries::seed_default_settings(&pool)
        .await
        .expect("settings should seed");
    pool
}

pub async fn test_state() -> Arc<AppState> {
    let config = Config::for_tests();
    let retry = RetryPolicy::new(
        config.database.retry_attempts,
        Duration::from_millis(config.database.retry_base_delay_ms),
    );
    Arc::new(AppState {
        config,
        db: test_pool().await,
        retry,
    })
}

/// An unsaved session for `user_id` with a fixed secret
pub fn session_with_secret(user_id: i64, setting: &Setting, secret: i32) -> GameSession {
    let mut rng = StdRng::seed_from_u64(99);
    let mut game = game::new_session(user_id, setting, &mut rng, Utc::now());
    game.secret_number = secret;
    game
}
