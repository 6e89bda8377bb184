use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteExecutor, FromRow, Result, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    forms::{CleanWord, EditUserForm, FeedbackForm, LevelSettingsForm},
    game,
    models::{
        Feedback, GameScoreEntry, GameSession, Guess, GuessResult, Level, PlayerScoreEntry,
        Setting, User, Word, DEFAULT_WORD_ATTEMPTS,
    },
    pagination::{Page, PageRequest},
};

// =============================================================================
// Users
// =============================================================================

/// Fields needed to create an account
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub is_admin: bool,
}

pub async fn get_user<'e>(executor: impl SqliteExecutor<'e>, user_id: i64) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

pub async fn get_user_by_email<'e>(
    executor: impl SqliteExecutor<'e>,
    email: &str,
) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(executor)
        .await
}

pub async fn get_user_by_username<'e>(
    executor: impl SqliteExecutor<'e>,
    username: &str,
) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(executor)
        .await
}

/// Whether another user (other than `exclude_id`) already has this username
pub async fn username_taken<'e>(
    executor: impl SqliteExecutor<'e>,
    username: &str,
    exclude_id: Option<i64>,
) -> Result<bool> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 AND (?2 IS NULL OR id != ?2))",
    )
    .bind(username)
    .bind(exclude_id)
    .fetch_one(executor)
    .await
}

/// Whether another user (other than `exclude_id`) already has this email
pub async fn email_taken<'e>(
    executor: impl SqliteExecutor<'e>,
    email: &str,
    exclude_id: Option<i64>,
) -> Result<bool> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 AND (?2 IS NULL OR id != ?2))",
    )
    .bind(email)
    .bind(exclude_id)
    .fetch_one(executor)
    .await
}

pub async fn create_user<'e>(executor: impl SqliteExecutor<'e>, user: &NewUser<'_>) -> Result<User> {
    let now = Utc::now();

    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password_hash, created_at, last_seen, is_admin)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(user.username)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(now)
    .bind(now)
    .bind(user.is_admin)
    .fetch_one(executor)
    .await
}

pub async fn touch_last_seen<'e>(executor: impl SqliteExecutor<'e>, user_id: i64) -> Result<()> {
    sqlx::query("UPDATE users SET last_seen = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Invalidate every token issued to the user so far
pub async fn bump_token_version<'e>(executor: impl SqliteExecutor<'e>, user_id: i64) -> Result<()> {
    sqlx::query("UPDATE users SET token_version = token_version + 1 WHERE id = ?")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn update_user<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: i64,
    form: &EditUserForm,
) -> Result<Option<User>> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET username = ?, email = ?, is_admin = ?, is_active = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(form.username())
    .bind(form.email())
    .bind(form.is_admin)
    .bind(form.is_active)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn toggle_user_active<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: i64,
) -> Result<Option<User>> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET is_active = NOT is_active WHERE id = ? RETURNING *",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Delete a user. Their games and guesses cascade; feedback is kept but detached.
pub async fn delete_user<'e>(executor: impl SqliteExecutor<'e>, user_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_users(pool: &SqlitePool, request: PageRequest) -> Result<Page<User>> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users ORDER BY username COLLATE NOCASE LIMIT ? OFFSET ?",
    )
    .bind(request.limit())
    .bind(request.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page::new(users, request, total))
}

/// Fold a finished game into the player's statistics
pub async fn record_game_result<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: i64,
    won: bool,
    score: i32,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET games_played = games_played + 1,
            games_won = games_won + ?,
            best_score = MAX(best_score, ?)
        WHERE id = ?
        "#,
    )
    .bind(i32::from(won))
    .bind(score)
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(())
}

// =============================================================================
// Level settings
// =============================================================================

/// Insert the built-in configuration for any level that has no row yet
pub async fn seed_default_settings(pool: &SqlitePool) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for level in Level::ALL {
        let defaults = game::default_settings(level);
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO settings
                (level, range_low, range_high, max_attempts, points_per_attempt, score_multiplier, is_active)
            VALUES (?, ?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(level)
        .bind(defaults.range_low)
        .bind(defaults.range_high)
        .bind(defaults.max_attempts)
        .bind(defaults.points_per_attempt)
        .bind(defaults.score_multiplier)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Difficulty order regardless of how ranges have been edited
const LEVEL_ORDER: &str =
    "CASE level WHEN 'easy' THEN 1 WHEN 'medium' THEN 2 WHEN 'hard' THEN 3 ELSE 4 END, id";

pub async fn list_settings<'e>(executor: impl SqliteExecutor<'e>) -> Result<Vec<Setting>> {
    sqlx::query_as::<_, Setting>(&format!("SELECT * FROM settings ORDER BY {LEVEL_ORDER}"))
        .fetch_all(executor)
        .await
}

pub async fn list_active_settings<'e>(executor: impl SqliteExecutor<'e>) -> Result<Vec<Setting>> {
    sqlx::query_as::<_, Setting>(&format!(
        "SELECT * FROM settings WHERE is_active = 1 ORDER BY {LEVEL_ORDER}"
    ))
    .fetch_all(executor)
    .await
}

pub async fn get_setting<'e>(executor: impl SqliteExecutor<'e>, level: Level) -> Result<Option<Setting>> {
    sqlx::query_as::<_, Setting>("SELECT * FROM settings WHERE level = ?")
        .bind(level)
        .fetch_optional(executor)
        .await
}

pub async fn update_setting<'e>(
    executor: impl SqliteExecutor<'e>,
    level: Level,
    form: &LevelSettingsForm,
) -> Result<Option<Setting>> {
    sqlx::query_as::<_, Setting>(
        r#"
        UPDATE settings
        SET range_low = ?, range_high = ?, max_attempts = ?,
            points_per_attempt = ?, score_multiplier = ?, is_active = ?
        WHERE level = ?
        RETURNING *
        "#,
    )
    .bind(form.range_low)
    .bind(form.range_high)
    .bind(form.max_attempts)
    .bind(form.points_per_attempt)
    .bind(form.score_multiplier)
    .bind(form.is_active)
    .bind(level)
    .fetch_optional(executor)
    .await
}

// =============================================================================
// Game sessions and guesses
// =============================================================================

pub async fn insert_game_session<'e>(executor: impl SqliteExecutor<'e>, game: &GameSession) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO game_sessions (
            id, user_id, level, secret_number, range_min, range_max,
            max_attempts, points_per_attempt, score_multiplier, attempts_left,
            current_range_low, current_range_high, completed, won, score,
            created_at, end_time
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(game.id)
    .bind(game.user_id)
    .bind(game.level)
    .bind(game.secret_number)
    .bind(game.range_min)
    .bind(game.range_max)
    .bind(game.max_attempts)
    .bind(game.points_per_attempt)
    .bind(game.score_multiplier)
    .bind(game.attempts_left)
    .bind(game.current_range_low)
    .bind(game.current_range_high)
    .bind(game.completed)
    .bind(game.won)
    .bind(game.score)
    .bind(game.created_at)
    .bind(game.end_time)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn get_game_session<'e>(
    executor: impl SqliteExecutor<'e>,
    game_id: Uuid,
) -> Result<Option<GameSession>> {
    sqlx::query_as::<_, GameSession>("SELECT * FROM game_sessions WHERE id = ?")
        .bind(game_id)
        .fetch_optional(executor)
        .await
}

/// Persist the mutable part of a session after a guess
pub async fn update_game_progress<'e>(executor: impl SqliteExecutor<'e>, game: &GameSession) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE game_sessions
        SET attempts_left = ?, current_range_low = ?, current_range_high = ?,
            completed = ?, won = ?, score = ?, end_time = ?
        WHERE id = ?
        "#,
    )
    .bind(game.attempts_left)
    .bind(game.current_range_low)
    .bind(game.current_range_high)
    .bind(game.completed)
    .bind(game.won)
    .bind(game.score)
    .bind(game.end_time)
    .bind(game.id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn insert_guess<'e>(
    executor: impl SqliteExecutor<'e>,
    game_id: Uuid,
    guess_value: i32,
    result: GuessResult,
    created_at: DateTime<Utc>,
) -> Result<Guess> {
    sqlx::query_as::<_, Guess>(
        r#"
        INSERT INTO guesses (game_id, guess_value, result, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(game_id)
    .bind(guess_value)
    .bind(result)
    .bind(created_at)
    .fetch_one(executor)
    .await
}

/// Guess history, newest first
pub async fn list_guesses<'e>(executor: impl SqliteExecutor<'e>, game_id: Uuid) -> Result<Vec<Guess>> {
    sqlx::query_as::<_, Guess>("SELECT * FROM guesses WHERE game_id = ? ORDER BY id DESC")
        .bind(game_id)
        .fetch_all(executor)
        .await
}

pub async fn recent_games_for_user<'e>(
    executor: impl SqliteExecutor<'e>,
    user_id: i64,
    limit: i64,
) -> Result<Vec<GameSession>> {
    sqlx::query_as::<_, GameSession>(
        "SELECT * FROM game_sessions WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(executor)
    .await
}

pub async fn list_game_sessions(pool: &SqlitePool, request: PageRequest) -> Result<Page<GameSession>> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM game_sessions")
        .fetch_one(pool)
        .await?;
    let games = sqlx::query_as::<_, GameSession>(
        "SELECT * FROM game_sessions ORDER BY created_at DESC LIMIT ? OFFSET ?",
    )
    .bind(request.limit())
    .bind(request.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page::new(games, request, total))
}

// =============================================================================
// Leaderboard
// =============================================================================

pub async fn top_players<'e>(executor: impl SqliteExecutor<'e>, limit: i64) -> Result<Vec<PlayerScoreEntry>> {
    sqlx::query_as::<_, PlayerScoreEntry>(
        r#"
        SELECT username, best_score, games_won
        FROM users
        WHERE best_score > 0
        ORDER BY best_score DESC, username
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(executor)
    .await
}

pub async fn recent_winners<'e>(executor: impl SqliteExecutor<'e>, limit: i64) -> Result<Vec<GameScoreEntry>> {
    sqlx::query_as::<_, GameScoreEntry>(
        r#"
        SELECT g.id AS game_id, u.username, g.level, g.score, g.end_time
        FROM game_sessions g
        JOIN users u ON u.id = g.user_id
        WHERE g.won = 1
        ORDER BY g.end_time DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(executor)
    .await
}

pub async fn level_leaders<'e>(
    executor: impl SqliteExecutor<'e>,
    level: Level,
    limit: i64,
) -> Result<Vec<GameScoreEntry>> {
    sqlx::query_as::<_, GameScoreEntry>(
        r#"
        SELECT g.id AS game_id, u.username, g.level, g.score, g.end_time
        FROM game_sessions g
        JOIN users u ON u.id = g.user_id
        WHERE g.won = 1 AND g.level = ?
        ORDER BY g.score DESC, g.end_time
        LIMIT ?
        "#,
    )
    .bind(level)
    .bind(limit)
    .fetch_all(executor)
    .await
}

// =============================================================================
// Feedback
// =============================================================================

pub async fn create_feedback<'e>(
    executor: impl SqliteExecutor<'e>,
    form: &FeedbackForm,
    user_id: Option<i64>,
) -> Result<Feedback> {
    sqlx::query_as::<_, Feedback>(
        r#"
        INSERT INTO feedback (name, email, message, user_id, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(form.name.trim())
    .bind(form.email.trim())
    .bind(form.message.trim())
    .bind(user_id)
    .bind(Utc::now())
    .fetch_one(executor)
    .await
}

pub async fn list_feedback(pool: &SqlitePool, request: PageRequest) -> Result<Page<Feedback>> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM feedback")
        .fetch_one(pool)
        .await?;
    let items = sqlx::query_as::<_, Feedback>(
        "SELECT * FROM feedback ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
    )
    .bind(request.limit())
    .bind(request.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page::new(items, request, total))
}

pub async fn toggle_feedback_resolved<'e>(
    executor: impl SqliteExecutor<'e>,
    feedback_id: i64,
) -> Result<Option<Feedback>> {
    sqlx::query_as::<_, Feedback>(
        "UPDATE feedback SET is_resolved = NOT is_resolved WHERE id = ? RETURNING *",
    )
    .bind(feedback_id)
    .fetch_optional(executor)
    .await
}

pub async fn delete_feedback<'e>(executor: impl SqliteExecutor<'e>, feedback_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM feedback WHERE id = ?")
        .bind(feedback_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Words
// =============================================================================

/// Escape LIKE wildcards so a search term matches literally
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Words ordered by text, optionally filtered by a case-insensitive substring
pub async fn list_words(
    pool: &SqlitePool,
    search: Option<&str>,
    request: PageRequest,
) -> Result<Page<Word>> {
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(like_pattern);

    let total = sqlx::query_scalar::<_, i64>(
        r#"SELECT COUNT(*) FROM words WHERE (?1 IS NULL OR text LIKE ?1 ESCAPE '\')"#,
    )
    .bind(pattern.as_deref())
    .fetch_one(pool)
    .await?;

    let words = sqlx::query_as::<_, Word>(
        r#"
        SELECT * FROM words
        WHERE (?1 IS NULL OR text LIKE ?1 ESCAPE '\')
        ORDER BY text, id
        LIMIT ?2 OFFSET ?3
        "#,
    )
    .bind(pattern.as_deref())
    .bind(request.limit())
    .bind(request.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page::new(words, request, total))
}

pub async fn create_word<'e>(executor: impl SqliteExecutor<'e>, word: &CleanWord) -> Result<Word> {
    sqlx::query_as::<_, Word>(
        r#"
        INSERT INTO words (text, difficulty, max_attempts, is_active, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&word.text)
    .bind(word.difficulty)
    .bind(word.max_attempts.unwrap_or(DEFAULT_WORD_ATTEMPTS))
    .bind(word.is_active.unwrap_or(true))
    .bind(Utc::now())
    .fetch_one(executor)
    .await
}

/// Update a word; fields left out of the form keep their stored value
pub async fn update_word<'e>(
    executor: impl SqliteExecutor<'e>,
    word_id: i64,
    word: &CleanWord,
) -> Result<Option<Word>> {
    sqlx::query_as::<_, Word>(
        r#"
        UPDATE words
        SET text = ?, difficulty = ?,
            max_attempts = COALESCE(?, max_attempts),
            is_active = COALESCE(?, is_active)
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&word.text)
    .bind(word.difficulty)
    .bind(word.max_attempts)
    .bind(word.is_active)
    .bind(word_id)
    .fetch_optional(executor)
    .await
}

pub async fn delete_word<'e>(executor: impl SqliteExecutor<'e>, word_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM words WHERE id = ?")
        .bind(word_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Insert each word not already stored at this difficulty. Returns how many
/// were inserted.
pub async fn import_words(
    conn: &mut SqliteConnection,
    difficulty: Level,
    words: &[String],
) -> Result<u64> {
    let now = Utc::now();
    let mut inserted = 0;

    for text in words {
        let result = sqlx::query(
            r#"
            INSERT INTO words (text, difficulty, max_attempts, is_active, created_at)
            SELECT ?1, ?2, ?3, 1, ?4
            WHERE NOT EXISTS (SELECT 1 FROM words WHERE text = ?1 AND difficulty = ?2)
            "#,
        )
        .bind(text)
        .bind(difficulty)
        .bind(DEFAULT_WORD_ATTEMPTS)
        .bind(now)
        .execute(&mut *conn)
        .await?;
        inserted += result.rows_affected();
    }

    Ok(inserted)
}

// =============================================================================
// Admin dashboard
// =============================================================================

#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct DashboardCounts {
    pub total_users: i64,
    pub active_users: i64,
    pub new_users: i64,
    pub total_games: i64,
    pub active_games: i64,
    pub total_feedback: i64,
    pub unresolved_feedback: i64,
    pub total_words: i64,
}

/// Headline counts; `new_since` bounds the "new users" window
pub async fn dashboard_counts<'e>(
    executor: impl SqliteExecutor<'e>,
    new_since: DateTime<Utc>,
) -> Result<DashboardCounts> {
    sqlx::query_as::<_, DashboardCounts>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users) AS total_users,
            (SELECT COUNT(*) FROM users WHERE is_active = 1) AS active_users,
            (SELECT COUNT(*) FROM users WHERE created_at >= ?1) AS new_users,
            (SELECT COUNT(*) FROM game_sessions) AS total_games,
            (SELECT COUNT(*) FROM game_sessions WHERE completed = 0) AS active_games,
            (SELECT COUNT(*) FROM feedback) AS total_feedback,
            (SELECT COUNT(*) FROM feedback WHERE is_resolved = 0) AS unresolved_feedback,
            (SELECT COUNT(*) FROM words) AS total_words
        "#,
    )
    .bind(new_since)
    .fetch_one(executor)
    .await
}
