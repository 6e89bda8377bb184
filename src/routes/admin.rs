use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::AdminUser,
    db::{queries, with_retry},
    error::AppError,
    extract::{AppJson, AppPath, AppQuery},
    forms::{EditUserForm, LevelSettingsForm, ValidationErrors, WordForm, WordImportForm},
    models::{Feedback, GameSession, Guess, Level, Setting, User, UserStats, Word},
    pagination::{Page, PageParams},
    routes::{auth::DUPLICATE_ACCOUNT_MESSAGE, game::PROFILE_RECENT_GAMES},
    wordlist::WordList,
    AppState,
};

/// Window for the "new users" dashboard count
const NEW_USER_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub counts: queries::DashboardCounts,
    pub settings: Vec<Setting>,
}

#[derive(Debug, Serialize)]
pub struct UserDetailResponse {
    pub user: User,
    pub stats: UserStats,
    pub recent_games: Vec<GameSession>,
}

#[derive(Debug, Serialize)]
pub struct GameDetailResponse {
    pub game: GameSession,
    pub username: Option<String>,
    pub guesses: Vec<Guess>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WordQuery {
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: u64,
    /// Already stored at this difficulty
    pub already_present: u64,
    /// Duplicated within the upload or too long
    pub skipped: usize,
}

// =============================================================================
// Dashboard
// =============================================================================

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<DashboardResponse>, AppError> {
    let since = Utc::now() - Duration::days(NEW_USER_WINDOW_DAYS);
    let counts = queries::dashboard_counts(&state.db, since).await?;
    let settings = queries::list_settings(&state.db).await?;

    Ok(Json(DashboardResponse { counts, settings }))
}

// =============================================================================
// Users
// =============================================================================

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<Page<User>>, AppError> {
    let request = params.resolve(state.config.admin.page_size);
    Ok(Json(queries::list_users(&state.db, request).await?))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    AppPath(user_id): AppPath<i64>,
) -> Result<Json<UserDetailResponse>, AppError> {
    let user = queries::get_user(&state.db, user_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    let recent_games =
        queries::recent_games_for_user(&state.db, user_id, PROFILE_RECENT_GAMES).await?;

    Ok(Json(UserDetailResponse {
        stats: user.to_stats(),
        user,
        recent_games,
    }))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    AppPath(user_id): AppPath<i64>,
    AppJson(form): AppJson<EditUserForm>,
) -> Result<Json<User>, AppError> {
    form.validate()?;
    if user_id == admin.id() && !form.is_active {
        return Err(AppError::forbidden("You cannot deactivate your own account"));
    }

    let email = form.email();
    let mut errors = ValidationErrors::new();
    if queries::username_taken(&state.db, form.username(), Some(user_id)).await? {
        errors.add("username", "That username is already taken");
    }
    if queries::email_taken(&state.db, &email, Some(user_id)).await? {
        errors.add("email", "That email is already registered");
    }
    errors.into_result()?;

    let pool = &state.db;
    let form = &form;
    let user = with_retry(&state.retry, "update user", || async move {
        Ok(queries::update_user(pool, user_id, form).await?)
    })
    .await
    .map_err(|e| e.on_unique_violation(DUPLICATE_ACCOUNT_MESSAGE))?
    .ok_or(AppError::NotFound("User"))?;

    tracing::info!("Admin {} updated user {}", admin.id(), user.id);

    Ok(Json(user))
}

pub async fn toggle_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    AppPath(user_id): AppPath<i64>,
) -> Result<Json<User>, AppError> {
    if user_id == admin.id() {
        return Err(AppError::forbidden("You cannot deactivate your own account"));
    }

    let pool = &state.db;
    let user = with_retry(&state.retry, "toggle user", || async move {
        Ok(queries::toggle_user_active(pool, user_id).await?)
    })
    .await?
    .ok_or(AppError::NotFound("User"))?;

    tracing::info!(
        "Admin {} {} user {}",
        admin.id(),
        if user.is_active { "activated" } else { "deactivated" },
        user.id
    );

    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    AppPath(user_id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    if user_id == admin.id() {
        return Err(AppError::forbidden("You cannot delete your own account"));
    }

    let pool = &state.db;
    let deleted = with_retry(&state.retry, "delete user", || async move {
        Ok(queries::delete_user(pool, user_id).await?)
    })
    .await?;

    if !deleted {
        return Err(AppError::NotFound("User"));
    }
    tracing::info!("Admin {} deleted user {}", admin.id(), user_id);

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Games
// =============================================================================

pub async fn list_games(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<Page<GameSession>>, AppError> {
    let request = params.resolve(state.config.admin.page_size);
    Ok(Json(queries::list_game_sessions(&state.db, request).await?))
}

pub async fn get_game(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    AppPath(game_id): AppPath<Uuid>,
) -> Result<Json<GameDetailResponse>, AppError> {
    let game = queries::get_game_session(&state.db, game_id)
        .await?
        .ok_or(AppError::NotFound("Game"))?;
    let username = queries::get_user(&state.db, game.user_id)
        .await?
        .map(|u| u.username);
    let guesses = queries::list_guesses(&state.db, game.id).await?;

    Ok(Json(GameDetailResponse {
        game,
        username,
        guesses,
    }))
}

// =============================================================================
// Feedback
// =============================================================================

pub async fn list_feedback(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<Page<Feedback>>, AppError> {
    let request = params.resolve(state.config.admin.page_size);
    Ok(Json(queries::list_feedback(&state.db, request).await?))
}

pub async fn resolve_feedback(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    AppPath(feedback_id): AppPath<i64>,
) -> Result<Json<Feedback>, AppError> {
    let pool = &state.db;
    let feedback = with_retry(&state.retry, "resolve feedback", || async move {
        Ok(queries::toggle_feedback_resolved(pool, feedback_id).await?)
    })
    .await?
    .ok_or(AppError::NotFound("Feedback"))?;

    Ok(Json(feedback))
}

pub async fn delete_feedback(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    AppPath(feedback_id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    let pool = &state.db;
    let deleted = with_retry(&state.retry, "delete feedback", || async move {
        Ok(queries::delete_feedback(pool, feedback_id).await?)
    })
    .await?;

    if !deleted {
        return Err(AppError::NotFound("Feedback"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Words
// =============================================================================

pub async fn list_words(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    AppQuery(query): AppQuery<WordQuery>,
) -> Result<Json<Page<Word>>, AppError> {
    let request = PageParams {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve(state.config.admin.page_size);

    Ok(Json(
        queries::list_words(&state.db, query.q.as_deref(), request).await?,
    ))
}

pub async fn create_word(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    AppJson(form): AppJson<WordForm>,
) -> Result<(StatusCode, Json<Word>), AppError> {
    let word = form.validate()?;

    let pool = &state.db;
    let clean = &word;
    let word = with_retry(&state.retry, "create word", || async move {
        Ok(queries::create_word(pool, clean).await?)
    })
    .await?;

    tracing::info!("Added word '{}' ({})", word.text, word.difficulty);

    Ok((StatusCode::CREATED, Json(word)))
}

pub async fn update_word(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    AppPath(word_id): AppPath<i64>,
    AppJson(form): AppJson<WordForm>,
) -> Result<Json<Word>, AppError> {
    let word = form.validate()?;

    let pool = &state.db;
    let clean = &word;
    let word = with_retry(&state.retry, "update word", || async move {
        Ok(queries::update_word(pool, word_id, clean).await?)
    })
    .await?
    .ok_or(AppError::NotFound("Word"))?;

    Ok(Json(word))
}

pub async fn delete_word(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    AppPath(word_id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    let pool = &state.db;
    let deleted = with_retry(&state.retry, "delete word", || async move {
        Ok(queries::delete_word(pool, word_id).await?)
    })
    .await?;

    if !deleted {
        return Err(AppError::NotFound("Word"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Bulk import a newline-separated list for one difficulty
pub async fn import_words(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    AppJson(form): AppJson<WordImportForm>,
) -> Result<Json<ImportSummary>, AppError> {
    let difficulty = form.difficulty()?;
    let list = WordList::parse(&form.words);
    if list.is_empty() {
        return Err(ValidationErrors::single("words", "No words to import").into());
    }

    let pool = &state.db;
    let words = list.words();
    let imported = with_retry(&state.retry, "import words", || async move {
        let mut tx = pool.begin().await?;
        let imported = queries::import_words(&mut tx, difficulty, words).await?;
        tx.commit().await?;
        Ok(imported)
    })
    .await?;

    let summary = ImportSummary {
        imported,
        already_present: list.len() as u64 - imported,
        skipped: list.skipped(),
    };
    tracing::info!("Imported {} {} words ({:?})", imported, difficulty, summary);

    Ok(Json(summary))
}

// =============================================================================
// Level settings
// =============================================================================

pub async fn list_settings(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<Json<Vec<Setting>>, AppError> {
    Ok(Json(queries::list_settings(&state.db).await?))
}

pub async fn update_setting(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    AppPath(level): AppPath<String>,
    AppJson(form): AppJson<LevelSettingsForm>,
) -> Result<Json<Setting>, AppError> {
    let level: Level = level.parse().map_err(|_| AppError::NotFound("Level"))?;
    form.validate()?;

    let pool = &state.db;
    let form = &form;
    let setting = with_retry(&state.retry, "update settings", || async move {
        Ok(queries::update_setting(pool, level, form).await?)
    })
    .await?
    .ok_or(AppError::NotFound("Level"))?;

    tracing::info!("{} level settings updated", level);

    Ok(Json(setting))
}
