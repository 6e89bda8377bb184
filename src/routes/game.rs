use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    db::{queries, with_retry},
    error::AppError,
    extract::{AppJson, AppPath},
    forms::{GuessForm, StartGameForm, ValidationErrors},
    game,
    models::{GameSession, GameView, Guess, GuessResult, Setting, UserStats},
    AppState,
};

/// How many sessions the profile page lists
pub const PROFILE_RECENT_GAMES: i64 = 5;

#[derive(Debug, Serialize)]
pub struct GameStateResponse {
    pub game: GameView,
    pub guesses: Vec<Guess>,
}

#[derive(Debug, Serialize)]
pub struct GuessResponse {
    pub result: GuessResult,
    pub message: &'static str,
    pub finished: bool,
    pub game: GameView,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub game: GameView,
    pub attempts_used: i32,
    pub guesses: Vec<Guess>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub username: String,
    pub stats: UserStats,
    pub recent_games: Vec<GameView>,
}

fn hint(result: GuessResult) -> &'static str {
    match result {
        GuessResult::Correct => "Correct! You found the number.",
        GuessResult::TooHigh => "Too high! Try a lower number.",
        GuessResult::TooLow => "Too low! Try a higher number.",
    }
}

/// Fetch a session and check it belongs to `user_id`
async fn load_owned_game(state: &AppState, game_id: Uuid, user_id: i64) -> Result<GameSession, AppError> {
    let game = queries::get_game_session(&state.db, game_id)
        .await?
        .ok_or(AppError::NotFound("Game"))?;

    if game.user_id != user_id {
        tracing::warn!("User {} tried to access game {} owned by another user", user_id, game_id);
        return Err(AppError::forbidden("You cannot access this game"));
    }

    Ok(game)
}

/// Levels currently open for play
pub async fn list_levels(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Setting>>, AppError> {
    let levels = queries::list_active_settings(&state.db).await?;
    Ok(Json(levels))
}

pub async fn start_game(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    AppJson(form): AppJson<StartGameForm>,
) -> Result<(StatusCode, Json<GameView>), AppError> {
    let level = form.level()?;

    let setting = queries::get_setting(&state.db, level)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| ValidationErrors::single("level", "Invalid level selected"))?;

    let game = game::new_session(auth.id(), &setting, &mut rand::rng(), Utc::now());

    let pool = &state.db;
    let new_game = &game;
    with_retry(&state.retry, "start game", || async move {
        Ok(queries::insert_game_session(pool, new_game).await?)
    })
    .await?;

    tracing::info!("User {} started {} game {}", auth.id(), level, game.id);

    Ok((StatusCode::CREATED, Json(GameView::from(&game))))
}

pub async fn get_game(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    AppPath(game_id): AppPath<Uuid>,
) -> Result<Json<GameStateResponse>, AppError> {
    let game = load_owned_game(&state, game_id, auth.id()).await?;
    let guesses = queries::list_guesses(&state.db, game.id).await?;

    Ok(Json(GameStateResponse {
        game: GameView::from(&game),
        guesses,
    }))
}

/// Submit a guess. The session update, the guess record and, when the game
/// ends, the player's statistics are written in one transaction.
pub async fn submit_guess(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    AppPath(game_id): AppPath<Uuid>,
    AppJson(form): AppJson<GuessForm>,
) -> Result<Json<GuessResponse>, AppError> {
    let value = form.value()?;
    let user_id = auth.id();
    let pool = &state.db;

    let (game, report) = with_retry(&state.retry, "submit guess", || async move {
        let mut tx = pool.begin().await?;

        let mut game = queries::get_game_session(&mut *tx, game_id)
            .await?
            .ok_or(AppError::NotFound("Game"))?;
        if game.user_id != user_id {
            return Err(AppError::forbidden("You cannot access this game"));
        }

        let now = Utc::now();
        let report = game::apply_guess(&mut game, value, now)?;

        queries::update_game_progress(&mut *tx, &game).await?;
        queries::insert_guess(&mut *tx, game.id, value, report.result, now).await?;
        if report.finished {
            queries::record_game_result(&mut *tx, user_id, game.won, game.score).await?;
        }

        tx.commit().await?;
        Ok((game, report))
    })
    .await?;

    if report.finished {
        tracing::info!(
            "Game {} finished for user {}: won={}, score={}",
            game.id,
            user_id,
            game.won,
            game.score
        );
    } else {
        tracing::debug!("Game {}: guess {} was {:?}", game.id, value, report.result);
    }

    Ok(Json(GuessResponse {
        result: report.result,
        message: hint(report.result),
        finished: report.finished,
        game: GameView::from(&game),
    }))
}

pub async fn get_results(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    AppPath(game_id): AppPath<Uuid>,
) -> Result<Json<ResultsResponse>, AppError> {
    let game = load_owned_game(&state, game_id, auth.id()).await?;
    if !game.completed {
        return Err(AppError::conflict("Game is still in progress"));
    }
    let guesses = queries::list_guesses(&state.db, game.id).await?;

    Ok(Json(ResultsResponse {
        attempts_used: game.attempts_used(),
        game: GameView::from(&game),
        guesses,
    }))
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let recent = queries::recent_games_for_user(&state.db, auth.id(), PROFILE_RECENT_GAMES).await?;

    Ok(Json(ProfileResponse {
        stats: auth.user.to_stats(),
        username: auth.user.username,
        recent_games: recent.iter().map(GameView::from).collect(),
    }))
}
