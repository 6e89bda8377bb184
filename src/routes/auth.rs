use axum::{extract::State, http::StatusCode, Json};
use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    auth::{self, AuthenticatedUser, REMEMBER_TTL_DAYS},
    db::{queries, with_retry},
    error::AppError,
    extract::AppJson,
    forms::{LoginForm, RegisterForm, ValidationErrors},
    models::{User, UserStats},
    password, AppState,
};

pub const DUPLICATE_ACCOUNT_MESSAGE: &str = "Username or email already exists";

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Seconds until the token expires
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    #[serde(flatten)]
    pub user: User,
    pub stats: UserStats,
}

/// Create an account. The new user must log in afterwards.
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(form): AppJson<RegisterForm>,
) -> Result<(StatusCode, Json<User>), AppError> {
    form.validate()?;
    let username = form.username();
    let email = form.email();

    let mut errors = ValidationErrors::new();
    if queries::username_taken(&state.db, username, None).await? {
        errors.add("username", "That username is already taken");
    }
    if queries::email_taken(&state.db, &email, None).await? {
        errors.add("email", "That email is already registered");
    }
    errors.into_result()?;

    let password_hash = password::hash(form.password.clone()).await?;
    let new_user = queries::NewUser {
        username,
        email: &email,
        password_hash: &password_hash,
        is_admin: false,
    };

    let pool = &state.db;
    let new_user = &new_user;
    let user = with_retry(&state.retry, "register user", || async move {
        Ok(queries::create_user(pool, new_user).await?)
    })
    .await
    // Lost a race with a concurrent registration
    .map_err(|e| e.on_unique_violation(DUPLICATE_ACCOUNT_MESSAGE))?;

    tracing::info!("Registered user: {} (ID: {})", user.username, user.id);

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(form): AppJson<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    form.validate()?;

    let found = queries::get_user_by_email(&state.db, &form.email()).await?;
    let user = match found {
        Some(user)
            if password::verify(form.password.clone(), user.password_hash.clone()).await =>
        {
            user
        }
        _ => {
            tracing::debug!("Failed login attempt");
            return Err(AppError::InvalidCredentials);
        }
    };

    if !user.is_active {
        tracing::info!("Login refused for deactivated user {}", user.id);
        return Err(AppError::forbidden("This account has been deactivated"));
    }

    let pool = &state.db;
    let user_id = user.id;
    with_retry(&state.retry, "update last seen", || async move {
        Ok(queries::touch_last_seen(pool, user_id).await?)
    })
    .await?;

    let ttl = if form.remember {
        Duration::days(REMEMBER_TTL_DAYS)
    } else {
        Duration::hours(state.config.security.token_ttl_hours)
    };

    let access_token = auth::generate_token(&user, &state.config.security.jwt_secret, ttl)
        .map_err(|e| {
            tracing::error!("Failed to generate JWT token: {}", e);
            AppError::Internal(e.into())
        })?;

    tracing::info!("User {} logged in", user.id);

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer",
        expires_in: ttl.num_seconds(),
        user,
    }))
}

/// Revoke every token issued to the current user
pub async fn logout(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<StatusCode, AppError> {
    let pool = &state.db;
    let user_id = auth.id();
    with_retry(&state.retry, "logout", || async move {
        Ok(queries::bump_token_version(pool, user_id).await?)
    })
    .await?;

    tracing::info!("User {} logged out", user_id);

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_current_user(auth: AuthenticatedUser) -> Json<UserResponse> {
    let stats = auth.user.to_stats();
    Json(UserResponse {
        user: auth.user,
        stats,
    })
}
