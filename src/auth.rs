use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, sync::Arc};

use crate::{db::queries, error::AppError, models::User, AppState};

/// Long-lived session lifetime for "remember me" logins
pub const REMEMBER_TTL_DAYS: i64 = 30;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,      // User ID
    pub username: String, // Username
    pub ver: i64,         // Token version at issue time
    pub exp: usize,       // Expiration time
}

/// A signed-in, active user, loaded fresh from the database
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
}

impl AuthenticatedUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }
}

/// A signed-in user with the admin flag
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

/// The current user when a valid token is present, `None` otherwise
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

/// Bearer token from the Authorization header, or a `?token=` query parameter
fn extract_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(String::from)
        .or_else(|| {
            parts
                .uri
                .query()
                .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
                .and_then(|params| {
                    params
                        .into_iter()
                        .find(|(k, _)| k == "token")
                        .map(|(_, v)| v)
                })
        })
}

pub fn decode_token(token: &str, jwt_secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

/// Extractor for authenticated users from JWT tokens.
///
/// The token must be unexpired, carry the user's current token version
/// (logout bumps it) and belong to an active account.
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let app_state = Arc::<AppState>::from_ref(state);
        let token = extract_token(parts);

        async move {
            let token = token.ok_or(AppError::Unauthorized)?;
            let claims = decode_token(&token, &app_state.config.security.jwt_secret)
                .ok_or(AppError::Unauthorized)?;
            let user_id = claims
                .sub
                .parse::<i64>()
                .map_err(|_| AppError::Unauthorized)?;

            let user = queries::get_user(&app_state.db, user_id)
                .await?
                .ok_or(AppError::Unauthorized)?;

            if !user.is_active || user.token_version != claims.ver {
                tracing::debug!("Rejected token for user {}", user.id);
                return Err(AppError::Unauthorized);
            }

            Ok(AuthenticatedUser { user })
        }
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !auth.user.is_admin {
            return Err(AppError::forbidden("Administrator access required"));
        }
        Ok(AdminUser(auth))
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            AuthenticatedUser::from_request_parts(parts, state).await.ok(),
        ))
    }
}

/// Generate a JWT token for a user, valid for `ttl`
pub fn generate_token(
    user: &User,
    jwt_secret: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = (Utc::now() + ttl).timestamp();

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        ver: user.token_version,
        exp: expiration.max(0) as usize,
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_ref()),
    )
}
