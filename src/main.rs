mod auth;
mod config;
mod db;
mod error;
mod extract;
mod forms;
mod game;
mod models;
mod pagination;
mod password;
mod routes;
#[cfg(test)]
mod test_support;
mod wordlist;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::Router;
use config::{AdminBootstrap, Config};
use db::{queries, RetryPolicy};
use sqlx::SqlitePool;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across all handlers
pub struct AppState {
    pub config: Config,
    pub db: SqlitePool,
    /// Backoff applied to writes that hit a locked database
    pub retry: RetryPolicy,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "number_guesser=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Number Guesser server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Connect to database
    let db = db::create_pool(
        config.database_url(),
        config.database.max_connections,
        config.busy_timeout(),
    )
    .await
    .context("Failed to open database")?;
    tracing::info!("Connected to database");

    // Run migrations
    db::migrate(&db).await?;
    tracing::info!("Database migrations completed");

    let seeded = queries::seed_default_settings(&db).await?;
    if seeded > 0 {
        tracing::info!("Seeded default settings for {} levels", seeded);
    }

    if let Some(admin) = &config.admin.bootstrap {
        bootstrap_admin(&db, admin).await?;
    }

    let retry = RetryPolicy::new(
        config.database.retry_attempts,
        Duration::from_millis(config.database.retry_base_delay_ms),
    );

    // Create application state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        retry,
    });

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Serve frontend static files
    let frontend_service = ServeDir::new(&config.server.frontend_dir);

    // Build router
    let app = Router::new()
        .merge(routes::create_routes())
        .fallback_service(frontend_service)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("Game frontend: http://{}/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the configured admin account unless that username already exists
async fn bootstrap_admin(db: &SqlitePool, admin: &AdminBootstrap) -> Result<()> {
    if queries::get_user_by_username(db, &admin.username).await?.is_some() {
        tracing::debug!("Admin account '{}' already exists", admin.username);
        return Ok(());
    }

    let password_hash = password::hash(admin.password.clone()).await?;
    let email = admin.email.trim().to_lowercase();
    let user = queries::create_user(
        db,
        &queries::NewUser {
            username: &admin.username,
            email: &email,
            password_hash: &password_hash,
            is_admin: true,
        },
    )
    .await
    .context("Failed to create admin account")?;

    tracing::info!("Created admin account '{}' (ID: {})", user.username, user.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> AdminBootstrap {
        AdminBootstrap {
            username: "root".to_string(),
            email: "Root@Example.com".to_string(),
            password: "rootpassword".to_string(),
        }
    }

    #[tokio::test]
    async fn test_bootstrap_admin_creates_once() {
        let pool = test_support::test_pool().await;

        bootstrap_admin(&pool, &admin()).await.unwrap();
        bootstrap_admin(&pool, &admin()).await.unwrap();

        let user = queries::get_user_by_username(&pool, "root")
            .await
            .unwrap()
            .unwrap();
        assert!(user.is_admin);
        assert_eq!(user.email, "root@example.com");
        assert!(password::verify_password("rootpassword", &user.password_hash));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
