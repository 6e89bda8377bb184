pub mod admin;
pub mod auth;
pub mod feedback;
pub mod game;
pub mod health;
pub mod leaderboard;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::AppState;

pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes())
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::get_current_user))
        .route("/game/levels", get(game::list_levels))
        .route("/game/start", post(game::start_game))
        .route("/game/{id}", get(game::get_game))
        .route("/game/{id}/guess", post(game::submit_guess))
        .route("/game/{id}/results", get(game::get_results))
        .route("/profile", get(game::get_profile))
        .route("/leaderboard", get(leaderboard::get_leaderboard))
        .route("/feedback", post(feedback::submit_feedback))
        .nest("/admin", admin_routes())
}

fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/users", get(admin::list_users))
        .route(
            "/users/{id}",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route("/users/{id}/toggle", post(admin::toggle_user))
        .route("/games", get(admin::list_games))
        .route("/games/{id}", get(admin::get_game))
        .route("/feedback", get(admin::list_feedback))
        .route("/feedback/{id}", axum::routing::delete(admin::delete_feedback))
        .route("/feedback/{id}/resolve", post(admin::resolve_feedback))
        .route("/words", get(admin::list_words).post(admin::create_word))
        .route("/words/import", post(admin::import_words))
        .route(
            "/words/{id}",
            put(admin::update_word).delete(admin::delete_word),
        )
        .route("/settings", get(admin::list_settings))
        .route("/settings/{level}", put(admin::update_setting))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::generate_token,
        db::queries::{self, NewUser},
        password, test_support,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use chrono::Duration;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestApp {
        state: Arc<AppState>,
        router: Router,
    }

    impl TestApp {
        async fn new() -> Self {
            let state = test_support::test_state().await;
            let router = create_routes().with_state(state.clone());
            Self { state, router }
        }

        async fn request(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let body = match body {
                Some(json) => {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };

            let response = self
                .router
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }

        /// Create a user directly and return it with a valid token
        async fn user(&self, username: &str, is_admin: bool) -> (i64, String) {
            let email = format!("{username}@example.com");
            let hash = password::hash_password("password123").unwrap();
            let user = queries::create_user(
                &self.state.db,
                &NewUser {
                    username,
                    email: &email,
                    password_hash: &hash,
                    is_admin,
                },
            )
            .await
            .unwrap();
            let token = generate_token(&user, "test-secret", Duration::hours(1)).unwrap();
            (user.id, token)
        }

        /// Start a game and force its secret
        async fn game_with_secret(&self, token: &str, level: &str, secret: i32) -> String {
            let (status, body) = self
                .request(
                    Method::POST,
                    "/api/game/start",
                    Some(token),
                    Some(json!({ "level": level })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
            let id = body["id"].as_str().unwrap().to_string();
            sqlx::query("UPDATE game_sessions SET secret_number = ? WHERE id = ?")
                .bind(secret)
                .bind(uuid::Uuid::parse_str(&id).unwrap())
                .execute(&self.state.db)
                .await
                .unwrap();
            id
        }
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new().await;
        let (status, body) = app.request(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_register_login_logout_flow() {
        let app = TestApp::new().await;
        let register = json!({
            "username": "newbie",
            "email": "Newbie@Example.com",
            "password": "longenough",
            "password_confirm": "longenough"
        });

        let (status, body) = app
            .request(Method::POST, "/api/auth/register", None, Some(register.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["email"], "newbie@example.com");
        assert!(body.get("password_hash").is_none());

        let (status, body) = app
            .request(Method::POST, "/api/auth/register", None, Some(register))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["fields"]["username"].is_array());
        assert!(body["fields"]["email"].is_array());

        let (status, _) = app
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": "newbie@example.com", "password": "wrong-password"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = app
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": "newbie@example.com", "password": "longenough"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["access_token"].as_str().unwrap().to_string();

        let (status, body) = app.request(Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "newbie");
        assert_eq!(body["stats"]["total_games"], 0);

        let (status, _) = app.request(Method::POST, "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        // Logout revokes the token
        let (status, _) = app.request(Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let app = TestApp::new().await;
        let (status, body) = app.request(Method::GET, "/api/profile", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");

        let (status, _) = app
            .request(Method::GET, "/api/profile", Some("not-a-jwt"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_play_a_winning_game() {
        let app = TestApp::new().await;
        let (user_id, token) = app.user("player", false).await;
        let id = app.game_with_secret(&token, "easy", 7).await;

        let (status, body) = app
            .request(Method::GET, &format!("/api/game/{id}"), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["game"].get("secret_number").is_none());

        let (status, _) = app
            .request(Method::GET, &format!("/api/game/{id}/results"), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let guess_uri = format!("/api/game/{id}/guess");
        let (status, body) = app
            .request(Method::POST, &guess_uri, Some(&token), Some(json!({"guess": 9})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "too_high");
        assert_eq!(body["game"]["range_high"], 8);

        let (_, body) = app
            .request(Method::POST, &guess_uri, Some(&token), Some(json!({"guess": "3"})))
            .await;
        assert_eq!(body["result"], "too_low");
        assert_eq!(body["game"]["range_low"], 4);

        let (_, body) = app
            .request(Method::POST, &guess_uri, Some(&token), Some(json!({"guess": 7})))
            .await;
        assert_eq!(body["result"], "correct");
        assert_eq!(body["finished"], true);
        // 2 attempts left * 10 points * 1x
        assert_eq!(body["game"]["score"], 20);
        assert_eq!(body["game"]["secret_number"], 7);

        let (status, body) = app
            .request(Method::GET, &format!("/api/game/{id}/results"), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["attempts_used"], 3);
        assert_eq!(body["guesses"][0]["guess_value"], 7);

        let (status, _) = app
            .request(Method::POST, &guess_uri, Some(&token), Some(json!({"guess": 7})))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let user = queries::get_user(&app.state.db, user_id).await.unwrap().unwrap();
        assert_eq!((user.games_played, user.games_won, user.best_score), (1, 1, 20));

        let (_, body) = app.request(Method::GET, "/api/leaderboard", None, None).await;
        assert_eq!(body["top_players"][0]["username"], "player");
        assert_eq!(body["level_leaders"]["easy"][0]["score"], 20);
    }

    #[tokio::test]
    async fn test_losing_game_and_invalid_guesses() {
        let app = TestApp::new().await;
        let (user_id, token) = app.user("unlucky", false).await;
        let id = app.game_with_secret(&token, "easy", 10).await;
        let guess_uri = format!("/api/game/{id}/guess");

        let (status, body) = app
            .request(Method::POST, &guess_uri, Some(&token), Some(json!({"guess": 11})))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["fields"]["guess"].is_array());

        let (status, body) = app
            .request(Method::POST, &guess_uri, Some(&token), Some(json!({"guess": "abc"})))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "invalid_request");

        for attempt in 1..=5 {
            let (status, body) = app
                .request(Method::POST, &guess_uri, Some(&token), Some(json!({"guess": 1})))
                .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["finished"], attempt == 5);
        }

        let (_, body) = app
            .request(Method::GET, &format!("/api/game/{id}/results"), Some(&token), None)
            .await;
        assert_eq!(body["game"]["status"], "lost");
        assert_eq!(body["game"]["score"], 0);
        assert_eq!(body["attempts_used"], 5);

        let user = queries::get_user(&app.state.db, user_id).await.unwrap().unwrap();
        assert_eq!((user.games_played, user.games_won), (1, 0));
    }

    #[tokio::test]
    async fn test_undecodable_requests_get_json_errors() {
        let app = TestApp::new().await;
        let (_, token) = app.user("sloppy", false).await;
        let (_, admin) = app.user("boss", true).await;
        let id = app.game_with_secret(&token, "easy", 3).await;

        let (status, body) = app
            .request(Method::POST, &format!("/api/game/{id}/guess"), Some(&token), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "invalid_request");
        assert!(body["message"].is_string());

        let (status, body) = app
            .request(Method::GET, "/api/game/not-a-uuid", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");

        let (status, body) = app
            .request(Method::GET, "/api/admin/users?page=many", Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_other_users_game_is_forbidden() {
        let app = TestApp::new().await;
        let (_, owner) = app.user("owner", false).await;
        let (_, intruder) = app.user("intruder", false).await;
        let id = app.game_with_secret(&owner, "medium", 20).await;

        let (status, _) = app
            .request(Method::GET, &format!("/api/game/{id}"), Some(&intruder), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .request(
                Method::POST,
                &format!("/api/game/{id}/guess"),
                Some(&intruder),
                Some(json!({"guess": 20})),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let unknown = uuid::Uuid::new_v4();
        let (status, _) = app
            .request(Method::GET, &format!("/api/game/{unknown}"), Some(&owner), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_inactive_level_cannot_be_started() {
        let app = TestApp::new().await;
        let (_, token) = app.user("hopeful", false).await;
        sqlx::query("UPDATE settings SET is_active = 0 WHERE level = 'hard'")
            .execute(&app.state.db)
            .await
            .unwrap();

        let (status, body) = app
            .request(Method::POST, "/api/game/start", Some(&token), Some(json!({"level": "hard"})))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["fields"]["level"].is_array());

        let (_, body) = app.request(Method::GET, "/api/game/levels", None, None).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_feedback_with_and_without_login() {
        let app = TestApp::new().await;
        let (user_id, token) = app.user("writer", false).await;
        let form = json!({"name": "Writer", "email": "writer@example.com", "message": "Nice!"});

        let (status, body) = app
            .request(Method::POST, "/api/feedback", None, Some(form.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["user_id"].is_null());

        let (status, body) = app
            .request(Method::POST, "/api/feedback", Some(&token), Some(form))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user_id"], user_id);

        let (status, _) = app
            .request(
                Method::POST,
                "/api/feedback",
                None,
                Some(json!({"name": "", "email": "bad", "message": ""})),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_admin_routes_require_admin() {
        let app = TestApp::new().await;
        let (_, player) = app.user("player", false).await;

        let (status, _) = app.request(Method::GET, "/api/admin/dashboard", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = app
            .request(Method::GET, "/api/admin/dashboard", Some(&player), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_or_deactivate_self() {
        let app = TestApp::new().await;
        let (admin_id, admin) = app.user("boss", true).await;
        let (player_id, _) = app.user("player", false).await;

        let (status, _) = app
            .request(Method::DELETE, &format!("/api/admin/users/{admin_id}"), Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app
            .request(
                Method::POST,
                &format!("/api/admin/users/{admin_id}/toggle"),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app
            .request(
                Method::POST,
                &format!("/api/admin/users/{player_id}/toggle"),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_active"], false);

        let (status, _) = app
            .request(Method::DELETE, &format!("/api/admin/users/{player_id}"), Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app
            .request(Method::GET, &format!("/api/admin/users/{player_id}"), Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_deactivated_user_is_locked_out() {
        let app = TestApp::new().await;
        let (_, admin) = app.user("boss", true).await;
        let (player_id, player) = app.user("player", false).await;

        app.request(
            Method::POST,
            &format!("/api/admin/users/{player_id}/toggle"),
            Some(&admin),
            None,
        )
        .await;

        let (status, _) = app.request(Method::GET, "/api/auth/me", Some(&player), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"email": "player@example.com", "password": "password123"})),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_edit_user_checks_uniqueness() {
        let app = TestApp::new().await;
        let (_, admin) = app.user("boss", true).await;
        let (player_id, _) = app.user("player", false).await;

        let (status, body) = app
            .request(
                Method::PUT,
                &format!("/api/admin/users/{player_id}"),
                Some(&admin),
                Some(json!({
                    "username": "boss",
                    "email": "player@example.com",
                    "is_admin": false,
                    "is_active": true
                })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["fields"]["username"].is_array());

        // Keeping the user's own email is fine
        let (status, body) = app
            .request(
                Method::PUT,
                &format!("/api/admin/users/{player_id}"),
                Some(&admin),
                Some(json!({
                    "username": "player_two",
                    "email": "player@example.com",
                    "is_admin": true,
                    "is_active": true
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "player_two");
        assert_eq!(body["is_admin"], true);
    }

    #[tokio::test]
    async fn test_admin_settings_update_applies_to_new_games_only() {
        let app = TestApp::new().await;
        let (_, admin) = app.user("boss", true).await;
        let (_, player) = app.user("player", false).await;
        let before = app.game_with_secret(&player, "easy", 5).await;

        let (status, body) = app
            .request(
                Method::PUT,
                "/api/admin/settings/easy",
                Some(&admin),
                Some(json!({
                    "range_low": 1,
                    "range_high": 20,
                    "max_attempts": 6,
                    "points_per_attempt": 5,
                    "score_multiplier": 1.5
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["range_high"], 20);

        let (status, _) = app
            .request(
                Method::PUT,
                "/api/admin/settings/easy",
                Some(&admin),
                Some(json!({
                    "range_low": 30,
                    "range_high": 20,
                    "max_attempts": 6,
                    "points_per_attempt": 5,
                    "score_multiplier": 1.5
                })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = app
            .request(
                Method::PUT,
                "/api/admin/settings/easy",
                Some(&admin),
                Some(json!({
                    "range_low": 1,
                    "range_high": 20,
                    "max_attempts": 50_000,
                    "points_per_attempt": 50_000,
                    "score_multiplier": 1.5
                })),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["fields"]["max_attempts"].is_array());
        assert!(body["fields"]["points_per_attempt"].is_array());

        let (status, _) = app
            .request(
                Method::PUT,
                "/api/admin/settings/legendary",
                Some(&admin),
                Some(json!({
                    "range_low": 1,
                    "range_high": 20,
                    "max_attempts": 6,
                    "points_per_attempt": 5,
                    "score_multiplier": 1.5
                })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = app
            .request(Method::GET, &format!("/api/game/{before}"), Some(&player), None)
            .await;
        assert_eq!(body["game"]["range_high"], 10);
        assert_eq!(body["game"]["max_attempts"], 5);

        let after = app.game_with_secret(&player, "easy", 5).await;
        let (_, body) = app
            .request(Method::GET, &format!("/api/game/{after}"), Some(&player), None)
            .await;
        assert_eq!(body["game"]["range_high"], 20);
        assert_eq!(body["game"]["max_attempts"], 6);
    }

    #[tokio::test]
    async fn test_admin_word_import_and_search() {
        let app = TestApp::new().await;
        let (_, admin) = app.user("boss", true).await;

        let (status, body) = app
            .request(
                Method::POST,
                "/api/admin/words",
                Some(&admin),
                Some(json!({"text": "Apple", "difficulty": "easy"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["text"], "apple");

        let (status, body) = app
            .request(
                Method::POST,
                "/api/admin/words/import",
                Some(&admin),
                Some(json!({
                    "words": "apple\nBanana\n\nbanana\ncherry\n",
                    "difficulty": "easy"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["imported"], 2);
        assert_eq!(body["already_present"], 1);
        assert_eq!(body["skipped"], 1);

        let (_, body) = app
            .request(Method::GET, "/api/admin/words?q=AN", Some(&admin), None)
            .await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["items"][0]["text"], "banana");

        let (status, _) = app
            .request(
                Method::POST,
                "/api/admin/words/import",
                Some(&admin),
                Some(json!({"words": "\n\n", "difficulty": "easy"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_admin_dashboard_and_feedback() {
        let app = TestApp::new().await;
        let (_, admin) = app.user("boss", true).await;
        let (status, feedback) = app
            .request(
                Method::POST,
                "/api/feedback",
                None,
                Some(json!({"name": "Visitor", "email": "v@example.com", "message": "Hi"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let feedback_id = feedback["id"].as_i64().unwrap();

        let (status, body) = app
            .request(Method::GET, "/api/admin/dashboard", Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_users"], 1);
        assert_eq!(body["unresolved_feedback"], 1);
        assert_eq!(body["settings"].as_array().unwrap().len(), 3);

        let (_, body) = app
            .request(
                Method::POST,
                &format!("/api/admin/feedback/{feedback_id}/resolve"),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(body["is_resolved"], true);

        let (status, _) = app
            .request(
                Method::DELETE,
                &format!("/api/admin/feedback/{feedback_id}"),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = app
            .request(Method::GET, "/api/admin/feedback", Some(&admin), None)
            .await;
        assert_eq!(body["total"], 0);
    }
}
