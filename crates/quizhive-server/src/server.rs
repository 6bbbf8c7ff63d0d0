use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use quizhive_engine::SessionStore;

use crate::registry::ConnectionRegistry;
use crate::{handlers, ws};

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
    pub max_send_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            max_send_queue: 256,
        }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub registry: Arc<ConnectionRegistry>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/game/create", post(handlers::create_game))
        .route(
            "/api/game/session/{code}",
            get(handlers::session_view).delete(handlers::delete_session),
        )
        .route("/api/game/start-question", post(handlers::start_question))
        .route(
            "/api/game/current-question/{code}",
            get(handlers::current_question),
        )
        .route("/api/game/finish-question", post(handlers::finish_question))
        .route("/api/game/finish-game", post(handlers::finish_game))
        .route("/api/game/leaderboard/{code}", get(handlers::leaderboard))
        .route("/api/game/report/{code}", get(handlers::export_report))
        .route("/ws/{game_code}/{nickname}", get(ws::ws_handler))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Create and start the server. Returns a handle holding the bound port.
pub async fn start(
    config: ServerConfig,
    store: Arc<SessionStore>,
) -> Result<ServerHandle, std::io::Error> {
    let registry = Arc::new(ConnectionRegistry::new(config.max_send_queue));
    let state = AppState { store, registry };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "quizhive server started");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server_handle,
    })
}

/// Handle returned by `start()`. Dropping it does not stop the server task.
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn started() -> ServerHandle {
        let config = ServerConfig {
            port: 0, // random port
            ..Default::default()
        };
        start(config, Arc::new(SessionStore::new())).await.unwrap()
    }

    fn api(port: u16, path: &str) -> String {
        format!("http://127.0.0.1:{port}/api/game{path}")
    }

    async fn create_game(client: &reqwest::Client, port: u16) -> String {
        let resp = client
            .post(api(port, "/create"))
            .json(&json!({
                "quiz_id": "quiz-1",
                "host_id": "host-1",
                "title": "Trivia",
                "questions": [
                    {
                        "question_type": "single_choice",
                        "question_text": "Capital of France?",
                        "options": ["Paris", "Lyon"],
                        "correct_answer": "0"
                    },
                    {
                        "question_type": "number",
                        "question_text": "Pi, roughly?",
                        "correct_answer": "3.14"
                    }
                ]
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["quiz_title"], "Trivia");
        assert_eq!(body["question_count"], 2);
        body["game_code"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn server_starts_and_serves_health() {
        let handle = started().await;
        assert!(handle.port > 0);

        let url = format!("http://127.0.0.1:{}/health", handle.port);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["active_games"], 0);
    }

    #[tokio::test]
    async fn host_drives_a_game_over_http() {
        let handle = started().await;
        let client = reqwest::Client::new();
        let port = handle.port;
        let code = create_game(&client, port).await;

        // Before any start, players see the idle payload.
        let resp = reqwest::get(api(port, &format!("/current-question/{code}")))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["question"].is_null());
        assert_eq!(body["message"], "No active question");

        // Start the first question.
        let resp = client
            .post(api(port, "/start-question"))
            .json(&json!({ "game_code": code, "host_id": "host-1", "question_index": 0 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);

        // The public payload now carries the question but never the answer.
        let resp = reqwest::get(api(port, &format!("/current-question/{code}")))
            .await
            .unwrap();
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["question"]["question_text"], "Capital of France?");
        assert!(body["question"].get("correct_answer").is_none());
        assert!(body["time_remaining"].as_f64().unwrap() > 0.0);

        // Starting the same question again is refused.
        let resp = client
            .post(api(port, "/start-question"))
            .json(&json!({ "game_code": code, "host_id": "host-1", "question_index": 0 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 409);

        // Score it (nobody answered; results are the empty map).
        let resp = client
            .post(api(port, "/finish-question"))
            .json(&json!({ "game_code": code, "host_id": "host-1" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        // Wrap up and read the report.
        let resp = client
            .post(api(port, "/finish-game"))
            .json(&json!({ "game_code": code, "host_id": "host-1" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["quiz_id"], "quiz-1");

        let resp = reqwest::get(api(port, &format!("/report/{code}?host_id=host-1")))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["quiz_title"], "Trivia");
        assert_eq!(body["questions"][0]["correct_answer"], "0");

        // Delete, then everything is gone.
        let resp = client
            .delete(api(port, &format!("/session/{code}?host_id=host-1")))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let resp = reqwest::get(api(port, &format!("/leaderboard/{code}")))
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn host_identity_and_error_statuses() {
        let handle = started().await;
        let client = reqwest::Client::new();
        let port = handle.port;
        let code = create_game(&client, port).await;

        // Wrong host on the dashboard.
        let resp = reqwest::get(api(port, &format!("/session/{code}?host_id=intruder")))
            .await
            .unwrap();
        assert_eq!(resp.status(), 403);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["detail"].is_string());

        // Unknown code.
        let resp = reqwest::get(api(port, "/session/ZZZZZ9?host_id=host-1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);

        // Malformed code.
        let resp = reqwest::get(api(port, "/current-question/nope"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);

        // Empty quiz.
        let resp = client
            .post(api(port, "/create"))
            .json(&json!({ "quiz_id": "quiz-2", "host_id": "host-1", "questions": [] }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 422);
    }

    #[test]
    fn build_router_creates_routes() {
        let state = AppState {
            store: Arc::new(SessionStore::new()),
            registry: Arc::new(ConnectionRegistry::new(32)),
        };
        let _router = build_router(state);
    }
}
