//! Host-facing HTTP handlers plus the public player queries.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use quizhive_core::{
    AnswerResult, GameCode, GameEvent, HostId, LeaderboardEntry, PublicQuestion, QuestionSpec,
    QuizId, QuizSnapshot,
};
use quizhive_engine::views::{CurrentQuestion, GameReport, SessionView};
use quizhive_engine::{SessionStore, DEFAULT_LEADERBOARD_LIMIT};

use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    pub quiz_id: QuizId,
    pub host_id: HostId,
    #[serde(default)]
    pub title: Option<String>,
    pub questions: Vec<QuestionSpec>,
}

#[derive(Debug, Serialize)]
pub struct CreateGameResponse {
    pub game_code: GameCode,
    pub quiz_title: String,
    pub question_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct StartQuestionRequest {
    pub game_code: GameCode,
    pub host_id: HostId,
    pub question_index: usize,
}

#[derive(Debug, Serialize)]
pub struct StartQuestionResponse {
    pub success: bool,
    pub question_index: usize,
}

#[derive(Debug, Deserialize)]
pub struct FinishQuestionRequest {
    pub game_code: GameCode,
    pub host_id: HostId,
}

#[derive(Debug, Serialize)]
pub struct FinishQuestionResponse {
    pub results: BTreeMap<String, AnswerResult>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Deserialize)]
pub struct FinishGameRequest {
    pub game_code: GameCode,
    pub host_id: HostId,
}

#[derive(Debug, Serialize)]
pub struct FinishGameResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub quiz_id: QuizId,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Serialize)]
pub struct DeleteSessionResponse {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct HostQuery {
    pub host_id: HostId,
}

#[derive(Debug, Serialize)]
struct NoActiveQuestion {
    question: Option<PublicQuestion>,
    message: &'static str,
}

/// Open a session for a quiz snapshot. The snapshot arrives inline because
/// quiz storage belongs to a separate service; whatever it sends is frozen
/// for the lifetime of the game.
pub async fn create_game(
    State(state): State<AppState>,
    Json(req): Json<CreateGameRequest>,
) -> Result<Json<CreateGameResponse>, ApiError> {
    let question_count = req.questions.len();
    let snapshot = QuizSnapshot::new(req.quiz_id, req.title, req.questions);
    let quiz_title = snapshot.title_or_default().to_owned();
    let game_code = state.store.create_session(req.host_id, snapshot)?;
    Ok(Json(CreateGameResponse {
        game_code,
        quiz_title,
        question_count,
    }))
}

/// Host dashboard: roster, live-question progress, latest results.
pub async fn session_view(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<HostQuery>,
) -> Result<Json<SessionView>, ApiError> {
    let code = GameCode::parse(code)?;
    require_host(&state.store, &code, &query.host_id)?;
    let view = state
        .store
        .session_view(&code)
        .ok_or_else(ApiError::game_not_found)?;
    Ok(Json(view))
}

/// Start the next question and announce it to every player. The broadcast
/// reads the started clock back from the live question so players and host
/// agree on the timer.
pub async fn start_question(
    State(state): State<AppState>,
    Json(req): Json<StartQuestionRequest>,
) -> Result<Json<StartQuestionResponse>, ApiError> {
    require_host(&state.store, &req.game_code, &req.host_id)?;
    if !state.store.start_question(&req.game_code, req.question_index) {
        return Err(ApiError::Conflict("cannot start this question now".into()));
    }
    if let Some(CurrentQuestion::Active(active)) = state.store.current_question(&req.game_code) {
        state.registry.broadcast_event(
            &req.game_code,
            &GameEvent::QuestionStarted {
                question_index: active.question_index,
                started_at: active.started_at,
                time_limit: active.question.time_limit,
            },
        );
    }
    Ok(Json(StartQuestionResponse {
        success: true,
        question_index: req.question_index,
    }))
}

/// Player-facing question payload. Public on purpose: players only hold a
/// game code. The correct answer is structurally absent.
pub async fn current_question(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response, ApiError> {
    let code = GameCode::parse(code)?;
    let current = state
        .store
        .current_question(&code)
        .ok_or_else(ApiError::game_not_found)?;
    Ok(match current {
        CurrentQuestion::Idle => Json(NoActiveQuestion {
            question: None,
            message: "No active question",
        })
        .into_response(),
        CurrentQuestion::Active(active) => Json(active).into_response(),
    })
}

/// Close the live question, score it, and reveal the results to everyone.
pub async fn finish_question(
    State(state): State<AppState>,
    Json(req): Json<FinishQuestionRequest>,
) -> Result<Json<FinishQuestionResponse>, ApiError> {
    require_host(&state.store, &req.game_code, &req.host_id)?;
    let finished = state
        .store
        .finish_question(&req.game_code)
        .ok_or_else(|| ApiError::Conflict("no unfinished question to score".into()))?;
    let leaderboard = state
        .store
        .leaderboard(&req.game_code, DEFAULT_LEADERBOARD_LIMIT, false);
    state.registry.broadcast_event(
        &req.game_code,
        &GameEvent::QuestionFinished {
            results: finished.results.clone(),
            leaderboard: leaderboard.clone(),
            correct_answer: finished.correct_answer,
        },
    );
    Ok(Json(FinishQuestionResponse {
        results: finished.results,
        leaderboard,
    }))
}

/// End the game for good and publish the final standings.
pub async fn finish_game(
    State(state): State<AppState>,
    Json(req): Json<FinishGameRequest>,
) -> Result<Json<FinishGameResponse>, ApiError> {
    require_host(&state.store, &req.game_code, &req.host_id)?;
    state.store.finish_game(&req.game_code);
    let leaderboard = state.store.leaderboard(&req.game_code, usize::MAX, false);
    let quiz_id = state
        .store
        .quiz_id(&req.game_code)
        .ok_or_else(ApiError::game_not_found)?;
    state.registry.broadcast_event(
        &req.game_code,
        &GameEvent::GameFinished {
            leaderboard: leaderboard.clone(),
            quiz_id: quiz_id.clone(),
        },
    );
    Ok(Json(FinishGameResponse {
        leaderboard,
        quiz_id,
    }))
}

/// Public top-ten standings for a game.
pub async fn leaderboard(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let code = GameCode::parse(code)?;
    if !state.store.contains(&code) {
        return Err(ApiError::game_not_found());
    }
    let leaderboard = state
        .store
        .leaderboard(&code, DEFAULT_LEADERBOARD_LIMIT, false);
    Ok(Json(LeaderboardResponse { leaderboard }))
}

/// Everything the report renderer needs, correct answers included. Host-only
/// since it reveals the full answer key.
pub async fn export_report(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<HostQuery>,
) -> Result<Json<GameReport>, ApiError> {
    let code = GameCode::parse(code)?;
    require_host(&state.store, &code, &query.host_id)?;
    let report = state
        .store
        .export_report(&code)
        .ok_or_else(ApiError::game_not_found)?;
    Ok(Json(report))
}

/// Drop a session and every connection bound to it.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<HostQuery>,
) -> Result<Json<DeleteSessionResponse>, ApiError> {
    let code = GameCode::parse(code)?;
    require_host(&state.store, &code, &query.host_id)?;
    state.store.remove_session(&code);
    Ok(Json(DeleteSessionResponse { success: true }))
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "active_games": state.store.session_count(),
        "connections": state.registry.count(),
    }))
}

fn require_host(store: &SessionStore, code: &GameCode, host_id: &HostId) -> Result<(), ApiError> {
    let owner = store.host_id(code).ok_or_else(ApiError::game_not_found)?;
    if owner != *host_id {
        return Err(ApiError::not_host());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ConnectionRegistry;
    use quizhive_core::QuestionKind;
    use std::sync::Arc;

    fn app_state() -> AppState {
        AppState {
            store: Arc::new(SessionStore::new()),
            registry: Arc::new(ConnectionRegistry::new(32)),
        }
    }

    fn create_request() -> CreateGameRequest {
        CreateGameRequest {
            quiz_id: QuizId::from_raw("quiz-1"),
            host_id: HostId::from_raw("host-1"),
            title: Some("Trivia".into()),
            questions: vec![
                QuestionSpec::new(QuestionKind::SingleChoice, "Capital of France?", "0")
                    .with_options(vec!["Paris".into(), "Lyon".into()]),
                QuestionSpec::new(QuestionKind::Number, "Pi, roughly?", "3.14"),
            ],
        }
    }

    async fn created(state: &AppState) -> GameCode {
        let resp = create_game(State(state.clone()), Json(create_request()))
            .await
            .unwrap();
        resp.0.game_code
    }

    #[tokio::test]
    async fn create_returns_code_title_and_count() {
        let state = app_state();
        let resp = create_game(State(state.clone()), Json(create_request()))
            .await
            .unwrap();
        assert_eq!(resp.0.quiz_title, "Trivia");
        assert_eq!(resp.0.question_count, 2);
        assert!(state.store.contains(&resp.0.game_code));
    }

    #[tokio::test]
    async fn create_rejects_an_empty_question_list() {
        let state = app_state();
        let mut req = create_request();
        req.questions.clear();
        let err = create_game(State(state), Json(req)).await.unwrap_err();
        assert!(matches!(err, ApiError::Unprocessable(_)));
    }

    #[tokio::test]
    async fn host_routes_enforce_identity() {
        let state = app_state();
        let code = created(&state).await;

        let err = session_view(
            State(state.clone()),
            Path(code.as_str().to_owned()),
            Query(HostQuery {
                host_id: HostId::from_raw("someone-else"),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let view = session_view(
            State(state.clone()),
            Path(code.as_str().to_owned()),
            Query(HostQuery {
                host_id: HostId::from_raw("host-1"),
            }),
        )
        .await
        .unwrap();
        assert_eq!(view.0.game_code, code);

        let err = session_view(
            State(state),
            Path("ZZZZZ9".to_owned()),
            Query(HostQuery {
                host_id: HostId::from_raw("host-1"),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn start_question_broadcasts_and_guards_sequencing() {
        let state = app_state();
        let code = created(&state).await;
        let (_conn, mut rx) = state.registry.register(code.clone());

        let err = start_question(
            State(state.clone()),
            Json(StartQuestionRequest {
                game_code: code.clone(),
                host_id: HostId::from_raw("host-1"),
                question_index: 1,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)), "index 1 before 0");

        let resp = start_question(
            State(state.clone()),
            Json(StartQuestionRequest {
                game_code: code.clone(),
                host_id: HostId::from_raw("host-1"),
                question_index: 0,
            }),
        )
        .await
        .unwrap();
        assert!(resp.0.success);
        assert_eq!(resp.0.question_index, 0);

        let frame: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame["type"], "question_started");
        assert_eq!(frame["question_index"], 0);
        assert_eq!(frame["time_limit"], 30);
    }

    #[tokio::test]
    async fn finish_question_scores_and_broadcasts_the_reveal() {
        let state = app_state();
        let code = created(&state).await;
        let (_conn, mut rx) = state.registry.register(code.clone());
        let host = HostId::from_raw("host-1");

        start_question(
            State(state.clone()),
            Json(StartQuestionRequest {
                game_code: code.clone(),
                host_id: host.clone(),
                question_index: 0,
            }),
        )
        .await
        .unwrap();
        let _ = rx.recv().await;

        state
            .store
            .join_session(&code, "ada", quizhive_core::ConnectionId::new())
            .unwrap();
        assert!(state.store.submit_answer(&code, "ada", "0"));

        let resp = finish_question(
            State(state.clone()),
            Json(FinishQuestionRequest {
                game_code: code.clone(),
                host_id: host.clone(),
            }),
        )
        .await
        .unwrap();
        assert!(resp.0.results["ada"].correct);
        assert_eq!(resp.0.leaderboard[0].nickname, "ada");

        let frame: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame["type"], "question_finished");
        assert_eq!(frame["correct_answer"], "0");
        assert_eq!(frame["results"]["ada"]["points"], 13);

        let err = finish_question(
            State(state),
            Json(FinishQuestionRequest {
                game_code: code,
                host_id: host,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)), "second finish refused");
    }

    #[tokio::test]
    async fn finish_game_publishes_final_standings() {
        let state = app_state();
        let code = created(&state).await;
        let (_conn, mut rx) = state.registry.register(code.clone());

        let resp = finish_game(
            State(state.clone()),
            Json(FinishGameRequest {
                game_code: code.clone(),
                host_id: HostId::from_raw("host-1"),
            }),
        )
        .await
        .unwrap();
        assert_eq!(resp.0.quiz_id.as_str(), "quiz-1");

        let frame: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame["type"], "game_finished");
        assert_eq!(frame["quiz_id"], "quiz-1");

        let err = start_question(
            State(state),
            Json(StartQuestionRequest {
                game_code: code,
                host_id: HostId::from_raw("host-1"),
                question_index: 0,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)), "finished game is terminal");
    }

    #[tokio::test]
    async fn delete_session_then_every_lookup_is_gone() {
        let state = app_state();
        let code = created(&state).await;

        let resp = delete_session(
            State(state.clone()),
            Path(code.as_str().to_owned()),
            Query(HostQuery {
                host_id: HostId::from_raw("host-1"),
            }),
        )
        .await
        .unwrap();
        assert!(resp.0.success);

        let err = leaderboard(State(state), Path(code.as_str().to_owned()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn report_carries_the_answer_key() {
        let state = app_state();
        let code = created(&state).await;

        let report = export_report(
            State(state),
            Path(code.as_str().to_owned()),
            Query(HostQuery {
                host_id: HostId::from_raw("host-1"),
            }),
        )
        .await
        .unwrap();
        assert_eq!(report.0.quiz_title, "Trivia");
        assert_eq!(report.0.question_count, 2);
        assert_eq!(report.0.questions[0].correct_answer, "0");
    }
}
