use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::QuizId;
use crate::results::{AnswerResult, LeaderboardEntry};

/// Everything the server pushes down a player socket.
///
/// Shapes are part of the client contract: the `type` tag plus snake_case
/// fields, one JSON object per WebSocket text frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    /// Personal greeting right after a successful join or reconnect.
    #[serde(rename = "connected")]
    Connected { message: String, nickname: String },

    #[serde(rename = "player_joined")]
    PlayerJoined { nickname: String },

    #[serde(rename = "player_disconnected")]
    PlayerDisconnected { nickname: String },

    #[serde(rename = "question_started")]
    QuestionStarted {
        question_index: usize,
        started_at: DateTime<Utc>,
        time_limit: u32,
    },

    /// Personal ack for a submission attempt.
    #[serde(rename = "answer_submitted")]
    AnswerSubmitted { success: bool },

    /// Progress ping after each accepted submission.
    #[serde(rename = "answer_received")]
    AnswerReceived {
        nickname: String,
        answers_count: usize,
        total_players: usize,
    },

    /// Scoring outcome for every session member, plus the revealed answer.
    #[serde(rename = "question_finished")]
    QuestionFinished {
        results: BTreeMap<String, AnswerResult>,
        leaderboard: Vec<LeaderboardEntry>,
        correct_answer: String,
    },

    #[serde(rename = "game_finished")]
    GameFinished {
        leaderboard: Vec<LeaderboardEntry>,
        quiz_id: QuizId,
    },

    #[serde(rename = "error")]
    Error { message: String },

    #[serde(rename = "pong")]
    Pong,
}

impl GameEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::PlayerJoined { .. } => "player_joined",
            Self::PlayerDisconnected { .. } => "player_disconnected",
            Self::QuestionStarted { .. } => "question_started",
            Self::AnswerSubmitted { .. } => "answer_submitted",
            Self::AnswerReceived { .. } => "answer_received",
            Self::QuestionFinished { .. } => "question_finished",
            Self::GameFinished { .. } => "game_finished",
            Self::Error { .. } => "error",
            Self::Pong => "pong",
        }
    }
}

/// Messages players send up the socket.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "submit_answer")]
    SubmitAnswer { answer: String },
    #[serde(rename = "ping")]
    Ping,
}
