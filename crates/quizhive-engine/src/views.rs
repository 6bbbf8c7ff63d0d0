use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use quizhive_core::{AnswerResult, GameCode, LeaderboardEntry, PublicQuestion, QuestionSpec};
use serde::Serialize;

use crate::session::{GameSession, GameStatus, DEFAULT_LEADERBOARD_LIMIT};

/// Host dashboard snapshot, assembled under a single read lock so the pieces
/// never disagree with each other.
#[derive(Clone, Debug, Serialize)]
pub struct SessionView {
    pub game_code: GameCode,
    pub status: GameStatus,
    pub player_count: usize,
    pub players: Vec<PlayerView>,
    /// -1 until the first question starts.
    pub current_question_index: i64,
    pub total_questions: usize,
    /// Present only while a question is live.
    pub current_question: Option<HostQuestionView>,
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Results of the latest question, present once it is finished.
    pub results: Option<BTreeMap<String, AnswerResult>>,
    pub question_finished: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub nickname: String,
    pub score: u32,
    pub connected: bool,
}

/// The live question as the host sees it, raw submissions included.
#[derive(Clone, Debug, Serialize)]
pub struct HostQuestionView {
    pub question_index: usize,
    pub question_text: String,
    pub time_limit: u32,
    pub started_at: DateTime<Utc>,
    pub answers_received: BTreeMap<String, ReceivedAnswerView>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReceivedAnswerView {
    pub answer: String,
    pub received_at: DateTime<Utc>,
}

/// What a known game code reports for its current question.
#[derive(Clone, Debug)]
pub enum CurrentQuestion {
    /// No unfinished question is live right now.
    Idle,
    Active(ActiveQuestion),
}

/// Player-facing payload for the live question. The correct answer is
/// structurally absent from `question`.
#[derive(Clone, Debug, Serialize)]
pub struct ActiveQuestion {
    pub question: PublicQuestion,
    pub question_index: usize,
    /// Seconds left on the clock, floored at zero.
    pub time_remaining: f64,
    pub started_at: DateTime<Utc>,
}

/// Submission tally for the live question.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct QuestionProgress {
    pub answers_count: usize,
    pub total_players: usize,
}

/// Data handed to the report renderer after a game: full question specs,
/// reveal included, plus the detailed leaderboard. Served host-only.
#[derive(Clone, Debug, Serialize)]
pub struct GameReport {
    pub game_code: GameCode,
    pub quiz_title: String,
    pub date: String,
    pub question_count: usize,
    pub questions: Vec<QuestionSpec>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl GameSession {
    pub fn view(&self) -> SessionView {
        let mut players: Vec<PlayerView> = self
            .players
            .values()
            .map(|p| PlayerView {
                nickname: p.nickname.clone(),
                score: p.score,
                connected: p.connected,
            })
            .collect();
        players.sort_by(|a, b| a.nickname.cmp(&b.nickname));

        let current = self.current_question.as_ref();
        let question_finished = current.map(|q| q.finished).unwrap_or(false);

        let results = current.filter(|q| q.finished).map(|q| {
            self.players
                .values()
                .filter_map(|p| {
                    p.answers
                        .get(&q.index)
                        .map(|r| (p.nickname.clone(), r.clone()))
                })
                .collect()
        });

        let current_question = current.filter(|q| !q.finished).map(|q| HostQuestionView {
            question_index: q.index,
            question_text: q.spec.text.clone(),
            time_limit: q.spec.time_limit,
            started_at: q.started_at,
            answers_received: q
                .answers_received
                .iter()
                .map(|(nickname, received)| {
                    (
                        nickname.clone(),
                        ReceivedAnswerView {
                            answer: received.answer.clone(),
                            received_at: received.received_at,
                        },
                    )
                })
                .collect(),
        });

        SessionView {
            game_code: self.code.clone(),
            status: self.status,
            player_count: self.players.len(),
            players,
            current_question_index: self.current_index.map(|i| i as i64).unwrap_or(-1),
            total_questions: self.snapshot.question_count(),
            current_question,
            leaderboard: self.leaderboard(DEFAULT_LEADERBOARD_LIMIT, false),
            results,
            question_finished,
        }
    }

    /// Player-facing payload for the live question, if one is running.
    pub fn active_question(&self, now: DateTime<Utc>) -> Option<ActiveQuestion> {
        let q = self.current_question.as_ref().filter(|q| !q.finished)?;
        let elapsed = now.signed_duration_since(q.started_at).num_milliseconds() as f64 / 1000.0;
        let time_remaining = (f64::from(q.spec.time_limit) - elapsed).max(0.0);
        Some(ActiveQuestion {
            question: q.spec.public_view(),
            question_index: q.index,
            time_remaining,
            started_at: q.started_at,
        })
    }

    /// Submission tally for the current question, finished or not.
    pub fn progress(&self) -> Option<QuestionProgress> {
        let q = self.current_question.as_ref()?;
        Some(QuestionProgress {
            answers_count: q.answers_received.len(),
            total_players: self.players.len(),
        })
    }

    pub fn report(&self, now: DateTime<Utc>) -> GameReport {
        GameReport {
            game_code: self.code.clone(),
            quiz_title: self.snapshot.title_or_default().to_owned(),
            date: now.format("%Y-%m-%d %H:%M").to_string(),
            question_count: self.snapshot.question_count(),
            questions: self.snapshot.questions.clone(),
            leaderboard: self.leaderboard(usize::MAX, true),
        }
    }
}
