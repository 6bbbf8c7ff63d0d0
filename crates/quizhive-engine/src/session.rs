use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use quizhive_core::{
    AnswerResult, ConnectionId, GameCode, HostId, LeaderboardEntry, QuestionKind, QuestionSpec,
    QuizId, QuizSnapshot,
};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::scoring;

/// Rows served when a caller asks for a leaderboard without a limit.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// Host-driven lifecycle of a session. `Finished` is terminal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Waiting,
    Playing,
    Finished,
}

/// One player's standing within a session.
///
/// Identity is the nickname. The connection id only records which socket is
/// currently speaking for them; it changes on reconnect while score and
/// answer history stay put.
#[derive(Clone, Debug)]
pub struct Player {
    pub nickname: String,
    pub score: u32,
    pub connected: bool,
    pub answers: BTreeMap<usize, AnswerResult>,
    pub connection_id: ConnectionId,
    pub joined_at: DateTime<Utc>,
}

impl Player {
    fn new(nickname: &str, connection_id: ConnectionId) -> Self {
        Self {
            nickname: nickname.to_owned(),
            score: 0,
            connected: true,
            answers: BTreeMap::new(),
            connection_id,
            joined_at: Utc::now(),
        }
    }
}

/// A submission on the books for the live question. Resubmitting replaces
/// the entry wholesale, receipt time and sequence number included.
#[derive(Clone, Debug)]
pub struct ReceivedAnswer {
    pub answer: String,
    pub received_at: DateTime<Utc>,
    /// Per-question arrival counter. Breaks receipt-time ties so speed
    /// ranking stays deterministic under burst submissions.
    pub seq: u64,
}

/// The live question: a per-start copy of the snapshot entry plus everything
/// submitted so far. `finished` flips once and never back.
#[derive(Clone, Debug)]
pub struct QuestionState {
    pub index: usize,
    pub spec: QuestionSpec,
    pub started_at: DateTime<Utc>,
    pub answers_received: HashMap<String, ReceivedAnswer>,
    pub finished: bool,
    next_seq: u64,
}

impl QuestionState {
    fn new(index: usize, spec: QuestionSpec) -> Self {
        Self {
            index,
            spec,
            started_at: Utc::now(),
            answers_received: HashMap::new(),
            finished: false,
            next_seq: 0,
        }
    }

    fn record_answer(&mut self, nickname: &str, answer: String) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.answers_received.insert(
            nickname.to_owned(),
            ReceivedAnswer {
                answer,
                received_at: Utc::now(),
                seq,
            },
        );
    }
}

/// How a join attempt landed for a well-formed request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JoinOutcome {
    Joined,
    Reconnected,
}

impl JoinOutcome {
    /// Greeting carried by the personal `connected` event.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Joined => "Joined the game",
            Self::Reconnected => "Reconnected to the game",
        }
    }
}

/// Everything the fanout layer needs after a question is scored.
#[derive(Clone, Debug)]
pub struct FinishedQuestion {
    pub index: usize,
    /// The reveal, in the coordinates the players saw (order questions are
    /// served shuffled per playthrough).
    pub correct_answer: String,
    pub results: BTreeMap<String, AnswerResult>,
}

/// One live game: the immutable question snapshot plus all mutable play
/// state. Mutation happens under the store's per-session write lock; every
/// method here is synchronous and never blocks on anything external.
#[derive(Clone, Debug)]
pub struct GameSession {
    pub code: GameCode,
    pub host_id: HostId,
    pub snapshot: QuizSnapshot,
    pub status: GameStatus,
    pub players: HashMap<String, Player>,
    pub current_index: Option<usize>,
    pub current_question: Option<QuestionState>,
    pub created_at: DateTime<Utc>,
}

impl GameSession {
    pub fn new(code: GameCode, host_id: HostId, snapshot: QuizSnapshot) -> Self {
        Self {
            code,
            host_id,
            snapshot,
            status: GameStatus::Waiting,
            players: HashMap::new(),
            current_index: None,
            current_question: None,
            created_at: Utc::now(),
        }
    }

    pub fn quiz_id(&self) -> &QuizId {
        &self.snapshot.quiz_id
    }

    /// Admit a player, or rebind a disconnected one to a fresh socket.
    ///
    /// A nickname with a live connection cannot be taken over; a nickname
    /// whose connection dropped reconnects with score and history intact.
    /// Mid-game joins are allowed and earn nothing retroactively.
    pub fn join(
        &mut self,
        nickname: &str,
        connection_id: ConnectionId,
    ) -> Result<JoinOutcome, EngineError> {
        if self.status == GameStatus::Finished {
            return Err(EngineError::GameOver);
        }
        match self.players.get_mut(nickname) {
            Some(player) if player.connected => {
                Err(EngineError::NicknameTaken(nickname.to_owned()))
            }
            Some(player) => {
                player.connection_id = connection_id;
                player.connected = true;
                Ok(JoinOutcome::Reconnected)
            }
            None => {
                self.players
                    .insert(nickname.to_owned(), Player::new(nickname, connection_id));
                Ok(JoinOutcome::Joined)
            }
        }
    }

    /// Start the question at `index`, which must be the required next one:
    /// 0 from waiting, the successor of the current index from playing.
    ///
    /// Returns false without touching state for anything else: out-of-range
    /// indices, a re-start of the still-live question (host double-click),
    /// skips, replays, or a finished game.
    pub fn start_question(&mut self, index: usize) -> bool {
        if self.status == GameStatus::Finished {
            return false;
        }
        if index >= self.snapshot.questions.len() {
            return false;
        }
        if let Some(q) = &self.current_question {
            if !q.finished && q.index == index {
                return false;
            }
        }
        let required = match self.current_index {
            None => 0,
            Some(i) => i + 1,
        };
        if index != required {
            return false;
        }

        self.status = GameStatus::Playing;
        self.current_index = Some(index);

        let mut spec = self.snapshot.questions[index].clone();
        if spec.kind == QuestionKind::Order && !spec.options.is_empty() {
            shuffle_order_question(&mut spec);
        }
        self.current_question = Some(QuestionState::new(index, spec));
        true
    }

    /// Put an answer on the books for the live question. The last submission
    /// before the finish wins. False when the game is over, there is no
    /// unfinished question, or the nickname never joined.
    pub fn submit_answer(&mut self, nickname: &str, answer: impl Into<String>) -> bool {
        if self.status == GameStatus::Finished {
            return false;
        }
        if !self.players.contains_key(nickname) {
            return false;
        }
        let Some(question) = self.current_question.as_mut() else {
            return false;
        };
        if question.finished {
            return false;
        }
        question.record_answer(nickname, answer.into());
        true
    }

    /// Score the live question and fix the results.
    ///
    /// Every member gets exactly one result: submitters are evaluated and the
    /// fastest correct ones earn bonus ranks, silent members get the zero
    /// result. Points land on cumulative scores in the same step. A second
    /// call is a no-op returning `None`; results never change once written.
    pub fn finish_question(&mut self) -> Option<FinishedQuestion> {
        let question = self.current_question.as_mut()?;
        if question.finished {
            return None;
        }
        question.finished = true;

        let index = question.index;
        let spec = question.spec.clone();
        let received: Vec<(String, ReceivedAnswer)> = question
            .answers_received
            .iter()
            .map(|(nickname, answer)| (nickname.clone(), answer.clone()))
            .collect();

        let mut results: BTreeMap<String, AnswerResult> = BTreeMap::new();
        let mut correct: Vec<(String, ReceivedAnswer)> = Vec::new();
        for (nickname, answer) in received {
            if scoring::evaluate(spec.kind, &answer.answer, &spec.correct_answer) {
                correct.push((nickname, answer));
            } else {
                results.insert(nickname, AnswerResult::incorrect(answer.answer));
            }
        }

        correct.sort_by_key(|(_, answer)| (answer.received_at, answer.seq));
        for (position, (nickname, answer)) in correct.into_iter().enumerate() {
            let (points, rank) = scoring::award(spec.points, position + 1, spec.speed_bonus);
            results.insert(
                nickname,
                AnswerResult {
                    correct: true,
                    points,
                    rank,
                    answer: Some(answer.answer),
                    was_online: true,
                },
            );
        }

        for (nickname, player) in &self.players {
            if !results.contains_key(nickname) {
                results.insert(nickname.clone(), AnswerResult::missed(player.connected));
            }
        }

        for (nickname, result) in &results {
            if let Some(player) = self.players.get_mut(nickname) {
                player.score += result.points;
                player.answers.insert(index, result.clone());
            }
        }

        Some(FinishedQuestion {
            index,
            correct_answer: spec.correct_answer,
            results,
        })
    }

    /// Score table, best first. Equal scores order by nickname so successive
    /// reads agree. Ranks are 1-based positions assigned after truncation.
    pub fn leaderboard(&self, limit: usize, include_detail: bool) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .players
            .values()
            .map(|player| {
                let correct_answers = player.answers.values().filter(|a| a.correct).count();
                LeaderboardEntry {
                    nickname: player.nickname.clone(),
                    score: player.score,
                    correct_answers,
                    total_answers: player.answers.len(),
                    rank: 0,
                    question_scores: include_detail.then(|| player.answers.clone()),
                }
            })
            .collect();

        entries.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.nickname.cmp(&b.nickname))
        });
        entries.truncate(limit);
        for (position, entry) in entries.iter_mut().enumerate() {
            entry.rank = position + 1;
        }
        entries
    }

    /// End the game. Terminal: no question can start and no answer can land
    /// afterwards, while leaderboards and reports stay readable.
    pub fn finish_game(&mut self) {
        self.status = GameStatus::Finished;
    }

    /// Mark whoever owns this socket as disconnected, returning the nickname.
    /// Players are never removed; their score and history await a reconnect.
    pub fn disconnect(&mut self, connection_id: &ConnectionId) -> Option<String> {
        let player = self
            .players
            .values_mut()
            .find(|p| &p.connection_id == connection_id)?;
        player.connected = false;
        Some(player.nickname.clone())
    }
}

/// Present an order question in a fresh arrangement for this playthrough.
///
/// Options are shuffled and the correct sequence is rewritten into the
/// shuffled coordinates, so clients answer in terms of what they see. The
/// snapshot template is never touched.
fn shuffle_order_question(spec: &mut QuestionSpec) {
    let correct: Vec<usize> = serde_json::from_str(&spec.correct_answer)
        .unwrap_or_else(|_| (0..spec.options.len()).collect());

    let mut arrangement: Vec<usize> = (0..spec.options.len()).collect();
    arrangement.shuffle(&mut rand::thread_rng());

    spec.options = arrangement
        .iter()
        .map(|&original| spec.options[original].clone())
        .collect();

    let remapped: Vec<usize> = correct
        .iter()
        .filter_map(|original| arrangement.iter().position(|&p| p == *original))
        .collect();
    spec.correct_answer =
        serde_json::to_string(&remapped).unwrap_or_else(|_| "[]".to_string());
}
