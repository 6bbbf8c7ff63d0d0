use std::sync::Arc;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use rand::Rng;
use tracing::{debug, info, instrument};

use quizhive_core::ids::{GAME_CODE_CHARSET, GAME_CODE_LEN};
use quizhive_core::{ConnectionId, GameCode, HostId, LeaderboardEntry, QuizId, QuizSnapshot};

use crate::error::EngineError;
use crate::session::{FinishedQuestion, GameSession, JoinOutcome};
use crate::views::{CurrentQuestion, GameReport, QuestionProgress, SessionView};

/// A disconnect that actually landed: which game and which player.
#[derive(Clone, Debug)]
pub struct Disconnected {
    pub code: GameCode,
    pub nickname: String,
}

/// The session arena. All game state lives here and nowhere else.
///
/// Each session sits behind its own `RwLock`, so there is exactly one writer
/// per game while different games mutate in parallel. The connection index
/// routes socket drops back to their session and is synchronized
/// independently. Two rules keep this deadlock-free: every operation locks at
/// most one session, and no map reference is held across a lock acquisition.
/// All methods are synchronous; nothing ever awaits under a lock.
pub struct SessionStore {
    sessions: DashMap<GameCode, Arc<RwLock<GameSession>>>,
    connections: DashMap<ConnectionId, GameCode>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            connections: DashMap::new(),
        }
    }

    /// Open a session for a quiz snapshot under a freshly minted code.
    /// The only refusal is an empty snapshot.
    #[instrument(skip(self, host_id, snapshot), fields(quiz_id = %snapshot.quiz_id, host_id = %host_id))]
    pub fn create_session(
        &self,
        host_id: HostId,
        snapshot: QuizSnapshot,
    ) -> Result<GameCode, EngineError> {
        if snapshot.is_empty() {
            return Err(EngineError::EmptyQuiz);
        }

        let mut rng = rand::thread_rng();
        loop {
            let candidate = random_code(&mut rng);
            match self.sessions.entry(candidate.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    let session = GameSession::new(candidate.clone(), host_id, snapshot);
                    slot.insert(Arc::new(RwLock::new(session)));
                    info!(code = %candidate, "session created");
                    return Ok(candidate);
                }
            }
        }
    }

    /// Admit or reconnect a player and bind their connection to the session.
    #[instrument(skip(self, connection_id), fields(code = %code, nickname))]
    pub fn join_session(
        &self,
        code: &GameCode,
        nickname: &str,
        connection_id: ConnectionId,
    ) -> Result<JoinOutcome, EngineError> {
        let session = self
            .session(code)
            .ok_or_else(|| EngineError::GameNotFound(code.clone()))?;
        let mut guard = session.write();

        let previous = guard
            .players
            .get(nickname)
            .map(|p| p.connection_id.clone());
        let outcome = guard.join(nickname, connection_id.clone())?;
        drop(guard);

        if outcome == JoinOutcome::Reconnected {
            if let Some(previous) = previous {
                self.connections.remove(&previous);
            }
        }
        self.connections.insert(connection_id, code.clone());

        info!(reconnect = outcome == JoinOutcome::Reconnected, "player joined");
        Ok(outcome)
    }

    /// Start the required next question. False leaves all state untouched.
    #[instrument(skip(self), fields(code = %code, index))]
    pub fn start_question(&self, code: &GameCode, index: usize) -> bool {
        let Some(session) = self.session(code) else {
            return false;
        };
        let started = session.write().start_question(index);
        if started {
            info!("question started");
        }
        started
    }

    /// Record an answer for the live question. Resubmission overwrites.
    #[instrument(skip(self, answer), fields(code = %code, nickname))]
    pub fn submit_answer(&self, code: &GameCode, nickname: &str, answer: &str) -> bool {
        let Some(session) = self.session(code) else {
            return false;
        };
        let accepted = session.write().submit_answer(nickname, answer);
        debug!(accepted, "answer submitted");
        accepted
    }

    /// Score the live question. `None` when there is nothing to finish,
    /// including a repeated call for an already-finished question.
    #[instrument(skip(self), fields(code = %code))]
    pub fn finish_question(&self, code: &GameCode) -> Option<FinishedQuestion> {
        let session = self.session(code)?;
        let finished = session.write().finish_question();
        if let Some(finished) = &finished {
            info!(index = finished.index, members = finished.results.len(), "question finished");
        }
        finished
    }

    /// Score table for a session; empty when the code is unknown.
    pub fn leaderboard(
        &self,
        code: &GameCode,
        limit: usize,
        include_detail: bool,
    ) -> Vec<LeaderboardEntry> {
        match self.session(code) {
            Some(session) => session.read().leaderboard(limit, include_detail),
            None => Vec::new(),
        }
    }

    /// End the game for good. False when the code is unknown.
    #[instrument(skip(self), fields(code = %code))]
    pub fn finish_game(&self, code: &GameCode) -> bool {
        let Some(session) = self.session(code) else {
            return false;
        };
        session.write().finish_game();
        info!("game finished");
        true
    }

    /// Route a socket drop to its player. Stale connection ids, including
    /// those superseded by a reconnect, are ignored. Never removes the player.
    #[instrument(skip(self), fields(connection_id = %connection_id))]
    pub fn disconnect_player(&self, connection_id: &ConnectionId) -> Option<Disconnected> {
        let (_, code) = self.connections.remove(connection_id)?;
        let session = self.session(&code)?;
        let nickname = session.write().disconnect(connection_id)?;
        info!(code = %code, nickname, "player disconnected");
        Some(Disconnected { code, nickname })
    }

    /// Drop a session and every connection bound to it.
    #[instrument(skip(self), fields(code = %code))]
    pub fn remove_session(&self, code: &GameCode) -> bool {
        let removed = self.sessions.remove(code).is_some();
        if removed {
            self.connections.retain(|_, bound| bound != code);
            info!("session removed");
        }
        removed
    }

    pub fn host_id(&self, code: &GameCode) -> Option<HostId> {
        let session = self.session(code)?;
        let guard = session.read();
        Some(guard.host_id.clone())
    }

    pub fn quiz_id(&self, code: &GameCode) -> Option<QuizId> {
        let session = self.session(code)?;
        let guard = session.read();
        Some(guard.quiz_id().clone())
    }

    /// Host dashboard view; one consistent snapshot per call.
    pub fn session_view(&self, code: &GameCode) -> Option<SessionView> {
        let session = self.session(code)?;
        let guard = session.read();
        Some(guard.view())
    }

    /// Player-facing current-question payload for a known code.
    pub fn current_question(&self, code: &GameCode) -> Option<CurrentQuestion> {
        let session = self.session(code)?;
        let guard = session.read();
        Some(match guard.active_question(Utc::now()) {
            Some(active) => CurrentQuestion::Active(active),
            None => CurrentQuestion::Idle,
        })
    }

    /// Submission tally for the current question of a known code.
    pub fn question_progress(&self, code: &GameCode) -> Option<QuestionProgress> {
        let session = self.session(code)?;
        let guard = session.read();
        guard.progress()
    }

    /// Report payload for the export collaborator.
    pub fn export_report(&self, code: &GameCode) -> Option<GameReport> {
        let session = self.session(code)?;
        let guard = session.read();
        Some(guard.report(Utc::now()))
    }

    pub fn contains(&self, code: &GameCode) -> bool {
        self.sessions.contains_key(code)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Clone the session handle out so no map reference survives into the
    /// lock acquisition below it.
    fn session(&self, code: &GameCode) -> Option<Arc<RwLock<GameSession>>> {
        self.sessions.get(code).map(|entry| entry.value().clone())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn random_code(rng: &mut impl Rng) -> GameCode {
    let code: String = (0..GAME_CODE_LEN)
        .map(|_| GAME_CODE_CHARSET[rng.gen_range(0..GAME_CODE_CHARSET.len())] as char)
        .collect();
    GameCode::from_raw(code)
}
