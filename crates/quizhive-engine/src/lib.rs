pub mod error;
pub mod scoring;
pub mod session;
pub mod store;
pub mod views;

pub use error::EngineError;
pub use session::{
    FinishedQuestion, GameSession, GameStatus, JoinOutcome, Player, QuestionState,
    DEFAULT_LEADERBOARD_LIMIT,
};
pub use store::{Disconnected, SessionStore};
pub use views::{
    ActiveQuestion, CurrentQuestion, GameReport, QuestionProgress, SessionView,
};
