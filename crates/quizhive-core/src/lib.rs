pub mod errors;
pub mod events;
pub mod ids;
pub mod quiz;
pub mod results;

pub use errors::CoreError;
pub use events::{ClientMessage, GameEvent};
pub use ids::{ConnectionId, GameCode, HostId, QuizId};
pub use quiz::{PublicQuestion, QuestionKind, QuestionSpec, QuizSnapshot};
pub use results::{AnswerResult, LeaderboardEntry};
