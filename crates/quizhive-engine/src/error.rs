use quizhive_core::GameCode;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("game not found: {0}")]
    GameNotFound(GameCode),

    #[error("the game is already over")]
    GameOver,

    #[error("nickname already taken: {0}")]
    NicknameTaken(String),

    #[error("the quiz has no questions")]
    EmptyQuiz,
}
