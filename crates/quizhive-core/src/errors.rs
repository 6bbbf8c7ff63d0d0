/// Failures in the shared wire and id types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Game codes are six uppercase alphanumeric characters.
    #[error("invalid game code: {0:?}")]
    InvalidGameCode(String),
}
