use thiserror::Error;

/// Failures raised by game rules while resolving names or checking moves.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("game name was not provided or does not exist: `{0}`")]
    UnknownGameType(String),
    #[error("invalid move {value}: expected one of {expected}")]
    InvalidMove { value: String, expected: String },
}
