use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw move submitted by a player.
///
/// Moves arrive untyped from the wire and are only interpreted by the
/// [`GameRule`](crate::rules::GameRule) that owns the session. A JSON string
/// decodes to [`Move::Token`], a JSON integer to [`Move::Number`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Move {
    /// Symbolic move such as `"rock"`
    Token(String),
    /// Numeric move for games that count or bid
    Number(i64),
}

impl Move {
    pub fn token(value: impl Into<String>) -> Self {
        Move::Token(value.into())
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            Move::Token(value) => Some(value),
            Move::Number(_) => None,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Token(value) => write!(f, "\"{value}\""),
            Move::Number(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Move {
    fn from(value: &str) -> Self {
        Move::Token(value.to_string())
    }
}
