use crate::session::SessionId;
use botserver_engine::moves::Move;
use botserver_engine::round::Status;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Event pushed to a player, serialized as `{"type": ..., "body": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "camelCase")]
pub enum GameEvent {
    StartGame(StartGame),
    RoundFinished(RoundFinished),
    GameFinished(GameFinished),
    Error(ErrorEvent),
}

impl GameEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::StartGame(_) => "startGame",
            GameEvent::RoundFinished(_) => "roundFinished",
            GameEvent::GameFinished(_) => "gameFinished",
            GameEvent::Error(_) => "error",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        GameEvent::Error(ErrorEvent {
            message: message.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGame {
    pub game_id: SessionId,
    pub players: Vec<String>,
    pub next_round: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundFinished {
    pub game_id: SessionId,
    pub current_round: u32,
    pub round_result: Outcome,
    pub next_round: u32,
    /// Score after the round, addressed player first
    pub score: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameFinished {
    pub game_id: SessionId,
    pub score: String,
    pub game_result: Outcome,
}

/// Result of a round or a game from the addressed player's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub moves: BTreeMap<String, MoveBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveBody {
    pub value: Move,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn start_game_wire_shape() {
        let event = GameEvent::StartGame(StartGame {
            game_id: "g1".into(),
            players: vec!["Player0".into(), "Player1".into()],
            next_round: 1,
        });
        let value = serde_json::to_value(&event).expect("encode");
        assert_eq!(
            value,
            json!({
                "type": "startGame",
                "body": {"gameId": "g1", "players": ["Player0", "Player1"], "nextRound": 1}
            })
        );
        assert_eq!(event.kind(), "startGame");
    }

    #[test]
    fn draw_round_omits_winner() {
        let mut moves = BTreeMap::new();
        moves.insert(
            "a".to_string(),
            MoveBody {
                value: Move::token("rock"),
            },
        );
        let event = GameEvent::RoundFinished(RoundFinished {
            game_id: "g1".into(),
            current_round: 2,
            round_result: Outcome {
                status: Status::Draw,
                winner: None,
                moves,
            },
            next_round: 2,
            score: "1-1".into(),
        });
        let value = serde_json::to_value(&event).expect("encode");
        assert_eq!(value["type"], "roundFinished");
        assert_eq!(value["body"]["roundResult"]["status"], "draw");
        assert!(value["body"]["roundResult"].get("winner").is_none());
        assert_eq!(value["body"]["roundResult"]["moves"]["a"]["value"], "rock");
        assert_eq!(value["body"]["score"], "1-1");
    }

    #[test]
    fn error_event_round_trips_through_tagged_form() {
        let raw = r#"{"type":"error","body":{"message":"unreachable players are: bob"}}"#;
        let event: GameEvent = serde_json::from_str(raw).expect("decode");
        assert_eq!(event, GameEvent::error("unreachable players are: bob"));
    }
}
