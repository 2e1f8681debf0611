use super::{decode_body, session_error, success_response};
use crate::events::MoveBody;
use crate::session::{PlayRequest, SessionManager};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayBody {
    pub game_id: String,
    pub player_id: String,
    pub round: u32,
    #[serde(rename = "move")]
    pub mv: MoveBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayReply {
    pub round: u32,
    pub players_yet_to_make_move: Vec<String>,
}

/// Submits a move for the current round.
///
/// `POST /play` with `{"gameId", "playerId", "round", "move": {"value": "rock"}}`.
/// Answers `200 {"round": 1, "playersYetToMakeMove": ["bob"]}`; once the list
/// is empty the round result is pushed to every player.
pub async fn play(sessions: Arc<SessionManager>, body: Bytes) -> Response {
    let body: PlayBody = match decode_body(&body) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let request = PlayRequest {
        session_id: body.game_id,
        player_id: body.player_id,
        round: body.round,
        mv: body.mv.value,
    };

    match sessions.play(request) {
        Ok(accepted) => success_response(
            StatusCode::OK,
            PlayReply {
                round: accepted.round,
                players_yet_to_make_move: accepted.players_to_move,
            },
        ),
        Err(err) => session_error(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botserver_engine::moves::Move;

    #[test]
    fn decodes_token_and_numeric_moves() {
        let body: PlayBody = serde_json::from_str(
            r#"{"gameId": "g", "playerId": "p", "round": 2, "move": {"value": "paper"}}"#,
        )
        .expect("decode");
        assert_eq!(body.round, 2);
        assert_eq!(body.mv.value, Move::from("paper"));

        let body: PlayBody = serde_json::from_str(
            r#"{"gameId": "g", "playerId": "p", "round": 1, "move": {"value": 7}}"#,
        )
        .expect("decode");
        assert_eq!(body.mv.value, Move::Number(7));
    }

    #[test]
    fn reply_uses_wire_names() {
        let reply = PlayReply {
            round: 1,
            players_yet_to_make_move: vec!["bob".into()],
        };
        let json = serde_json::to_value(&reply).expect("serialize");
        assert_eq!(json["playersYetToMakeMove"][0], "bob");
    }
}
