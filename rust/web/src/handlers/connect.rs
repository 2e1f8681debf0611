use super::{decode_body, session_error, success_response};
use crate::session::{ConnectRequest, SessionManager};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloRequest {
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(default)]
    pub event_callback: Option<String>,
    pub game: GameSelection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSelection {
    pub name: String,
    pub connection_token: String,
    #[serde(default)]
    pub number_of_total_players: Option<usize>,
    #[serde(default)]
    pub total_rounds: Option<u32>,
}

impl HelloRequest {
    fn into_connect(self) -> ConnectRequest {
        ConnectRequest {
            game_name: self.game.name,
            token: self.game.connection_token,
            player_count: self.game.number_of_total_players.unwrap_or(0),
            player_name: self.player_name.unwrap_or_default(),
            callback: self.event_callback.filter(|url| !url.trim().is_empty()),
            total_rounds: self.game.total_rounds.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HelloResponse {
    pub game_id: String,
    pub rounds: u32,
    pub player: PlayerBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerBody {
    pub id: String,
    pub name: String,
}

/// Joins (or opens) the session keyed by `game.connectionToken`.
///
/// # HTTP Method and Path
/// - **Method**: POST
/// - **Path**: `/hello`
///
/// # Request Format
/// ```json
/// {
///   "playerName": "alice",
///   "eventCallback": "http://bot.local/events",
///   "game": { "name": "rps", "connectionToken": "t1", "numberOfTotalPlayers": 2, "totalRounds": 3 }
/// }
/// ```
/// `playerName`, `eventCallback`, `numberOfTotalPlayers` and `totalRounds`
/// are optional.
///
/// # Response Format
/// - **Success (200 OK)**: `{"gameId": "...", "rounds": 3, "player": {"id": "...", "name": "alice"}}`
/// - **Error (400)**: `empty_token`, `unknown_game_type`, `invalid_player_count`, `bad_request`
/// - **Error (409)**: `session_full`
pub async fn hello(sessions: Arc<SessionManager>, body: Bytes) -> Response {
    let request: HelloRequest = match decode_body(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match sessions.connect(request.into_connect()) {
        Ok(joined) => success_response(
            StatusCode::OK,
            HelloResponse {
                game_id: joined.session_id,
                rounds: joined.total_rounds,
                player: PlayerBody {
                    id: joined.player_id,
                    name: joined.player_name,
                },
            },
        ),
        Err(err) => session_error(err),
    }
}
