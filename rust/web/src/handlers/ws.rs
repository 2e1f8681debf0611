use super::session_error;
use crate::notify::{PushChannel, PushReceiver};
use crate::session::{SessionError, SessionManager};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use warp::reply::Response;
use warp::ws::{Message, WebSocket, Ws};
use warp::Reply;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsQuery {
    pub game_id: String,
    pub player_id: String,
}

/// Creates a push channel for the player and registers it with the session.
pub fn open_channel(
    sessions: &SessionManager,
    query: &WsQuery,
) -> Result<PushReceiver, SessionError> {
    let (channel, receiver) = PushChannel::new();
    sessions.register_channel(&query.game_id, &query.player_id, channel)?;
    Ok(receiver)
}

/// `GET /ws?gameId=..&playerId=..`
///
/// The channel is registered before the handshake completes, so an unknown
/// game or player gets a JSON error response and no upgrade.
pub fn upgrade(sessions: Arc<SessionManager>, query: WsQuery, ws: Ws) -> Response {
    match open_channel(&sessions, &query) {
        Ok(receiver) => ws
            .on_upgrade(move |socket| pump(socket, receiver, query))
            .into_response(),
        Err(err) => session_error(err),
    }
}

async fn pump(socket: WebSocket, receiver: PushReceiver, query: WsQuery) {
    let (mut sink, mut incoming) = socket.split();
    let mut events = ReceiverStream::new(receiver);

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::error!(error = %err, event = event.kind(), "failed to encode event");
                        continue;
                    }
                };
                if let Err(err) = sink.send(Message::text(text)).await {
                    tracing::warn!(
                        player_id = %query.player_id,
                        error = %err,
                        "websocket send failed"
                    );
                    break;
                }
            }
            frame = incoming.next() => match frame {
                Some(Ok(message)) if message.is_close() => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::debug!(player_id = %query.player_id, error = %err, "websocket read failed");
                    break;
                }
                None => break,
            }
        }
    }

    let _ = sink.close().await;
    tracing::info!(
        session_id = %query.game_id,
        player_id = %query.player_id,
        "push channel closed"
    );
}
