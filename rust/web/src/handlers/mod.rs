pub mod connect;
pub mod health;
pub mod play;
pub mod ws;

pub use connect::{hello, GameSelection, HelloRequest, HelloResponse, PlayerBody};
pub use health::health;
pub use play::{play, PlayBody, PlayReply};
pub use ws::{open_channel, upgrade, WsQuery};

use crate::errors::{bad_request, IntoErrorResponse};
use crate::session::SessionError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

fn success_response<T>(status: StatusCode, body: T) -> Response
where
    T: Serialize,
{
    reply::with_status(reply::json(&body), status).into_response()
}

fn session_error(err: SessionError) -> Response {
    err.into_http_response()
}

/// Decodes a JSON body, answering with a `bad_request` error body instead of
/// warp's plain-text rejection.
fn decode_body<T>(body: &[u8]) -> Result<T, Response>
where
    T: DeserializeOwned,
{
    serde_json::from_slice(body).map_err(|err| {
        tracing::debug!(error = %err, "request body rejected");
        bad_request(format!("malformed request body: {err}"))
    })
}
