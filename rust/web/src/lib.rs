//! HTTP and WebSocket front of the bot game server.
//!
//! Bots join a session with `POST /hello`, optionally open a push channel on
//! `GET /ws`, and submit moves with `POST /play`. Game events flow back either
//! over the push channel or as JSON `POST`s to the bot's callback URL.

pub mod errors;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod notify;
pub mod player;
pub mod server;
pub mod session;
pub mod settings;

pub use errors::{ErrorResponse, ErrorSeverity, IntoErrorResponse};
pub use events::{GameEvent, GameFinished, Outcome, RoundFinished, StartGame};
pub use logging::{init_logging, LogEntry, LogFormat, TestLogSubscriber};
pub use middleware::{log_response, with_request_logging};
pub use notify::{DeliveryError, Notifier, PushChannel, PushReceiver, Route};
pub use player::{Player, PlayerId};
pub use server::{AppContext, ServerConfig, ServerError, ServerHandle, WebServer};
pub use session::{
    ConnectRequest, ConnectResponse, Phase, PlayRequest, PlayResponse, SessionError, SessionId,
    SessionManager, SessionSnapshot,
};
pub use settings::{LifecycleSettings, SettingsError};
