use crate::events::GameEvent;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

// A bot this many events behind loses the overflow like any other failed
// delivery.
const PUSH_CHANNEL_BUFFER: usize = 64;

pub type PushReceiver = mpsc::Receiver<GameEvent>;

/// Sending half of an open push connection to one player.
#[derive(Debug, Clone)]
pub struct PushChannel {
    sender: mpsc::Sender<GameEvent>,
}

impl PushChannel {
    /// Creates a channel; the receiver belongs to the transport that drains it.
    pub fn new() -> (Self, PushReceiver) {
        let (sender, receiver) = mpsc::channel(PUSH_CHANNEL_BUFFER);
        (Self { sender }, receiver)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn push(&self, event: GameEvent) -> Result<(), DeliveryError> {
        self.sender.try_send(event).map_err(|err| match err {
            TrySendError::Full(_) => DeliveryError::ChannelFull,
            TrySendError::Closed(_) => DeliveryError::ChannelClosed,
        })
    }
}

/// Where a notification goes. A push channel always wins over a callback.
#[derive(Debug, Clone)]
pub enum Route {
    Channel(PushChannel),
    Callback(Url),
}

impl Route {
    pub fn transport(&self) -> &'static str {
        match self {
            Route::Channel(_) => "channel",
            Route::Callback(_) => "callback",
        }
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("could not encode event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("publishing through HTTP failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("expecting status code 204 (No Content) but got {0}")]
    UnexpectedStatus(StatusCode),
    #[error("push channel is closed")]
    ChannelClosed,
    #[error("push channel is full")]
    ChannelFull,
}

/// Best-effort, fire-and-forget event delivery.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
    delay: Duration,
}

impl Notifier {
    pub fn new(delay: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            delay,
        }
    }

    /// Delivers `event` on a detached task after the configured delay.
    ///
    /// Failures are logged and dropped; nothing is retried.
    pub fn dispatch(&self, route: Route, event: GameEvent) {
        let notifier = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(notifier.delay).await;
            let transport = route.transport();
            match notifier.deliver(&route, &event).await {
                Ok(()) => {
                    tracing::debug!(transport, event_type = event.kind(), "event delivered");
                }
                Err(err @ DeliveryError::UnexpectedStatus(_)) => {
                    tracing::warn!(
                        transport,
                        event_type = event.kind(),
                        error = %err,
                        "event delivery was not acknowledged"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        transport,
                        event_type = event.kind(),
                        error = %err,
                        "event delivery failed"
                    );
                }
            }
        });
    }

    /// Sends `event` immediately over `route`.
    pub async fn deliver(&self, route: &Route, event: &GameEvent) -> Result<(), DeliveryError> {
        match route {
            Route::Channel(channel) => channel.push(event.clone()),
            Route::Callback(url) => {
                let body = serde_json::to_vec(event)?;
                let response = self
                    .client
                    .post(url.clone())
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(body)
                    .send()
                    .await?;
                match response.status() {
                    StatusCode::NO_CONTENT => Ok(()),
                    status => Err(DeliveryError::UnexpectedStatus(status)),
                }
            }
        }
    }
}
