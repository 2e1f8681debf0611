//! Error responses for the bot API.
//!
//! Every failed request is answered with an [`ErrorResponse`] body. Component
//! errors implement [`IntoErrorResponse`] to pick the HTTP status, a
//! machine-readable code and the log level.
use serde::{Deserialize, Serialize};
use std::fmt;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

/// Standard error body for all endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "stale_round")
    pub error: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn into_response(self, status: StatusCode) -> Response {
        reply::with_status(reply::json(&self), status).into_response()
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Error classification for logging levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Bad requests from bots; expected during normal play
    Client,
    /// Unexpected failures inside the server
    Server,
    /// Shared state can no longer be trusted
    Critical,
}

/// Converts an error into an HTTP response, logging it on the way out.
pub trait IntoErrorResponse {
    fn status_code(&self) -> StatusCode;

    fn error_code(&self) -> &'static str;

    fn error_message(&self) -> String;

    fn error_details(&self) -> Option<serde_json::Value> {
        None
    }

    fn severity(&self) -> ErrorSeverity {
        if self.status_code().is_server_error() {
            ErrorSeverity::Server
        } else {
            ErrorSeverity::Client
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        if let Some(details) = self.error_details() {
            ErrorResponse::with_details(self.error_code(), self.error_message(), details)
        } else {
            ErrorResponse::new(self.error_code(), self.error_message())
        }
    }

    fn into_http_response(self) -> Response
    where
        Self: Sized,
    {
        let status = self.status_code();
        let severity = self.severity();
        let error_response = self.to_error_response();

        match severity {
            ErrorSeverity::Client => {
                tracing::info!(
                    error = %error_response.error,
                    status = status.as_u16(),
                    "client error: {}",
                    error_response.message
                );
            }
            ErrorSeverity::Server => {
                tracing::error!(
                    error = %error_response.error,
                    status = status.as_u16(),
                    "server error: {}",
                    error_response.message
                );
            }
            ErrorSeverity::Critical => {
                tracing::error!(
                    error = %error_response.error,
                    status = status.as_u16(),
                    critical = true,
                    "critical error: {}",
                    error_response.message
                );
            }
        }

        error_response.into_response(status)
    }
}

/// Response for request bodies or query strings the web layer could not
/// decode into a core request.
pub fn bad_request(message: impl Into<String>) -> Response {
    ErrorResponse::new("bad_request", message).into_response(StatusCode::BAD_REQUEST)
}
