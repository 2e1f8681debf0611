use std::time::Instant;
use warp::filters::path::FullPath;
use warp::http::{Method, StatusCode};
use warp::reject::Rejection;
use warp::reply::Response;
use warp::Filter;

struct RequestStart {
    path: String,
    method: Method,
    started: Instant,
}

/// Logs every request on the way in and its status on the way out.
pub fn with_request_logging<F>(
    filter: F,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone
where
    F: Filter<Extract = (Response,), Error = Rejection> + Clone + Send + Sync + 'static,
{
    warp::any()
        .and(warp::path::full())
        .and(warp::method())
        .map(|path: FullPath, method: Method| {
            tracing::debug!(path = %path.as_str(), method = %method, "incoming request");
            RequestStart {
                path: path.as_str().to_string(),
                method,
                started: Instant::now(),
            }
        })
        .and(filter)
        .map(|start: RequestStart, response: Response| {
            log_response(
                response.status(),
                &start.path,
                start.method.as_str(),
                start.started.elapsed().as_millis(),
            );
            response
        })
}

/// Log response with status code
pub fn log_response(status: StatusCode, path: &str, method: &str, duration_ms: u128) {
    if status.is_server_error() {
        tracing::error!(
            status = %status.as_u16(),
            path = %path,
            method = %method,
            duration_ms = duration_ms,
            "server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            status = %status.as_u16(),
            path = %path,
            method = %method,
            duration_ms = duration_ms,
            "client error"
        );
    } else {
        tracing::info!(
            status = %status.as_u16(),
            path = %path,
            method = %method,
            duration_ms = duration_ms,
            "request completed"
        );
    }
}
