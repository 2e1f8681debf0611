use serde::Serialize;
use warp::reply::Json;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

/// `GET /health`: liveness only, no session state is inspected.
pub fn health() -> Json {
    warp::reply::json(&HealthBody { status: "ok" })
}
