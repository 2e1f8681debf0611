use botserver_web::{
    AppContext, ConnectRequest, ConnectResponse, LifecycleSettings, ServerConfig, WebServer,
};
use serde_json::{json, Value};
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::test::WsClient;

fn context() -> AppContext {
    let lifecycle = LifecycleSettings {
        readiness_attempts: 50,
        readiness_interval_ms: 10,
        delivery_delay_ms: 1,
    };
    AppContext::new(ServerConfig::for_tests().with_lifecycle(lifecycle)).expect("context")
}

fn connect(context: &AppContext, name: &str) -> ConnectResponse {
    context
        .sessions()
        .connect(ConnectRequest {
            game_name: "rps".into(),
            token: "ws".into(),
            player_name: name.into(),
            ..Default::default()
        })
        .expect("connect")
}

async fn open(routes: &BoxedFilter<(Response,)>, who: &ConnectResponse) -> WsClient {
    warp::test::ws()
        .path(&format!(
            "/ws?gameId={}&playerId={}",
            who.session_id, who.player_id
        ))
        .handshake(routes.clone())
        .await
        .expect("handshake")
}

async fn next_event(client: &mut WsClient) -> Value {
    let message = tokio::time::timeout(std::time::Duration::from_secs(5), client.recv())
        .await
        .expect("event before timeout")
        .expect("message");
    serde_json::from_str(message.to_str().expect("text frame")).expect("json event")
}

#[tokio::test]
async fn events_arrive_as_json_text_frames() {
    let context = context();
    let routes = WebServer::routes(&context);

    let alice = connect(&context, "alice");
    let mut alice_ws = open(&routes, &alice).await;
    let bob = connect(&context, "bob");
    let mut bob_ws = open(&routes, &bob).await;

    for client in [&mut alice_ws, &mut bob_ws] {
        let event = next_event(client).await;
        assert_eq!(event["type"], "startGame");
        assert_eq!(event["body"]["players"], json!(["alice", "bob"]));
    }

    for (who, mv) in [(&alice, "paper"), (&bob, "paper")] {
        let response = warp::test::request()
            .method("POST")
            .path("/play")
            .json(&json!({
                "gameId": who.session_id,
                "playerId": who.player_id,
                "round": 1,
                "move": { "value": mv }
            }))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let event = next_event(&mut bob_ws).await;
    assert_eq!(event["type"], "roundFinished");
    assert_eq!(event["body"]["roundResult"]["status"], "draw");
    assert_eq!(event["body"]["nextRound"], 1);
}

#[tokio::test]
async fn unknown_player_gets_an_error_instead_of_an_upgrade() {
    let context = context();
    let routes = WebServer::routes(&context);
    let alice = connect(&context, "alice");

    let response = warp::test::request()
        .method("GET")
        .path(&format!("/ws?gameId={}&playerId=ghost", alice.session_id))
        .header("connection", "upgrade")
        .header("upgrade", "websocket")
        .header("sec-websocket-version", "13")
        .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(response.body()).expect("json");
    assert_eq!(body["error"], "unknown_player");
}

#[tokio::test]
async fn unknown_game_refuses_the_handshake() {
    let routes = WebServer::routes(&context());

    let result = warp::test::ws()
        .path("/ws?gameId=missing&playerId=nobody")
        .handshake(routes)
        .await;

    assert!(result.is_err());
}
