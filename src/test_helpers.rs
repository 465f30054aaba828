//! In-process mock of the negotiate and connect endpoints.
//!
//! Each mock binds `127.0.0.1:0`, answers `/signalr/negotiate` with a fixed
//! body and hands every accepted websocket to a per-test script. Query
//! parameters of each connect request are reported on `connects`.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use axum::extract::Query;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::routing::get;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::{Client, ClientConfig};

pub struct MockServer {
    pub addr: SocketAddr,
    pub connects: mpsc::UnboundedReceiver<HashMap<String, String>>,
}

impl MockServer {
    pub fn host(&self) -> String {
        self.addr.to_string()
    }
}

/// Serve negotiate with `negotiation` and run `script` for each websocket.
pub async fn spawn_mock<F, Fut>(negotiation: Value, script: F) -> MockServer
where
    F: Fn(WebSocket) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (connect_tx, connects) = mpsc::unbounded_channel();
    let app = Router::new()
        .route(
            "/signalr/negotiate",
            get(move || {
                let body = negotiation.clone();
                async move { axum::Json(body) }
            }),
        )
        .route(
            "/signalr/connect",
            get(move |Query(params): Query<HashMap<String, String>>, ws: WebSocketUpgrade| {
                let connect_tx = connect_tx.clone();
                let script = script.clone();
                async move {
                    let _ = connect_tx.send(params);
                    ws.on_upgrade(script)
                }
            }),
        );
    let addr = serve(app).await;
    MockServer { addr, connects }
}

/// Serve only the negotiate endpoint with a raw status and body.
pub async fn spawn_negotiate_only(status: StatusCode, body: &'static str) -> SocketAddr {
    let app = Router::new().route("/signalr/negotiate", get(move || async move { (status, body) }));
    serve(app).await
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock listener");
    let addr = listener.local_addr().expect("mock listener addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server failed");
    });
    addr
}

pub fn negotiation(token: &str) -> Value {
    json!({
        "Url": "/signalr",
        "ConnectionToken": token,
        "ConnectionId": "conn-1",
        "KeepAliveTimeout": 20.0,
        "DisconnectTimeout": 30.0,
        "ConnectionTimeout": 110.0,
        "TryWebSockets": true,
        "ProtocolVersion": "1.5",
        "TransportConnectTimeout": 5.0,
        "LogPollDelay": 0.0
    })
}

/// Client that dials plain `ws://`, for use against the mock.
pub fn ws_client() -> Client {
    let config = ClientConfig { connect_scheme: "ws".to_owned(), ..ClientConfig::default() };
    Client::new(config).expect("client should build")
}

/// Next text message from the client, parsed as JSON. `None` once closed.
pub async fn recv_json(socket: &mut WebSocket) -> Option<Value> {
    while let Some(Ok(message)) = socket.recv().await {
        match message {
            Message::Text(text) => return serde_json::from_str(text.as_str()).ok(),
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}

pub async fn send_json(socket: &mut WebSocket, value: Value) {
    let _ = socket.send(Message::Text(value.to_string().into())).await;
}

/// Keep the socket open until the client goes away.
pub async fn drain(mut socket: WebSocket) {
    while recv_json(&mut socket).await.is_some() {}
}
