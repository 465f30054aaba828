//! Client error taxonomy.
//!
//! Negotiation and dial failures are fatal to a connect attempt. Transport
//! failures are fatal to the session and surface from `Client::dispatch`.
//! `Server` is per-call and never affects other calls or the dispatch loop.

use tokio_tungstenite::tungstenite;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Scheme and host do not form a usable URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The negotiation HTTP request failed or returned a non-success status.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// A JSON body or frame could not be encoded or decoded.
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// The websocket dial or handshake failed.
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tungstenite::Error>),
    /// Reading from or writing to the live websocket failed.
    #[error("websocket transport failed: {0}")]
    Transport(Box<tungstenite::Error>),
    /// The server closed the websocket or the stream ended.
    #[error("websocket closed")]
    WsClosed,
    /// No live connection; call `connect` first.
    #[error("not connected")]
    NotConnected,
    /// Another task already owns the connection's read half.
    #[error("dispatch loop already running")]
    AlreadyDispatching,
    /// A `connect` is still negotiating or dialing.
    #[error("connect already in progress")]
    Connecting,
    /// The server answered the call with an error message.
    #[error("server returned error: {0}")]
    Server(String),
    /// The connection ended before the call received a result.
    #[error("call to server returned no result")]
    Abandoned,
}
