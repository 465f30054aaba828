//! Transport connector: dials the persistent websocket for a negotiated session.
//!
//! All negotiation happens in the URL query: transport selector, client
//! protocol, connection token and the JSON list of hubs. The socket is usable
//! as soon as the websocket handshake completes.

use reqwest::Url;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};

use crate::error::ClientError;
use crate::negotiate::{SessionParameters, endpoint_url};

pub const CONNECT_PATH: &str = "/signalr/connect";
pub const TRANSPORT: &str = "webSockets";
pub const CLIENT_PROTOCOL: &str = "1.5";

/// The live duplex connection.
pub type Connection = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Serialize)]
struct HubDescriptor<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
}

/// Build the connect URL for `host` carrying the session token and hub list.
///
/// # Errors
///
/// Returns [`ClientError::InvalidEndpoint`] when `scheme://host` is not a URL.
pub fn connection_url<S: AsRef<str>>(
    scheme: &str,
    host: &str,
    params: &SessionParameters,
    hubs: &[S],
) -> Result<Url, ClientError> {
    let descriptors = hubs
        .iter()
        .map(|hub| HubDescriptor { name: hub.as_ref() })
        .collect::<Vec<_>>();
    let connection_data = serde_json::to_string(&descriptors)?;

    let mut url = endpoint_url(scheme, host, CONNECT_PATH)?;
    url.query_pairs_mut()
        .append_pair("transport", TRANSPORT)
        .append_pair("clientProtocol", CLIENT_PROTOCOL)
        .append_pair("connectionToken", &params.connection_token)
        .append_pair("connectionData", &connection_data);
    Ok(url)
}

/// Dial the duplex connection for a negotiated session.
///
/// # Errors
///
/// Returns [`ClientError::WsConnect`] with the underlying dial error.
pub async fn connect<S: AsRef<str>>(
    scheme: &str,
    host: &str,
    params: &SessionParameters,
    hubs: &[S],
) -> Result<Connection, ClientError> {
    let url = connection_url(scheme, host, params, hubs)?;
    debug!(%scheme, %host, hubs = hubs.len(), "transport: dialing");

    let (socket, _) = connect_async(url.as_str())
        .await
        .map_err(|e| ClientError::WsConnect(Box::new(e)))?;

    info!(connection_id = %params.connection_id, "transport: connected");
    Ok(socket)
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
