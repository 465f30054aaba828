//! Negotiation: the HTTP pre-step that issues a connection token.
//!
//! One GET to `/signalr/negotiate` on the caller's scheme and host. No retry;
//! transport and decode errors go back to the caller unchanged.

use reqwest::Url;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ClientError;

pub const NEGOTIATE_PATH: &str = "/signalr/negotiate";

/// Session data handed out by the negotiate endpoint.
///
/// Missing fields take their defaults; the only field the client needs to
/// open the duplex connection is `connection_token`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct SessionParameters {
    pub url: String,
    pub connection_token: String,
    pub connection_id: String,
    /// Seconds. `null` when the server has keep-alive disabled.
    pub keep_alive_timeout: Option<f64>,
    pub disconnect_timeout: f64,
    pub connection_timeout: f64,
    pub try_web_sockets: bool,
    pub protocol_version: String,
    pub transport_connect_timeout: f64,
    pub log_poll_delay: f64,
}

/// Negotiate session parameters with the server at `scheme://host`.
///
/// # Errors
///
/// Returns [`ClientError::InvalidEndpoint`] for a bad scheme/host,
/// [`ClientError::Http`] for network failures and non-success statuses, and
/// [`ClientError::InvalidJson`] when the body is not a negotiation response.
pub async fn negotiate(http: &reqwest::Client, scheme: &str, host: &str) -> Result<SessionParameters, ClientError> {
    let url = endpoint_url(scheme, host, NEGOTIATE_PATH)?;
    let body = http.get(url).send().await?.error_for_status()?.text().await?;
    let params = serde_json::from_str::<SessionParameters>(&body)?;

    info!(
        connection_id = %params.connection_id,
        protocol_version = %params.protocol_version,
        "negotiate: session parameters received"
    );
    if !params.try_web_sockets {
        warn!(connection_id = %params.connection_id, "negotiate: server does not advertise websockets; dialing anyway");
    }
    Ok(params)
}

/// Build `scheme://host{path}`, rejecting anything that is not a URL authority.
pub(crate) fn endpoint_url(scheme: &str, host: &str, path: &str) -> Result<Url, ClientError> {
    let raw = format!("{scheme}://{host}");
    let url = Url::parse(&raw).map_err(|e| ClientError::InvalidEndpoint(format!("{raw}: {e}")))?;
    if url.host_str().is_none_or(str::is_empty) || url.path() != "/" || url.query().is_some() {
        return Err(ClientError::InvalidEndpoint(raw));
    }
    url.join(path).map_err(|e| ClientError::InvalidEndpoint(format!("{raw}: {e}")))
}

#[cfg(test)]
#[path = "negotiate_test.rs"]
mod tests;
