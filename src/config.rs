//! Client configuration parsed from environment variables.

use crate::error::ClientError;

pub const DEFAULT_CONNECT_SCHEME: &str = "wss";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Timeouts applied to the negotiation HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Scheme used to dial the duplex connection: `wss` or `ws`.
    pub connect_scheme: String,
    pub timeouts: HttpTimeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_scheme: DEFAULT_CONNECT_SCHEME.to_owned(),
            timeouts: HttpTimeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `SIGNALR_CONNECT_SCHEME`: `wss` (default) or `ws`
    /// - `SIGNALR_REQUEST_TIMEOUT_SECS`: default 30
    /// - `SIGNALR_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] for an unsupported connect scheme.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] for an unsupported connect scheme.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let connect_scheme = parse_connect_scheme(lookup("SIGNALR_CONNECT_SCHEME").as_deref())?;
        let timeouts = HttpTimeouts {
            request_secs: parse_u64(lookup("SIGNALR_REQUEST_TIMEOUT_SECS"), DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(lookup("SIGNALR_CONNECT_TIMEOUT_SECS"), DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        Ok(Self { connect_scheme, timeouts })
    }
}

fn parse_u64(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok()).unwrap_or(default)
}

fn parse_connect_scheme(raw: Option<&str>) -> Result<String, ClientError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(DEFAULT_CONNECT_SCHEME) {
        scheme @ ("wss" | "ws") => Ok(scheme.to_owned()),
        other => Err(ClientError::Config(format!(
            "unsupported SIGNALR_CONNECT_SCHEME '{other}' (expected 'wss' or 'ws')"
        ))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
