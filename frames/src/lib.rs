//! Hub frame model and JSON codec for the persistent-connection transport.
//!
//! This crate owns the wire representation exchanged with the server once the
//! duplex connection is open. Payloads stay opaque (`serde_json::Value`); the
//! only interpretation performed here is classifying an inbound envelope into
//! one of the three [`IncomingFrame`] shapes.
//!
//! DESIGN
//! ======
//! - Outgoing: `{"H": hub, "M": method, "A": [args], "I": id}`.
//! - Incoming: generic envelope `{"C", "M", "R", "I", "E"}`. A non-empty `I`
//!   makes it a call result; otherwise a single hub-call object inside `M`
//!   makes it a server invocation; anything else is unroutable.
//! - [`decode_frame`] never fails. Garbage in is `IncomingFrame::Unroutable`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Why an inbound frame could not be routed.
#[derive(Debug, thiserror::Error)]
pub enum Unroutable {
    /// The bytes are not a decodable JSON envelope.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Valid envelope that is neither a call result nor a server invocation.
    #[error("frame is neither a call result nor a server invocation")]
    Unrecognized,
}

/// A client-initiated hub method call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutgoingCall {
    /// Target hub name.
    #[serde(rename = "H")]
    pub hub: String,
    /// Method name on the hub.
    #[serde(rename = "M")]
    pub method: String,
    /// Positional arguments.
    #[serde(rename = "A")]
    pub args: Vec<Value>,
    /// Correlation identifier, echoed back as `I` on the result frame.
    #[serde(rename = "I")]
    pub id: u64,
}

impl OutgoingCall {
    #[must_use]
    pub fn new(id: u64, hub: impl Into<String>, method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            hub: hub.into(),
            method: method.into(),
            args,
            id,
        }
    }
}

/// Response to an [`OutgoingCall`], matched by identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct CallResult {
    /// Identifier in string form, as used for registry lookups.
    pub id: String,
    /// Result values on success, the server's error text on failure.
    pub outcome: Result<Vec<Value>, String>,
}

/// A server-pushed invocation of a client-side hub method.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerInvocation {
    pub hub: String,
    pub method: String,
    pub args: Vec<Value>,
}

/// One classified inbound frame.
#[derive(Debug)]
pub enum IncomingFrame {
    CallResult(CallResult),
    ServerInvocation(ServerInvocation),
    Unroutable(Unroutable),
}

/// Encode a call into its JSON text frame.
///
/// # Errors
///
/// Returns a serialization error if an argument cannot be represented as JSON.
pub fn encode_call(call: &OutgoingCall) -> Result<String, serde_json::Error> {
    serde_json::to_string(call)
}

/// Decode and classify one inbound frame.
///
/// Classification order: call result (non-empty `I`), then server invocation
/// (exactly one nested hub call with non-empty `H` and `M`), then unroutable.
#[must_use]
pub fn decode_frame(bytes: &[u8]) -> IncomingFrame {
    match decode_envelope(bytes) {
        Ok(envelope) => classify(envelope),
        Err(error) => IncomingFrame::Unroutable(Unroutable::Malformed(error)),
    }
}

fn decode_envelope(bytes: &[u8]) -> Result<Envelope, serde_json::Error> {
    // Going through a map rejects top-level arrays, which serde would
    // otherwise accept positionally for a struct.
    let map = serde_json::from_slice::<Map<String, Value>>(bytes)?;
    serde_json::from_value(Value::Object(map))
}

fn classify(envelope: Envelope) -> IncomingFrame {
    let id = envelope.identifier.map(WireId::into_string).unwrap_or_default();
    if !id.is_empty() {
        let outcome = match envelope.error.filter(|error| !error.is_empty()) {
            Some(error) => Err(error),
            None => Ok(result_values(envelope.result)),
        };
        return IncomingFrame::CallResult(CallResult { id, outcome });
    }

    let mut data = envelope.data.unwrap_or_default();
    if data.len() == 1 {
        if let Some(invocation) = data.pop().and_then(hub_invocation) {
            return IncomingFrame::ServerInvocation(invocation);
        }
    }

    IncomingFrame::Unroutable(Unroutable::Unrecognized)
}

fn hub_invocation(value: Value) -> Option<ServerInvocation> {
    let wire = serde_json::from_value::<WireInvocation>(value).ok()?;
    if wire.hub.is_empty() || wire.method.is_empty() {
        return None;
    }
    Some(ServerInvocation {
        hub: wire.hub,
        method: wire.method,
        args: wire.args.unwrap_or_default(),
    })
}

fn result_values(result: Value) -> Vec<Value> {
    match result {
        Value::Null => Vec::new(),
        Value::Array(values) => values,
        other => vec![other],
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Envelope {
    // `C` (message cursor) is only meaningful to the polling transports.
    #[serde(rename = "M")]
    data: Option<Vec<Value>>,
    #[serde(rename = "R")]
    result: Value,
    #[serde(rename = "I")]
    identifier: Option<WireId>,
    #[serde(rename = "E")]
    error: Option<String>,
}

/// Servers echo the identifier as a string; some send it back as a number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(serde_json::Number),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireInvocation {
    #[serde(rename = "H", default)]
    hub: String,
    #[serde(rename = "M", default)]
    method: String,
    #[serde(rename = "A", default)]
    args: Option<Vec<Value>>,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
