//! Client for the classic hub protocol over a persistent websocket.
//!
//! ARCHITECTURE
//! ============
//! ```text
//!   negotiate (HTTP GET) ──▶ transport (websocket dial) ──▶ Client
//!                                                            │
//!                     call() ──▶ PendingCalls ◀── dispatch() ┘
//! ```
//!
//! - [`negotiate`]: one-shot HTTP handshake yielding [`SessionParameters`].
//! - [`transport`]: dials the duplex connection with token and hub list.
//! - [`frames`] (separate crate): call encoding and inbound classification.
//! - [`pending`]: identifier → one-shot slot registry.
//! - [`Client::dispatch`]: the single reader routing every inbound frame.
//!
//! A client serves one logical connection at a time. Share it behind `Arc`:
//! one task runs `dispatch`, any number of tasks `call`.

pub mod client;
pub mod config;
mod dispatch;
pub mod error;
pub mod negotiate;
pub mod pending;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use client::{Client, ClientMethodHandler, MessageErrorHandler};
pub use config::ClientConfig;
pub use error::ClientError;
pub use frames::{CallResult, IncomingFrame, OutgoingCall, ServerInvocation, Unroutable};
pub use negotiate::SessionParameters;
pub use pending::PendingCalls;
