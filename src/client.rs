//! Hub client: connect, call, and the hooks the dispatch loop invokes.
//!
//! DESIGN
//! ======
//! One client owns at most one live connection. `connect` negotiates, dials
//! and splits the socket: the write half sits behind an async mutex shared by
//! every caller, the read half is taken by exactly one `dispatch` task.
//!
//! ```text
//!   call() ──register──▶ PendingCalls ◀──resolve── dispatch()
//!      │                                              ▲
//!      └──write──▶ [writer] ══ websocket ══ [reader] ─┘
//! ```
//!
//! Identifiers are allocated from a per-client counter starting at 1 and keep
//! increasing across reconnects.
//!
//! `connect` and `dispatch` exclude each other through the `connecting` and
//! `dispatching` flags: each sets its own flag, then checks the other's.
//! `live` is cleared when the dispatch loop ends; a write half left behind by
//! that teardown is refused by the next call.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use frames::{OutgoingCall, Unroutable};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::negotiate::{SessionParameters, negotiate};
use crate::pending::{PendingCalls, PendingGuard};
use crate::transport::{self, Connection};

type Writer = SplitSink<Connection, Message>;
type Reader = SplitStream<Connection>;

/// Callback for server-pushed hub method invocations: `(hub, method, args)`.
pub type ClientMethodHandler = dyn Fn(&str, &str, &[Value]) + Send + Sync;

/// Callback for inbound frames that could not be routed.
pub type MessageErrorHandler = dyn Fn(&Unroutable) + Send + Sync;

pub struct Client {
    config: ClientConfig,
    http: reqwest::Client,
    next_id: AtomicU64,
    pub(crate) on_client_method: Option<Box<ClientMethodHandler>>,
    pub(crate) on_message_error: Option<Box<MessageErrorHandler>>,
    pub(crate) pending: PendingCalls,
    pub(crate) session: Mutex<Option<SessionParameters>>,
    pub(crate) writer: tokio::sync::Mutex<Option<Writer>>,
    pub(crate) reader: tokio::sync::Mutex<Option<Reader>>,
    pub(crate) dispatching: AtomicBool,
    pub(crate) connecting: AtomicBool,
    pub(crate) live: AtomicBool,
}

impl Client {
    /// Create a disconnected client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the negotiation HTTP client fails to build.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()?;

        Ok(Self {
            config,
            http,
            next_id: AtomicU64::new(1),
            on_client_method: None,
            on_message_error: None,
            pending: PendingCalls::new(),
            session: Mutex::new(None),
            writer: tokio::sync::Mutex::new(None),
            reader: tokio::sync::Mutex::new(None),
            dispatching: AtomicBool::new(false),
            connecting: AtomicBool::new(false),
            live: AtomicBool::new(false),
        })
    }

    /// Handle server-to-client hub invocations.
    ///
    /// The handler runs on the dispatch task. Until it returns no further frame
    /// is read, call results included, so it must not block.
    #[must_use]
    pub fn on_client_method(mut self, handler: impl Fn(&str, &str, &[Value]) + Send + Sync + 'static) -> Self {
        self.on_client_method = Some(Box::new(handler));
        self
    }

    /// Observe frames the dispatch loop could not route.
    #[must_use]
    pub fn on_message_error(mut self, handler: impl Fn(&Unroutable) + Send + Sync + 'static) -> Self {
        self.on_message_error = Some(Box::new(handler));
        self
    }

    /// Negotiate with `scheme://host` and open the duplex connection.
    ///
    /// Replaces any previous, no longer dispatching, session. Calls still
    /// waiting on the replaced session fail with [`ClientError::Abandoned`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::AlreadyDispatching`] while a dispatch loop still
    /// owns the current connection, [`ClientError::Connecting`] while another
    /// connect is in flight, otherwise the negotiation or dial error.
    pub async fn connect<S: AsRef<str>>(&self, scheme: &str, host: &str, hubs: &[S]) -> Result<(), ClientError> {
        if self.connecting.swap(true, Ordering::SeqCst) {
            return Err(ClientError::Connecting);
        }
        let _connecting = ConnectingGuard { flag: &self.connecting };
        if self.dispatching.load(Ordering::SeqCst) {
            return Err(ClientError::AlreadyDispatching);
        }

        let params = negotiate(&self.http, scheme, host).await?;
        let socket = transport::connect(&self.config.connect_scheme, host, &params, hubs).await?;
        let (writer, reader) = socket.split();

        let mut writer_slot = self.writer.lock().await;
        let stale_reader = self.reader.lock().await.replace(reader);
        let stale_writer = writer_slot.replace(writer);
        if stale_writer.is_some() || stale_reader.is_some() {
            // Replies on the old socket can no longer be read.
            let failed = self.pending.fail_all();
            if failed > 0 {
                info!(failed, "connect: failed calls of replaced session");
            }
        }
        self.live.store(true, Ordering::SeqCst);
        *self.session_slot() = Some(params);
        drop(writer_slot);

        if let Some(mut stale) = stale_writer {
            let _ = stale.close().await;
        }
        Ok(())
    }

    /// Invoke `hub.method(args)` on the server and wait for its result.
    ///
    /// There is no built-in deadline; wrap the future in a timeout if needed.
    /// Dropping the future withdraws the call's registration.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Server`] with the server's error text
    /// - [`ClientError::Abandoned`] if the connection ends first
    /// - [`ClientError::NotConnected`] / [`ClientError::Transport`] if the
    ///   request could not be written
    pub async fn call(&self, hub: &str, method: &str, args: Vec<Value>) -> Result<Vec<Value>, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let text = frames::encode_call(&OutgoingCall::new(id, hub, method, args))?;
        let key = id.to_string();

        // Register before writing so a fast reply always finds its slot.
        let rx = self.pending.register(&key);
        let _guard = PendingGuard::new(&self.pending, &key);
        self.send_text(text).await?;
        debug!(id, %hub, %method, "call: request sent");

        match rx.await {
            Ok(Ok(values)) => Ok(values),
            Ok(Err(message)) => {
                debug!(id, %message, "call: server returned error");
                Err(ClientError::Server(message))
            }
            Err(_) => Err(ClientError::Abandoned),
        }
    }

    /// Parameters of the current session, if connected.
    #[must_use]
    pub fn session(&self) -> Option<SessionParameters> {
        self.session_slot().clone()
    }

    /// Whether a write half is available for calls.
    pub async fn is_connected(&self) -> bool {
        self.live.load(Ordering::SeqCst) && self.writer.lock().await.is_some()
    }

    /// Number of calls still waiting on a result.
    #[must_use]
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn send_text(&self, text: String) -> Result<(), ClientError> {
        let mut writer = self.writer.lock().await;
        if !self.live.load(Ordering::SeqCst) {
            if let Some(mut stale) = writer.take() {
                debug!("call: dropping write half left by ended dispatch");
                let _ = stale.close().await;
            }
            return Err(ClientError::NotConnected);
        }
        let Some(sink) = writer.as_mut() else {
            return Err(ClientError::NotConnected);
        };
        if let Err(e) = sink.send(Message::text(text)).await {
            warn!(error = %e, "call: write failed; closing connection");
            if let Some(mut sink) = writer.take() {
                let _ = sink.close().await;
            }
            return Err(ClientError::Transport(Box::new(e)));
        }
        Ok(())
    }

    pub(crate) fn session_slot(&self) -> MutexGuard<'_, Option<SessionParameters>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the `connecting` flag however `connect` returns.
struct ConnectingGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
