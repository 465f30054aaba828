//! Dispatch loop: the single reader of the duplex connection.
//!
//! LIFECYCLE
//! =========
//! 1. Take the read half (only one loop may run per connection)
//! 2. Read frame → decode → route, until the transport fails or closes
//! 3. Close the write half, forget the session, fail every pending call
//!
//! Routing is synchronous: a server-invocation handler that stalls also stalls
//! delivery of call results behind it.
//!
//! Unroutable frames (keep-alives, init frames, garbage) are reported to the
//! diagnostic hook and never end the loop. Only transport-level errors do.

use std::sync::atomic::Ordering;
use std::time::Duration;

use frames::IncomingFrame;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::error::ClientError;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

impl Client {
    /// Run the dispatch loop until the connection fails.
    ///
    /// Always returns the error that ended the loop. Pending calls are failed
    /// with [`ClientError::Abandoned`] on the way out, and the client can then
    /// be connected again. Dropping this future has the same effect, minus the
    /// graceful close of the websocket.
    ///
    /// Returns [`ClientError::Connecting`] at once if a `connect` is in flight.
    pub async fn dispatch(&self) -> ClientError {
        if self.dispatching.swap(true, Ordering::SeqCst) {
            return ClientError::AlreadyDispatching;
        }
        if self.connecting.load(Ordering::SeqCst) {
            self.dispatching.store(false, Ordering::SeqCst);
            return ClientError::Connecting;
        }
        let _running = DispatchGuard { client: self };

        let Some(mut reader) = self.reader.lock().await.take() else {
            return ClientError::NotConnected;
        };
        info!("dispatch: running");

        let error = loop {
            let message = match reader.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => break ClientError::Transport(Box::new(e)),
                None => break ClientError::WsClosed,
            };
            match message {
                Message::Text(text) => self.route(frames::decode_frame(text.as_bytes())),
                Message::Binary(bytes) => self.route(frames::decode_frame(&bytes)),
                Message::Close(close) => {
                    debug!(?close, "dispatch: close frame received");
                    break ClientError::WsClosed;
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        };

        warn!(error = %error, "dispatch: connection lost");
        drop(reader);
        self.close_writer().await;
        error
    }

    /// Hand one decoded frame to its destination.
    pub(crate) fn route(&self, frame: IncomingFrame) {
        match frame {
            IncomingFrame::CallResult(result) => {
                self.pending.resolve(result);
            }
            IncomingFrame::ServerInvocation(invocation) => {
                debug!(hub = %invocation.hub, method = %invocation.method, "dispatch: server invocation");
                if let Some(handler) = &self.on_client_method {
                    handler(&invocation.hub, &invocation.method, &invocation.args);
                }
            }
            IncomingFrame::Unroutable(reason) => {
                debug!(%reason, "dispatch: unroutable frame");
                if let Some(handler) = &self.on_message_error {
                    handler(&reason);
                }
            }
        }
    }

    async fn close_writer(&self) {
        let Some(mut writer) = self.writer.lock().await.take() else {
            return;
        };
        if tokio::time::timeout(CLOSE_TIMEOUT, writer.close()).await.is_err() {
            debug!("dispatch: close handshake timed out");
        }
    }
}

/// Tears down session state when the loop ends, however it ends.
struct DispatchGuard<'a> {
    client: &'a Client,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        // Cleared first: a call holding the writer lock now sees a dead
        // session even if the write half cannot be taken below.
        self.client.live.store(false, Ordering::SeqCst);
        // Without an await the write half can only be dropped, not closed.
        if let Ok(mut writer) = self.client.writer.try_lock() {
            drop(writer.take());
        }
        self.client.session_slot().take();
        let failed = self.client.pending.fail_all();
        if failed > 0 {
            info!(failed, "dispatch: failed pending calls");
        }
        self.client.dispatching.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod tests;
