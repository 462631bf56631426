//! RPC connection and read loop.
//!
//! This module handles one live RPC channel to the browser, including
//! request/response correlation and notification routing.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming frames from the browser (responses, notifications, requests)
//! - Outgoing requests and notifications from the Rust API
//! - Request/response correlation by [`CallId`]
//! - Handing notifications to the [`Dispatcher`]
//!
//! The loop is the only code that resolves a pending call. When it exits,
//! for whatever reason, every call still pending fails with
//! [`Error::ConnectionLost`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, json};
use tokio::io::{AsyncRead, AsyncWrite, WriteHalf};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, trace, warn};

use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::identifiers::{CallId, CallIdSequence};
use crate::protocol::{Notification, RpcEnvelope, RpcRequest, RpcResponse};
use crate::transport::{FrameWriter, RpcChannel};

// ============================================================================
// Constants
// ============================================================================

/// Result sent back for every request the browser makes of us.
const INBOUND_ACK: bool = true;

// ============================================================================
// Types
// ============================================================================

/// A request awaiting its response.
struct PendingCall {
    /// Method, kept for error reporting.
    method: String,
    /// Resolver, used exactly once.
    response_tx: oneshot::Sender<Result<Value>>,
}

/// Map of call IDs to pending calls.
type CorrelationMap = FxHashMap<CallId, PendingCall>;

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Send a request and resolve `response_tx` with its response.
    Request {
        id: CallId,
        method: String,
        params: Value,
        response_tx: oneshot::Sender<Result<Value>>,
    },
    /// Send a notification.
    Notify { method: String, params: Value },
    /// Remove an abandoned correlation entry.
    RemoveCorrelation(CallId),
    /// Shutdown the connection.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// Live RPC channel to the browser.
///
/// Cloning is cheap; all clones talk to the same read loop.
#[derive(Clone)]
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Correlation map (shared with event loop).
    correlation: Arc<Mutex<CorrelationMap>>,
    /// Call id source for this connection.
    ids: Arc<CallIdSequence>,
    /// Cleared by the event loop on exit.
    alive: Arc<AtomicBool>,
    /// Event loop task, taken by the first `close`.
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("alive", &self.is_alive())
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Creates a connection over `channel` and spawns its event loop.
    pub fn new<S>(channel: RpcChannel<S>, dispatcher: Arc<Dispatcher>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let correlation = Arc::new(Mutex::new(CorrelationMap::default()));
        let alive = Arc::new(AtomicBool::new(true));

        let (frames, writer) = channel.split();

        let task = tokio::spawn(Self::run_event_loop(
            frames,
            writer,
            command_rx,
            Arc::clone(&correlation),
            dispatcher,
            Arc::clone(&alive),
        ));

        Self {
            command_tx,
            correlation,
            ids: Arc::new(CallIdSequence::new()),
            alive,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    /// Sends a request and waits for its response.
    ///
    /// There is no deadline; see [`request_with_timeout`].
    ///
    /// # Errors
    ///
    /// - [`Error::Request`] if the browser answered with an error
    /// - [`Error::Write`] if the request could not be written
    /// - [`Error::ConnectionLost`] if the channel closed first
    ///
    /// [`request_with_timeout`]: Connection::request_with_timeout
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let (id, response_rx) = self.submit(method, params)?;
        trace!(%id, method, "Awaiting response");

        response_rx.await.unwrap_or(Err(Error::ConnectionLost))
    }

    /// Sends a request and waits at most `request_timeout` for its response.
    ///
    /// # Errors
    ///
    /// As [`request`], plus [`Error::RequestTimeout`] on expiry. A late
    /// response is dropped.
    ///
    /// [`request`]: Connection::request
    pub async fn request_with_timeout(
        &self,
        method: &str,
        params: Value,
        request_timeout: Duration,
    ) -> Result<Value> {
        let (id, response_rx) = self.submit(method, params)?;

        match timeout(request_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionLost),
            Err(_) => {
                let _ = self
                    .command_tx
                    .send(ConnectionCommand::RemoveCorrelation(id));

                Err(Error::request_timeout(
                    id,
                    request_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Sends a notification; no response is expected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionLost`] if the event loop has exited.
    pub fn notify(&self, method: &str, params: Value) -> Result<()> {
        self.command_tx
            .send(ConnectionCommand::Notify {
                method: method.to_string(),
                params,
            })
            .map_err(|_| Error::ConnectionLost)
    }

    /// Returns `true` while the event loop is running.
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire) && !self.command_tx.is_closed()
    }

    /// Returns the number of pending calls.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlation.lock().len()
    }

    /// Closes the channel and waits for the event loop to exit.
    ///
    /// Every pending call fails with [`Error::ConnectionLost`] before this
    /// returns. Calling it again is a no-op.
    pub async fn close(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);

        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            warn!(error = %e, "RPC event loop ended abnormally");
        }
    }

    fn submit(
        &self,
        method: &str,
        params: Value,
    ) -> Result<(CallId, oneshot::Receiver<Result<Value>>)> {
        let id = self.ids.next_id();
        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(ConnectionCommand::Request {
                id,
                method: method.to_string(),
                params,
                response_tx,
            })
            .map_err(|_| Error::ConnectionLost)?;

        Ok((id, response_rx))
    }
}

// ============================================================================
// Connection - Event Loop
// ============================================================================

impl Connection {
    /// Event loop that handles socket I/O.
    async fn run_event_loop<F, S>(
        mut frames: F,
        mut writer: FrameWriter<WriteHalf<S>>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        correlation: Arc<Mutex<CorrelationMap>>,
        dispatcher: Arc<Dispatcher>,
        alive: Arc<AtomicBool>,
    ) where
        F: Stream<Item = Result<Vec<u8>>> + Unpin,
        S: AsyncRead + AsyncWrite,
    {
        loop {
            tokio::select! {
                // Incoming frames from the browser
                frame = frames.next() => {
                    match frame {
                        Some(Ok(bytes)) => {
                            let reply = Self::handle_incoming_frame(&bytes, &correlation, &dispatcher);

                            if let Some(reply) = reply
                                && let Err(e) = Self::write_envelope(&mut writer, &reply).await
                            {
                                warn!(error = %e, "Failed to acknowledge inbound request");
                            }
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "RPC socket read failed");
                            break;
                        }

                        None => {
                            debug!("RPC socket closed by browser");
                            break;
                        }
                    }
                }

                // Commands from Rust API
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Request { id, method, params, response_tx }) => {
                            Self::handle_request_command(
                                id,
                                method,
                                params,
                                response_tx,
                                &mut writer,
                                &correlation,
                            ).await;
                        }

                        Some(ConnectionCommand::Notify { method, params }) => {
                            let envelope = RpcEnvelope::notification(method, params);
                            if let Err(e) = Self::write_envelope(&mut writer, &envelope).await {
                                warn!(error = %e, "Failed to send notification");
                            }
                        }

                        Some(ConnectionCommand::RemoveCorrelation(id)) => {
                            correlation.lock().remove(&id);
                            debug!(%id, "Removed abandoned correlation");
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            writer.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        alive.store(false, Ordering::Release);
        command_rx.close();

        // Requests queued behind the exit are dropped here; their callers
        // see the closed oneshot as a lost connection.
        while command_rx.try_recv().is_ok() {}

        Self::fail_pending_calls(&correlation);

        debug!("RPC event loop terminated");
    }

    /// Handles one frame from the browser.
    ///
    /// Returns the reply to write, if any.
    fn handle_incoming_frame(
        bytes: &[u8],
        correlation: &Arc<Mutex<CorrelationMap>>,
        dispatcher: &Dispatcher,
    ) -> Option<RpcEnvelope> {
        let envelope = match RpcEnvelope::decode(bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, frame = %String::from_utf8_lossy(bytes), "Skipping malformed frame");
                return None;
            }
        };

        match envelope {
            RpcEnvelope::Response(response) => {
                Self::resolve(response, correlation);
                None
            }

            RpcEnvelope::Notification(note) => {
                dispatcher.dispatch(&Notification::new(note.method, note.params));
                None
            }

            RpcEnvelope::Request(RpcRequest { id, method, params }) => {
                debug!(%id, method = %method, "Inbound request");
                dispatcher.dispatch(&Notification::new(method, params));
                Some(RpcEnvelope::Response(RpcResponse::success(
                    id,
                    json!(INBOUND_ACK),
                )))
            }
        }
    }

    /// Resolves the pending call a response answers.
    fn resolve(response: RpcResponse, correlation: &Arc<Mutex<CorrelationMap>>) {
        let Some(id) = response.call_id() else {
            warn!(id = %response.id, "Response with foreign id");
            return;
        };

        let pending = correlation.lock().remove(&id);

        match pending {
            Some(PendingCall {
                method,
                response_tx,
            }) => {
                trace!(%id, method = %method, "Response received");
                let _ = response_tx.send(response.into_result(&method));
            }
            None => {
                warn!(%id, "Dropping response for unknown or already resolved call");
            }
        }
    }

    /// Handles a request command from the Rust API.
    async fn handle_request_command<S>(
        id: CallId,
        method: String,
        params: Value,
        response_tx: oneshot::Sender<Result<Value>>,
        writer: &mut FrameWriter<WriteHalf<S>>,
        correlation: &Arc<Mutex<CorrelationMap>>,
    ) where
        S: AsyncRead + AsyncWrite,
    {
        let envelope = RpcEnvelope::request(id, method.as_str(), params);

        let payload = match envelope.encode() {
            Ok(payload) => payload,
            Err(e) => {
                let _ = response_tx.send(Err(e));
                return;
            }
        };

        // Store correlation before sending
        correlation.lock().insert(
            id,
            PendingCall {
                method,
                response_tx,
            },
        );

        if let Err(e) = writer.write_frame(payload).await {
            // Remove correlation and notify caller
            if let Some(pending) = correlation.lock().remove(&id) {
                let _ = pending.response_tx.send(Err(e));
            }
            return;
        }

        trace!(%id, "Request sent");
    }

    async fn write_envelope<S>(
        writer: &mut FrameWriter<WriteHalf<S>>,
        envelope: &RpcEnvelope,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite,
    {
        writer.write_frame(envelope.encode()?).await
    }

    /// Fails all pending calls with ConnectionLost.
    fn fail_pending_calls(correlation: &Arc<Mutex<CorrelationMap>>) {
        let pending: Vec<_> = correlation.lock().drain().collect();
        let count = pending.len();

        for (_, call) in pending {
            let _ = call.response_tx.send(Err(Error::ConnectionLost));
        }

        if count > 0 {
            debug!(count, "Failed pending calls on disconnect");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
