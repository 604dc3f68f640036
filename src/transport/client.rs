//! Request correlation client.
//!
//! The [`Client`] sits on top of a [`Connection`] and turns the one-way
//! message stream into request/reply calls. Each outstanding request owns a
//! oneshot slot in a pending table keyed by [`CommandId`]; a dispatch task
//! resolves slots as responses arrive and routes events to the shared
//! [`Subscriptions`].
//!
//! # Disconnect
//!
//! When the connection reports `Closed`, the dispatch task swaps the whole
//! pending table out under the lock and fails every swapped entry with
//! [`Error::ConnectionClosed`] after releasing it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::CommandId;
use crate::protocol::{Event, Handshake, Message, Reply, Request, Response, Subscriptions};

use super::connection::{ConnectOptions, Connection, TransportEvent, TransportEvents};

// ============================================================================
// Types
// ============================================================================

/// Slot of one in-flight request.
struct Pending {
    /// Distinguishes re-registrations of the same id.
    ticket: u64,
    tx: oneshot::Sender<Result<Response>>,
}

/// State shared between callers and the dispatch task.
struct Correlation {
    /// In-flight requests.
    pending: Mutex<FxHashMap<CommandId, Pending>>,
    /// Set under the `pending` lock once the table has been drained.
    closed: AtomicBool,
    /// Ticket source for pending slots.
    tickets: AtomicU64,
    /// Event routing registry.
    subscriptions: Arc<Subscriptions>,
    /// Greeting received on connect.
    handshake: Mutex<Option<Handshake>>,
}

/// Removes a pending slot on every exit path of a request.
struct PendingGuard<'a> {
    correlation: &'a Correlation,
    id: CommandId,
    ticket: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.correlation.remove(self.id, self.ticket);
    }
}

// ============================================================================
// Correlation
// ============================================================================

impl Correlation {
    /// Registers a slot for `id`.
    fn register(&self, id: CommandId) -> Result<(u64, oneshot::Receiver<Result<Response>>)> {
        let (tx, rx) = oneshot::channel();
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);

        let mut pending = self.pending.lock();
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ConnectionClosed);
        }
        if pending.contains_key(&id) {
            return Err(Error::protocol(format!("Command id {id} is already in flight")));
        }
        pending.insert(id, Pending { ticket, tx });

        Ok((ticket, rx))
    }

    /// Removes the slot for `id` if it still belongs to `ticket`.
    fn remove(&self, id: CommandId, ticket: u64) {
        let mut pending = self.pending.lock();
        if pending.get(&id).is_some_and(|slot| slot.ticket == ticket) {
            pending.remove(&id);
        }
    }

    /// Routes one inbound message.
    fn handle_message(&self, text: &str) {
        let message = match Message::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Dropping malformed message");
                return;
            }
        };

        match message {
            Message::Response(response) => self.resolve(response),
            Message::Event(payload) => match Event::from_payload(payload) {
                Some(event) => {
                    self.subscriptions.dispatch(&event);
                }
                None => trace!("Dropping event without routing key"),
            },
            Message::Handshake(handshake) => {
                debug!(
                    application = %handshake.application_type,
                    protocol = handshake.marionette_protocol,
                    "Handshake received"
                );
                *self.handshake.lock() = Some(handshake);
            }
            Message::Command(_) => debug!("Ignoring inbound command"),
        }
    }

    fn resolve(&self, response: Response) {
        let id = response.id;
        let slot = self.pending.lock().remove(&id);

        match slot {
            Some(slot) => {
                trace!(%id, "Response matched");
                let _ = slot.tx.send(Ok(response));
            }
            None => debug!(%id, "Dropping response without pending request"),
        }
    }

    /// Fails every pending request with `ConnectionClosed`.
    fn fail_all(&self) {
        let drained = {
            let mut pending = self.pending.lock();
            self.closed.store(true, Ordering::SeqCst);
            std::mem::take(&mut *pending)
        };

        if !drained.is_empty() {
            debug!(count = drained.len(), "Failing pending requests");
        }

        for (_, slot) in drained {
            let _ = slot.tx.send(Err(Error::ConnectionClosed));
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// Internal shared state for a client handle.
struct ClientInner {
    connection: Connection,
    correlation: Arc<Correlation>,
    next_id: AtomicU32,
    dispatch_task: Mutex<Option<JoinHandle<()>>>,
}

/// Request/reply client over a [`Connection`].
///
/// # Thread Safety
///
/// `Client` is `Send + Sync` and cheap to clone. Any number of tasks may
/// have requests in flight at once.
///
/// # Example
///
/// ```ignore
/// let client = Client::connect(addr, &ConnectOptions::default(), subscriptions).await?;
///
/// let request = Request::new(client.next_id(), Command::GetTitle);
/// let reply = client.send(&request).await?;
/// println!("{}", reply.value());
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("connection", &self.inner.connection)
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Constructors
// ============================================================================

impl Client {
    /// Wraps an open connection and starts the dispatch task.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(
        connection: Connection,
        events: TransportEvents,
        subscriptions: Arc<Subscriptions>,
    ) -> Self {
        let correlation = Arc::new(Correlation {
            pending: Mutex::new(FxHashMap::default()),
            closed: AtomicBool::new(false),
            tickets: AtomicU64::new(0),
            subscriptions,
            handshake: Mutex::new(None),
        });

        let dispatch_task = tokio::spawn(Self::run_dispatch_loop(
            events,
            Arc::clone(&correlation),
        ));

        Self {
            inner: Arc::new(ClientInner {
                connection,
                correlation,
                next_id: AtomicU32::new(1),
                dispatch_task: Mutex::new(Some(dispatch_task)),
            }),
        }
    }

    /// Connects to `addr` and wraps the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectFailed`] if every connect attempt failed.
    pub async fn connect(
        addr: SocketAddr,
        options: &ConnectOptions,
        subscriptions: Arc<Subscriptions>,
    ) -> Result<Self> {
        let (connection, events) = Connection::connect(addr, options).await?;
        Ok(Self::new(connection, events, subscriptions))
    }

    async fn run_dispatch_loop(mut events: TransportEvents, correlation: Arc<Correlation>) {
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::Message(text) => correlation.handle_message(&text),
                TransportEvent::Closed => break,
            }
        }

        correlation.fail_all();
        debug!("Dispatch loop terminated");
    }
}

// ============================================================================
// Client - Public API
// ============================================================================

impl Client {
    /// Returns a fresh command id (monotonic, starting at 1).
    #[inline]
    #[must_use]
    pub fn next_id(&self) -> CommandId {
        CommandId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    /// Returns `true` while the connection is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connection.is_connected()
    }

    /// Returns the shared subscription registry.
    #[inline]
    #[must_use]
    pub fn subscriptions(&self) -> &Arc<Subscriptions> {
        &self.inner.correlation.subscriptions
    }

    /// Returns the connect-time greeting, once received.
    #[must_use]
    pub fn handshake(&self) -> Option<Handshake> {
        self.inner.correlation.handshake.lock().clone()
    }

    /// Returns the number of in-flight requests.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.correlation.pending.lock().len()
    }

    /// Sends a request and waits for its reply.
    ///
    /// A remote error is returned as data inside the [`Reply`]. Cancelling
    /// `cancel` abandons the wait; a command already written is not
    /// retracted.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the connection is not open
    /// - [`Error::Protocol`] if the id is already in flight
    /// - [`Error::Cancelled`] if `cancel` fired first
    /// - [`Error::ConnectionClosed`] if the connection dropped first
    pub async fn send_request(&self, request: &Request, cancel: &CancellationToken) -> Result<Reply> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let id = request.id;
        let wire = request.to_wire()?;
        let correlation: &Correlation = &self.inner.correlation;

        let (ticket, rx) = correlation.register(id)?;
        let _guard = PendingGuard {
            correlation,
            id,
            ticket,
        };

        self.inner.connection.send_message(&wire)?;
        debug!(%id, command = request.name(), "Command sent");

        let response = tokio::select! {
            biased;
            outcome = rx => match outcome {
                Ok(response) => response?,
                Err(_) => return Err(Error::ConnectionClosed),
            },
            _ = cancel.cancelled() => {
                debug!(%id, command = request.name(), "Command cancelled");
                return Err(Error::Cancelled { id });
            }
        };

        Ok(request.apply_response(response))
    }

    /// Sends a request without a cancellation source.
    ///
    /// # Errors
    ///
    /// See [`send_request`](Self::send_request).
    pub async fn send(&self, request: &Request) -> Result<Reply> {
        self.send_request(request, &CancellationToken::new()).await
    }

    /// Sends a request, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] when no reply arrived in time, otherwise
    /// see [`send_request`](Self::send_request).
    pub async fn send_with_timeout(&self, request: &Request, timeout: Duration) -> Result<Reply> {
        match tokio::time::timeout(timeout, self.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(
                request.name(),
                u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }

    /// Closes the connection. Pending requests fail with `ConnectionClosed`.
    pub fn close(&self) {
        self.inner.connection.close();
    }

    /// Closes the connection and waits for all background tasks.
    pub async fn shutdown(&self) {
        self.inner.connection.shutdown().await;

        let task = self.inner.dispatch_task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            warn!(error = %e, "Dispatch task failed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
