//! TCP connection and I/O loops.
//!
//! A [`Connection`] owns one TCP socket to the remote end and runs two
//! independent background tasks:
//!
//! - **Send loop**: drains an unbounded FIFO of encoded frames, writing and
//!   flushing each one in enqueue order
//! - **Receive loop**: decodes frames and forwards each message text
//!
//! Both loops report through one [`TransportEvents`] channel created before
//! either loop starts, so no message can be missed. The channel carries
//! [`TransportEvent::Closed`] exactly once, when the first loop terminates.
//!
//! # States
//!
//! ```text
//! Disconnected ──open()──► Connecting ──► Connected
//!                               │              │
//!                               └──────────────┴──► Closed (terminal)
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::future::join_all;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::codec::{FrameReader, encode};

// ============================================================================
// Constants
// ============================================================================

/// Default number of connect attempts.
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 10;

/// Default delay between connect attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(400);

// ============================================================================
// ConnectOptions
// ============================================================================

/// Connect retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Total number of TCP connect attempts (at least one is made).
    pub attempts: u32,
    /// Pause between failed attempts.
    pub retry_delay: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_CONNECT_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl ConnectOptions {
    /// Creates the default policy (10 attempts, 400ms apart).
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of attempts.
    #[inline]
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Sets the delay between attempts.
    #[inline]
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

// ============================================================================
// Types
// ============================================================================

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not yet opened.
    Disconnected,
    /// Dialling the endpoint.
    Connecting,
    /// Socket open, loops running.
    Connected,
    /// Terminal.
    Closed,
}

/// Notification emitted by the I/O loops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A decoded message body.
    Message(String),
    /// The connection is gone. Sent once.
    Closed,
}

/// Receiver of [`TransportEvent`]s for one connection.
pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

/// State shared with the I/O loops.
struct Shared {
    /// Remote endpoint.
    addr: SocketAddr,
    /// Lifecycle state.
    state: Mutex<ConnectionState>,
    /// Event sink, taken when `Closed` is emitted.
    events: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
    /// Set once `Closed` has been emitted.
    closed_notified: AtomicBool,
    /// Stops both loops.
    shutdown: CancellationToken,
}

impl Shared {
    /// Emits `Closed` unless already emitted or never connected.
    fn notify_closed(&self) {
        {
            let mut state = self.state.lock();
            if *state == ConnectionState::Disconnected {
                return;
            }
            *state = ConnectionState::Closed;
        }

        if self.closed_notified.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(events) = self.events.lock().take() {
            let _ = events.send(TransportEvent::Closed);
        }

        debug!(addr = %self.addr, "Connection closed notification sent");
    }
}

/// Internal shared state for a connection handle.
struct ConnectionInner {
    /// State shared with the loops.
    shared: Arc<Shared>,
    /// Producer side of the send queue.
    outbound: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    /// Loop task handles, joined by `shutdown`.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for ConnectionInner {
    fn drop(&mut self) {
        // Last handle gone: let the loops release the socket.
        self.shared.shutdown.cancel();
    }
}

// ============================================================================
// Connection
// ============================================================================

/// A framed TCP connection to the remote end.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync` and cheap to clone; clones share the socket.
///
/// # Example
///
/// ```ignore
/// let (connection, mut events) =
///     Connection::connect(addr, &ConnectOptions::default()).await?;
///
/// connection.send_message(r#"[0,1,"WebDriver:GetTitle",{}]"#)?;
/// while let Some(event) = events.recv().await {
///     println!("{event:?}");
/// }
/// ```
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("addr", &self.inner.shared.addr)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Connection - Constructors
// ============================================================================

impl Connection {
    /// Creates a disconnected handle for an endpoint.
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                shared: Arc::new(Shared {
                    addr,
                    state: Mutex::new(ConnectionState::Disconnected),
                    events: Mutex::new(None),
                    closed_notified: AtomicBool::new(false),
                    shutdown: CancellationToken::new(),
                }),
                outbound: Mutex::new(None),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Creates a handle and opens it.
    ///
    /// # Errors
    ///
    /// See [`Connection::open`].
    pub async fn connect(
        addr: SocketAddr,
        options: &ConnectOptions,
    ) -> Result<(Self, TransportEvents)> {
        let connection = Self::new(addr);
        let events = connection.open(options).await?;
        Ok((connection, events))
    }

    /// Dials the endpoint and starts the send and receive loops.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectFailed`] if every attempt failed
    /// - [`Error::ConnectionClosed`] if [`close`](Self::close) ran meanwhile
    /// - [`Error::Protocol`] if the handle was already opened
    pub async fn open(&self, options: &ConnectOptions) -> Result<TransportEvents> {
        let shared = &self.inner.shared;

        {
            let mut state = shared.state.lock();
            if *state != ConnectionState::Disconnected {
                return Err(Error::protocol(format!(
                    "Connection already opened (state {:?})",
                    *state
                )));
            }
            *state = ConnectionState::Connecting;
        }

        let stream = match Self::dial(shared.addr, options).await {
            Ok(stream) => stream,
            Err(e) => {
                let mut state = shared.state.lock();
                if *state == ConnectionState::Connecting {
                    *state = ConnectionState::Disconnected;
                }
                return Err(e);
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "Failed to set TCP_NODELAY");
        }

        let (reader, writer) = stream.into_split();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        {
            let mut state = shared.state.lock();
            if *state != ConnectionState::Connecting {
                return Err(Error::ConnectionClosed);
            }
            *shared.events.lock() = Some(events_tx.clone());
            *self.inner.outbound.lock() = Some(outbound_tx);
            *state = ConnectionState::Connected;
        }

        let send_task = tokio::spawn(Self::run_send_loop(
            writer,
            outbound_rx,
            Arc::clone(shared),
        ));
        let receive_task = tokio::spawn(Self::run_receive_loop(
            reader,
            events_tx,
            Arc::clone(shared),
        ));
        self.inner.tasks.lock().extend([send_task, receive_task]);

        info!(addr = %shared.addr, "Connected");
        Ok(events_rx)
    }

    /// Connects with bounded retries.
    async fn dial(addr: SocketAddr, options: &ConnectOptions) -> Result<TcpStream> {
        let attempts = options.attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    debug!(%addr, attempt, "TCP connection established");
                    return Ok(stream);
                }
                Err(e) if attempt < attempts => {
                    debug!(%addr, attempt, error = %e, "Connect failed, retrying");
                    sleep(options.retry_delay).await;
                }
                Err(e) => {
                    warn!(%addr, attempts, error = %e, "Connect failed, giving up");
                    return Err(Error::ConnectFailed {
                        addr,
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }
}

// ============================================================================
// Connection - Public API
// ============================================================================

impl Connection {
    /// Returns the remote endpoint.
    #[inline]
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.inner.shared.addr
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.shared.state.lock()
    }

    /// Returns `true` while the loops are running.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Enqueues a message for the send loop.
    ///
    /// Returns as soon as the frame is queued; delivery is not confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] without queueing if the connection
    /// is not connected. The `Closed` notification is raised as well.
    pub fn send_message(&self, text: &str) -> Result<()> {
        if !self.is_connected() {
            self.inner.shared.notify_closed();
            return Err(Error::ConnectionClosed);
        }

        let outbound = self.inner.outbound.lock();
        let queued = outbound
            .as_ref()
            .is_some_and(|tx| tx.send(encode(text)).is_ok());
        drop(outbound);

        if !queued {
            self.inner.shared.notify_closed();
            return Err(Error::ConnectionClosed);
        }

        trace!(len = text.len(), "Frame queued");
        Ok(())
    }

    /// Closes the connection.
    ///
    /// Idempotent and callable from any thread. The loops observe the close
    /// and emit the single `Closed` notification themselves.
    pub fn close(&self) {
        let previous = std::mem::replace(
            &mut *self.inner.shared.state.lock(),
            ConnectionState::Closed,
        );

        self.inner.shared.shutdown.cancel();
        self.inner.outbound.lock().take();

        if previous != ConnectionState::Closed {
            debug!(addr = %self.inner.shared.addr, "Connection close requested");
        }
    }

    /// Closes the connection and waits for both loops to finish.
    pub async fn shutdown(&self) {
        self.close();

        let tasks: Vec<_> = self.inner.tasks.lock().drain(..).collect();
        for result in join_all(tasks).await {
            if let Err(e) = result {
                warn!(error = %e, "Connection loop task failed");
            }
        }
    }
}

// ============================================================================
// Connection - Loops
// ============================================================================

impl Connection {
    /// Writes queued frames in order until shutdown or an I/O error.
    async fn run_send_loop(
        mut writer: OwnedWriteHalf,
        mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
        shared: Arc<Shared>,
    ) {
        loop {
            let frame = tokio::select! {
                _ = shared.shutdown.cancelled() => {
                    debug!("Send loop cancelled");
                    break;
                }
                frame = outbound.recv() => match frame {
                    Some(frame) => frame,
                    None => {
                        debug!("Send queue closed");
                        break;
                    }
                },
            };

            let written = tokio::select! {
                _ = shared.shutdown.cancelled() => break,
                result = Self::write_frame(&mut writer, &frame) => result,
            };

            if let Err(e) = written {
                error!(error = %e, "Send failed");
                break;
            }

            trace!(len = frame.len(), "Frame sent");
        }

        shared.notify_closed();
        shared.shutdown.cancel();
        debug!("Send loop terminated");
    }

    async fn write_frame(writer: &mut OwnedWriteHalf, frame: &[u8]) -> std::io::Result<()> {
        writer.write_all(frame).await?;
        writer.flush().await
    }

    /// Decodes frames until shutdown, end of stream or a decode failure.
    async fn run_receive_loop(
        reader: OwnedReadHalf,
        events: mpsc::UnboundedSender<TransportEvent>,
        shared: Arc<Shared>,
    ) {
        let mut frames = FrameReader::new(reader);

        loop {
            let frame = tokio::select! {
                _ = shared.shutdown.cancelled() => {
                    debug!("Receive loop cancelled");
                    break;
                }
                frame = frames.read_frame() => frame,
            };

            match frame {
                Ok(Some(text)) => {
                    trace!(len = text.len(), "Message received");
                    if events.send(TransportEvent::Message(text)).is_err() {
                        debug!("Event receiver dropped");
                        break;
                    }
                }
                Ok(None) => {
                    debug!("Remote closed the stream");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Receive failed");
                    break;
                }
            }
        }

        shared.notify_closed();
        shared.shutdown.cancel();
        debug!("Receive loop terminated");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    async fn free_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        listener.local_addr().expect("addr")
    }

    async fn next_event(events: &mut TransportEvents) -> Option<TransportEvent> {
        timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("event within 5s")
    }

    #[test]
    fn test_default_options() {
        let options = ConnectOptions::default();
        assert_eq!(options.attempts, 10);
        assert_eq!(options.retry_delay, Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_connect_gives_up_after_attempts() {
        let addr = free_addr().await;
        let options = ConnectOptions::new()
            .with_attempts(3)
            .with_retry_delay(Duration::from_millis(10));

        let err = Connection::connect(addr, &options).await.unwrap_err();
        assert!(matches!(err, Error::ConnectFailed { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_failed_connect_returns_to_disconnected() {
        let addr = free_addr().await;
        let connection = Connection::new(addr);
        let options = ConnectOptions::new().with_attempts(1);

        assert!(connection.open(&options).await.is_err());
        assert_eq!(connection.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_retries_until_listener_appears() {
        let addr = free_addr().await;

        let server = tokio::spawn(async move {
            sleep(Duration::from_millis(150)).await;
            let listener = TcpListener::bind(addr).await.expect("bind");
            listener.accept().await.expect("accept")
        });

        let options = ConnectOptions::new().with_retry_delay(Duration::from_millis(50));
        let (connection, _events) = Connection::connect(addr, &options).await.expect("connect");

        assert!(connection.is_connected());
        let _ = server.await;
    }

    #[tokio::test]
    async fn test_frames_sent_in_order() -> anyhow::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (connection, _events) = Connection::connect(addr, &ConnectOptions::default()).await?;
        let (mut socket, _) = listener.accept().await?;

        connection.send_message("[1]")?;
        connection.send_message("[22]")?;

        let mut buf = vec![0u8; 11];
        socket.read_exact(&mut buf).await?;
        assert_eq!(buf, b"3:[1]4:[22]");
        Ok(())
    }

    #[tokio::test]
    async fn test_messages_and_single_close_notification() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let (connection, mut events) = Connection::connect(addr, &ConnectOptions::default())
            .await
            .expect("connect");
        let (mut socket, _) = listener.accept().await.expect("accept");

        socket.write_all(b"3:[2]0:").await.expect("write");
        drop(socket);

        assert_eq!(
            next_event(&mut events).await,
            Some(TransportEvent::Message("[2]".into()))
        );
        assert_eq!(next_event(&mut events).await, Some(TransportEvent::Closed));
        assert_eq!(next_event(&mut events).await, None);
        assert_eq!(connection.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_send_after_close_fails_without_queueing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let (connection, mut events) = Connection::connect(addr, &ConnectOptions::default())
            .await
            .expect("connect");

        connection.close();
        connection.close();

        let err = connection.send_message("[0]").unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));

        connection.shutdown().await;
        assert_eq!(next_event(&mut events).await, Some(TransportEvent::Closed));
        assert_eq!(next_event(&mut events).await, None);
    }

    #[tokio::test]
    async fn test_send_before_open_is_rejected() {
        let connection = Connection::new(free_addr().await);
        assert!(matches!(
            connection.send_message("[0]"),
            Err(Error::ConnectionClosed)
        ));
        assert_eq!(connection.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_corrupt_header_terminates_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let (_connection, mut events) = Connection::connect(addr, &ConnectOptions::default())
            .await
            .expect("connect");
        let (mut socket, _) = listener.accept().await.expect("accept");

        socket.write_all(b"xx:whatever").await.expect("write");

        assert_eq!(next_event(&mut events).await, Some(TransportEvent::Closed));
    }
}
