//! Secondary event channel.
//!
//! A second TCP connection that carries only events. The remote runtime
//! pushes payloads over it outside the command/response cadence; each one
//! is routed through the same [`Subscriptions`] as events arriving on the
//! primary connection.
//!
//! # Setup
//!
//! 1. Switch to the chrome context
//! 2. Probe for a pump left by an earlier session and reuse its port
//! 3. Otherwise run the bootstrap script with the chosen port
//! 4. Restore the previous context
//! 5. Connect, with retries, and start the pump task
//!
//! The channel is optional: callers treat a failed [`EventChannel::open`]
//! as running without push events.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::driver::assets::{EVENT_PUMP_BOOTSTRAP, EVENT_PUMP_GLOBAL};
use crate::error::{Error, Result};
use crate::protocol::message::EVENT_TAG;
use crate::protocol::{Context, Event, Subscriptions};
use crate::transport::{ConnectOptions, Connection, TransportEvent, TransportEvents};

use super::session::{Script, Session};

// ============================================================================
// Constants
// ============================================================================

/// Offset added to the primary port when no event port is configured.
pub const EVENT_PORT_OFFSET: u16 = 10000;

// ============================================================================
// EventChannelOptions
// ============================================================================

/// Configuration for [`EventChannel::open`].
#[derive(Debug, Clone)]
pub struct EventChannelOptions {
    /// Port to listen on; `None` means primary port + [`EVENT_PORT_OFFSET`].
    pub port: Option<u16>,
    /// Connect retry policy.
    pub connect: ConnectOptions,
    /// Script that starts the remote listener.
    pub bootstrap_script: String,
}

impl Default for EventChannelOptions {
    fn default() -> Self {
        Self {
            port: None,
            connect: ConnectOptions::default(),
            bootstrap_script: EVENT_PUMP_BOOTSTRAP.to_string(),
        }
    }
}

impl EventChannelOptions {
    /// Creates options with the default bootstrap and derived port.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an explicit port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the connect retry policy.
    #[must_use]
    pub fn with_connect(mut self, connect: ConnectOptions) -> Self {
        self.connect = connect;
        self
    }

    /// Replaces the bootstrap script.
    #[must_use]
    pub fn with_bootstrap_script(mut self, script: impl Into<String>) -> Self {
        self.bootstrap_script = script.into();
        self
    }
}

// ============================================================================
// EventChannel
// ============================================================================

struct EventChannelInner {
    port: u16,
    connection: Connection,
    pump_task: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to an open event channel.
#[derive(Clone)]
pub struct EventChannel {
    inner: Arc<EventChannelInner>,
}

impl fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("port", &self.inner.port)
            .field("open", &self.is_open())
            .finish()
    }
}

impl EventChannel {
    /// Installs (or finds) the remote pump and connects to it.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the derived port overflows
    /// - [`Error::Remote`] if the context switch or bootstrap failed
    /// - [`Error::ConnectFailed`] if the pump never accepted a connection
    pub async fn open(session: &Session, options: EventChannelOptions) -> Result<Self> {
        let primary = session.client().connection().addr();
        let requested = event_port(primary.port(), options.port)?;

        let previous = session.context();
        session.set_context(Context::Chrome).await?;

        let prepared = prepare_pump(session, requested, &options.bootstrap_script).await;

        let restore = match previous {
            Context::None => Context::Content,
            other => other,
        };
        if let Err(e) = session.set_context(restore).await {
            warn!(error = %e, context = ?restore, "Failed to restore context");
        }

        let port = prepared?;
        let addr = SocketAddr::new(primary.ip(), port);
        let (connection, events) = Connection::connect(addr, &options.connect).await?;

        let subscriptions = Arc::clone(session.client().subscriptions());
        let pump_task = tokio::spawn(run_event_pump(events, subscriptions));

        info!(port, "Event channel open");

        Ok(Self {
            inner: Arc::new(EventChannelInner {
                port,
                connection,
                pump_task: Mutex::new(Some(pump_task)),
            }),
        })
    }

    /// Returns the port the channel is connected to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.port
    }

    /// Returns `true` while the connection is up.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.connection.is_connected()
    }

    /// Closes the connection. The pump task ends on its own.
    pub fn close(&self) {
        self.inner.connection.close();
    }

    /// Closes the connection and waits for every task to finish.
    pub async fn shutdown(&self) {
        self.inner.connection.shutdown().await;

        let task = self.inner.pump_task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            warn!(error = %e, "Event pump task failed");
        }
    }
}

// ============================================================================
// Pump
// ============================================================================

async fn prepare_pump(session: &Session, requested: u16, bootstrap: &str) -> Result<u16> {
    if session.object_exists(EVENT_PUMP_GLOBAL).await? {
        let value = session
            .execute(&format!("return {EVENT_PUMP_GLOBAL}.port;"))
            .await?;
        if let Some(port) = value.as_u64().and_then(|p| u16::try_from(p).ok()) {
            debug!(port, "Reusing existing event pump");
            return Ok(port);
        }
        warn!(value = %value, "Existing event pump reports no port, bootstrapping");
    }

    debug!(port = requested, "Bootstrapping event pump");
    session
        .execute_script(&Script::new(bootstrap).arg(requested))
        .await?;
    Ok(requested)
}

async fn run_event_pump(mut events: TransportEvents, subscriptions: Arc<Subscriptions>) {
    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Message(text) => match parse_event(&text) {
                Some(event) => {
                    subscriptions.dispatch(&event);
                }
                None => trace!(len = text.len(), "Dropped non-event frame"),
            },
            TransportEvent::Closed => break,
        }
    }

    debug!("Event pump terminated");
}

// ============================================================================
// Helper Functions
// ============================================================================

fn event_port(primary: u16, explicit: Option<u16>) -> Result<u16> {
    match explicit {
        Some(port) => Ok(port),
        None => primary.checked_add(EVENT_PORT_OFFSET).ok_or_else(|| {
            Error::config(format!(
                "Event port {primary} + {EVENT_PORT_OFFSET} exceeds the port range"
            ))
        }),
    }
}

/// Reads an event frame: a `[2, ..., payload]` array or a bare payload.
fn parse_event(text: &str) -> Option<Event> {
    let value: Value = serde_json::from_str(text).ok()?;

    let payload = match value {
        Value::Array(mut items)
            if items.len() >= 2 && items.first().and_then(Value::as_u64) == Some(EVENT_TAG) =>
        {
            items.pop()?
        }
        Value::Object(_) => value,
        _ => return None,
    };

    Event::from_payload(payload)
}

// ============================================================================
// Tests
// ============================================================================
