//! Session bootstrap.
//!
//! The [`Driver`] holds the connection settings and the optional
//! collaborators. [`Driver::connect`] runs the full bring-up:
//!
//! 1. Resolve the Marionette port (explicit, preference store, 2828)
//! 2. Write the capability flags into the preference store
//! 3. Launch the browser, if a launcher is configured
//! 4. Connect the primary transport with retries
//! 5. Start the session (one retry on failure)
//! 6. Apply configured timeouts
//! 7. Open the event channel; failure only degrades the browser handle
//!
//! # Example
//!
//! ```no_run
//! use firefox_marionette::{By, Driver};
//!
//! # async fn example() -> firefox_marionette::Result<()> {
//! let browser = Driver::builder().port(2828).build()?.connect().await?;
//!
//! browser.session().navigate("https://example.com").await?;
//! let heading = browser.session().find_element(By::tag("h1")).await?;
//! println!("{}", heading.text().await?);
//!
//! browser.close().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::browser::{EventChannel, EventChannelOptions, Session, Timeouts};
use crate::error::{Error, Result};
use crate::protocol::Subscriptions;
use crate::transport::{Client, ConnectOptions};

use super::browser::Browser;
use super::builder::DriverBuilder;
use super::launcher::{BrowserProcess, Launcher};
use super::preferences::{
    MARIONETTE_PORT_PREF, MULTIPROCESS_PREF, PreferenceStore, PreferenceValue,
    REMOTE_DEBUGGING_PREF,
};

// ============================================================================
// Constants
// ============================================================================

/// Port Marionette listens on unless configured otherwise.
pub const DEFAULT_MARIONETTE_PORT: u16 = 2828;

// ============================================================================
// Types
// ============================================================================

/// Validated driver configuration.
pub(crate) struct DriverConfig {
    pub host: IpAddr,
    pub port: Option<u16>,
    pub event_port: Option<u16>,
    pub event_channel: bool,
    pub connect: ConnectOptions,
    pub capabilities: Value,
    pub timeouts: Timeouts,
    pub event_pump_script: Option<String>,
    pub preferences: Option<Arc<dyn PreferenceStore>>,
    pub launcher: Option<Arc<dyn Launcher>>,
}

// ============================================================================
// Driver
// ============================================================================

/// Marionette session factory.
#[derive(Clone)]
pub struct Driver {
    /// Shared configuration.
    pub(crate) inner: Arc<DriverConfig>,
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("host", &self.inner.host)
            .field("port", &self.inner.port)
            .field("event_channel", &self.inner.event_channel)
            .finish_non_exhaustive()
    }
}

impl Driver {
    /// Creates a configuration builder for the driver.
    #[inline]
    #[must_use]
    pub fn builder() -> DriverBuilder {
        DriverBuilder::new()
    }

    pub(crate) fn new(config: DriverConfig) -> Self {
        Self {
            inner: Arc::new(config),
        }
    }
}

// ============================================================================
// Driver - Public API
// ============================================================================

impl Driver {
    /// Resolves the Marionette port.
    ///
    /// Explicit port first, then [`MARIONETTE_PORT_PREF`] from the store,
    /// then [`DEFAULT_MARIONETTE_PORT`].
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the stored port is not a valid port number
    /// - Any error of the preference store
    pub fn resolve_port(&self) -> Result<u16> {
        if let Some(port) = self.inner.port {
            return Ok(port);
        }

        let Some(store) = &self.inner.preferences else {
            return Ok(DEFAULT_MARIONETTE_PORT);
        };

        match store.get(MARIONETTE_PORT_PREF)? {
            None => Ok(DEFAULT_MARIONETTE_PORT),
            Some(value) => value
                .as_int()
                .and_then(|port| u16::try_from(port).ok())
                .filter(|port| *port != 0)
                .ok_or_else(|| {
                    Error::config(format!("Invalid {MARIONETTE_PORT_PREF} preference: {value}"))
                }),
        }
    }

    /// Brings up a browser session.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the port could not be resolved
    /// - [`Error::Launch`] if the launcher failed
    /// - [`Error::ConnectFailed`] if the transport never connected
    /// - [`Error::Remote`] if the session could not be started
    pub async fn connect(&self) -> Result<Browser> {
        let port = self.resolve_port()?;
        self.write_preferences(port)?;

        let mut process = match &self.inner.launcher {
            Some(launcher) => {
                debug!(port, "Launching browser");
                Some(launcher.launch(port).await?)
            }
            None => None,
        };

        match self.establish(port).await {
            Ok(session) => {
                let event_channel = self.open_event_channel(&session).await;
                Ok(Browser::new(session, event_channel, process))
            }
            Err(e) => {
                if let Some(process) = process.as_mut()
                    && let Err(close_err) = process.close().await
                {
                    warn!(error = %close_err, "Failed to close browser after setup error");
                }
                Err(e)
            }
        }
    }
}

// ============================================================================
// Driver - Internal
// ============================================================================

impl Driver {
    fn write_preferences(&self, port: u16) -> Result<()> {
        let Some(store) = &self.inner.preferences else {
            return Ok(());
        };

        store.merge(vec![
            (MARIONETTE_PORT_PREF.to_string(), PreferenceValue::from(port)),
            (MULTIPROCESS_PREF.to_string(), PreferenceValue::Bool(true)),
            (REMOTE_DEBUGGING_PREF.to_string(), PreferenceValue::Bool(true)),
        ])
    }

    async fn establish(&self, port: u16) -> Result<Session> {
        let addr = SocketAddr::new(self.inner.host, port);
        let client = Client::connect(addr, &self.inner.connect, Arc::new(Subscriptions::new())).await?;

        let session = match Session::start(client.clone(), self.inner.capabilities.clone()).await {
            Ok(session) => session,
            Err(e) => {
                client.shutdown().await;
                return Err(e);
            }
        };

        if let Err(e) = session.set_timeouts(&self.inner.timeouts).await {
            client.shutdown().await;
            return Err(e);
        }

        info!(%addr, session_id = ?session.session_id(), "Browser connected");
        Ok(session)
    }

    async fn open_event_channel(&self, session: &Session) -> Option<EventChannel> {
        if !self.inner.event_channel {
            return None;
        }

        let mut options = EventChannelOptions::new().with_connect(self.inner.connect);
        if let Some(port) = self.inner.event_port {
            options = options.with_port(port);
        }
        if let Some(script) = &self.inner.event_pump_script {
            options = options.with_bootstrap_script(script.clone());
        }

        match EventChannel::open(session, options).await {
            Ok(channel) => Some(channel),
            Err(e) => {
                warn!(error = %e, "Event channel unavailable, continuing without push events");
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::driver::MemoryPreferences;
    use crate::transport::stub::{StubServer, command_name, command_params, reply_err, reply_ok};

    struct FakeProcess {
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl BrowserProcess for FakeProcess {
        async fn close(&mut self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeLauncher {
        port: AtomicU16,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Launcher for FakeLauncher {
        async fn launch(&self, port: u16) -> Result<Box<dyn BrowserProcess>> {
            self.port.store(port, Ordering::SeqCst);
            Ok(Box::new(FakeProcess {
                closed: Arc::clone(&self.closed),
            }))
        }
    }

    async fn browser_stub() -> StubServer {
        StubServer::start(|command| {
            let result = match command_name(command) {
                "WebDriver:NewSession" => json!({
                    "sessionId": "s-1",
                    "capabilities": { "browserName": "firefox" }
                }),
                "WebDriver:ExecuteScript"
                    if command_params(command)["script"]
                        .as_str()
                        .is_some_and(|s| s.starts_with("try")) =>
                {
                    json!({ "value": "undefined" })
                }
                _ => json!({ "value": null }),
            };
            vec![reply_ok(command, result)]
        })
        .await
    }

    async fn unused_port() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        listener.local_addr().expect("addr").port()
    }

    fn fast_retry(builder: DriverBuilder) -> DriverBuilder {
        builder
            .connect_attempts(2)
            .retry_delay(Duration::from_millis(10))
    }

    #[test]
    fn test_port_resolution_order() {
        let prefs = Arc::new(MemoryPreferences::new().with(MARIONETTE_PORT_PREF, 2900_i32));

        let explicit = Driver::builder().port(3000).preferences(prefs.clone()).build().expect("build");
        assert_eq!(explicit.resolve_port().expect("port"), 3000);

        let stored = Driver::builder().preferences(prefs).build().expect("build");
        assert_eq!(stored.resolve_port().expect("port"), 2900);

        let default = Driver::builder().build().expect("build");
        assert_eq!(default.resolve_port().expect("port"), DEFAULT_MARIONETTE_PORT);
    }

    #[test]
    fn test_invalid_stored_port_is_config_error() {
        let prefs = Arc::new(MemoryPreferences::new().with(MARIONETTE_PORT_PREF, 70000_i32));
        let driver = Driver::builder().preferences(prefs).build().expect("build");

        assert!(matches!(driver.resolve_port(), Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_connect_with_unavailable_event_channel() {
        let server = browser_stub().await;
        let prefs = Arc::new(MemoryPreferences::new());

        let browser = fast_retry(Driver::builder())
            .port(server.addr().port())
            .event_port(unused_port().await)
            .implicit_wait(Duration::from_millis(200))
            .preferences(prefs.clone())
            .build()
            .expect("build")
            .connect()
            .await
            .expect("connect");

        assert!(browser.event_channel().is_none());
        assert_eq!(browser.session().session_id().as_deref(), Some("s-1"));
        assert_eq!(browser.session().implicit_wait(), Duration::from_millis(200));
        assert_eq!(
            prefs.get(MULTIPROCESS_PREF).expect("get"),
            Some(PreferenceValue::Bool(true))
        );

        let names = server.received_names();
        assert_eq!(names[0], "WebDriver:NewSession");
        assert_eq!(names[1], "WebDriver:SetTimeouts");

        browser.close().await;
    }

    #[tokio::test]
    async fn test_launcher_receives_port_and_process_is_closed() {
        let server = browser_stub().await;
        let closed = Arc::new(AtomicBool::new(false));
        let launcher = Arc::new(FakeLauncher {
            port: AtomicU16::new(0),
            closed: Arc::clone(&closed),
        });

        let browser = fast_retry(Driver::builder())
            .port(server.addr().port())
            .event_channel(false)
            .launcher(launcher.clone())
            .build()
            .expect("build")
            .connect()
            .await
            .expect("connect");

        assert_eq!(launcher.port.load(Ordering::SeqCst), server.addr().port());

        browser.close().await;
        assert!(closed.load(Ordering::SeqCst));
        assert!(server.received_names().contains(&"WebDriver:DeleteSession".to_string()));
    }

    #[tokio::test]
    async fn test_failed_session_closes_launched_process() {
        let server = StubServer::start(|command| {
            vec![reply_err(command, "session not created", "no")]
        })
        .await;
        let closed = Arc::new(AtomicBool::new(false));
        let launcher = Arc::new(FakeLauncher {
            port: AtomicU16::new(0),
            closed: Arc::clone(&closed),
        });

        let err = fast_retry(Driver::builder())
            .port(server.addr().port())
            .launcher(launcher)
            .build()
            .expect("build")
            .connect()
            .await
            .unwrap_err();

        assert!(err.is_remote());
        assert!(closed.load(Ordering::SeqCst));
    }
}
