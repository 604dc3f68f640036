//! Builder pattern for driver configuration.
//!
//! Provides a fluent API for configuring and creating [`Driver`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use firefox_marionette::Driver;
//!
//! # fn example() -> firefox_marionette::Result<()> {
//! let driver = Driver::builder()
//!     .port(2828)
//!     .connect_attempts(20)
//!     .implicit_wait(Duration::from_secs(2))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use crate::browser::Timeouts;
use crate::error::{Error, Result};
use crate::transport::ConnectOptions;

use super::core::{Driver, DriverConfig};
use super::launcher::Launcher;
use super::preferences::PreferenceStore;

// ============================================================================
// DriverBuilder
// ============================================================================

/// Builder for configuring a [`Driver`] instance.
///
/// Use [`Driver::builder()`] to create a new builder.
#[derive(Clone)]
pub struct DriverBuilder {
    host: IpAddr,
    port: Option<u16>,
    event_port: Option<u16>,
    event_channel: bool,
    connect: ConnectOptions,
    capabilities: Value,
    timeouts: Timeouts,
    event_pump_script: Option<String>,
    preferences: Option<Arc<dyn PreferenceStore>>,
    launcher: Option<Arc<dyn Launcher>>,
}

impl Default for DriverBuilder {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: None,
            event_port: None,
            event_channel: true,
            connect: ConnectOptions::default(),
            capabilities: json!({}),
            timeouts: Timeouts::default(),
            event_pump_script: None,
            preferences: None,
            launcher: None,
        }
    }
}

impl fmt::Debug for DriverBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverBuilder")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("event_port", &self.event_port)
            .field("event_channel", &self.event_channel)
            .field("connect", &self.connect)
            .field("has_preferences", &self.preferences.is_some())
            .field("has_launcher", &self.launcher.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// DriverBuilder Implementation
// ============================================================================

impl DriverBuilder {
    /// Creates a builder with defaults (`127.0.0.1`, port from preferences
    /// or 2828, event channel enabled).
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host to connect to.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Sets the Marionette port, overriding the preference store.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the event channel port (default: Marionette port + 10000).
    #[inline]
    #[must_use]
    pub fn event_port(mut self, port: u16) -> Self {
        self.event_port = Some(port);
        self
    }

    /// Enables or disables the secondary event channel.
    #[inline]
    #[must_use]
    pub fn event_channel(mut self, enabled: bool) -> Self {
        self.event_channel = enabled;
        self
    }

    /// Sets the number of TCP connect attempts.
    #[inline]
    #[must_use]
    pub fn connect_attempts(mut self, attempts: u32) -> Self {
        self.connect = self.connect.with_attempts(attempts);
        self
    }

    /// Sets the pause between connect attempts.
    #[inline]
    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.connect = self.connect.with_retry_delay(delay);
        self
    }

    /// Sets the capabilities sent with `WebDriver:NewSession`.
    #[inline]
    #[must_use]
    pub fn capabilities(mut self, capabilities: Value) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Sets the implicit wait applied after the session starts.
    #[inline]
    #[must_use]
    pub fn implicit_wait(mut self, wait: Duration) -> Self {
        self.timeouts.implicit = Some(wait);
        self
    }

    /// Sets the timeouts applied after the session starts.
    ///
    /// Replaces any earlier [`implicit_wait`](Self::implicit_wait).
    #[inline]
    #[must_use]
    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Replaces the event pump bootstrap script.
    #[inline]
    #[must_use]
    pub fn event_pump_script(mut self, script: impl Into<String>) -> Self {
        self.event_pump_script = Some(script.into());
        self
    }

    /// Sets the preference store used for port discovery.
    #[inline]
    #[must_use]
    pub fn preferences(mut self, store: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(store);
        self
    }

    /// Sets the launcher that starts the browser before connecting.
    #[inline]
    #[must_use]
    pub fn launcher(mut self, launcher: Arc<dyn Launcher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Builds the driver with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if a port is 0
    /// - [`Error::Config`] if connect attempts is 0
    pub fn build(self) -> Result<Driver> {
        self.validate()?;

        Ok(Driver::new(DriverConfig {
            host: self.host,
            port: self.port,
            event_port: self.event_port,
            event_channel: self.event_channel,
            connect: self.connect,
            capabilities: self.capabilities,
            timeouts: self.timeouts,
            event_pump_script: self.event_pump_script,
            preferences: self.preferences,
            launcher: self.launcher,
        }))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl DriverBuilder {
    fn validate(&self) -> Result<()> {
        if self.port == Some(0) {
            return Err(Error::config(
                "Marionette port must be non-zero. Use .port() with a real port.",
            ));
        }
        if self.event_port == Some(0) {
            return Err(Error::config("Event port must be non-zero."));
        }
        if self.connect.attempts == 0 {
            return Err(Error::config(
                "At least one connect attempt is required. Use .connect_attempts(n) with n >= 1.",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let builder = DriverBuilder::new();
        assert_eq!(builder.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(builder.port.is_none());
        assert!(builder.event_channel);
        assert_eq!(builder.connect, ConnectOptions::default());
    }

    #[test]
    fn test_zero_port_rejected() {
        let err = DriverBuilder::new().port(0).build().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = DriverBuilder::new().connect_attempts(0).build().unwrap_err();
        assert!(err.to_string().contains("connect attempt"));
    }

    #[test]
    fn test_implicit_wait_goes_into_timeouts() {
        let builder = DriverBuilder::new().implicit_wait(Duration::from_millis(300));
        assert_eq!(builder.timeouts.implicit, Some(Duration::from_millis(300)));
    }
}
